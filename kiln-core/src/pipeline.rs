//! Build pipeline: render the site in a child process, then publish it.
//!
//! Tasks run strictly in series. The copy reads what the render wrote, so a
//! failed task ends the run and nothing after it starts.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use crate::publish::{PublishError, copy_tree};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Render exited with status {code}")]
    RenderFailed { code: i32 },
    #[error("Render was terminated by signal {signal}")]
    RenderSignaled { signal: i32 },
    #[error("Copy failed: {0}")]
    Copy(#[from] PublishError),
}

impl PipelineError {
    /// Process exit code that reports this failure to the invoker.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::RenderFailed { code } => *code,
            PipelineError::RenderSignaled { signal } => 128 + signal,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Rendering,
    Copying,
    Failed,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Rendering => "rendering",
            PipelineState::Copying => "copying",
            PipelineState::Failed => "failed",
            PipelineState::Done => "done",
        };
        f.write_str(name)
    }
}

pub trait Task {
    fn name(&self) -> &str;
    /// State the pipeline is in while this task runs.
    fn state(&self) -> PipelineState;
    fn run(&self) -> Result<(), PipelineError>;
}

/// Runs the site generator as a child process sharing our stdio.
#[derive(Debug, Clone)]
pub struct RenderTask {
    program: OsString,
    args: Vec<OsString>,
}

impl RenderTask {
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Task for RenderTask {
    fn name(&self) -> &str {
        "render"
    }

    fn state(&self) -> PipelineState {
        PipelineState::Rendering
    }

    fn run(&self) -> Result<(), PipelineError> {
        log::debug!("Spawning {:?} {:?}", self.program, self.args);
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| PipelineError::Spawn {
                program: self.program.to_string_lossy().to_string(),
                source,
            })?;

        check_status(status)
    }
}

fn check_status(status: ExitStatus) -> Result<(), PipelineError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(PipelineError::RenderFailed { code });
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(PipelineError::RenderSignaled { signal });
        }
    }

    Err(PipelineError::RenderFailed { code: 1 })
}

/// Copies the generator output into the publish directory.
#[derive(Debug, Clone)]
pub struct CopyTask {
    from: PathBuf,
    to: PathBuf,
}

impl CopyTask {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(from: P, to: Q) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Task for CopyTask {
    fn name(&self) -> &str {
        "copy"
    }

    fn state(&self) -> PipelineState {
        PipelineState::Copying
    }

    fn run(&self) -> Result<(), PipelineError> {
        let copied = copy_tree(&self.from, &self.to)?;
        log::info!(
            "Copied {copied} files from {} to {}",
            self.from.display(),
            self.to.display()
        );
        Ok(())
    }
}

pub struct Pipeline {
    tasks: Vec<Box<dyn Task>>,
    state: PipelineState,
}

impl Pipeline {
    /// Tasks that run one after another, stopping at the first failure.
    pub fn series(tasks: Vec<Box<dyn Task>>) -> Self {
        Self {
            tasks,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn run(&mut self) -> Result<(), PipelineError> {
        for task in &self.tasks {
            self.state = transition(self.state, task.state());
            log::debug!("Starting '{}'", task.name());

            if let Err(err) = task.run() {
                self.state = transition(self.state, PipelineState::Failed);
                log::error!("'{}' failed: {err}", task.name());
                return Err(err);
            }
            log::debug!("Finished '{}'", task.name());
        }

        self.state = transition(self.state, PipelineState::Done);
        Ok(())
    }
}

fn transition(from: PipelineState, to: PipelineState) -> PipelineState {
    log::debug!("Pipeline {from} -> {to}");
    to
}
