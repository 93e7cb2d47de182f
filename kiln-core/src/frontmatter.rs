use serde_json::Value;

use crate::data::DataContext;

const FENCE: &str = "---";

#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    #[error("Invalid front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Front matter is not terminated by `---`")]
    Unterminated,
}

/// Data declared at the top of a template, plus the body that follows it.
#[derive(Debug, Default, Clone)]
pub struct FrontMatter {
    pub data: DataContext,
    pub body: String,
}

impl FrontMatter {
    /// Split a `---` fenced YAML block off the start of `source`.
    ///
    /// Sources without an opening fence are returned whole as the body.
    pub fn parse(source: &str) -> Result<Self, FrontMatterError> {
        let Some(rest) = strip_opening_fence(source) else {
            return Ok(Self {
                data: DataContext::new(),
                body: source.to_string(),
            });
        };

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            if line.trim_end() == FENCE {
                let yaml = &rest[..offset];
                let body = &rest[offset + line.len()..];
                let data = if yaml.trim().is_empty() {
                    DataContext::new()
                } else {
                    serde_yaml::from_str(yaml)?
                };
                return Ok(Self {
                    data,
                    body: body.to_string(),
                });
            }
            offset += line.len();
        }

        Err(FrontMatterError::Unterminated)
    }

    pub fn layout(&self) -> Option<&str> {
        self.data.get("layout").and_then(Value::as_str)
    }

    /// `None` when no permalink is set, `Some(None)` for `permalink: false`.
    pub fn permalink(&self) -> Option<Option<&str>> {
        match self.data.get("permalink") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(false)) => Some(None),
            Some(Value::String(s)) => Some(Some(s.as_str())),
            Some(_) => None,
        }
    }
}

fn strip_opening_fence(source: &str) -> Option<&str> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let rest = source.strip_prefix(FENCE)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_front_matter() {
        let fm = FrontMatter::parse("<h1>{{ dogImage }}</h1>\n").unwrap();
        assert!(fm.data.is_empty());
        assert_eq!(fm.body, "<h1>{{ dogImage }}</h1>\n");
    }

    #[test]
    fn test_front_matter_split() {
        let src = "---\ntitle: Good boy\nlayout: base.njk\ntags: [dogs, golden]\n---\n# Hello\n";
        let fm = FrontMatter::parse(src).unwrap();
        assert_eq!(fm.data["title"], json!("Good boy"));
        assert_eq!(fm.data["tags"], json!(["dogs", "golden"]));
        assert_eq!(fm.layout(), Some("base.njk"));
        assert_eq!(fm.body, "# Hello\n");
    }

    #[test]
    fn test_permalink_variants() {
        let fm = FrontMatter::parse("---\npermalink: false\n---\nx").unwrap();
        assert_eq!(fm.permalink(), Some(None));

        let fm = FrontMatter::parse("---\npermalink: /feed.xml\n---\nx").unwrap();
        assert_eq!(fm.permalink(), Some(Some("/feed.xml")));

        let fm = FrontMatter::parse("---\n---\nx").unwrap();
        assert_eq!(fm.permalink(), None);
        assert_eq!(fm.body, "x");
    }

    #[test]
    fn test_horizontal_rule_is_not_front_matter() {
        let fm = FrontMatter::parse("Intro\n---\nmore").unwrap();
        assert!(fm.data.is_empty());
        assert_eq!(fm.body, "Intro\n---\nmore");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            FrontMatter::parse("---\ntitle: x\n"),
            Err(FrontMatterError::Unterminated)
        ));
        assert!(matches!(
            FrontMatter::parse("---\ntitle: [unclosed\n---\n"),
            Err(FrontMatterError::Yaml(_))
        ));
    }
}
