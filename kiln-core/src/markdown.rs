use std::sync::LazyLock;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Convert markdown to HTML, highlighting fenced code blocks with `syntax_theme`.
pub fn render_markdown(source: &str, syntax_theme: &str) -> String {
    let events: Vec<Event> = Parser::new_ext(source, options()).collect();
    let mut processed_events = Vec::with_capacity(events.len());
    let mut i = 0;

    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) if !lang.is_empty() => {
                // Collect all text events until the end of the code block
                let mut code_content = String::new();
                i += 1;

                while i < events.len() {
                    match &events[i] {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(text) => code_content.push_str(text),
                        _ => {}
                    }
                    i += 1;
                }

                processed_events.push(Event::Html(highlight(&code_content, lang, syntax_theme).into()));
            }
            event => processed_events.push(event.clone()),
        }
        i += 1;
    }

    let mut out = String::new();
    html::push_html(&mut out, processed_events.into_iter());
    out
}

fn highlight(code: &str, lang: &str, syntax_theme: &str) -> String {
    let syntax = SYNTAX_SET.find_syntax_by_token(lang).or_else(|| match lang {
        "toml" => SYNTAX_SET.find_syntax_by_name("YAML"),
        _ => None,
    });

    let plain = || {
        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            html_escape::encode_double_quoted_attribute(lang),
            html_escape::encode_text(code)
        )
    };

    match (syntax, THEME_SET.themes.get(syntax_theme)) {
        (Some(syntax), Some(theme)) => {
            highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).unwrap_or_else(|_| plain())
        }
        _ => plain(),
    }
}

/// Text of the first level-one heading, if any.
pub fn first_heading(source: &str) -> Option<String> {
    let mut in_h1 = false;
    let mut text = String::new();

    for event in Parser::new_ext(source, options()) {
        match event {
            Event::Start(Tag::Heading { level: HeadingLevel::H1, .. }) => in_h1 = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => return Some(text.trim().to_string()),
            Event::Text(t) | Event::Code(t) if in_h1 => text.push_str(&t),
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let html = render_markdown("# Title\n\n![dog](https://images.dog.ceo/x.jpg)\n", "base16-ocean.dark");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<img src=\"https://images.dog.ceo/x.jpg\" alt=\"dog\""));
    }

    #[test]
    fn test_tables_and_strikethrough() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n", "base16-ocean.dark");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_fenced_code_is_highlighted() {
        let html = render_markdown("```rust\nfn main() {}\n```\n", "base16-ocean.dark");
        assert!(html.contains("<pre style="));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_unknown_theme_falls_back_to_plain() {
        let html = render_markdown("```rust\nlet a = 1 < 2;\n```\n", "no-such-theme");
        assert!(html.contains("<pre><code class=\"language-rust\">let a = 1 &lt; 2;\n</code></pre>"));
    }

    #[test]
    fn test_first_heading() {
        assert_eq!(first_heading("intro\n\n# Golden `retriever`\n## sub"), Some("Golden retriever".into()));
        assert_eq!(first_heading("## only h2"), None);
    }
}
