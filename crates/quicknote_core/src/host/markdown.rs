//! CommonMark rendering via `pulldown-cmark`.

use super::MarkdownRenderer;
use pulldown_cmark::{html, Options, Parser};

/// CommonMark renderer with tables, strikethrough and task lists enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkRenderer;

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut body = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut body, Parser::new_ext(markdown, options));
        body
    }
}

#[cfg(test)]
mod tests {
    use super::CommonMarkRenderer;
    use crate::host::MarkdownRenderer;

    #[test]
    fn renders_headings_and_emphasis() {
        let html = CommonMarkRenderer.render("# Hi\n\n*there*");
        assert_eq!(html, "<h1>Hi</h1>\n<p><em>there</em></p>\n");
    }

    #[test]
    fn renders_strikethrough_extension() {
        let html = CommonMarkRenderer.render("~~old~~");
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn empty_input_renders_empty_html() {
        assert_eq!(CommonMarkRenderer.render(""), "");
    }
}
