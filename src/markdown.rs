//! Markdown rendering for post bodies and excerpts.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

/// The number of body words kept in an excerpt.
pub const EXCERPT_WORDS: usize = 40;

/// Appended to every excerpt.
pub const ELLIPSIS: &str = "...";

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").unwrap());

/// Converts markdown to HTML, appending the result to `w`.
pub fn to_html(w: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    html::push_html(w, Parser::new_ext(markdown, options));
}

/// Builds the plain-text excerpt of a raw markdown body: the first
/// [`EXCERPT_WORDS`] whitespace-separated words plus [`ELLIPSIS`], rendered
/// through [`to_html`] and stripped of tags.
pub fn excerpt(markdown: &str) -> String {
    let mut truncated = markdown
        .split_whitespace()
        .take(EXCERPT_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    truncated.push_str(ELLIPSIS);

    let mut rendered = String::new();
    to_html(&mut rendered, &truncated);
    strip_tags(&rendered).trim().to_owned()
}

/// Removes anything that looks like an HTML tag. This doesn't validate the
/// markup; every `<...>` on a single line goes.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}
