//! Defines the [`Post`] type and the logic for parsing posts from their
//! source files.
//!
//! A post source file is UTF-8 text made of a header block and a body
//! separated by the first blank line:
//!
//! ```text
//! title: Hello, world!
//! date: 2021-04-16 09:30
//! status: public
//! author: Jane
//! tags: greet intro
//!
//! # Hello
//!
//! World
//! ```
//!
//! Every header line is `key: value`. Keys are case-insensitive and unknown
//! keys are ignored. The body is markdown.

use crate::{date, markdown, slug};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// The status that makes a post public. Any other status is a draft.
pub const PUBLIC: &str = "public";

/// The position given to posts whose header doesn't set one.
pub const DEFAULT_POSITION: &str = "0";

/// A post parsed from its source file. Posts are rebuilt from source on every
/// access and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Post {
    /// The publication date. `None` for undated posts.
    #[serde(with = "date::persisted")]
    pub date: Option<NaiveDateTime>,

    pub title: String,

    /// `public` or anything else, which makes the post a draft.
    pub status: String,

    pub author: String,

    /// Tags in header order. Empty tags are dropped; duplicates are kept.
    pub tags: Vec<String>,

    /// Orders posts sharing a date. Compared as a string, so `"10"` sorts
    /// before `"2"`.
    pub position: String,

    /// The source file. This identifies the post everywhere else.
    pub file: PathBuf,

    /// The post's slug. Derived from the title when the header omits it.
    pub url: String,

    /// The body rendered to HTML.
    pub content: String,

    /// The first words of the body as plain text. See [`markdown::excerpt`].
    pub excerpt: String,
}

impl Post {
    /// Reads and parses the post at `path`.
    pub fn from_file(path: &Path) -> Result<Post> {
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Post::parse(path, &contents)
    }

    /// Parses a post from the contents of the source file at `path`. The
    /// path is only recorded, never read.
    pub fn parse(path: &Path, input: &str) -> Result<Post> {
        let (header, body) = split_header(input).ok_or_else(|| {
            Error::MissingSeparator {
                path: path.to_owned(),
            }
        })?;

        let mut post = Post {
            file: path.to_owned(),
            ..Post::default()
        };

        for line in header.lines() {
            let colon = line.find(':').ok_or_else(|| Error::MalformedHeader {
                path: path.to_owned(),
                line: line.to_owned(),
            })?;
            let value = line[colon + 1..].trim();
            match line[..colon].trim().to_lowercase().as_str() {
                "date" => {
                    post.date =
                        date::parse(value).map_err(|source| Error::Date {
                            path: path.to_owned(),
                            source,
                        })?
                }
                "title" => post.title = value.to_owned(),
                "status" => post.status = value.to_owned(),
                "author" => post.author = value.to_owned(),
                "tags" => {
                    post.tags = value
                        .split(' ')
                        .filter(|tag| !tag.is_empty())
                        .map(str::to_owned)
                        .collect()
                }
                "position" => post.position = value.to_owned(),
                "url" => post.url = value.to_owned(),
                _ => {}
            }
        }

        if post.position.is_empty() {
            post.position = DEFAULT_POSITION.to_owned();
        }

        if post.url.is_empty() {
            post.url = slug::slugify(&post.title);
        }

        markdown::to_html(&mut post.content, body);
        post.excerpt = markdown::excerpt(body);

        debug!(file = %path.display(), url = %post.url, "parsed post");
        Ok(post)
    }

    /// Returns true if the post is listed publicly.
    pub fn is_public(&self) -> bool {
        self.status == PUBLIC
    }

    /// Formats the post's date for display. Undated posts yield an empty
    /// string. `format` must be a valid strftime pattern (see
    /// [`date::validate_format`]).
    pub fn display_date(&self, format: &str) -> String {
        date::display(&self.date, format)
    }
}

/// Splits a source file at its first blank line into header and body. A
/// line holding only `\r` counts as blank so CRLF files work too.
fn split_header(input: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in input.split_inclusive('\n') {
        if line.trim_end_matches(|c| c == '\n' || c == '\r').is_empty()
            && line.ends_with('\n')
        {
            return Some((&input[..offset], &input[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// The result of parsing a [`Post`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`]. Every variant carries the path of
/// the offending source file.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the source file is missing or can't be read.
    #[error("reading post `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Returned when there's no blank line between header and body.
    #[error("post `{}` has no blank line separating its header from its body", .path.display())]
    MissingSeparator { path: PathBuf },

    /// Returned when a header line has no colon.
    #[error("post `{}` has a malformed header line `{line}`", .path.display())]
    MalformedHeader { path: PathBuf, line: String },

    /// Returned when the `date` header matches none of the accepted formats.
    #[error("post `{}` has an invalid date", .path.display())]
    Date {
        path: PathBuf,
        #[source]
        source: date::Error,
    },
}

impl Error {
    /// The source file the error is about.
    pub fn path(&self) -> &Path {
        match self {
            Error::Io { path, .. } => path,
            Error::MissingSeparator { path } => path,
            Error::MalformedHeader { path, .. } => path,
            Error::Date { path, .. } => path,
        }
    }
}
