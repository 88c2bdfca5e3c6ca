//! The index store: a JSON summary of every post, written by
//! [`crate::build`] and read by [`crate::query`].
//!
//! The document looks like this:
//!
//! ```json
//! {
//!   "posts": [{"date": "2021-04-16 09:30:00", "title": "...", "status": "public",
//!              "author": "...", "tags": ["greet"], "file": "posts/hello.md",
//!              "url": "hello-world"}],
//!   "drafts": [],
//!   "tags": {"greet": ["hello-world"]}
//! }
//! ```
//!
//! Readers trust it without re-validation, so it's only ever replaced
//! wholesale and atomically (see [`Index::save`]).

use crate::date;
use crate::post::Post;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// The header fields of a [`Post`] as persisted in the index. The rendered
/// content, excerpt and position are left out; the position only matters
/// while sorting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(with = "date::persisted", default)]
    pub date: Option<NaiveDateTime>,
    pub title: String,
    pub status: String,
    pub author: String,
    pub tags: Vec<String>,
    pub file: PathBuf,
    pub url: String,
}

impl From<&Post> for IndexEntry {
    fn from(post: &Post) -> IndexEntry {
        IndexEntry {
            date: post.date,
            title: post.title.clone(),
            status: post.status.clone(),
            author: post.author.clone(),
            tags: post.tags.clone(),
            file: post.file.clone(),
            url: post.url.clone(),
        }
    }
}

/// The whole index store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Public posts, newest first.
    pub posts: Vec<IndexEntry>,

    /// Drafts, in the same order as `posts`.
    pub drafts: Vec<IndexEntry>,

    /// Maps each tag of a public post to the urls of the public posts
    /// carrying it, in `posts` order.
    pub tags: BTreeMap<String, Vec<String>>,
}

impl Index {
    /// Reads the index store at `path`.
    pub fn load(path: &Path) -> Result<Index> {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            Error::Corrupt {
                path: path.to_owned(),
                source,
            }
        })
    }

    /// Replaces the index store at `path` with `self`. The document is
    /// written to a temporary file in the same directory and renamed over
    /// `path`, so readers see either the old index or the new one.
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_error = |source| Error::Write {
            path: path.to_owned(),
            source,
        };

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
        {
            let mut w = BufWriter::new(&mut tmp);
            serde_json::to_writer(&mut w, self).map_err(|source| {
                Error::Serialize {
                    path: path.to_owned(),
                    source,
                }
            })?;
            w.flush().map_err(write_error)?;
        }
        tmp.as_file().sync_all().map_err(write_error)?;
        tmp.persist(path).map_err(|e| write_error(e.error))?;
        Ok(())
    }

    /// Returns the draft list if `draft` is set, otherwise the public list.
    pub fn list(&self, draft: bool) -> &[IndexEntry] {
        if draft {
            &self.drafts
        } else {
            &self.posts
        }
    }
}

/// The result of an index store operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading or writing the index store.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the index store is missing or can't be read.
    #[error("reading index `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Returned when the index store isn't a valid index document.
    #[error("index `{}` is corrupt", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Returned when the index can't be serialized.
    #[error("serializing index `{}`", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Returned when the new index can't be written or moved into place.
    #[error("writing index `{}`", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(url: &str, date: &str, status: &str) -> IndexEntry {
        IndexEntry {
            date: date::parse(date).unwrap(),
            title: url.to_uppercase(),
            status: status.to_owned(),
            author: "jane".to_owned(),
            tags: vec!["a".to_owned()],
            file: PathBuf::from(format!("posts/{}.md", url)),
            url: url.to_owned(),
        }
    }

    fn sample() -> Index {
        let mut tags = BTreeMap::new();
        tags.insert("a".to_owned(), vec!["first".to_owned()]);
        Index {
            posts: vec![entry("first", "2024-01-01 10:30", "public")],
            drafts: vec![entry("undated", "", "draft")],
            tags,
        }
    }

    #[test]
    fn test_save_then_load() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let index = sample();
        index.save(&path)?;
        assert_eq!(index, Index::load(&path)?);
        Ok(())
    }

    #[test]
    fn test_persisted_shape() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        sample().save(&path)?;

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!("2024-01-01 10:30:00", value["posts"][0]["date"]);
        assert!(value["drafts"][0]["date"].is_null());
        assert_eq!("first", value["tags"]["a"][0]);
        assert!(value["posts"][0].get("content").is_none());
        assert!(value["posts"][0].get("position").is_none());
        Ok(())
    }

    #[test]
    fn test_save_replaces_previous_index() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        sample().save(&path)?;
        Index::default().save(&path)?;
        assert_eq!(Index::default(), Index::load(&path)?);

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(1, leftovers);
        Ok(())
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        match Index::load(&dir.path().join("nope.json")) {
            Err(Error::Io { source, .. }) => {
                assert_eq!(io::ErrorKind::NotFound, source.kind())
            }
            other => panic!("wanted Io, got {:?}", other),
        }
    }

    #[test]
    fn test_load_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{\"posts\": [").unwrap();
        match Index::load(&path) {
            Err(Error::Corrupt { .. }) => {}
            other => panic!("wanted Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_list() {
        let index = sample();
        assert_eq!("first", index.list(false)[0].url);
        assert_eq!("undated", index.list(true)[0].url);
    }
}
