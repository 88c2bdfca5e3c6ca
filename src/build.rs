//! Exports the [`build_index`] function which rebuilds the index store from
//! the post source directory: parsing every post ([`parse_posts`]), sorting
//! and splitting them into public posts and drafts ([`index_posts`]), and
//! replacing the index store on disk ([`Index::save`]).

use crate::index::{self, Index};
use crate::post::Post;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Summarizes a rebuild.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BuildReport {
    /// The number of posts parsed successfully.
    pub total: usize,

    /// The number of public posts.
    pub public: usize,

    /// The number of drafts.
    pub drafts: usize,

    /// The number of distinct tags on public posts.
    pub tags: usize,

    /// The files that couldn't be parsed and were left out of the index.
    pub failed: Vec<FailedPost>,
}

/// A source file left out of the index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedPost {
    pub file: PathBuf,

    /// Why the file was left out.
    pub error: String,
}

/// Rebuilds the index store at `index_file` from the posts in
/// `posts_directory`. Posts that fail to parse are reported and skipped, but
/// failing to read the directory or to write the index aborts the rebuild
/// and leaves the previous index in place.
pub fn build_index(posts_directory: &Path, index_file: &Path) -> Result<BuildReport> {
    let (mut posts, failed) = parse_posts(posts_directory)?;
    sort_posts(&mut posts);
    warn_duplicate_urls(&posts);

    let index = index_posts(&posts);
    index.save(index_file)?;

    let report = BuildReport {
        total: posts.len(),
        public: index.posts.len(),
        drafts: index.drafts.len(),
        tags: index.tags.len(),
        failed,
    };
    info!(
        total = report.total,
        public = report.public,
        drafts = report.drafts,
        tags = report.tags,
        failed = report.failed.len(),
        "rebuilt index `{}`",
        index_file.display()
    );
    Ok(report)
}

/// Parses every file directly inside `dir`; subdirectories are ignored.
/// Returns the parsed posts in file-name order along with the files that
/// couldn't be parsed.
pub fn parse_posts(dir: &Path) -> Result<(Vec<Post>, Vec<FailedPost>)> {
    let mut posts = Vec::new();
    let mut failed = Vec::new();

    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));
    for result in entries {
        let entry = match result {
            Ok(entry) => entry,
            // An unreadable root is fatal; a single broken entry isn't.
            Err(err) if err.depth() == 0 => {
                return Err(Error::Scan {
                    path: dir.to_owned(),
                    source: err,
                })
            }
            Err(err) => {
                let file = err.path().unwrap_or(dir).to_owned();
                warn!("skipping `{}`: {}", file.display(), err);
                failed.push(FailedPost {
                    file,
                    error: err.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match Post::from_file(entry.path()) {
            Ok(post) => posts.push(post),
            Err(err) => {
                warn!("excluding post: {}", error_chain(&err));
                failed.push(FailedPost {
                    file: entry.path().to_owned(),
                    error: error_chain(&err),
                });
            }
        }
    }

    Ok((posts, failed))
}

/// Orders posts newest first. Posts sharing a date are ordered by ascending
/// position, compared as strings. Undated posts come last.
pub fn sort_posts(posts: &mut [Post]) {
    // Both sorts are stable, so the date sort keeps the position order
    // among equal dates.
    posts.sort_by(|a, b| a.position.cmp(&b.position));
    posts.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Splits sorted posts into the public and draft lists and groups public post
/// urls by tag. Drafts never contribute tags.
pub fn index_posts(posts: &[Post]) -> Index {
    let mut index = Index::default();
    for post in posts {
        if post.is_public() {
            for tag in post.tags.iter() {
                index
                    .tags
                    .entry(tag.clone())
                    .or_insert_with(Vec::new)
                    .push(post.url.clone());
            }
            index.posts.push(post.into());
        } else {
            index.drafts.push(post.into());
        }
    }
    index
}

/// Lookups by url return the first match, so a duplicated url hides every
/// post but one.
fn warn_duplicate_urls(posts: &[Post]) {
    let mut seen = HashSet::new();
    for post in posts {
        if !seen.insert(post.url.as_str()) {
            warn!(
                "url `{}` of `{}` is already used by another post",
                post.url,
                post.file.display()
            );
        }
    }
}

/// Renders an error along with its sources, e.g.
/// `post `a.md` has an invalid date: unrecognized date ...`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for rebuilding the index store.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the post source directory can't be read.
    #[error("reading posts directory `{}`", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Returned when the index store can't be written.
    #[error(transparent)]
    Store(#[from] index::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_post(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn urls(entries: &[index::IndexEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.url.as_str()).collect()
    }

    #[test]
    fn test_sort_posts() -> std::result::Result<(), crate::post::Error> {
        let mut posts = vec![
            Post::parse(Path::new("a"), "url: a\ndate: 2024-01-01\nposition: 2\n\n")?,
            Post::parse(Path::new("b"), "url: b\ndate: 2024-01-01\nposition: 1\n\n")?,
            Post::parse(Path::new("c"), "url: c\ndate: 2024-02-01\nposition: 0\n\n")?,
        ];
        sort_posts(&mut posts);
        let order: Vec<&str> = posts.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(vec!["c", "b", "a"], order);
        Ok(())
    }

    #[test]
    fn test_sort_posts_compares_positions_as_strings() -> std::result::Result<(), crate::post::Error> {
        let mut posts = vec![
            Post::parse(Path::new("two"), "url: two\ndate: 2024-01-01\nposition: 2\n\n")?,
            Post::parse(Path::new("ten"), "url: ten\ndate: 2024-01-01\nposition: 10\n\n")?,
        ];
        sort_posts(&mut posts);
        let order: Vec<&str> = posts.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(vec!["ten", "two"], order);
        Ok(())
    }

    #[test]
    fn test_sort_posts_puts_undated_last() -> std::result::Result<(), crate::post::Error> {
        let mut posts = vec![
            Post::parse(Path::new("u"), "url: undated\n\n")?,
            Post::parse(Path::new("o"), "url: old\ndate: 1999-12-31\n\n")?,
            Post::parse(Path::new("n"), "url: new\ndate: 2024-01-01 08:00\n\n")?,
        ];
        sort_posts(&mut posts);
        let order: Vec<&str> = posts.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(vec!["new", "old", "undated"], order);
        Ok(())
    }

    #[test]
    fn test_index_posts_only_public_tags() -> std::result::Result<(), crate::post::Error> {
        let posts = vec![
            Post::parse(Path::new("p"), "url: pub\nstatus: public\ntags: a b\n\n")?,
            Post::parse(Path::new("d"), "url: draft\nstatus: draft\ntags: a c\n\n")?,
        ];
        let index = index_posts(&posts);
        assert_eq!(vec!["pub"], urls(&index.posts));
        assert_eq!(vec!["draft"], urls(&index.drafts));
        assert_eq!(2, index.tags.len());
        assert_eq!(vec!["pub".to_owned()], index.tags["a"]);
        assert_eq!(vec!["pub".to_owned()], index.tags["b"]);
        assert!(!index.tags.contains_key("c"));
        Ok(())
    }

    #[test]
    fn test_index_posts_keeps_sorted_order_per_tag() -> std::result::Result<(), crate::post::Error> {
        let mut posts = vec![
            Post::parse(Path::new("1"), "url: older\nstatus: public\ndate: 2023-01-01\ntags: t\n\n")?,
            Post::parse(Path::new("2"), "url: newer\nstatus: public\ndate: 2024-01-01\ntags: t\n\n")?,
        ];
        sort_posts(&mut posts);
        let index = index_posts(&posts);
        assert_eq!(vec!["newer".to_owned(), "older".to_owned()], index.tags["t"]);
        Ok(())
    }

    #[test]
    fn test_build_index() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir(&posts).unwrap();
        fs::create_dir(posts.join("img")).unwrap();
        write_post(&posts.join("img"), "nested.md", "title: Nested\nstatus: public\n\nbody");
        write_post(&posts, "a.md", "title: First\nstatus: public\ndate: 2024-01-01\ntags: rust\n\nbody");
        write_post(&posts, "b.md", "title: Second\nstatus: draft\ndate: 2024-01-02\ntags: go\n\nbody");
        let bad = write_post(&posts, "c.md", "title: no separator\nstatus: public\n");
        let bad_date = write_post(&posts, "d.md", "title: Bad date\ndate: soon\n\nbody");

        let index_file = dir.path().join("contentData.json");
        let report = build_index(&posts, &index_file)?;

        assert_eq!(2, report.total);
        assert_eq!(1, report.public);
        assert_eq!(1, report.drafts);
        assert_eq!(1, report.tags);
        let failed: Vec<&Path> = report.failed.iter().map(|f| f.file.as_path()).collect();
        assert_eq!(vec![bad.as_path(), bad_date.as_path()], failed);
        assert!(report.failed[1].error.contains("soon"));

        let index = Index::load(&index_file)?;
        assert_eq!(vec!["first"], urls(&index.posts));
        assert_eq!(vec!["second"], urls(&index.drafts));
        assert_eq!(vec!["first".to_owned()], index.tags["rust"]);
        Ok(())
    }

    #[test]
    fn test_build_index_round_trips_headers() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write_post(
            dir.path(),
            "a.md",
            "title: Héllo\ndate: 2024-03-04 05:06:07\nstatus: public\nauthor: Jane\ntags: x y\n\nbody",
        );
        write_post(dir.path(), "b.md", "title: Undated draft\nstatus: wip\nurl: custom\n\nbody");
        let out = TempDir::new().unwrap();
        let index_file = out.path().join("index.json");
        build_index(dir.path(), &index_file)?;

        let index = Index::load(&index_file)?;
        for entry in index.posts.iter().chain(index.drafts.iter()) {
            let post = Post::from_file(&entry.file).unwrap();
            assert_eq!(entry, &index::IndexEntry::from(&post));
        }
        Ok(())
    }

    #[test]
    fn test_build_index_drops_stale_entries() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir(&posts).unwrap();
        let index_file = dir.path().join("contentData.json");

        let gone = write_post(&posts, "gone.md", "title: Gone\nstatus: public\ntags: old\n\nbody");
        build_index(&posts, &index_file)?;
        fs::remove_file(gone).unwrap();
        write_post(&posts, "kept.md", "title: Kept\nstatus: public\n\nbody");
        let report = build_index(&posts, &index_file)?;

        assert_eq!(1, report.total);
        let index = Index::load(&index_file)?;
        assert_eq!(vec!["kept"], urls(&index.posts));
        assert!(index.tags.is_empty());
        Ok(())
    }

    #[test]
    fn test_build_index_missing_directory() {
        let dir = TempDir::new().unwrap();
        let index_file = dir.path().join("contentData.json");
        match build_index(&dir.path().join("missing"), &index_file) {
            Err(Error::Scan { .. }) => assert!(!index_file.exists()),
            other => panic!("wanted Scan, got {:?}", other),
        }
    }

    #[test]
    fn test_build_report_serializes() {
        let report = BuildReport {
            total: 1,
            public: 1,
            failed: vec![FailedPost {
                file: PathBuf::from("posts/bad.md"),
                error: "boom".to_owned(),
            }],
            ..BuildReport::default()
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!("posts/bad.md", value["failed"][0]["file"]);
    }
}
