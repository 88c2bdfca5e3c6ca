//! Answers the questions the presentation layer asks: which posts go on a
//! listing page, which post lives at a url, which posts carry a tag. Every
//! query reads the index store afresh and re-parses the source files it
//! points at, so answers are as fresh as the last refresh.

use crate::index::{self, Index, IndexEntry};
use crate::post::{self, Post};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// The read side of the blog.
#[derive(Clone, Debug)]
pub struct Blog {
    /// The index store to read.
    index_file: PathBuf,

    /// The number of posts per listing page.
    page_size: usize,
}

/// A slice of the public post list.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IndexPage {
    pub posts: Vec<Post>,

    /// Whether the page starts at the newest visible post.
    pub is_first: bool,

    /// Whether the page reaches the oldest post.
    pub is_last: bool,

    /// Source files listed in the index that no longer parse. They're left
    /// off the page rather than failing it.
    pub skipped: Vec<PathBuf>,
}

/// A numbered listing page.
#[derive(Clone, Debug, Serialize)]
pub struct Page {
    /// The 1-based page number.
    pub number: usize,

    #[serde(flatten)]
    pub listing: IndexPage,
}

/// The public posts carrying a tag.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TagListing {
    pub posts: Vec<Post>,

    /// Source files listed under the tag that no longer parse.
    pub skipped: Vec<PathBuf>,
}

/// A public post along with its neighbours in the public list.
#[derive(Clone, Debug, Serialize)]
pub struct PostView {
    pub post: Post,

    /// The next older post, if any.
    pub older: Option<Post>,

    /// The next newer post, if any.
    pub newer: Option<Post>,
}

impl Blog {
    pub fn new<P: Into<PathBuf>>(index_file: P, page_size: usize) -> Blog {
        Blog {
            index_file: index_file.into(),
            page_size: page_size.max(1),
        }
    }

    fn load(&self) -> Result<Index> {
        Ok(Index::load(&self.index_file)?)
    }

    /// Returns up to `count` public posts starting at `start`, not counting
    /// posts dated in the future. Those sit at the front of the list and are
    /// always hidden.
    pub fn get_index(&self, start: usize, count: usize) -> Result<IndexPage> {
        self.get_index_at(start, count, Local::now().naive_local())
    }

    /// Like [`Blog::get_index`] but with an explicit notion of "now".
    pub fn get_index_at(
        &self,
        start: usize,
        count: usize,
        now: NaiveDateTime,
    ) -> Result<IndexPage> {
        let index = self.load()?;
        let posts = &index.posts;

        let offset = posts
            .iter()
            .take_while(|entry| matches!(entry.date, Some(date) if date > now))
            .count();
        let start = start.saturating_add(offset);
        if start >= posts.len() {
            return Ok(IndexPage {
                is_last: true,
                ..IndexPage::default()
            });
        }

        let end = start.saturating_add(count).min(posts.len());
        let (resolved, skipped) = resolve_all(&posts[start..end]);
        Ok(IndexPage {
            posts: resolved,
            is_first: start == offset,
            is_last: end == posts.len(),
            skipped,
        })
    }

    /// Returns listing page `number`, counting from 1. Page 0 is page 1.
    pub fn page(&self, number: usize) -> Result<Page> {
        let number = number.max(1);
        let listing = self.get_index((number - 1).saturating_mul(self.page_size), self.page_size)?;
        Ok(Page { number, listing })
    }

    /// Returns the position of the post with `url` in the public list, or the
    /// draft list if `draft` is set.
    pub fn get_post_id_by_url(&self, url: &str, draft: bool) -> Result<Option<usize>> {
        Ok(find(self.load()?.list(draft), url))
    }

    /// Returns the post with `url`, looking through public posts before
    /// drafts.
    pub fn get_post_by_url(&self, url: &str) -> Result<Option<Post>> {
        let index = self.load()?;
        let entry = index
            .posts
            .iter()
            .chain(index.drafts.iter())
            .find(|entry| entry.url == url);
        match entry {
            Some(entry) => Ok(Some(Post::from_file(&entry.file)?)),
            None => Ok(None),
        }
    }

    /// Returns the public posts tagged `tag`, newest first. Unknown tags
    /// yield no posts.
    pub fn get_posts_by_tag(&self, tag: &str) -> Result<TagListing> {
        let index = self.load()?;
        let urls = match index.tags.get(tag) {
            Some(urls) => urls,
            None => return Ok(TagListing::default()),
        };
        let entries: Vec<IndexEntry> = urls
            .iter()
            .filter_map(|url| index.posts.iter().find(|entry| &entry.url == url))
            .cloned()
            .collect();
        let (posts, skipped) = resolve_all(&entries);
        Ok(TagListing { posts, skipped })
    }

    /// Returns the post at position `id` of the public list, or of the draft
    /// list if `draft` is set. Positions past the end yield `None`.
    pub fn get_post_by_id(&self, id: usize, draft: bool) -> Result<Option<Post>> {
        match self.load()?.list(draft).get(id) {
            Some(entry) => Ok(Some(Post::from_file(&entry.file)?)),
            None => Ok(None),
        }
    }

    /// Returns the public post at `url` along with its older and newer
    /// neighbours. A neighbour that fails to parse is left out.
    pub fn post_view(&self, url: &str) -> Result<Option<PostView>> {
        let id = match self.get_post_id_by_url(url, false)? {
            Some(id) => id,
            None => return Ok(None),
        };
        let post = match self.get_post_by_id(id, false)? {
            Some(post) => post,
            None => return Ok(None),
        };
        Ok(Some(PostView {
            post,
            older: self.neighbour(id.checked_add(1)),
            newer: self.neighbour(id.checked_sub(1)),
        }))
    }

    /// Returns the draft at `url`. Public posts aren't considered.
    pub fn draft_view(&self, url: &str) -> Result<Option<Post>> {
        match self.get_post_id_by_url(url, true)? {
            Some(id) => self.get_post_by_id(id, true),
            None => Ok(None),
        }
    }

    fn neighbour(&self, id: Option<usize>) -> Option<Post> {
        let id = id?;
        match self.get_post_by_id(id, false) {
            Ok(post) => post,
            Err(err) => {
                warn!("leaving out neighbour {}: {}", id, err);
                None
            }
        }
    }
}

fn find(entries: &[IndexEntry], url: &str) -> Option<usize> {
    entries.iter().position(|entry| entry.url == url)
}

/// Re-parses the source file of each entry. Entries that fail are logged
/// and returned separately.
fn resolve_all(entries: &[IndexEntry]) -> (Vec<Post>, Vec<PathBuf>) {
    let mut posts = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();
    for entry in entries {
        match Post::from_file(&entry.file) {
            Ok(post) => posts.push(post),
            Err(err) => {
                warn!("skipping indexed post `{}`: {}", entry.url, err);
                skipped.push(entry.file.clone());
            }
        }
    }
    (posts, skipped)
}

/// The result of a query.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed query. Missing posts and tags aren't errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the index store is missing or corrupt.
    #[error(transparent)]
    Store(#[from] index::Error),

    /// Returned when a requested post's source file no longer parses.
    #[error(transparent)]
    Post(#[from] post::Error),
}
