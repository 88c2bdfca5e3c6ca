//! The library code for the `quire` blog engine. Posts are plain-text files
//! in a single directory; the engine works in two halves:
//!
//! 1. Refreshing the index ([`crate::refresh`], [`crate::build`]): every post
//!    source file is parsed ([`crate::post`]), the posts are sorted newest
//!    first, split into public posts and drafts, grouped by tag, and the
//!    result is written to a JSON index store ([`crate::index`]).
//! 2. Answering queries ([`crate::query`]): listing pages, single posts, tag
//!    pages and draft previews are read from the index store, and the source
//!    file behind each hit is parsed again so the content is current.
//!
//! Nothing is cached in memory between calls. The index store is the only
//! shared state and is only ever replaced wholesale.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod date;
pub mod index;
pub mod markdown;
pub mod post;
pub mod query;
pub mod refresh;
pub mod slug;
