//! The refresh trigger: rebuilds the index store for callers holding the
//! shared secret.

use crate::build::{self, build_index, BuildReport, FailedPost};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Authenticates refresh requests and runs them one at a time.
pub struct Refresher {
    posts_directory: PathBuf,
    index_file: PathBuf,

    /// The file whose first line is the shared secret.
    key_file: PathBuf,

    /// Held for the duration of a rebuild.
    lock: Mutex<()>,
}

/// The payload returned to a successful caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub posts: PostCounts,

    /// The number of distinct tags.
    pub tags: usize,

    pub failed: Vec<FailedPost>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PostCounts {
    pub total: usize,
    pub public: usize,
    pub drafts: usize,
}

impl From<BuildReport> for RefreshResponse {
    fn from(report: BuildReport) -> RefreshResponse {
        RefreshResponse {
            success: true,
            posts: PostCounts {
                total: report.total,
                public: report.public,
                drafts: report.drafts,
            },
            tags: report.tags,
            failed: report.failed,
        }
    }
}

impl Refresher {
    pub fn new<P, I, K>(posts_directory: P, index_file: I, key_file: K) -> Refresher
    where
        P: Into<PathBuf>,
        I: Into<PathBuf>,
        K: Into<PathBuf>,
    {
        Refresher {
            posts_directory: posts_directory.into(),
            index_file: index_file.into(),
            key_file: key_file.into(),
            lock: Mutex::new(()),
        }
    }

    /// Rebuilds the index store if `key` matches the shared secret. A wrong
    /// key yields [`Error::NotFound`] so callers can't tell the trigger
    /// exists.
    pub fn refresh(&self, key: &str) -> Result<RefreshResponse> {
        if !self.authenticate(key) {
            info!("rejected refresh request");
            return Err(Error::NotFound);
        }

        let _guard = self.lock.lock();
        Ok(build_index(&self.posts_directory, &self.index_file)?.into())
    }

    fn authenticate(&self, key: &str) -> bool {
        match read_key(&self.key_file) {
            Ok(Some(expected)) => expected == key,
            Ok(None) => {
                warn!("refresh key file `{}` is empty", self.key_file.display());
                false
            }
            Err(err) => {
                warn!(
                    "reading refresh key file `{}`: {}",
                    self.key_file.display(),
                    err
                );
                false
            }
        }
    }
}

/// Reads the secret from the first line of `path`. An empty first line
/// means there's no secret.
fn read_key(path: &Path) -> io::Result<Option<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .map(str::to_owned))
}

/// The result of a refresh.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed refresh.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the caller's key doesn't match the secret, or there is
    /// no usable secret.
    #[error("not found")]
    NotFound,

    /// Returned when the rebuild itself fails.
    #[error(transparent)]
    Build(#[from] build::Error),
}
