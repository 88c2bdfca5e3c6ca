//! Loads the project configuration from a `quire.yaml` file. Every key is
//! optional:
//!
//! ```yaml
//! posts_directory: posts           # post source files
//! index_file: contentData.json     # the index store
//! refresh_key_file: refresh.key    # first line is the refresh secret
//! page_size: 10                    # posts per listing page
//! date_format: "%d-%m-%Y"          # display format for post dates
//! ```
//!
//! Relative paths are resolved against the directory holding `quire.yaml`.

use crate::date;
use crate::query::Blog;
use crate::refresh::Refresher;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The name of the project file.
pub const PROJECT_FILE: &str = "quire.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct DateFormat(String);
impl Default for DateFormat {
    fn default() -> Self {
        DateFormat(date::DEFAULT_DISPLAY_FORMAT.to_owned())
    }
}

#[derive(Deserialize)]
struct Project {
    #[serde(default)]
    posts_directory: Option<PathBuf>,

    #[serde(default)]
    index_file: Option<PathBuf>,

    #[serde(default)]
    refresh_key_file: Option<PathBuf>,

    #[serde(default)]
    page_size: PageSize,

    #[serde(default)]
    date_format: DateFormat,
}

/// The resolved project configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub posts_directory: PathBuf,
    pub index_file: PathBuf,
    pub refresh_key_file: PathBuf,
    pub page_size: usize,
    pub date_format: String,
}

impl Config {
    /// Looks for `quire.yaml` in `dir` and then in each of its ancestors,
    /// loading the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path)
                .with_context(|| format!("Loading configuration `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    /// Loads the project file at `path`.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        // An empty file is an empty mapping rather than an error.
        let project: Project = if contents.trim().is_empty() {
            serde_yaml::from_str("{}")?
        } else {
            serde_yaml::from_str(&contents)?
        };

        let root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;
        // The index store records source paths, so they must not depend on
        // the working directory.
        let root = if root.as_os_str().is_empty() {
            Path::new(".")
        } else {
            root
        };
        let root = fs::canonicalize(root)
            .with_context(|| format!("Resolving project directory `{}`", root.display()))?;

        if project.page_size.0 == 0 {
            return Err(anyhow!("`page_size` must be at least 1"));
        }
        date::validate_format(&project.date_format.0)?;

        let resolve = |value: Option<PathBuf>, default: &str| {
            root.join(value.unwrap_or_else(|| PathBuf::from(default)))
        };
        Ok(Config {
            posts_directory: resolve(project.posts_directory, "posts"),
            index_file: resolve(project.index_file, "contentData.json"),
            refresh_key_file: resolve(project.refresh_key_file, "refresh.key"),
            page_size: project.page_size.0,
            date_format: project.date_format.0,
        })
    }

    /// The query side of the configured blog.
    pub fn blog(&self) -> Blog {
        Blog::new(&self.index_file, self.page_size)
    }

    /// The refresh trigger of the configured blog.
    pub fn refresher(&self) -> Refresher {
        Refresher::new(
            &self.posts_directory,
            &self.index_file,
            &self.refresh_key_file,
        )
    }
}
