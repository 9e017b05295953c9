//! Glob-based file selection
//!
//! Patterns are anchored at the source root, so `*.html` only selects
//! top-level documents while `img/**/*.png` descends. A leading `!`
//! excludes. Each selected file remembers its path relative to the glob
//! base of the pattern that selected it, which is where it lands under
//! the output directory.

use crate::core::config::AssetSelection;
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while building or walking a file set
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// A file picked by a [`FileSet`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Path to the file on disk
    pub path: PathBuf,

    /// Path relative to the glob base
    pub relative: PathBuf,
}

impl SelectedFile {
    /// Where this file goes inside an output directory
    pub fn destination(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(&self.relative)
    }
}

/// One include pattern with every exclude applied on top of it
#[derive(Debug, Clone)]
struct Include {
    base: PathBuf,
    matcher: Override,
}

/// A set of include/exclude globs rooted at a directory
#[derive(Debug, Clone)]
pub struct FileSet {
    root: PathBuf,
    includes: Vec<Include>,
    base: Option<PathBuf>,
}

impl FileSet {
    /// Build a file set from glob patterns relative to `root`
    pub fn new<S: AsRef<str>>(root: impl Into<PathBuf>, patterns: &[S]) -> Result<Self, SelectionError> {
        let root = root.into();
        let (excludes, includes): (Vec<&str>, Vec<&str>) = patterns
            .iter()
            .map(|p| p.as_ref())
            .partition(|p| p.starts_with('!'));

        let includes = includes
            .into_iter()
            .map(|pattern| -> Result<Include, SelectionError> {
                let mut builder = OverrideBuilder::new(&root);
                add_pattern(&mut builder, &anchor(pattern))?;
                for exclude in &excludes {
                    add_pattern(&mut builder, &format!("!{}", anchor(&exclude[1..])))?;
                }
                let matcher = builder.build().map_err(|source| SelectionError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
                Ok(Include {
                    base: glob_base(pattern),
                    matcher,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root,
            includes,
            base: None,
        })
    }

    /// Build a file set for a configured selection
    pub fn from_selection(root: impl Into<PathBuf>, selection: &AssetSelection) -> Result<Self, SelectionError> {
        let mut set = Self::new(root, &selection.sources)?;
        set.base = selection.base.clone();
        Ok(set)
    }

    /// Strip this base from every selected path instead of the glob bases
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check whether a path (absolute under the root, or relative to it) is selected
    pub fn matches(&self, path: &Path) -> bool {
        let relative = match path.strip_prefix(&self.root) {
            Ok(relative) => relative,
            Err(_) if path.is_relative() => path,
            Err(_) => return false,
        };
        self.includes
            .iter()
            .any(|include| include.matcher.matched(relative, false).is_whitelist())
    }

    /// Walk the root and return every selected file, sorted by path
    pub fn resolve(&self) -> Result<Vec<SelectedFile>, SelectionError> {
        let mut selected = BTreeMap::new();

        for include in &self.includes {
            let start = self.root.join(&include.base);
            if !start.is_dir() {
                continue;
            }

            for entry in WalkBuilder::new(&start).standard_filters(false).build() {
                let entry = entry.map_err(|source| SelectionError::Walk {
                    path: start.clone(),
                    source,
                })?;
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }

                let Ok(relative_to_root) = entry.path().strip_prefix(&self.root) else {
                    continue;
                };
                if selected.contains_key(relative_to_root) {
                    continue;
                }
                if !include.matcher.matched(relative_to_root, false).is_whitelist() {
                    continue;
                }

                let base = self.base.as_ref().unwrap_or(&include.base);
                let relative = relative_to_root
                    .strip_prefix(base)
                    .unwrap_or(relative_to_root)
                    .to_path_buf();

                selected.insert(
                    relative_to_root.to_path_buf(),
                    SelectedFile {
                        path: entry.path().to_path_buf(),
                        relative,
                    },
                );
            }
        }

        Ok(selected.into_values().collect())
    }
}

fn add_pattern(builder: &mut OverrideBuilder, pattern: &str) -> Result<(), SelectionError> {
    builder
        .add(pattern)
        .map(|_| ())
        .map_err(|source| SelectionError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Anchor a pattern at the root so slash-free globs don't match at every depth
fn anchor(pattern: &str) -> String {
    let trimmed = pattern.trim_start_matches("./").trim_start_matches('/');
    format!("/{}", trimmed)
}

fn has_glob_chars(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// The literal directory prefix of a glob.
///
/// `img/**/*.png` → `img`, `*.html` → ``, `sass/style.scss` → `sass`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let trimmed = pattern.trim_start_matches("./").trim_start_matches('/');

    if !has_glob_chars(trimmed) {
        return Path::new(trimmed)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
    }

    trimmed
        .split('/')
        .take_while(|segment| !has_glob_chars(segment))
        .collect()
}
