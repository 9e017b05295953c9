//! Build configuration from YAML

use crate::core::composition::Composition;
use crate::tasks::BUILTIN_TASKS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Default configuration file name, looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = "sitepipe.yaml";

/// Top-level build configuration loaded from YAML
///
/// Every field has a default, so an empty file (or no file at all)
/// describes the conventional `source/` → `build/` layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory holding the sources, relative to the project root
    pub source_dir: PathBuf,

    /// Directory receiving the build output, relative to the project root
    pub build_dir: PathBuf,

    /// Stylesheet compilation
    pub styles: StylesConfig,

    /// HTML minification
    pub markup: MarkupConfig,

    /// Script minification
    pub scripts: AssetSelection,

    /// Raster image handling
    pub images: ImagesConfig,

    /// SVG handling
    pub vectors: VectorsConfig,

    /// Files copied verbatim (fonts, favicon, manifest)
    pub static_files: AssetSelection,

    /// Development server
    pub server: ServerConfig,

    /// Watch rules for the development flow
    pub watch: Vec<WatchRuleConfig>,

    /// Named task graphs
    pub graphs: BTreeMap<String, Composition>,

    /// Timeout applied to every task run (in seconds)
    pub task_timeout_secs: u64,
}

/// A set of source globs and the output directory they are written to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSelection {
    /// Glob patterns relative to the source root; a leading `!` excludes
    pub sources: Vec<String>,

    /// Explicit base directory stripped from matched paths.
    /// When unset, each pattern's own glob base is used.
    #[serde(default)]
    pub base: Option<PathBuf>,

    /// Output directory relative to the build root
    #[serde(default)]
    pub output: PathBuf,
}

impl AssetSelection {
    pub fn new<S: Into<String>>(sources: impl IntoIterator<Item = S>, output: impl Into<PathBuf>) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            base: None,
            output: output.into(),
        }
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }
}

/// Stylesheet compilation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    /// Entry stylesheet relative to the source root
    pub entry: PathBuf,

    /// Compiled stylesheet path relative to the build root
    pub output: PathBuf,

    /// Write a `.map` file next to the output
    pub source_map: bool,

    /// Browserslist queries used for vendor prefixing
    pub browserslist: Vec<String>,

    /// Extra directories searched by `@use` and `@import`, relative to the source root
    pub load_paths: Vec<PathBuf>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("sass/style.scss"),
            output: PathBuf::from("css/style.min.css"),
            source_map: true,
            browserslist: vec!["defaults".to_string()],
            load_paths: Vec::new(),
        }
    }
}

/// HTML minification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    pub sources: Vec<String>,
    pub output: PathBuf,
    /// Keep HTML comments in the minified output
    pub keep_comments: bool,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            sources: vec!["*.html".to_string()],
            output: PathBuf::new(),
            keep_comments: true,
        }
    }
}

impl MarkupConfig {
    pub fn selection(&self) -> AssetSelection {
        AssetSelection::new(self.sources.clone(), self.output.clone())
    }
}

/// Raster image settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Images copied unmodified
    pub copy: AssetSelection,

    /// Images recompressed in their own format
    pub optimize: AssetSelection,

    /// Images converted to WebP
    pub webp: AssetSelection,

    /// JPEG quality used when recompressing (1-100)
    pub jpeg_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        let optimized = ["img/**/*.{jpg,png}", "!img/favicons/*.{jpg,png}"];
        Self {
            copy: AssetSelection::new(["images/**/*.{jpg,png}"], "images"),
            optimize: AssetSelection::new(optimized, "img"),
            webp: AssetSelection::new(optimized, "img"),
            jpeg_quality: 75,
        }
    }
}

/// SVG settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorsConfig {
    /// Standalone vector images copied verbatim
    pub copy: AssetSelection,

    /// Icons stacked into a sprite sheet
    pub sprite: SpriteConfig,
}

impl Default for VectorsConfig {
    fn default() -> Self {
        Self {
            copy: AssetSelection::new(["img/**/*.svg", "!img/sprite/*.svg"], "img"),
            sprite: SpriteConfig::default(),
        }
    }
}

/// Sprite sheet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Icon globs relative to the source root
    pub sources: Vec<String>,

    /// Sprite file path relative to the build root
    pub output: PathBuf,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            sources: vec!["img/sprite/*.svg".to_string()],
            output: PathBuf::from("img/sprite.svg"),
        }
    }
}

/// Development server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Send permissive cross-origin headers
    pub cors: bool,

    /// Quiet period used to coalesce file change events (in milliseconds)
    pub watch_debounce_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors: true,
            watch_debounce_ms: 100,
        }
    }
}

/// What connected browsers should do after a watched rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    /// Rebuild only
    #[default]
    None,
    /// Re-fetch stylesheets in place
    Css,
    /// Reload the page
    Full,
}

/// A watch rule: source globs, the tasks they trigger, and the reload that follows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRuleConfig {
    /// Globs relative to the source root
    pub paths: Vec<String>,

    /// Tasks to run, in order
    pub tasks: Vec<String>,

    #[serde(default)]
    pub reload: ReloadKind,
}

impl WatchRuleConfig {
    fn new(paths: &[&str], tasks: &[&str], reload: ReloadKind) -> Self {
        Self {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            reload,
        }
    }
}

fn default_watch_rules() -> Vec<WatchRuleConfig> {
    vec![
        WatchRuleConfig::new(&["sass/**/*.scss"], &["styles"], ReloadKind::Css),
        WatchRuleConfig::new(&["js/script.js"], &["scripts"], ReloadKind::None),
        WatchRuleConfig::new(&["*.html"], &["html"], ReloadKind::Full),
        WatchRuleConfig::new(&["js/*.js"], &["scripts"], ReloadKind::Full),
    ]
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source"),
            build_dir: PathBuf::from("build"),
            styles: StylesConfig::default(),
            markup: MarkupConfig::default(),
            scripts: AssetSelection::new(["js/*.js"], "js"),
            images: ImagesConfig::default(),
            vectors: VectorsConfig::default(),
            static_files: AssetSelection::new(
                ["fonts/*.{woff2,woff}", "*.ico", "*.webmanifest"],
                "",
            )
            .with_base(""),
            server: ServerConfig::default(),
            watch: default_watch_rules(),
            graphs: Composition::default_graphs(),
            task_timeout_secs: 300,
        }
    }
}

impl BuildConfig {
    /// Load build configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse build configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: BuildConfig = if yaml.trim().is_empty() {
            BuildConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        // User graphs extend the defaults rather than replacing them
        for (name, graph) in Composition::default_graphs() {
            config.graphs.entry(name).or_insert(graph);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the build configuration
    pub fn validate(&self) -> Result<()> {
        let build = normalize(&self.build_dir).with_context(|| {
            format!(
                "build_dir '{}' must be a relative path inside the project root",
                self.build_dir.display()
            )
        })?;

        if build.as_os_str().is_empty() {
            anyhow::bail!("build_dir must not be the project root");
        }

        // A source dir outside the project cannot be under the build dir
        let source = normalize(&self.source_dir);
        if source.as_ref() == Some(&build) {
            anyhow::bail!("build_dir and source_dir must differ");
        }
        if source.is_some_and(|source| source.starts_with(&build)) {
            anyhow::bail!(
                "source_dir '{}' is inside build_dir '{}' and would be deleted by clean",
                self.source_dir.display(),
                self.build_dir.display()
            );
        }

        let selections = [
            ("scripts", &self.scripts.sources),
            ("markup", &self.markup.sources),
            ("images.copy", &self.images.copy.sources),
            ("images.optimize", &self.images.optimize.sources),
            ("images.webp", &self.images.webp.sources),
            ("vectors.copy", &self.vectors.copy.sources),
            ("vectors.sprite", &self.vectors.sprite.sources),
            ("static_files", &self.static_files.sources),
        ];
        for (name, sources) in selections {
            if !sources.iter().any(|s| !s.starts_with('!')) {
                anyhow::bail!("'{}' needs at least one include pattern", name);
            }
        }

        if !(1..=100).contains(&self.images.jpeg_quality) {
            anyhow::bail!(
                "images.jpeg_quality must be between 1 and 100, got {}",
                self.images.jpeg_quality
            );
        }

        for (name, graph) in &self.graphs {
            for task in graph.task_names() {
                if !BUILTIN_TASKS.contains(&task) {
                    anyhow::bail!("Graph '{}' references unknown task '{}'", name, task);
                }
            }
        }

        for (index, rule) in self.watch.iter().enumerate() {
            if rule.paths.is_empty() {
                anyhow::bail!("Watch rule {} has no paths", index + 1);
            }
            for task in &rule.tasks {
                if !BUILTIN_TASKS.contains(&task.as_str()) {
                    anyhow::bail!("Watch rule {} references unknown task '{}'", index + 1, task);
                }
            }
        }

        Ok(())
    }

    /// Look up a named task graph
    pub fn graph(&self, name: &str) -> Option<&Composition> {
        self.graphs.get(name)
    }
}

/// A configuration together with the directory its paths are relative to
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: BuildConfig,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, config: BuildConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Load the project configuration.
    ///
    /// An explicit path must exist. Without one, `sitepipe.yaml` in the
    /// current directory is used when present, otherwise the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                let config = BuildConfig::from_file(path)?;
                let root = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                Ok(Self::new(root, config))
            }
            None => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                let default_path = cwd.join(DEFAULT_CONFIG_FILE);
                let config = if default_path.is_file() {
                    BuildConfig::from_file(&default_path)?
                } else {
                    BuildConfig::default()
                };
                Ok(Self::new(cwd, config))
            }
        }
    }

    pub fn source_root(&self) -> PathBuf {
        self.root.join(&self.config.source_dir)
    }

    pub fn build_root(&self) -> PathBuf {
        self.root.join(&self.config.build_dir)
    }
}

/// Resolve `.` and `..` lexically, relative to the project root.
///
/// `None` for absolute paths and for paths that climb out of the root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::Normal(part) => normalized.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}
