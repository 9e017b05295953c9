//! Test utilities: a throwaway site source tree and build runners

#![allow(dead_code)]

use sitepipe::core::{BuildConfig, Pipeline, Project};
use sitepipe::execution::{ExecutionEngine, ExecutionError, ExecutionSummary, SchedulingStrategy};
use sitepipe::serve::{DevSession, ReloadHub};
use sitepipe::tasks::{TaskContext, TaskRegistry};

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const STYLE_ENTRY: &str = r#"@import "variables";
@import "blocks/header";

body {
  margin: 0;
  font-family: $font;
}
"#;

pub const STYLE_VARIABLES: &str = r#"$accent: #ff0000;
$font: "Open Sans", sans-serif;
"#;

pub const STYLE_HEADER: &str = r#".header {
  color: $accent;

  &__title {
    font-size: 24px;
  }
}
"#;

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Home</title>
    <link rel="stylesheet" href="css/style.min.css">
  </head>
  <body>
    <!-- page header -->
    <header class="header">
      <h1 class="header__title">Home</h1>
    </header>
    <script src="js/script.js"></script>
  </body>
</html>
"#;

pub const ABOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <title>About</title>
  </head>
  <body>
    <p>
      About us
    </p>
  </body>
</html>
"#;

pub const SCRIPT: &str = r#"
var navToggle = document.querySelector('.header__toggle');

function toggleMenu(element) {
  var isOpen = element.classList.contains('header--open');
  if (isOpen) {
    element.classList.remove('header--open');
  } else {
    element.classList.add('header--open');
  }
}

navToggle.addEventListener('click', function () {
  toggleMenu(document.querySelector('.header'));
});
"#;

pub const LOGO_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="40"><circle cx="20" cy="20" r="18"/></svg>"#;

pub const ICON_CART: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24">
  <path d="M4 4h16v16H4z"/>
</svg>
"#;

pub const ICON_MENU: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 16 16">
  <rect width="16" height="2"/>
  <rect y="7" width="16" height="2"/>
</svg>
"#;

/// A site laid out the conventional way under a temporary directory
pub struct SiteFixture {
    pub dir: TempDir,
}

impl SiteFixture {
    /// Populate `source/` with one file for every build task
    pub fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().expect("create temp dir"),
        };

        fixture.write("sass/style.scss", STYLE_ENTRY);
        fixture.write("sass/_variables.scss", STYLE_VARIABLES);
        fixture.write("sass/blocks/_header.scss", STYLE_HEADER);
        fixture.write("index.html", INDEX_HTML);
        fixture.write("about.html", ABOUT_HTML);
        fixture.write("js/script.js", SCRIPT);
        fixture.write("img/logo.svg", LOGO_SVG);
        fixture.write("img/sprite/icon-cart.svg", ICON_CART);
        fixture.write("img/sprite/icon-menu.svg", ICON_MENU);
        fixture.write("fonts/open-sans.woff2", "wOF2 font bytes");
        fixture.write("favicon.ico", "ico bytes");
        fixture.write("manifest.webmanifest", r#"{"name": "Fixture"}"#);

        fixture.write_photo("img/photo.jpg");
        fixture.write_badge("img/badge.png");
        fixture.write_badge("img/favicons/favicon-32.png");
        fixture.write_photo("images/raw.jpg");

        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn project(&self) -> Project {
        Project::new(self.root(), BuildConfig::default())
    }

    pub fn source(&self, relative: &str) -> PathBuf {
        self.project().source_root().join(relative)
    }

    pub fn output(&self, relative: &str) -> PathBuf {
        self.project().build_root().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.source(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create source dir");
        }
        std::fs::write(&path, content).unwrap_or_else(|e| panic!("write {}: {}", path.display(), e));
    }

    pub fn read_output(&self, relative: &str) -> String {
        let path = self.output(relative);
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
    }

    pub fn read_output_bytes(&self, relative: &str) -> Vec<u8> {
        let path = self.output(relative);
        std::fs::read(&path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
    }

    /// Every file under the build root, relative and with `/` separators
    pub fn output_files(&self) -> BTreeSet<String> {
        let build_root = self.project().build_root();
        if !build_root.exists() {
            return BTreeSet::new();
        }

        ignore::WalkBuilder::new(&build_root)
            .standard_filters(false)
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(&build_root)
                    .expect("walked path under build root")
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }

    /// A noisy gradient, so JPEG recompression has something to chew on
    fn write_photo(&self, relative: &str) {
        let image = RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, ((x * y) % 256) as u8])
        });
        self.save_image(relative, |path| image.save(path));
    }

    /// Flat colours with a transparent border
    fn write_badge(&self, relative: &str) {
        let image = RgbaImage::from_fn(32, 32, |x, y| {
            if x < 4 || y < 4 || x > 27 || y > 27 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([30, 144, 255, 255])
            }
        });
        self.save_image(relative, |path| image.save(path));
    }

    fn save_image(&self, relative: &str, save: impl FnOnce(&Path) -> image::ImageResult<()>) {
        let path = self.source(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create image dir");
        }
        save(&path).unwrap_or_else(|e| panic!("save {}: {}", path.display(), e));
    }
}

/// Files the default `build` graph produces for [`SiteFixture::new`]
pub fn expected_build_files() -> BTreeSet<String> {
    [
        "about.html",
        "index.html",
        "favicon.ico",
        "manifest.webmanifest",
        "fonts/open-sans.woff2",
        "css/style.min.css",
        "css/style.min.css.map",
        "js/script.js",
        "images/raw.jpg",
        "img/photo.jpg",
        "img/photo.webp",
        "img/badge.png",
        "img/badge.webp",
        "img/logo.svg",
        "img/sprite.svg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn engine(strategy: SchedulingStrategy) -> ExecutionEngine {
    ExecutionEngine::new(Arc::new(TaskRegistry::builtin()), strategy)
}

/// Run a named graph from the default configuration
pub async fn run_graph(project: &Project, graph: &str) -> Result<ExecutionSummary, ExecutionError> {
    let composition = project
        .config
        .graph(graph)
        .unwrap_or_else(|| panic!("graph '{}' is not configured", graph));
    let mut pipeline = Pipeline::from_composition(graph, composition);
    let ctx = TaskContext::new(project);
    engine(SchedulingStrategy::Parallel).execute(&mut pipeline, &ctx).await
}

/// Run the production build for the fixture
pub async fn run_build(fixture: &SiteFixture) -> ExecutionSummary {
    run_graph(&fixture.project(), "build")
        .await
        .unwrap_or_else(|e| panic!("build failed: {}", e))
}

/// A development session over the fixture, with its own reload hub
pub fn dev_session(fixture: &SiteFixture) -> DevSession {
    let project = fixture.project();
    DevSession::new(
        TaskContext::new(&project),
        engine(SchedulingStrategy::Sequential),
        ReloadHub::default(),
    )
    .unwrap_or_else(|e| panic!("invalid watch rules: {}", e))
}

/// Assert a build output exists and is non-empty
pub fn assert_output(fixture: &SiteFixture, relative: &str) {
    let path = fixture.output(relative);
    let metadata = std::fs::metadata(&path)
        .unwrap_or_else(|_| panic!("expected output {} to exist", relative));
    assert!(metadata.len() > 0, "output {} is empty", relative);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_populates_source_tree() {
        let fixture = SiteFixture::new();
        assert!(fixture.source("sass/style.scss").is_file());
        assert!(fixture.source("img/favicons/favicon-32.png").is_file());
        assert!(image::open(fixture.source("img/photo.jpg")).is_ok());
        assert!(fixture.output_files().is_empty());
    }

    #[test]
    fn test_output_files_are_relative() {
        let fixture = SiteFixture::new();
        let nested = fixture.output("img/nested/a.txt");
        std::fs::create_dir_all(nested.parent().unwrap()).unwrap();
        std::fs::write(&nested, "a").unwrap();

        let files = fixture.output_files();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["img/nested/a.txt"]);
    }
}
