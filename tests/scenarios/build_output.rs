//! Test: the production build writes exactly the expected file set

use crate::helpers::*;

#[tokio::test]
async fn test_build_produces_expected_files() {
    let fixture = SiteFixture::new();

    let summary = run_build(&fixture).await;

    assert_eq!(fixture.output_files(), expected_build_files());
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 0);
    // clean, copy, copy-images, optimize-images and the six asset tasks
    assert_eq!(summary.completed, 10);
    assert!(summary.warnings.is_empty(), "unexpected warnings: {:?}", summary.warnings);
}

#[tokio::test]
async fn test_build_leaves_excluded_sources_behind() {
    let fixture = SiteFixture::new();

    run_build(&fixture).await;

    let files = fixture.output_files();
    assert!(!files.iter().any(|f| f.contains("favicons")));
    assert!(!files.iter().any(|f| f.starts_with("img/sprite/")));
    assert!(!files.iter().any(|f| f.ends_with(".scss")));
    assert!(!files.contains("images/raw.webp"));
}

#[tokio::test]
async fn test_static_files_are_byte_identical() {
    let fixture = SiteFixture::new();

    run_build(&fixture).await;

    for relative in ["favicon.ico", "manifest.webmanifest", "fonts/open-sans.woff2", "img/logo.svg"] {
        let source = std::fs::read(fixture.source(relative)).unwrap();
        assert_eq!(fixture.read_output_bytes(relative), source, "{} changed", relative);
    }
    assert_eq!(
        fixture.read_output_bytes("images/raw.jpg"),
        std::fs::read(fixture.source("images/raw.jpg")).unwrap()
    );
}

#[tokio::test]
async fn test_build_removes_stale_output() {
    let fixture = SiteFixture::new();
    let stale = fixture.output("css/old.css");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "a{}").unwrap();

    run_build(&fixture).await;

    assert!(!stale.exists());
    assert_eq!(fixture.output_files(), expected_build_files());
}

#[tokio::test]
async fn test_broken_script_fails_build_but_siblings_finish() {
    let fixture = SiteFixture::new();
    fixture.write("js/script.js", "function (");

    let err = run_graph(&fixture.project(), "build").await.unwrap_err();

    assert!(err.to_string().contains("scripts"), "unexpected error: {}", err);
    assert!(!fixture.output("js/script.js").exists());
    assert_output(&fixture, "css/style.min.css");
    assert_output(&fixture, "index.html");
    assert_output(&fixture, "img/sprite.svg");
}

#[tokio::test]
async fn test_sass_error_is_reported_as_warning() {
    let fixture = SiteFixture::new();
    fixture.write("sass/style.scss", ".header { color: $missing; }");

    let summary = run_build(&fixture).await;

    assert_eq!(summary.failed, 0);
    assert!(!fixture.output("css/style.min.css").exists());
    assert!(!summary.warnings.is_empty());
    assert_output(&fixture, "index.html");
}
