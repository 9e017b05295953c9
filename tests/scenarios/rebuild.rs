//! Test: rebuilding gives the same result

use crate::helpers::*;
use std::collections::BTreeMap;

/// Outputs whose bytes do not depend on encoder timing or scheduling
const DETERMINISTIC: &[&str] = &[
    "css/style.min.css",
    "css/style.min.css.map",
    "index.html",
    "about.html",
    "js/script.js",
    "img/sprite.svg",
    "img/logo.svg",
    "manifest.webmanifest",
];

fn snapshot(fixture: &SiteFixture) -> BTreeMap<&'static str, Vec<u8>> {
    DETERMINISTIC
        .iter()
        .map(|relative| (*relative, fixture.read_output_bytes(relative)))
        .collect()
}

#[tokio::test]
async fn test_build_after_deleting_output_is_identical() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;
    let first_files = fixture.output_files();
    let first = snapshot(&fixture);

    std::fs::remove_dir_all(fixture.project().build_root()).unwrap();
    run_build(&fixture).await;

    assert_eq!(fixture.output_files(), first_files);
    assert_eq!(snapshot(&fixture), first);
}

#[tokio::test]
async fn test_repeated_build_over_existing_output() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;
    let first = snapshot(&fixture);

    run_build(&fixture).await;

    assert_eq!(fixture.output_files(), expected_build_files());
    assert_eq!(snapshot(&fixture), first);
}

#[tokio::test]
async fn test_assets_graph_skips_clean() {
    let fixture = SiteFixture::new();
    let marker = fixture.output("keep.txt");
    std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
    std::fs::write(&marker, "kept").unwrap();

    let summary = run_graph(&fixture.project(), "assets").await.unwrap();

    assert_eq!(summary.completed, 6);
    assert!(marker.is_file());
    assert_output(&fixture, "css/style.min.css");
    assert!(!fixture.output("fonts/open-sans.woff2").exists());
}
