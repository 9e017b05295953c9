//! Test: each output carries the transformation of its task

use crate::helpers::*;
use image::GenericImageView;
use sitepipe::core::{BuildConfig, Project};

#[tokio::test]
async fn test_stylesheet_is_compiled_minified_and_mapped() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;

    let css = fixture.read_output("css/style.min.css");
    let (body, trailer) = css.split_once('\n').expect("source map comment on its own line");
    assert!(body.contains(".header{color:red}"), "got: {}", body);
    assert!(body.contains(".header__title{font-size:24px}"));
    assert!(body.contains("body{margin:0"));
    assert!(!body.contains('$'));
    assert_eq!(trailer, "/*# sourceMappingURL=style.min.css.map */");

    let map: serde_json::Value = serde_json::from_str(&fixture.read_output("css/style.min.css.map")).unwrap();
    assert_eq!(map["version"], 3);
    let sources = map["sources"].as_array().unwrap();
    assert!(sources.iter().any(|s| s.as_str().unwrap().ends_with("style.css")));
}

#[tokio::test]
async fn test_stylesheet_is_prefixed_for_configured_browsers() {
    let fixture = SiteFixture::new();
    fixture.write("sass/blocks/_header.scss", ".header { user-select: none; }");
    let mut config = BuildConfig::default();
    config.styles.browserslist = vec!["safari 10".to_string()];
    let project = Project::new(fixture.root(), config);

    run_graph(&project, "build").await.unwrap();

    let css = fixture.read_output("css/style.min.css");
    assert!(css.contains("-webkit-user-select:none"), "got: {}", css);
}

#[tokio::test]
async fn test_markup_is_minified_with_comments_kept() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;

    let index = fixture.read_output("index.html");
    assert!(index.len() < INDEX_HTML.len());
    assert!(index.contains("<!-- page header -->"));
    assert!(index.contains("css/style.min.css"));
    assert!(!index.contains("\n    <"));

    let about = fixture.read_output("about.html");
    assert!(!about.contains("  "), "whitespace left in: {}", about);
}

#[tokio::test]
async fn test_script_is_minified() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;

    let script = fixture.read_output("js/script.js");
    assert!(script.len() < SCRIPT.len());
    assert!(script.contains("addEventListener"));
    assert!(!script.contains("\n  "));
}

#[tokio::test]
async fn test_raster_images_are_optimized_and_converted() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;

    let photo = image::open(fixture.output("img/photo.jpg")).unwrap();
    assert_eq!(photo.dimensions(), (64, 48));
    let source_len = std::fs::metadata(fixture.source("img/photo.jpg")).unwrap().len();
    let output_len = std::fs::metadata(fixture.output("img/photo.jpg")).unwrap().len();
    assert!(output_len <= source_len);

    for relative in ["img/photo.webp", "img/badge.webp"] {
        let bytes = fixture.read_output_bytes(relative);
        assert_eq!(&bytes[..4], b"RIFF", "{} is not a RIFF container", relative);
        assert_eq!(&bytes[8..12], b"WEBP", "{} is not WebP", relative);
    }

    let badge = image::load_from_memory(&fixture.read_output_bytes("img/badge.webp")).unwrap();
    assert_eq!(badge.dimensions(), (32, 32));
    assert!(badge.color().has_alpha());
}

#[tokio::test]
async fn test_sprite_stacks_icons() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;

    let sprite = fixture.read_output("img/sprite.svg");
    assert!(sprite.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\">"));
    assert!(sprite.contains("<svg id=\"icon-cart\" viewBox=\"0 0 24 24\">"));
    assert!(sprite.contains("<svg id=\"icon-menu\" viewBox=\"0 0 16 16\">"));
    assert!(!sprite.contains("<?xml"));
    assert!(!sprite.contains('\n'));
}
