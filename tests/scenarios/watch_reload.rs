//! Test: a watched change regenerates only its outputs and signals a reload

use crate::helpers::*;
use sitepipe::core::ReloadKind;
use std::time::SystemTime;

fn modified(fixture: &SiteFixture, relative: &str) -> SystemTime {
    std::fs::metadata(fixture.output(relative))
        .and_then(|m| m.modified())
        .unwrap_or_else(|e| panic!("stat {}: {}", relative, e))
}

#[tokio::test]
async fn test_style_change_refreshes_stylesheets_only() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;
    let session = dev_session(&fixture);
    let mut reloads = session.hub().subscribe();

    let html_before = modified(&fixture, "index.html");
    let script_before = modified(&fixture, "js/script.js");
    let sprite_before = modified(&fixture, "img/sprite.svg");

    fixture.write("sass/blocks/_header.scss", ".header { color: $accent; padding: 10px; }");
    let reload = session
        .handle_changes(&[fixture.source("sass/blocks/_header.scss")])
        .await
        .unwrap();

    assert_eq!(reload, Some(ReloadKind::Css));
    assert_eq!(reloads.recv().await.unwrap(), ReloadKind::Css);
    assert!(fixture.read_output("css/style.min.css").contains("padding:10px"));

    assert_eq!(modified(&fixture, "index.html"), html_before);
    assert_eq!(modified(&fixture, "js/script.js"), script_before);
    assert_eq!(modified(&fixture, "img/sprite.svg"), sprite_before);
}

#[tokio::test]
async fn test_page_change_reloads_browsers() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;
    let session = dev_session(&fixture);
    let mut reloads = session.hub().subscribe();
    let css_before = fixture.read_output("css/style.min.css");

    fixture.write("about.html", "<html><body>  <p>Updated</p>  </body></html>");
    let reload = session.handle_changes(&[fixture.source("about.html")]).await.unwrap();

    assert_eq!(reload, Some(ReloadKind::Full));
    assert_eq!(reloads.recv().await.unwrap(), ReloadKind::Full);
    assert!(fixture.read_output("about.html").contains("Updated"));
    assert_eq!(fixture.read_output("css/style.min.css"), css_before);
}

#[tokio::test]
async fn test_script_change_merges_rules() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;
    let session = dev_session(&fixture);

    fixture.write("js/script.js", "var   answer = 40 + 2;\nconsole.log(answer);\n");
    let reload = session.handle_changes(&[fixture.source("js/script.js")]).await.unwrap();

    assert_eq!(reload, Some(ReloadKind::Full));
    assert!(!fixture.read_output("js/script.js").contains("var   "));
}

#[tokio::test]
async fn test_unwatched_change_is_ignored() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;
    let session = dev_session(&fixture);
    let mut reloads = session.hub().subscribe();
    let files = fixture.output_files();

    fixture.write("img/sprite/icon-new.svg", ICON_MENU);
    let reload = session
        .handle_changes(&[fixture.source("img/sprite/icon-new.svg")])
        .await
        .unwrap();

    assert_eq!(reload, None);
    assert!(reloads.try_recv().is_err());
    assert_eq!(fixture.output_files(), files);
}

#[tokio::test]
async fn test_broken_change_keeps_previous_output() {
    let fixture = SiteFixture::new();
    run_build(&fixture).await;
    let session = dev_session(&fixture);
    let mut reloads = session.hub().subscribe();
    let script_before = fixture.read_output("js/script.js");

    fixture.write("js/script.js", "function (");
    assert!(session.handle_changes(&[fixture.source("js/script.js")]).await.is_err());

    assert!(reloads.try_recv().is_err());
    assert_eq!(fixture.read_output("js/script.js"), script_before);
}
