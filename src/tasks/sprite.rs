//! SVG sprite assembly
//!
//! Every icon becomes a nested `<svg id="{file stem}">` inside one document.
//! Nested sprites are shown through `:target`, so the page can reference an
//! icon either as `sprite.svg#cart` in an `<img>` or with `<use href>`.

use super::{write_output, AssetTask, TaskContext, TaskError, TaskReport};
use crate::core::selection::FileSet;
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, info};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Root attributes that belong to the sprite document, not the icon
const DROPPED_ROOT_ATTRS: &[&str] = &["version", "width", "height", "x", "y", "id"];

macro_rules! regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("valid regex"))
        }
    };
}

regex!(prolog_re, r"(?s)<\?xml.*?\?>");
regex!(doctype_re, r"(?is)<!DOCTYPE[^>]*>");
regex!(comment_re, r"(?s)<!--.*?-->");
regex!(root_re, r"(?s)^\s*<svg\b([^>]*?)(/?)>(.*)$");
regex!(attr_re, r#"([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#);
regex!(id_re, r#"\bid\s*=\s*(?:"([^"]*)"|'([^']*)')"#);
regex!(url_ref_re, r#"url\(\s*(['"]?)#([\w.:-]+)['"]?\s*\)"#);
regex!(href_ref_re, r#"((?:xlink:)?href\s*=\s*["'])#([\w.:-]+)"#);
regex!(between_tags_re, r">\s+<");

/// One icon ready for the sprite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteIcon {
    pub id: String,
    pub attributes: Vec<(String, String)>,
    pub content: String,
}

impl SpriteIcon {
    /// Parse an icon document, prefixing its internal ids with `id`
    pub fn parse(id: &str, source: &str) -> Result<Self, String> {
        let cleaned = prolog_re().replace_all(source, "");
        let cleaned = doctype_re().replace_all(&cleaned, "");
        let cleaned = comment_re().replace_all(&cleaned, "");

        let root = root_re()
            .captures(&cleaned)
            .ok_or_else(|| "missing <svg> root element".to_string())?;
        let self_closing = !root[2].is_empty();
        let rest = &root[3];

        let content = if self_closing {
            String::new()
        } else {
            let end = rest
                .rfind("</svg>")
                .ok_or_else(|| "unclosed <svg> root element".to_string())?;
            rest[..end].trim().to_string()
        };

        let mut attributes = Vec::new();
        let mut width = None;
        let mut height = None;
        let mut has_view_box = false;
        for cap in attr_re().captures_iter(&root[1]) {
            let name = cap[1].to_string();
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();

            match name.as_str() {
                "width" => width = Some(value.clone()),
                "height" => height = Some(value.clone()),
                "viewBox" => has_view_box = true,
                _ => {}
            }

            if name == "xmlns" || name.starts_with("xmlns:") || DROPPED_ROOT_ATTRS.contains(&name.as_str()) {
                continue;
            }
            attributes.push((name, value));
        }

        if !has_view_box {
            if let (Some(w), Some(h)) = (width.as_deref().and_then(dimension), height.as_deref().and_then(dimension)) {
                attributes.insert(0, ("viewBox".to_string(), format!("0 0 {} {}", w, h)));
            }
        }

        Ok(Self {
            id: id.to_string(),
            attributes,
            content: prefix_ids(id, &content),
        })
    }

    fn render(&self, out: &mut String) {
        out.push_str("<svg id=\"");
        out.push_str(&escape_text(&self.id));
        out.push('"');
        for (name, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, escape_quoted(value)));
        }
        out.push('>');
        out.push_str(&self.content);
        out.push_str("</svg>");
    }
}

/// Escape a raw string (a file stem) for a double-quoted attribute
fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

/// Re-quote an attribute value taken from the source document.
///
/// Entities already present stay as they are; only characters that cannot
/// appear inside double quotes are escaped.
fn escape_quoted(value: &str) -> String {
    value.replace('<', "&lt;").replace('"', "&quot;")
}

/// `"24px"` → `"24"`; anything non-numeric is rejected
fn dimension(value: &str) -> Option<&str> {
    let number = value.trim().trim_end_matches("px");
    number.parse::<f64>().ok().map(|_| number)
}

/// Rename internal ids to `{prefix}_{id}` and rewrite local references to them
fn prefix_ids(prefix: &str, content: &str) -> String {
    let ids: HashSet<String> = id_re()
        .captures_iter(content)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)))
        .map(|m| m.as_str().to_string())
        .collect();
    if ids.is_empty() {
        return content.to_string();
    }

    let content = id_re().replace_all(content, |cap: &Captures| {
        let id = cap.get(1).or_else(|| cap.get(2)).map_or("", |m| m.as_str());
        format!("id=\"{}_{}\"", prefix, id)
    });
    let content = url_ref_re().replace_all(&content, |cap: &Captures| {
        if ids.contains(&cap[2]) {
            format!("url({q}#{}_{}{q})", prefix, &cap[2], q = &cap[1])
        } else {
            cap[0].to_string()
        }
    });
    let content = href_ref_re().replace_all(&content, |cap: &Captures| {
        if ids.contains(&cap[2]) {
            format!("{}#{}_{}", &cap[1], prefix, &cap[2])
        } else {
            cap[0].to_string()
        }
    });
    content.into_owned()
}

/// Combine parsed icons into a single sprite document
pub fn build_sprite(icons: &[SpriteIcon]) -> String {
    let mut body = String::new();
    for icon in icons {
        icon.render(&mut body);
    }
    let body = between_tags_re().replace_all(&body, "><");

    let xlink = if body.contains("xlink:") {
        format!(" xmlns:xlink=\"{}\"", XLINK_NS)
    } else {
        String::new()
    };

    format!(
        "<svg xmlns=\"{}\"{}><style>:root svg:not(:target){{display:none}}</style>{}</svg>",
        SVG_NS, xlink, body
    )
}

/// Merges icon SVGs into one sprite file
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteTask;

#[async_trait]
impl AssetTask for SpriteTask {
    fn name(&self) -> &str {
        "sprite"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let sprite = &ctx.config.vectors.sprite;
        let files = FileSet::new(&ctx.source_root, &sprite.sources)?.resolve()?;

        let mut report = TaskReport::new();
        let mut seen = HashSet::new();
        let mut icons = Vec::with_capacity(files.len());
        for file in files {
            let Some(stem) = file.path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if !seen.insert(stem.clone()) {
                report.warn(format!(
                    "Skipping {}: icon id '{}' already used",
                    file.path.display(),
                    stem
                ));
                continue;
            }

            let source = tokio::fs::read_to_string(&file.path)
                .await
                .map_err(TaskError::io(&file.path))?;
            let icon = SpriteIcon::parse(&stem, &source).map_err(|message| TaskError::Svg {
                path: file.path.clone(),
                message,
            })?;
            debug!("Added {} to sprite as #{}", file.path.display(), icon.id);
            icons.push(icon);
        }

        if icons.is_empty() {
            report.warn("No sprite icons found, sprite not written");
            return Ok(report);
        }

        let output = ctx.build_root.join(&sprite.output);
        write_output(&output, build_sprite(&icons)).await?;
        info!("sprite: {} icons -> {}", icons.len(), output.display());
        report.push_output(output);
        Ok(report)
    }
}
