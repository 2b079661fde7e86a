//! Theme asset generation: turns an ordered block sequence into a Liquid
//! section and a JSON template. Pure and deterministic, no I/O.

use serde::Serialize;
use serde_json::json;

use crate::schema::{BlockInstance, BlockType};

/// Generated theme assets for one page, keyed by their theme asset paths.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAssets {
    pub section_key: String,
    pub section_liquid: String,
    pub template_key: String,
    pub template_json: String,
}

#[derive(Debug, Serialize)]
struct SectionSchema {
    name: String,
    settings: Vec<serde_json::Value>,
}

/// Generates the section and template assets for `(page_id, blocks)`.
///
/// Calling this twice with identical input yields byte-identical output.
pub fn generate_section_assets(page_id: &str, blocks: &[BlockInstance]) -> GeneratedAssets {
    let handle = page_handle(page_id);
    let section_name = format!("pagesmith-{handle}");

    let mut body = String::new();
    for block in blocks {
        body.push_str(&render_block(block));
        body.push('\n');
    }

    let schema = SectionSchema {
        name: format!("Pagesmith: {handle}"),
        settings: Vec::new(),
    };
    let schema_json =
        serde_json::to_string_pretty(&schema).expect("section schema serializes to JSON");
    let section_liquid = format!(
        "<div class=\"pagesmith-page pagesmith-page--{handle}\">\n{body}</div>\n\n{{% schema %}}\n{schema_json}\n{{% endschema %}}\n"
    );

    let template = json!({
        "sections": {
            "main": {
                "type": section_name,
                "settings": {}
            }
        },
        "order": ["main"]
    });
    let template_json =
        serde_json::to_string_pretty(&template).expect("template serializes to JSON");

    GeneratedAssets {
        section_key: format!("sections/{section_name}.liquid"),
        section_liquid,
        template_key: format!("templates/page.{section_name}.json"),
        template_json,
    }
}

/// Sanitizes a page id into a theme-safe handle: lowercase alphanumerics
/// with single dashes, never empty.
pub fn page_handle(page_id: &str) -> String {
    let mut handle = String::with_capacity(page_id.len());
    let mut last_dash = true;
    for ch in page_id.chars() {
        if ch.is_ascii_alphanumeric() {
            handle.extend(ch.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            handle.push('-');
            last_dash = true;
        }
    }
    let handle = handle.trim_end_matches('-').to_string();
    if handle.is_empty() {
        "page".to_string()
    } else {
        handle
    }
}

fn render_block(block: &BlockInstance) -> String {
    match block.block_type {
        BlockType::Section => {
            let padding = escape_html(prop(block, "padding"));
            let background = escape_html(prop(block, "background"));
            let title = escape_html(prop(block, "title"));
            let text = escape_html(prop(block, "text"));
            format!(
                "<section class=\"pagesmith-block pagesmith-section {padding}\" data-background=\"{background}\">\n  <h2>{title}</h2>\n  <p>{text}</p>\n</section>"
            )
        }
        BlockType::Heading => {
            let tag = heading_tag(prop(block, "tag"));
            let alignment = escape_html(prop(block, "alignment"));
            let text = escape_html(prop(block, "text"));
            format!(
                "<{tag} class=\"pagesmith-block pagesmith-heading\" style=\"text-align: {alignment}\">{text}</{tag}>"
            )
        }
        BlockType::Text => {
            let alignment = escape_html(prop(block, "alignment"));
            let text = escape_html(prop(block, "text"));
            format!(
                "<p class=\"pagesmith-block pagesmith-text\" style=\"text-align: {alignment}\">{text}</p>"
            )
        }
        BlockType::Button => {
            let alignment = escape_html(prop(block, "alignment"));
            let variant = escape_html(prop(block, "variant"));
            let href = escape_html(prop(block, "href"));
            let label = escape_html(prop(block, "label"));
            format!(
                "<div class=\"pagesmith-block pagesmith-button\" style=\"text-align: {alignment}\">\n  <a class=\"pagesmith-button--{variant}\" href=\"{href}\">{label}</a>\n</div>"
            )
        }
        BlockType::Image => {
            let alignment = escape_html(prop(block, "alignment"));
            let src = escape_html(prop(block, "src"));
            let alt = escape_html(prop(block, "alt"));
            let aspect = escape_html(prop(block, "aspectRatio"));
            format!(
                "<div class=\"pagesmith-block pagesmith-image\" style=\"text-align: {alignment}\">\n  <img src=\"{src}\" alt=\"{alt}\" style=\"aspect-ratio: {aspect}\" loading=\"lazy\">\n</div>"
            )
        }
        // Custom code embeds are emitted verbatim.
        BlockType::Code => prop(block, "code").to_string(),
    }
}

fn prop<'a>(block: &'a BlockInstance, key: &str) -> &'a str {
    block.props.get(key).and_then(|value| value.as_str()).unwrap_or("")
}

/// Heading tags outside h1..h6 fall back to h2.
fn heading_tag(tag: &str) -> &str {
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => tag,
        _ => "h2",
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
