//! Static block catalog: one definition per [`BlockType`], loaded once.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde_json::{Value, json};

use crate::schema::{BlockDefinition, BlockInstance, BlockType, PropertyMap, new_block_id};

fn props(value: Value) -> PropertyMap {
    match value {
        Value::Object(map) => map,
        other => panic!("block defaults must be a JSON object, got {other}"),
    }
}

static BLOCK_DEFINITIONS: Lazy<Vec<BlockDefinition>> = Lazy::new(|| {
    vec![
        BlockDefinition {
            block_type: BlockType::Section,
            label: "Section",
            description: "Full-width container with padding",
            group: "Layout",
            icon: "container",
            defaults: props(json!({
                "background": "slate-900",
                "padding": "py-16 px-6",
                "title": "Section title",
                "text": "Use this section to highlight a product or offer.",
            })),
        },
        BlockDefinition {
            block_type: BlockType::Heading,
            label: "Heading",
            description: "Large typography for hero statements",
            group: "Content",
            icon: "heading",
            defaults: props(json!({
                "text": "Craft the perfect story for your landing page",
                "tag": "h2",
                "alignment": "left",
            })),
        },
        BlockDefinition {
            block_type: BlockType::Text,
            label: "Text",
            description: "Supporting paragraph copy",
            group: "Content",
            icon: "text",
            defaults: props(json!({
                "text": "Share details about your offer, product, or promotion.",
                "alignment": "left",
            })),
        },
        BlockDefinition {
            block_type: BlockType::Button,
            label: "Button",
            description: "Primary call-to-action button",
            group: "Content",
            icon: "button",
            defaults: props(json!({
                "label": "Shop now",
                "href": "#",
                "variant": "primary",
                "alignment": "left",
            })),
        },
        BlockDefinition {
            block_type: BlockType::Image,
            label: "Image",
            description: "Upload imagery through Cloudinary",
            group: "Content",
            icon: "image",
            defaults: props(json!({
                "src": "https://res.cloudinary.com/demo/image/upload/v1700000000/sample.jpg",
                "alt": "Product photo",
                "aspectRatio": "16/9",
                "alignment": "center",
            })),
        },
        BlockDefinition {
            block_type: BlockType::Code,
            label: "Custom code",
            description: "Embed custom HTML, CSS, or Liquid",
            group: "Advanced",
            icon: "code",
            defaults: props(json!({
                "code": "<div style='padding: 2rem; text-align: center;'>Custom embed</div>",
            })),
        },
    ]
});

/// Looks up the immutable definition for a block type.
pub fn definition(block_type: BlockType) -> &'static BlockDefinition {
    BLOCK_DEFINITIONS
        .iter()
        .find(|definition| definition.block_type == block_type)
        .expect("every block type has a catalog entry")
}

/// All definitions in catalog order.
pub fn all_definitions() -> &'static [BlockDefinition] {
    &BLOCK_DEFINITIONS
}

/// Named group of definitions for palette display.
#[derive(Debug, Clone)]
pub struct BlockGroup {
    pub name: &'static str,
    pub blocks: Vec<&'static BlockDefinition>,
}

/// Partitions the catalog into groups, preserving first-seen group order.
pub fn block_groups() -> Vec<BlockGroup> {
    let mut groups: IndexMap<&'static str, Vec<&'static BlockDefinition>> = IndexMap::new();
    for definition in BLOCK_DEFINITIONS.iter() {
        groups.entry(definition.group).or_default().push(definition);
    }
    groups
        .into_iter()
        .map(|(name, blocks)| BlockGroup { name, blocks })
        .collect()
}

/// Constructs a fresh instance seeded from the type's default props.
pub fn instance_with_defaults(block_type: BlockType) -> BlockInstance {
    BlockInstance {
        id: new_block_id(),
        block_type,
        props: definition(block_type).defaults.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_block_type_has_a_definition() {
        for block_type in [
            BlockType::Section,
            BlockType::Heading,
            BlockType::Text,
            BlockType::Button,
            BlockType::Image,
            BlockType::Code,
        ] {
            assert_eq!(definition(block_type).block_type, block_type);
        }
    }

    #[test]
    fn groups_preserve_first_seen_order() {
        let groups = block_groups();
        let names: Vec<&str> = groups.iter().map(|group| group.name).collect();
        assert_eq!(names, ["Layout", "Content", "Advanced"]);
        let content = &groups[1];
        assert_eq!(content.blocks.len(), 4);
    }

    #[test]
    fn instances_are_seeded_from_defaults() {
        let block = instance_with_defaults(BlockType::Button);
        assert_eq!(block.props["label"], "Shop now");
        assert_eq!(block.props["variant"], "primary");
        assert!(!block.id.is_empty());
    }
}
