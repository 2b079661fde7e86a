//! Core block types shared by the builder, persistence, and publish layers.

use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Shallow property bag carried by every block instance.
pub type PropertyMap = Map<String, Value>;

/// Closed set of block kinds the builder understands.
///
/// Unknown kinds never exist past deserialization: payloads referencing a
/// type outside this set are rejected at the API edge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BlockType {
    Section,
    Heading,
    Text,
    Button,
    Image,
    Code,
}

/// Static, per-type catalog entry: palette metadata plus default props.
#[derive(Debug, Clone, Serialize, TS)]
pub struct BlockDefinition {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub label: &'static str,
    pub description: &'static str,
    pub group: &'static str,
    pub icon: &'static str,
    #[ts(type = "Record<string, unknown>")]
    pub defaults: PropertyMap,
}

/// One placed block on a page: a unique id, a type, and its props.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct BlockInstance {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[ts(type = "Record<string, unknown>")]
    pub props: PropertyMap,
}

/// Optional page-level metadata stored alongside the block sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
pub struct PageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

const BLOCK_ID_LEN: usize = 8;

/// Random short id, collision-resistant within a page's lifetime.
pub fn new_block_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BLOCK_ID_LEN)
        .map(char::from)
        .collect()
}
