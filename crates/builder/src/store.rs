//! In-memory builder state: the ordered block sequence, selection, and
//! dirty tracking against the last hydrated/saved baseline.

use chrono::{DateTime, Utc};

use crate::definitions::instance_with_defaults;
use crate::schema::{BlockInstance, BlockType, PropertyMap};

/// Single-session builder state. All mutation is synchronous; callers own
/// the ordering of operations.
#[derive(Debug, Default, Clone)]
pub struct BuilderStore {
    blocks: Vec<BlockInstance>,
    selected_block_id: Option<String>,
    baseline: Vec<BlockInstance>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl BuilderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[BlockInstance] {
        &self.blocks
    }

    pub fn selected_block_id(&self) -> Option<&str> {
        self.selected_block_id.as_deref()
    }

    pub fn selected_block(&self) -> Option<&BlockInstance> {
        let id = self.selected_block_id.as_deref()?;
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// Whether the sequence differs from the last hydrated/saved baseline.
    pub fn has_changes(&self) -> bool {
        self.blocks != self.baseline
    }

    /// Inserts a new block seeded from defaults and selects it.
    ///
    /// `index` outside `0..=len` falls back to appending.
    pub fn add_block(&mut self, block_type: BlockType, index: Option<usize>) -> &BlockInstance {
        let block = instance_with_defaults(block_type);
        self.selected_block_id = Some(block.id.clone());

        let at = match index {
            Some(i) if i <= self.blocks.len() => i,
            _ => self.blocks.len(),
        };
        self.blocks.insert(at, block);
        &self.blocks[at]
    }

    /// Moves the block `active_id` to the position currently occupied by
    /// `over_id`. No-op when the ids are equal or either is absent.
    pub fn move_block(&mut self, active_id: &str, over_id: &str) {
        if active_id == over_id {
            return;
        }
        let Some(active_index) = self.index_of(active_id) else {
            return;
        };
        let Some(over_index) = self.index_of(over_id) else {
            return;
        };

        let active = self.blocks.remove(active_index);
        self.blocks.insert(over_index, active);
    }

    /// Moves the block `active_id` to an explicit absolute index. No-op when
    /// the id is absent or the index is out of bounds.
    pub fn reorder_block(&mut self, active_id: &str, new_index: usize) {
        let Some(current_index) = self.index_of(active_id) else {
            return;
        };
        if new_index >= self.blocks.len() {
            return;
        }

        let active = self.blocks.remove(current_index);
        self.blocks.insert(new_index, active);
    }

    /// Sets or clears selection. Selecting an id with no matching block is
    /// legal and simply yields no `selected_block`.
    pub fn select_block(&mut self, id: Option<String>) {
        self.selected_block_id = id;
    }

    /// Shallow-merges `props` into the matching block. No-op when absent.
    pub fn update_block_props(&mut self, id: &str, props: PropertyMap) {
        let Some(block) = self.blocks.iter_mut().find(|block| block.id == id) else {
            return;
        };
        for (key, value) in props {
            block.props.insert(key, value);
        }
    }

    /// Deletes the block, clearing selection if it was selected.
    pub fn remove_block(&mut self, id: &str) {
        self.blocks.retain(|block| block.id != id);
        if self.selected_block_id.as_deref() == Some(id) {
            self.selected_block_id = None;
        }
    }

    /// Replaces the entire sequence and resets the dirty baseline.
    pub fn hydrate(&mut self, blocks: Vec<BlockInstance>) {
        self.baseline = blocks.clone();
        self.blocks = blocks;
    }

    /// Records a successful save: the current sequence becomes the baseline.
    pub fn mark_saved(&mut self, timestamp: DateTime<Utc>) {
        self.baseline = self.blocks.clone();
        self.last_saved_at = Some(timestamp);
    }

    /// Clears blocks and selection. The baseline is untouched, so a reset of
    /// a previously saved page reads as unsaved changes.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.selected_block_id = None;
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ids(store: &BuilderStore) -> Vec<String> {
        store.blocks().iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn add_block_appends_and_selects() {
        let mut store = BuilderStore::new();
        let id = store.add_block(BlockType::Heading, None).id.clone();
        assert_eq!(store.blocks().len(), 1);
        assert_eq!(store.selected_block_id(), Some(id.as_str()));
        assert_eq!(store.selected_block().unwrap().block_type, BlockType::Heading);
    }

    #[test]
    fn add_block_inserts_at_index_and_clamps() {
        let mut store = BuilderStore::new();
        let first = store.add_block(BlockType::Heading, None).id.clone();
        let second = store.add_block(BlockType::Text, None).id.clone();
        let inserted = store.add_block(BlockType::Button, Some(0)).id.clone();
        assert_eq!(ids(&store), [inserted.clone(), first.clone(), second.clone()]);

        // Out-of-range index appends.
        let appended = store.add_block(BlockType::Image, Some(99)).id.clone();
        assert_eq!(ids(&store), [inserted, first, second, appended]);
    }

    #[test]
    fn block_ids_stay_unique_across_operations() {
        let mut store = BuilderStore::new();
        for _ in 0..16 {
            store.add_block(BlockType::Text, Some(0));
        }
        let mut seen = ids(&store);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn move_block_lands_on_target_position() {
        let mut store = BuilderStore::new();
        let a = store.add_block(BlockType::Heading, None).id.clone();
        let b = store.add_block(BlockType::Text, None).id.clone();
        let c = store.add_block(BlockType::Button, None).id.clone();

        store.move_block(&a, &c);
        assert_eq!(ids(&store), [b, c, a]);
    }

    #[test]
    fn move_block_noops() {
        let mut store = BuilderStore::new();
        let a = store.add_block(BlockType::Heading, None).id.clone();
        let b = store.add_block(BlockType::Text, None).id.clone();
        let before = ids(&store);

        store.move_block(&a, &a);
        assert_eq!(ids(&store), before);
        store.move_block("missing", &b);
        assert_eq!(ids(&store), before);
        store.move_block(&a, "missing");
        assert_eq!(ids(&store), before);
    }

    #[test]
    fn reorder_block_respects_bounds() {
        let mut store = BuilderStore::new();
        let a = store.add_block(BlockType::Heading, None).id.clone();
        let b = store.add_block(BlockType::Text, None).id.clone();

        store.reorder_block(&a, 1);
        assert_eq!(ids(&store), [b.clone(), a.clone()]);

        let before = ids(&store);
        store.reorder_block(&a, 2);
        assert_eq!(ids(&store), before);
        store.reorder_block("missing", 0);
        assert_eq!(ids(&store), before);
    }

    #[test]
    fn update_block_props_is_a_shallow_merge() {
        let mut store = BuilderStore::new();
        let id = store.add_block(BlockType::Heading, None).id.clone();
        let mut patch = PropertyMap::new();
        patch.insert("text".into(), json!("Hello"));
        store.update_block_props(&id, patch);

        let block = &store.blocks()[0];
        assert_eq!(block.props["text"], "Hello");
        // Unspecified keys keep their default values.
        assert_eq!(block.props["tag"], "h2");
        assert_eq!(block.props["alignment"], "left");
    }

    #[test]
    fn update_block_props_missing_id_is_a_noop() {
        let mut store = BuilderStore::new();
        store.add_block(BlockType::Text, None);
        let before = store.blocks().to_vec();
        let mut patch = PropertyMap::new();
        patch.insert("text".into(), json!("ignored"));
        store.update_block_props("missing", patch);
        assert_eq!(store.blocks(), before.as_slice());
    }

    #[test]
    fn remove_block_clears_matching_selection() {
        let mut store = BuilderStore::new();
        let a = store.add_block(BlockType::Heading, None).id.clone();
        let b = store.add_block(BlockType::Text, None).id.clone();

        store.select_block(Some(a.clone()));
        store.remove_block(&a);
        assert_eq!(store.selected_block_id(), None);
        assert_eq!(ids(&store), [b.clone()]);

        // Removing an unselected block keeps selection.
        store.select_block(Some("dangling".into()));
        store.remove_block(&b);
        assert_eq!(store.selected_block_id(), Some("dangling"));
        assert!(store.selected_block().is_none());
    }

    #[test]
    fn dirty_flag_round_trip() {
        let mut store = BuilderStore::new();
        store.add_block(BlockType::Heading, None);
        let snapshot = store.blocks().to_vec();

        store.hydrate(snapshot);
        assert!(!store.has_changes());

        let saved_at = Utc::now();
        store.mark_saved(saved_at);
        assert!(!store.has_changes());
        assert_eq!(store.last_saved_at(), Some(saved_at));

        let id = store.blocks()[0].id.clone();
        let mut patch = PropertyMap::new();
        patch.insert("text".into(), json!("edited"));
        store.update_block_props(&id, patch);
        assert!(store.has_changes());

        store.mark_saved(Utc::now());
        assert!(!store.has_changes());

        store.remove_block(&id);
        assert!(store.has_changes());
    }

    #[test]
    fn reset_clears_blocks_and_selection() {
        let mut store = BuilderStore::new();
        store.add_block(BlockType::Text, None);
        store.mark_saved(Utc::now());
        store.reset();
        assert!(store.blocks().is_empty());
        assert_eq!(store.selected_block_id(), None);
        assert!(store.has_changes());
    }
}
