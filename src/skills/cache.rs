//! In-memory cache of loaded skill definitions (spec.md §3, §4.1: "cached
//! after first load").

use super::types::SkillDefinition;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache for loaded skill definitions, keyed by skill name.
#[derive(Debug, Default)]
pub struct SkillCache {
    loaded: HashMap<String, Arc<SkillDefinition>>,
}

impl SkillCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a cached definition by name, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<SkillDefinition>> {
        self.loaded.get(name).cloned()
    }

    /// Insert a freshly loaded definition, returning the cached handle.
    /// If another load already populated this name, the existing entry wins
    /// (first-load-wins within a single process lifetime).
    pub fn insert(&mut self, definition: SkillDefinition) -> Arc<SkillDefinition> {
        let name = definition.metadata.name.clone();
        if let Some(existing) = self.loaded.get(&name) {
            return Arc::clone(existing);
        }
        let arc = Arc::new(definition);
        self.loaded.insert(name, Arc::clone(&arc));
        arc
    }

    /// Discard all cached definitions (used by `Registry::reload`).
    pub fn clear(&mut self) {
        self.loaded.clear();
    }
}
