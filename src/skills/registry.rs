//! Skill registry: two-level metadata + definition loading (spec.md §4.1).

use super::cache::SkillCache;
use super::loader::SkillLoader;
use super::types::{SkillDefinition, SkillMetadata};
use super::{SkillError, SkillResult};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::instrument;

/// Discovers skill metadata eagerly and loads full definitions lazily,
/// caching them after first use.
pub struct SkillRegistry {
    loader: SkillLoader,
    metadata: RwLock<std::collections::HashMap<String, SkillMetadata>>,
    cache: Mutex<SkillCache>,
    scanned_once: OnceCell<()>,
}

impl SkillRegistry {
    /// Build a registry rooted at `skills_dir`. Does not scan yet.
    #[must_use]
    pub fn new(skills_dir: PathBuf) -> Self {
        Self {
            loader: SkillLoader::new(skills_dir),
            metadata: RwLock::new(std::collections::HashMap::new()),
            cache: Mutex::new(SkillCache::new()),
            scanned_once: OnceCell::new(),
        }
    }

    /// Build a registry from environment configuration.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(PathBuf::from(crate::config::get_skills_dir()))
    }

    /// Re-read every skill directory and replace the metadata table
    /// (spec.md §4.1: idempotent given an unchanged filesystem).
    #[instrument(skip(self))]
    pub async fn scan(&self) -> SkillResult<Vec<SkillMetadata>> {
        let found = self.loader.scan()?;
        let mut guard = self.metadata.write().await;
        guard.clear();
        for metadata in &found {
            guard.insert(metadata.name.clone(), metadata.clone());
        }
        Ok(found)
    }

    /// Scan exactly once, lazily, the first time any registry method needs
    /// metadata to exist (spec.md §4.2 step 1, §5 "idempotent-init pattern").
    async fn ensure_scanned(&self) -> SkillResult<()> {
        self.scanned_once
            .get_or_try_init(|| async { self.scan().await.map(|_| ()) })
            .await
            .map(|_| ())
    }

    /// List known metadata, optionally restricted to entries whose `tags`
    /// intersect `tags_filter`.
    pub async fn list(&self, tags_filter: Option<&[String]>) -> SkillResult<Vec<SkillMetadata>> {
        self.ensure_scanned().await?;
        let guard = self.metadata.read().await;
        let filter: Option<HashSet<&str>> =
            tags_filter.filter(|f| !f.is_empty()).map(|f| f.iter().map(String::as_str).collect());
        Ok(guard
            .values()
            .filter(|m| match &filter {
                None => true,
                Some(tags) => m.tags.iter().any(|t| tags.contains(t.as_str())),
            })
            .cloned()
            .collect())
    }

    /// Load the full definition for `name`, caching it after first load.
    #[instrument(skip(self))]
    pub async fn load_full(&self, name: &str) -> SkillResult<Arc<SkillDefinition>> {
        self.ensure_scanned().await?;

        if let Some(cached) = self.cache.lock().await.get(name) {
            return Ok(cached);
        }

        let metadata = {
            let guard = self.metadata.read().await;
            guard
                .get(name)
                .cloned()
                .ok_or_else(|| SkillError::SkillNotFound(name.to_string()))?
        };

        let definition = self.loader.load_definition(metadata)?;
        Ok(self.cache.lock().await.insert(definition))
    }

    /// Discard cached metadata and definitions, then re-scan (spec.md §4.1).
    #[instrument(skip(self))]
    pub async fn reload(&self) -> SkillResult<Vec<SkillMetadata>> {
        self.cache.lock().await.clear();
        self.scan().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_skill(dir: &std::path::Path, name: &str, yaml: &str) -> anyhow::Result<()> {
        let skill_dir = dir.join(name);
        fs::create_dir_all(&skill_dir)?;
        fs::write(skill_dir.join("skill.yaml"), yaml)?;
        Ok(())
    }

    #[tokio::test]
    async fn scan_is_idempotent_given_unchanged_filesystem() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        write_skill(
            tmp.path(),
            "summarize",
            "name: summarize\nkind: pure-prompt\nprompt_template: \"Summarize: {{content}}\"\n",
        )?;
        let registry = SkillRegistry::new(tmp.path().to_path_buf());
        let first = registry.scan().await?;
        let second = registry.scan().await?;
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].name, second[0].name);
        Ok(())
    }

    #[tokio::test]
    async fn load_full_caches_and_returns_equal_definitions() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        write_skill(
            tmp.path(),
            "summarize",
            "name: summarize\nkind: pure-prompt\nprompt_template: \"Summarize: {{content}}\"\n",
        )?;
        let registry = SkillRegistry::new(tmp.path().to_path_buf());
        let first = registry.load_full("summarize").await?;
        let second = registry.load_full("summarize").await?;
        assert!(Arc::ptr_eq(&first, &second));
        Ok(())
    }

    #[tokio::test]
    async fn load_full_missing_name_is_skill_not_found() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let registry = SkillRegistry::new(tmp.path().to_path_buf());
        match registry.load_full("nope").await {
            Err(SkillError::SkillNotFound(_)) => {}
            other => anyhow::bail!("expected SkillNotFound, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn list_filters_by_tag_intersection() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        write_skill(
            tmp.path(),
            "a",
            "name: a\nkind: pure-prompt\nprompt_template: x\ntags: [alpha]\n",
        )?;
        write_skill(
            tmp.path(),
            "b",
            "name: b\nkind: pure-prompt\nprompt_template: x\ntags: [beta]\n",
        )?;
        let registry = SkillRegistry::new(tmp.path().to_path_buf());
        let filtered = registry.list(Some(&["alpha".to_string()])).await?;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "a");
        Ok(())
    }
}
