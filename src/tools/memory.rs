use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::providers::types::tool::{ParamSpec, ToolSpec};

#[derive(Debug, Deserialize)]
pub struct RememberArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct RecallArgs {
    pub key: String,
}

pub fn remember_spec() -> ToolSpec {
    ToolSpec::new(
        "remember_fact",
        "Save a fact to long-term memory.",
        vec![
            ParamSpec::required("key", "Short name to file the fact under"),
            ParamSpec::required("value", "The fact to remember"),
        ],
    )
}

pub fn recall_spec() -> ToolSpec {
    ToolSpec::new(
        "recall_fact",
        "Recall a fact from long-term memory.",
        vec![ParamSpec::required("key", "Name the fact was saved under")],
    )
}

/// Key/value facts kept in a JSON file between runs.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files read as an empty memory.
    async fn load(&self) -> BTreeMap<String, String> {
        let Ok(raw) = tokio::fs::read_to_string(&self.path).await else {
            return BTreeMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable memory file");
            BTreeMap::new()
        })
    }

    async fn save(&self, facts: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(facts)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    pub async fn remember(&self, key: &str, value: &str) -> String {
        let mut facts = self.load().await;
        facts.insert(key.to_string(), value.to_string());
        match self.save(&facts).await {
            Ok(()) => "Saved to memory.".to_string(),
            Err(e) => format!("Error: could not write {}: {}", self.path.display(), e),
        }
    }

    pub async fn recall(&self, key: &str) -> String {
        self.load()
            .await
            .remove(key)
            .unwrap_or_else(|| "Not found.".to_string())
    }
}
