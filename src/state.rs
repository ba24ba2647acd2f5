use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding debtbomb's per-repository files
pub const STATE_DIR: &str = ".debtbomb";

/// Mapping from item identity to ticket key
pub const STATE_FILE: &str = "jira-map.json";

/// Persisted mapping from debt item identity to external ticket key.
///
/// Loaded once per run, mutated in memory and rewritten in full by
/// [`TicketStateStore::save`]. Mutation requires `&mut self`, so a single
/// owner (the reconciler) has exclusive access for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketStateStore {
    path: PathBuf,
    tickets: BTreeMap<String, String>,
}

impl TicketStateStore {
    /// Load the store for a scan root; a missing or empty file is an empty store
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_from(root.join(STATE_DIR).join(STATE_FILE))
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::empty(path));
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read ticket state: {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Self::empty(path));
        }

        let tickets: BTreeMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse ticket state: {}", path.display()))?;

        Ok(Self { path, tickets })
    }

    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            tickets: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.tickets.get(id).map(String::as_str)
    }

    pub fn set(&mut self, id: &str, ticket_key: &str) {
        self.tickets.insert(id.to_string(), ticket_key.to_string());
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.tickets.remove(id)
    }

    /// Copy of the current mapping, safe to iterate while mutating the store
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.tickets.clone()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Overwrite the persisted file with the in-memory mapping
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.tickets)
            .context("Failed to serialize ticket state")?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write ticket state: {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = TicketStateStore::load(temp_dir.path()).unwrap();
        assert!(store.is_empty());
        assert_eq!(
            store.path(),
            temp_dir.path().join(".debtbomb").join("jira-map.json")
        );
    }

    #[test]
    fn test_empty_file_is_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(STATE_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(STATE_FILE), "").unwrap();

        let store = TicketStateStore::load(temp_dir.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(STATE_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(STATE_FILE), "not json").unwrap();

        assert!(TicketStateStore::load(temp_dir.path()).is_err());
    }

    #[test]
    fn test_mutation_and_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = TicketStateStore::load(temp_dir.path()).unwrap();

        store.set("abc", "OPS-1");
        store.set("def", "OPS-2");
        let snapshot = store.snapshot();

        assert_eq!(store.get("abc"), Some("OPS-1"));
        assert_eq!(store.remove("abc"), Some("OPS-1".to_string()));
        assert_eq!(store.get("abc"), None);
        assert_eq!(store.remove("abc"), None);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_save_overwrites_in_full() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = TicketStateStore::load(temp_dir.path()).unwrap();
        store.set("abc", "OPS-1");
        store.set("def", "OPS-2");
        store.save().unwrap();

        let mut reloaded = TicketStateStore::load(temp_dir.path()).unwrap();
        assert_eq!(reloaded, store);

        reloaded.remove("abc");
        reloaded.save().unwrap();

        let contents = fs::read_to_string(reloaded.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, serde_json::json!({ "def": "OPS-2" }));
    }
}
