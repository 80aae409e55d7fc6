use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::persona::Persona;

/// Durable home for the remote identifiers. The assistant and thread are
/// created once and reused across restarts, so their ids outlive the
/// process in a small JSON file instead of living in source constants.
#[derive(Debug, Clone)]
pub struct IdStore {
    path: PathBuf,
    ids: StoredIds,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredIds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl IdStore {
    /// Open (or start empty) the store file for a persona.
    pub fn open(store_dir: &str, persona: Persona) -> io::Result<Self> {
        fs::create_dir_all(store_dir)?;
        let path = PathBuf::from(store_dir).join(format!("{}.json", persona.key()));

        let ids = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            StoredIds::default()
        };

        Ok(Self { path, ids })
    }

    pub fn assistant_id(&self) -> Option<&str> {
        self.ids.assistant_id.as_deref()
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.ids.thread_id.as_deref()
    }

    pub fn set_assistant_id(&mut self, id: String) -> io::Result<()> {
        self.ids.assistant_id = Some(id);
        self.write()
    }

    pub fn set_thread_id(&mut self, id: String) -> io::Result<()> {
        self.ids.thread_id = Some(id);
        self.write()
    }

    fn write(&mut self) -> io::Result<()> {
        self.ids.updated_at = Some(chrono::Utc::now());
        fs::write(&self.path, serde_json::to_string_pretty(&self.ids)?)?;
        tracing::debug!("Wrote id store: {:?}", self.path);
        Ok(())
    }
}
