use serde::{Deserialize, Serialize};

use crate::{
    storage::{epoch_millis, generate_id, KeyValueStore, COMPETITORS_KEY},
    Result,
};

/// A registered stacker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// Registered competitors in insertion order, written through to the backend
/// after every mutation.
#[derive(Debug)]
pub struct CompetitorStore<S: KeyValueStore> {
    backend: S,
    competitors: Vec<Competitor>,
}

impl<S: KeyValueStore> CompetitorStore<S> {
    /// Loads the collection from `backend`; missing data yields an empty store.
    pub fn open(backend: S) -> Result<Self> {
        let competitors = match backend.load(COMPETITORS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        Ok(Self {
            backend,
            competitors,
        })
    }

    /// Registers a competitor. Names that are empty after trimming are
    /// ignored and yield `None`.
    pub fn add(&mut self, name: &str) -> Result<Option<Competitor>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let competitor = Competitor {
            id: generate_id(),
            name: name.to_string(),
            created_at: epoch_millis(),
        };
        let mut next = self.competitors.clone();
        next.push(competitor.clone());
        self.commit(next)?;
        tracing::debug!(id = %competitor.id, name = %competitor.name, "added competitor");
        Ok(Some(competitor))
    }

    /// Removes the competitor if present. Unknown ids are not an error.
    pub fn remove(&mut self, id: &str) -> Result<()> {
        let next: Vec<Competitor> = self
            .competitors
            .iter()
            .filter(|competitor| competitor.id != id)
            .cloned()
            .collect();
        let removed = next.len() != self.competitors.len();
        self.commit(next)?;
        if removed {
            tracing::debug!(id, "removed competitor");
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Competitor> {
        self.competitors.iter().find(|competitor| competitor.id == id)
    }

    pub fn list(&self) -> &[Competitor] {
        &self.competitors
    }

    pub fn is_empty(&self) -> bool {
        self.competitors.is_empty()
    }

    /// Saves `next` before it replaces the visible collection.
    fn commit(&mut self, next: Vec<Competitor>) -> Result<()> {
        let raw = serde_json::to_string(&next)?;
        self.backend.save(COMPETITORS_KEY, &raw)?;
        self.competitors = next;
        Ok(())
    }
}
