use serde::{Deserialize, Serialize};

use crate::{
    storage::{epoch_millis, generate_id, KeyValueStore, RECORDS_KEY},
    EventType, Result,
};

/// One committed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRecord {
    pub id: String,
    pub event_type: EventType,
    /// Participants in selection order. Empty for a guest run.
    pub competitor_ids: Vec<String>,
    /// Elapsed milliseconds.
    pub time: u64,
    pub created_at: i64,
}

impl TimeRecord {
    pub fn is_guest(&self) -> bool {
        self.competitor_ids.is_empty()
    }

    /// Order-independent identity of the participating competitors.
    pub fn competitor_set_key(&self) -> String {
        competitor_set_key(&self.competitor_ids)
    }
}

/// Sorts the ids and joins them with `,` so that `[b, a]` and `[a, b]`
/// compare equal.
pub fn competitor_set_key<S: AsRef<str>>(ids: &[S]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(|id| id.as_ref()).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

/// Every committed run, written through to the backend after each mutation.
#[derive(Debug)]
pub struct RecordStore<S: KeyValueStore> {
    backend: S,
    records: Vec<TimeRecord>,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Loads the collection from `backend`; missing data yields an empty store.
    pub fn open(backend: S) -> Result<Self> {
        let records = match backend.load(RECORDS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        Ok(Self { backend, records })
    }

    /// Appends a run. The competitor count is not checked here; selection
    /// validation happens before a run is timed.
    pub fn add(
        &mut self,
        event_type: EventType,
        competitor_ids: Vec<String>,
        time_ms: u64,
    ) -> Result<TimeRecord> {
        let record = TimeRecord {
            id: generate_id(),
            event_type,
            competitor_ids,
            time: time_ms,
            created_at: epoch_millis(),
        };
        let mut next = self.records.clone();
        next.push(record.clone());
        self.commit(next)?;
        tracing::debug!(id = %record.id, event = %event_type, time_ms, "added record");
        Ok(record)
    }

    /// Removes a single record if present.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.retain(|record| record.id != id)
    }

    pub fn clear_all(&mut self) -> Result<()> {
        tracing::debug!(count = self.records.len(), "clearing all records");
        self.commit(Vec::new())
    }

    pub fn clear_by_event(&mut self, event_type: EventType) -> Result<()> {
        self.retain(|record| record.event_type != event_type)?;
        tracing::debug!(event = %event_type, "cleared event records");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&TimeRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn list(&self) -> &[TimeRecord] {
        &self.records
    }

    /// Records of one event, in insertion order.
    pub fn list_by_event(&self, event_type: EventType) -> Vec<&TimeRecord> {
        self.records
            .iter()
            .filter(|record| record.event_type == event_type)
            .collect()
    }

    /// Fastest record for the event and competitor set, ignoring the order of
    /// `competitor_ids`. Equal times resolve to the earliest record.
    pub fn best_for<T: AsRef<str>>(
        &self,
        event_type: EventType,
        competitor_ids: &[T],
    ) -> Option<&TimeRecord> {
        let key = competitor_set_key(competitor_ids);
        self.records
            .iter()
            .filter(|record| record.event_type == event_type && record.competitor_set_key() == key)
            .min_by_key(|record| record.time)
    }

    fn retain(&mut self, keep: impl Fn(&TimeRecord) -> bool) -> Result<()> {
        let next = self.records.iter().filter(|record| keep(*record)).cloned().collect();
        self.commit(next)
    }

    /// Saves `next` and only then makes it the visible collection, so a
    /// failed save leaves the store unchanged.
    fn commit(&mut self, next: Vec<TimeRecord>) -> Result<()> {
        let raw = serde_json::to_string(&next)?;
        self.backend.save(RECORDS_KEY, &raw)?;
        self.records = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn store() -> RecordStore<MemoryStore> {
        RecordStore::open(MemoryStore::new()).unwrap()
    }

    #[test]
    fn best_for_picks_fastest_run() {
        let mut records = store();
        records
            .add(EventType::ThreeThreeThree, ids(&["p1"]), 5230)
            .unwrap();
        let best = records
            .add(EventType::ThreeThreeThree, ids(&["p1"]), 4980)
            .unwrap();
        records.add(EventType::ThreeSixThree, ids(&["p1"]), 3000).unwrap();

        assert_eq!(records.best_for(EventType::ThreeThreeThree, &["p1"]), Some(&best));
    }

    #[test]
    fn best_for_ignores_competitor_order() {
        let mut records = store();
        let run = records
            .add(EventType::Doubles, ids(&["p2", "p1"]), 6000)
            .unwrap();
        records.add(EventType::Doubles, ids(&["p1", "p3"]), 5000).unwrap();

        assert_eq!(records.best_for(EventType::Doubles, &["p1", "p2"]), Some(&run));
        assert!(records.best_for(EventType::Doubles, &["p2"]).is_none());
        assert!(records.best_for(EventType::Cycle, &["p1", "p2"]).is_none());
    }

    #[test]
    fn best_for_keeps_first_of_equal_times() {
        let mut records = store();
        let first = records.add(EventType::Cycle, ids(&["p1"]), 7000).unwrap();
        records.add(EventType::Cycle, ids(&["p1"]), 7000).unwrap();

        assert_eq!(records.best_for(EventType::Cycle, &["p1"]), Some(&first));
    }

    #[test]
    fn clear_by_event_leaves_other_events() {
        let mut records = store();
        records.add(EventType::Cycle, ids(&["p1"]), 9000).unwrap();
        records.add(EventType::Cycle, Vec::new(), 8000).unwrap();
        let kept = records
            .add(EventType::ThreeSixThree, ids(&["p1"]), 4000)
            .unwrap();

        records.clear_by_event(EventType::Cycle).unwrap();
        assert!(records.list_by_event(EventType::Cycle).is_empty());
        assert_eq!(records.list(), &[kept]);

        records.clear_all().unwrap();
        assert!(records.list().is_empty());
    }

    #[test]
    fn delete_is_idempotent_and_persisted() {
        let backend = MemoryStore::new();
        let mut records = RecordStore::open(backend.clone()).unwrap();
        let undone = records.add(EventType::Cycle, ids(&["p1"]), 100).unwrap();
        let kept = records.add(EventType::Cycle, ids(&["p1"]), 200).unwrap();

        records.delete(&undone.id).unwrap();
        records.delete(&undone.id).unwrap();

        let reopened = RecordStore::open(backend).unwrap();
        assert_eq!(reopened.list(), &[kept]);
        assert!(reopened.get(&undone.id).is_none());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut records = store();
        let record = records
            .add(EventType::TeamThreeSixThree, ids(&["a", "b"]), 12_345)
            .unwrap();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["eventType"], "team-3-6-3");
        assert_eq!(json["competitorIds"][1], "b");
        assert_eq!(json["time"], 12_345);
        assert!(json["createdAt"].is_i64());
    }

    #[derive(Debug, Clone, Default)]
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for ReadOnlyStore {
        fn load(&self, key: &str) -> Result<Option<String>> {
            self.inner.load(key)
        }

        fn save(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(crate::CupStackError::msg("disk full"))
        }
    }

    #[test]
    fn failed_save_leaves_records_unchanged() {
        let mut seeded = RecordStore::open(MemoryStore::new()).unwrap();
        seeded.add(EventType::Cycle, ids(&["p1"]), 4_000).unwrap();
        seeded.add(EventType::Doubles, ids(&["p1", "p2"]), 6_000).unwrap();
        let before = seeded.list().to_vec();

        let mut records = RecordStore::open(ReadOnlyStore {
            inner: seeded.backend.clone(),
        })
        .unwrap();

        assert!(records.add(EventType::Cycle, ids(&["p1"]), 3_000).is_err());
        assert!(records.delete(&before[0].id).is_err());
        assert!(records.clear_by_event(EventType::Cycle).is_err());
        assert!(records.clear_all().is_err());

        assert_eq!(records.list(), before.as_slice());
        assert_eq!(
            records.best_for(EventType::Cycle, &["p1"]).map(|r| r.time),
            Some(4_000)
        );
    }

    #[test]
    fn list_by_event_returns_matching_records_in_order() {
        let mut records = store();
        let first = records.add(EventType::Cycle, ids(&["p1"]), 9_000).unwrap();
        records.add(EventType::Doubles, ids(&["p1", "p2"]), 7_000).unwrap();
        let guest = records.add(EventType::Cycle, Vec::new(), 8_000).unwrap();
        records.add(EventType::ThreeThreeThree, ids(&["p2"]), 4_000).unwrap();
        let last = records.add(EventType::Cycle, ids(&["p2"]), 10_000).unwrap();

        assert_eq!(records.list_by_event(EventType::Cycle), [&first, &guest, &last]);
        assert!(records.list_by_event(EventType::TeamThreeSixThree).is_empty());
    }

    #[test]
    fn set_key_sorts_ids() {
        assert_eq!(competitor_set_key(&["p3", "p1"]), "p1,p3");
        assert_eq!(competitor_set_key::<&str>(&[]), "");
    }
}
