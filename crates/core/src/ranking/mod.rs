//! Leaderboards derived from the record and competitor collections.
//!
//! Nothing is cached: every call recomputes from the slices it was given.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Competitor, EventType, TimeRecord};

/// Best time of one competitor combination in one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub record_id: String,
    pub competitor_ids: Vec<String>,
    pub time: u64,
}

/// First-place count of one competitor across all events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub competitor_id: String,
    pub name: String,
    pub first_places: usize,
}

/// Read-only view over the current records and competitors.
#[derive(Debug, Clone, Copy)]
pub struct Leaderboard<'a> {
    records: &'a [TimeRecord],
    competitors: &'a [Competitor],
}

impl<'a> Leaderboard<'a> {
    pub fn new(records: &'a [TimeRecord], competitors: &'a [Competitor]) -> Self {
        Self {
            records,
            competitors,
        }
    }

    /// Per-event leaderboard: one entry per competitor set, fastest first.
    /// Guest runs never appear. Equal times keep the order in which their
    /// competitor sets were first recorded.
    pub fn best_by_competitor_set(&self, event_type: EventType) -> Vec<RankingEntry> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut best: Vec<&TimeRecord> = Vec::new();

        for record in self
            .records
            .iter()
            .filter(|record| record.event_type == event_type && !record.is_guest())
        {
            let key = record.competitor_set_key();
            match slots.get(&key).copied() {
                Some(slot) => {
                    if record.time < best[slot].time {
                        best[slot] = record;
                    }
                }
                None => {
                    slots.insert(key, best.len());
                    best.push(record);
                }
            }
        }

        best.sort_by_key(|record| record.time);
        best.into_iter()
            .map(|record| RankingEntry {
                record_id: record.id.clone(),
                competitor_ids: record.competitor_ids.clone(),
                time: record.time,
            })
            .collect()
    }

    /// Overall leaderboard counting event wins.
    ///
    /// Only the first entry of each event leaderboard scores, even when the
    /// next entry has the same time. Competitors that are no longer registered
    /// are left out. Equal counts keep registration order.
    pub fn overall_standings(&self) -> Vec<Standing> {
        let leaders: Vec<RankingEntry> = EventType::ALL
            .into_iter()
            .filter_map(|event| self.best_by_competitor_set(event).into_iter().next())
            .collect();

        let mut wins: HashMap<&str, usize> = HashMap::new();
        for leader in &leaders {
            for id in &leader.competitor_ids {
                *wins.entry(id.as_str()).or_default() += 1;
            }
        }

        let mut standings: Vec<Standing> = self
            .competitors
            .iter()
            .filter_map(|competitor| {
                wins.get(competitor.id.as_str()).map(|&first_places| Standing {
                    competitor_id: competitor.id.clone(),
                    name: competitor.name.clone(),
                    first_places,
                })
            })
            .collect();
        standings.sort_by(|a, b| b.first_places.cmp(&a.first_places));
        standings
    }

    /// Joins the names of the given competitors with `, `. Unknown ids are
    /// skipped.
    pub fn competitor_names<T: AsRef<str>>(&self, ids: &[T]) -> String {
        competitor_names(self.competitors, ids)
    }
}

/// Display string for a competitor list; ids without a registered competitor
/// are dropped.
pub fn competitor_names<T: AsRef<str>>(competitors: &[Competitor], ids: &[T]) -> String {
    ids.iter()
        .filter_map(|id| {
            competitors
                .iter()
                .find(|competitor| competitor.id == id.as_ref())
                .map(|competitor| competitor.name.as_str())
        })
        .collect::<Vec<_>>()
        .join(", ")
}
