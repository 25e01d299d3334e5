use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::CupStackError;

/// Whether an event is run by a single stacker or a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Individual,
    Team,
}

/// The five competition disciplines. The set is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "3-3-3")]
    ThreeThreeThree,
    #[serde(rename = "3-6-3")]
    ThreeSixThree,
    #[serde(rename = "cycle")]
    Cycle,
    #[serde(rename = "doubles")]
    Doubles,
    #[serde(rename = "team-3-6-3")]
    TeamThreeSixThree,
}

impl EventType {
    /// Every event, individual events first, in leaderboard order.
    pub const ALL: [EventType; 5] = [
        EventType::ThreeThreeThree,
        EventType::ThreeSixThree,
        EventType::Cycle,
        EventType::Doubles,
        EventType::TeamThreeSixThree,
    ];

    /// Storage and command line key, e.g. `team-3-6-3`.
    pub fn key(self) -> &'static str {
        match self {
            EventType::ThreeThreeThree => "3-3-3",
            EventType::ThreeSixThree => "3-6-3",
            EventType::Cycle => "cycle",
            EventType::Doubles => "doubles",
            EventType::TeamThreeSixThree => "team-3-6-3",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            EventType::ThreeThreeThree => "3-3-3",
            EventType::ThreeSixThree => "3-6-3",
            EventType::Cycle => "Cycle",
            EventType::Doubles => "Doubles",
            EventType::TeamThreeSixThree => "Team 3-6-3",
        }
    }

    pub fn category(self) -> EventCategory {
        match self {
            EventType::ThreeThreeThree | EventType::ThreeSixThree | EventType::Cycle => {
                EventCategory::Individual
            }
            EventType::Doubles | EventType::TeamThreeSixThree => EventCategory::Team,
        }
    }

    pub fn is_team(self) -> bool {
        self.category() == EventCategory::Team
    }

    /// Minimum number of competitors for a ranked run.
    pub fn min_competitors(self) -> usize {
        match self.category() {
            EventCategory::Individual => 1,
            EventCategory::Team => 2,
        }
    }

    /// Maximum number of competitors for a ranked run, `None` when unbounded.
    pub fn max_competitors(self) -> Option<usize> {
        match self.category() {
            EventCategory::Individual => Some(1),
            EventCategory::Team => None,
        }
    }

    /// Returns true when a run with `count` competitors may be timed.
    /// Zero is always accepted and denotes a guest run.
    pub fn accepts(self, count: usize) -> bool {
        if count == 0 {
            return true;
        }
        count >= self.min_competitors() && self.max_competitors().map_or(true, |max| count <= max)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EventType {
    type Err = CupStackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        EventType::ALL
            .into_iter()
            .find(|event| event.key().eq_ignore_ascii_case(key))
            .ok_or_else(|| CupStackError::UnknownEvent(key.to_string()))
    }
}
