//! Core library for the Cupstack timer.
//!
//! The crate holds everything except the terminal front end: the stopwatch
//! and its frame loop, the competitor and record stores with their storage
//! backends, the timing session that ties a run to a selection, and the
//! leaderboards computed from stored records.

pub mod competitor;
pub mod config;
pub mod error;
pub mod event;
pub mod ranking;
pub mod record;
pub mod session;
pub mod stopwatch;
pub mod storage;

pub use competitor::{Competitor, CompetitorStore};
pub use config::{AppConfig, RankingConfig, StorageConfig, TimerConfig};
pub use error::{CupStackError, Result};
pub use event::{EventCategory, EventType};
pub use ranking::{competitor_names, Leaderboard, RankingEntry, Standing};
pub use record::{competitor_set_key, RecordStore, TimeRecord};
pub use session::{
    join_competitor_ids, parse_competitor_ids, RunResult, Selection, TimingSession, TouchOutcome,
};
pub use stopwatch::{
    format_time, Clock, FrameLoop, ManualClock, Stopwatch, StopwatchState, SystemClock,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
