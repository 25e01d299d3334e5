//! One timing screen: a validated selection, a stopwatch and the frame loop
//! that refreshes it, committing finished runs into the record store.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::{
    config::TimerConfig,
    storage::KeyValueStore,
    stopwatch::{Clock, FrameLoop, Stopwatch, StopwatchState, SystemClock},
    Competitor, CupStackError, EventType, RecordStore, Result, TimeRecord,
};

/// Splits a comma-joined id list. Empty segments are dropped, so an empty
/// string is a guest run.
pub fn parse_competitor_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_competitor_ids<T: AsRef<str>>(ids: &[T]) -> String {
    ids.iter().map(|id| id.as_ref()).collect::<Vec<_>>().join(",")
}

/// Event and participants chosen before a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub event_type: EventType,
    pub competitor_ids: Vec<String>,
}

impl Selection {
    /// Checks the ids against the registry and the event's competitor limits.
    /// Repeated ids count once. No ids at all selects a guest run.
    pub fn new(
        event_type: EventType,
        competitor_ids: Vec<String>,
        registered: &[Competitor],
    ) -> Result<Self> {
        let mut unique: Vec<String> = Vec::with_capacity(competitor_ids.len());
        for id in competitor_ids {
            if !registered.iter().any(|competitor| competitor.id == id) {
                return Err(CupStackError::UnknownCompetitor(id));
            }
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        if !event_type.accepts(unique.len()) {
            return Err(CupStackError::InvalidSelection {
                event: event_type,
                count: unique.len(),
            });
        }

        Ok(Self {
            event_type,
            competitor_ids: unique,
        })
    }

    pub fn guest(event_type: EventType) -> Self {
        Self {
            event_type,
            competitor_ids: Vec::new(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.competitor_ids.is_empty()
    }
}

/// What the result screen shows for a committed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub record: TimeRecord,
    /// Best record for the same event and competitor set, including this run.
    /// Always `None` for guest runs.
    pub best: Option<TimeRecord>,
    pub is_new_best: bool,
}

impl RunResult {
    pub fn new<S: KeyValueStore>(record: TimeRecord, records: &RecordStore<S>) -> Self {
        let best = if record.is_guest() {
            None
        } else {
            records
                .best_for(record.event_type, record.competitor_ids.as_slice())
                .cloned()
        };
        let is_new_best = best.as_ref().is_some_and(|best| best.time == record.time);
        Self {
            record,
            best,
            is_new_best,
        }
    }
}

/// Outcome of a single touch on the timing screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TouchOutcome {
    Started,
    /// Too early to stop, or the run is already finished.
    Ignored,
    Finished(RunResult),
}

type DisplayFn = Arc<dyn Fn(u64) + Send + Sync>;

/// Drives one run at a time for a fixed selection.
///
/// The frame loop only exists while a run is in progress; stopping,
/// resetting or dropping the session cancels it.
pub struct TimingSession<C: Clock + 'static = SystemClock> {
    selection: Selection,
    settings: TimerConfig,
    stopwatch: Arc<Mutex<Stopwatch<C>>>,
    frames: Option<FrameLoop>,
    display: Option<DisplayFn>,
}

impl TimingSession<SystemClock> {
    pub fn new(selection: Selection, settings: TimerConfig) -> Self {
        Self::with_clock(selection, settings, SystemClock)
    }
}

impl<C: Clock + 'static> TimingSession<C> {
    pub fn with_clock(selection: Selection, settings: TimerConfig, clock: C) -> Self {
        Self {
            selection,
            settings,
            stopwatch: Arc::new(Mutex::new(Stopwatch::with_clock(clock))),
            frames: None,
            display: None,
        }
    }

    /// Registers a callback that receives the elapsed time on every frame of
    /// a running stopwatch.
    pub fn on_frame<F>(mut self, display: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.display = Some(Arc::new(display));
        self
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn state(&self) -> Result<StopwatchState> {
        Ok(self.lock()?.state())
    }

    pub fn elapsed_ms(&self) -> Result<u64> {
        Ok(self.lock()?.elapsed_ms())
    }

    /// Starts a run when idle, stops and commits it when running. A stop
    /// earlier than `min_run_ms` after the start is ignored and the run keeps
    /// going. Touches on a finished run do nothing until [`Self::reset`].
    pub fn touch<S: KeyValueStore>(
        &mut self,
        records: &mut RecordStore<S>,
    ) -> Result<TouchOutcome> {
        let finished = {
            let mut stopwatch = self.lock()?;
            match stopwatch.state() {
                StopwatchState::Stopped => {
                    tracing::debug!("touch ignored, run already finished");
                    return Ok(TouchOutcome::Ignored);
                }
                StopwatchState::Running
                    if stopwatch.running_for_ms() < self.settings.min_run_ms =>
                {
                    tracing::debug!(
                        running_for_ms = stopwatch.running_for_ms(),
                        "touch ignored, run too short to stop"
                    );
                    return Ok(TouchOutcome::Ignored);
                }
                _ => stopwatch.toggle(),
            }
        };

        match finished {
            None => {
                self.start_frames()?;
                tracing::info!(event = %self.selection.event_type, "run started");
                Ok(TouchOutcome::Started)
            }
            Some(time_ms) => {
                self.stop_frames();
                let record = records.add(
                    self.selection.event_type,
                    self.selection.competitor_ids.clone(),
                    time_ms,
                )?;
                tracing::info!(
                    event = %record.event_type,
                    time_ms,
                    guest = record.is_guest(),
                    "run committed"
                );
                Ok(TouchOutcome::Finished(RunResult::new(record, records)))
            }
        }
    }

    /// Discards the current run, finished or not.
    pub fn reset(&mut self) -> Result<()> {
        self.stop_frames();
        self.lock()?.reset();
        Ok(())
    }

    fn start_frames(&mut self) -> Result<()> {
        self.stop_frames();
        let stopwatch = self.stopwatch.clone();
        let display = self.display.clone();
        let frames = FrameLoop::spawn(self.settings.frame_interval(), move || {
            let Ok(mut stopwatch) = stopwatch.lock() else {
                return false;
            };
            let elapsed = stopwatch.tick();
            let running = stopwatch.state() == StopwatchState::Running;
            drop(stopwatch);

            if running {
                if let Some(display) = &display {
                    display(elapsed);
                }
            }
            running
        })?;
        self.frames = Some(frames);
        Ok(())
    }

    fn stop_frames(&mut self) {
        if let Some(frames) = self.frames.take() {
            frames.cancel();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Stopwatch<C>>> {
        self.stopwatch
            .lock()
            .map_err(|_| CupStackError::msg("stopwatch has been poisoned"))
    }
}

impl<C: Clock + 'static> std::fmt::Debug for TimingSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingSession")
            .field("selection", &self.selection)
            .field("running", &self.frames.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;
    use crate::{stopwatch::ManualClock, storage::MemoryStore};

    fn settings() -> TimerConfig {
        TimerConfig {
            frame_interval_ms: 1,
            ..TimerConfig::default()
        }
    }

    fn roster() -> Vec<Competitor> {
        ["p1", "p2", "p3"]
            .into_iter()
            .map(|id| Competitor {
                id: id.to_string(),
                name: id.to_uppercase(),
                created_at: 0,
            })
            .collect()
    }

    fn session(selection: Selection) -> (ManualClock, TimingSession<ManualClock>) {
        let clock = ManualClock::new(0);
        let session = TimingSession::with_clock(selection, settings(), clock.clone());
        (clock, session)
    }

    fn records() -> RecordStore<MemoryStore> {
        RecordStore::open(MemoryStore::new()).unwrap()
    }

    fn finished(outcome: TouchOutcome) -> RunResult {
        match outcome {
            TouchOutcome::Finished(result) => result,
            other => panic!("expected a finished run, got {other:?}"),
        }
    }

    #[test]
    fn parses_and_joins_navigation_ids() {
        assert_eq!(parse_competitor_ids("p1, p2,,"), ["p1", "p2"]);
        assert!(parse_competitor_ids("").is_empty());
        assert_eq!(join_competitor_ids(&["p1", "p2"]), "p1,p2");
    }

    #[test]
    fn selection_enforces_event_limits() {
        let roster = roster();
        let err = Selection::new(EventType::Doubles, vec!["p1".into()], &roster).unwrap_err();
        assert!(matches!(
            err,
            CupStackError::InvalidSelection {
                event: EventType::Doubles,
                count: 1
            }
        ));

        let err = Selection::new(EventType::Cycle, vec!["p1".into(), "p2".into()], &roster)
            .unwrap_err();
        assert!(matches!(err, CupStackError::InvalidSelection { count: 2, .. }));

        let doubled = Selection::new(
            EventType::Doubles,
            vec!["p1".into(), "p1".into(), "p2".into()],
            &roster,
        )
        .unwrap();
        assert_eq!(doubled.competitor_ids, ["p1", "p2"]);

        assert!(Selection::new(EventType::Doubles, Vec::new(), &roster)
            .unwrap()
            .is_guest());
    }

    #[test]
    fn selection_rejects_unknown_competitors() {
        let err = Selection::new(EventType::Cycle, vec!["ghost".into()], &roster()).unwrap_err();
        assert!(matches!(err, CupStackError::UnknownCompetitor(id) if id == "ghost"));
    }

    #[test]
    fn early_stop_is_ignored() {
        let (clock, mut session) = session(Selection::guest(EventType::Cycle));
        let mut records = records();

        assert_eq!(session.touch(&mut records).unwrap(), TouchOutcome::Started);
        clock.advance(999);
        assert_eq!(session.touch(&mut records).unwrap(), TouchOutcome::Ignored);
        assert_eq!(session.state().unwrap(), StopwatchState::Running);
        assert!(records.list().is_empty());

        clock.advance(1);
        let result = finished(session.touch(&mut records).unwrap());
        assert_eq!(result.record.time, 1_000);
        assert_eq!(records.list().len(), 1);
    }

    #[test]
    fn finished_run_ignores_touches_until_reset() {
        let selection = Selection::new(EventType::ThreeThreeThree, vec!["p1".into()], &roster())
            .unwrap();
        let (clock, mut session) = session(selection);
        let mut records = records();

        session.touch(&mut records).unwrap();
        clock.advance(5_230);
        finished(session.touch(&mut records).unwrap());

        clock.advance(2_000);
        assert_eq!(session.touch(&mut records).unwrap(), TouchOutcome::Ignored);
        assert_eq!(session.elapsed_ms().unwrap(), 5_230);

        session.reset().unwrap();
        assert_eq!(session.state().unwrap(), StopwatchState::Idle);
        assert_eq!(session.elapsed_ms().unwrap(), 0);
        assert_eq!(session.touch(&mut records).unwrap(), TouchOutcome::Started);
    }

    #[test]
    fn reports_new_best_against_previous_runs() {
        let selection = Selection::new(EventType::ThreeThreeThree, vec!["p1".into()], &roster())
            .unwrap();
        let (clock, mut session) = session(selection);
        let mut records = records();

        session.touch(&mut records).unwrap();
        clock.advance(5_230);
        let first = finished(session.touch(&mut records).unwrap());
        assert!(first.is_new_best);

        session.reset().unwrap();
        session.touch(&mut records).unwrap();
        clock.advance(4_980);
        let second = finished(session.touch(&mut records).unwrap());
        assert!(second.is_new_best);

        session.reset().unwrap();
        session.touch(&mut records).unwrap();
        clock.advance(6_000);
        let third = finished(session.touch(&mut records).unwrap());
        assert!(!third.is_new_best);
        assert_eq!(third.best.map(|best| best.time), Some(4_980));
    }

    #[test]
    fn guest_runs_have_no_best() {
        let (clock, mut session) = session(Selection::guest(EventType::Doubles));
        let mut records = records();

        session.touch(&mut records).unwrap();
        clock.advance(3_000);
        let result = finished(session.touch(&mut records).unwrap());

        assert!(result.record.is_guest());
        assert!(result.best.is_none());
        assert!(!result.is_new_best);
    }

    #[test]
    fn publishes_elapsed_while_running_only() {
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = published.clone();
        let clock = ManualClock::new(0);
        let mut session = TimingSession::with_clock(
            Selection::guest(EventType::Cycle),
            settings(),
            clock.clone(),
        )
        .on_frame(move |elapsed| sink.lock().unwrap().push(elapsed));
        let mut records = records();

        session.touch(&mut records).unwrap();
        clock.advance(1_250);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(published.lock().unwrap().last().copied(), Some(1_250));

        finished(session.touch(&mut records).unwrap());
        let count = published.lock().unwrap().len();
        clock.advance(500);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(published.lock().unwrap().len(), count);
    }
}
