use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::board::{Board, Quorum};
use crate::config::{MonitorSettings, SavedConfig};
use crate::poller::{PollOutcome, PollQuery};

pub const NOTIFICATION_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Results,
    Settings,
}

/// What the main loop must do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    ToggleRefresh,
    RefreshNow,
    QuestionChanged,
    IntervalChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsOption {
    Interval,
    Quorum,
}

impl SettingsOption {
    pub const ALL: [SettingsOption; 2] = [SettingsOption::Interval, SettingsOption::Quorum];
}

pub struct App {
    pub mode: AppMode,
    pub endpoint: String,
    pub query: PollQuery,
    pub question_count: Option<u32>,
    pub interval: Duration,
    pub board: Board,
    pub auto_refresh: bool,
    pub last_applied_seq: u64,
    pub last_update: Option<DateTime<Local>>,
    pub last_error: Option<(DateTime<Local>, String)>,
    pub polls_ok: u64,
    pub polls_failed: u64,
    pub settings_selected: usize,
    /// Saved configuration that settings changes are written back to.
    pub config_path: Option<PathBuf>,
    pub notification: Option<String>,
    pub notification_time: Option<Instant>,
    pub start_time: Instant,
}

impl App {
    pub fn new(settings: &MonitorSettings) -> Self {
        App {
            mode: AppMode::Results,
            endpoint: settings.endpoint.clone(),
            query: settings.query.clone(),
            question_count: settings.question_count,
            interval: settings.interval,
            board: Board::new(settings.quorum),
            auto_refresh: false,
            last_applied_seq: 0,
            last_update: None,
            last_error: None,
            polls_ok: 0,
            polls_failed: 0,
            settings_selected: 0,
            config_path: None,
            notification: None,
            notification_time: None,
            start_time: Instant::now(),
        }
    }

    /// Apply a poll outcome unless it is stale. Returns whether it was used.
    ///
    /// Outcomes for another question, or older than the last applied
    /// response, are dropped so a slow request never overwrites newer data.
    pub fn handle_outcome(&mut self, outcome: PollOutcome) -> bool {
        let seq = outcome.seq;
        let trigger = outcome.trigger;
        if outcome.query != self.query {
            debug!(seq, ?trigger, "discarding outcome for question {}", outcome.query.question_no);
            return false;
        }
        if seq <= self.last_applied_seq {
            debug!(seq, ?trigger, last = self.last_applied_seq, "discarding stale outcome");
            return false;
        }

        match outcome.result {
            Ok(response) => {
                self.last_applied_seq = seq;
                let updated = self.board.apply(&response);
                if !updated.is_empty() {
                    info!(seq, ?trigger, "redrew {} chart(s)", updated.len());
                }
                self.last_update = Some(Local::now());
                self.last_error = None;
                self.polls_ok += 1;
            }
            Err(e) => {
                self.last_error = Some((Local::now(), e.to_string()));
                self.polls_failed += 1;
            }
        }
        true
    }

    /// Move to another question: its charts start from scratch.
    pub fn set_question(&mut self, question_no: u32) -> bool {
        let in_range =
            question_no >= 1 && self.question_count.is_none_or(|count| question_no <= count);
        if !in_range || question_no == self.query.question_no {
            return false;
        }
        self.query.question_no = question_no;
        self.board.clear();
        self.last_update = None;
        self.last_error = None;
        true
    }

    /// The session's current settings in their saved form.
    pub fn session_config(&self) -> SavedConfig {
        SavedConfig {
            endpoint: self.endpoint.clone(),
            comp_slug: self.query.comp_slug.clone(),
            event_slug: self.query.event_slug.clone(),
            question_no: self.query.question_no,
            question_count: self.question_count,
            quorum_percent: self.board.quorum().percent(),
            refresh_interval_secs: self.interval.as_secs(),
            auto_refresh: self.auto_refresh,
        }
    }

    pub fn set_quorum(&mut self, quorum: Quorum) {
        self.board.set_quorum(quorum);
    }

    pub fn selected_setting(&self) -> SettingsOption {
        SettingsOption::ALL[self.settings_selected.min(SettingsOption::ALL.len() - 1)]
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notification = Some(message.into());
        self.notification_time = Some(Instant::now());
    }

    pub fn expire_notification(&mut self) {
        if let Some(time) = self.notification_time {
            if time.elapsed() > Duration::from_secs(NOTIFICATION_TIMEOUT_SECS) {
                self.notification = None;
                self.notification_time = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PollError;
    use crate::poller::Trigger;
    use crate::results::{Palette, PollResponse, TargetKey, VoteAggregate};

    fn settings() -> MonitorSettings {
        MonitorSettings {
            endpoint: "http://localhost/polls/get_chart_data/".to_string(),
            query: PollQuery {
                comp_slug: None,
                event_slug: "agm".to_string(),
                question_no: 1,
            },
            question_count: Some(3),
            quorum: Quorum::from_percent(50.0).unwrap(),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            auto_refresh: false,
        }
    }

    fn outcome(seq: u64, question_no: u32, nb_votes: u64) -> PollOutcome {
        PollOutcome {
            seq,
            query: PollQuery {
                comp_slug: None,
                event_slug: "agm".to_string(),
                question_no,
            },
            trigger: Trigger::Timer,
            result: Ok(PollResponse {
                charts: [(
                    TargetKey::Global,
                    VoteAggregate {
                        total_votes: 10,
                        nb_votes,
                        labels: vec![],
                        values: vec![],
                    },
                )]
                .into_iter()
                .collect(),
                palette: Palette::default(),
            }),
        }
    }

    fn shown(app: &App) -> Option<u64> {
        app.board.target(TargetKey::Global).and_then(|t| t.shown_votes())
    }

    #[test]
    fn newer_outcomes_win_over_late_older_ones() {
        let mut app = App::new(&settings());
        assert!(app.handle_outcome(outcome(2, 1, 7)));
        assert!(!app.handle_outcome(outcome(1, 1, 3)));
        assert_eq!(shown(&app), Some(7));
        assert_eq!(app.polls_ok, 1);
    }

    #[test]
    fn outcomes_for_another_question_are_ignored() {
        let mut app = App::new(&settings());
        assert!(app.set_question(2));
        assert!(!app.handle_outcome(outcome(1, 1, 4)));
        assert!(app.board.is_empty());
        assert!(app.handle_outcome(outcome(2, 2, 4)));
        assert_eq!(shown(&app), Some(4));
    }

    #[test]
    fn failures_keep_the_last_good_state() {
        let mut app = App::new(&settings());
        app.handle_outcome(outcome(1, 1, 6));
        let redraws = app.board.redraws();

        let failed = PollOutcome {
            result: Err(PollError::Invalid("global: 2 labels but 1 values".to_string())),
            ..outcome(2, 1, 0)
        };
        assert!(app.handle_outcome(failed));
        assert_eq!(shown(&app), Some(6));
        assert_eq!(app.board.redraws(), redraws);
        assert_eq!(app.polls_failed, 1);
        assert!(app.last_error.as_ref().unwrap().1.contains("labels"));

        // A failed request does not make an older successful one stale.
        assert!(app.handle_outcome(outcome(3, 1, 8)));
        assert!(app.last_error.is_none());
    }

    #[test]
    fn question_navigation_stays_in_range() {
        let mut app = App::new(&settings());
        assert!(!app.set_question(0));
        assert!(!app.set_question(1));
        assert!(app.set_question(3));
        assert!(!app.set_question(4));
        assert_eq!(app.query.question_no, 3);
    }

    #[test]
    fn session_config_reflects_live_changes() {
        let mut app = App::new(&settings());
        app.set_question(2);
        app.set_quorum(Quorum::from_percent(65.0).unwrap());
        let saved = app.session_config();
        assert_eq!(saved.question_no, 2);
        assert_eq!(saved.quorum_percent, 65.0);
        assert_eq!(saved.refresh_interval_secs, 5);
        assert_eq!(saved.question_count, Some(3));
    }

    #[test]
    fn navigation_drops_the_previous_charts() {
        let mut app = App::new(&settings());
        app.handle_outcome(outcome(1, 1, 6));
        assert_eq!(app.board.live_charts(), 1);
        app.set_question(2);
        assert_eq!(app.board.live_charts(), 0);
    }
}
