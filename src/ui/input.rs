use std::time::Duration;

use crossterm::event::KeyCode;
use tracing::warn;

use crate::board::Quorum;
use crate::config::{
    MAX_INTERVAL_SECS, MIN_INTERVAL_SECS, SavedConfig, load_config_from, reset_config_at,
    save_config_to,
};
use crate::types::{App, AppMode, KeyAction, SettingsOption};

const QUORUM_STEP_PERCENT: f64 = 5.0;

/// Handle keyboard input events for all application modes
pub fn handle_key_event(app: &mut App, key: KeyCode) -> KeyAction {
    match app.mode {
        AppMode::Results => handle_results_mode_keys(app, key),
        AppMode::Settings => handle_settings_mode_keys(app, key),
    }
}

/// Handle key events on the results dashboard
fn handle_results_mode_keys(app: &mut App, key: KeyCode) -> KeyAction {
    match key {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('a') | KeyCode::Char(' ') => KeyAction::ToggleRefresh,
        KeyCode::Char('r') => KeyAction::RefreshNow,
        KeyCode::Left => {
            let previous = app.query.question_no.saturating_sub(1);
            if app.set_question(previous) {
                KeyAction::QuestionChanged
            } else {
                KeyAction::None
            }
        }
        KeyCode::Right => {
            let next = app.query.question_no.saturating_add(1);
            if app.set_question(next) {
                KeyAction::QuestionChanged
            } else {
                KeyAction::None
            }
        }
        KeyCode::Tab => {
            app.mode = AppMode::Settings;
            KeyAction::None
        }
        KeyCode::Esc => {
            // Dismiss the status messages
            app.notification = None;
            app.notification_time = None;
            app.last_error = None;
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}

/// Handle key events in settings mode
fn handle_settings_mode_keys(app: &mut App, key: KeyCode) -> KeyAction {
    match key {
        KeyCode::Char('q') => return KeyAction::Quit,
        KeyCode::Esc | KeyCode::Tab => {
            app.mode = AppMode::Results;
        }
        KeyCode::Up => {
            if app.settings_selected > 0 {
                app.settings_selected -= 1;
            }
        }
        KeyCode::Down => {
            if app.settings_selected < SettingsOption::ALL.len() - 1 {
                app.settings_selected += 1;
            }
        }
        KeyCode::Left => return adjust_setting(app, -1),
        KeyCode::Right => return adjust_setting(app, 1),
        KeyCode::Char('s') => save_session(app),
        KeyCode::Char('r') => {
            let result = app.config_path.as_deref().map(reset_config_at);
            match result {
                Some(Ok(true)) => {
                    app.notify("✅ Configuration removed. Restart to run the guided setup again.");
                }
                Some(Ok(false)) | None => {
                    app.notify("ℹ️ No saved configuration found to remove.");
                }
                Some(Err(e)) => {
                    warn!("could not remove configuration: {}", e);
                    app.notify("❌ Error removing configuration.");
                }
            }
        }
        _ => {}
    }
    KeyAction::None
}

fn adjust_setting(app: &mut App, direction: i64) -> KeyAction {
    match app.selected_setting() {
        SettingsOption::Interval => {
            let current = app.interval.as_secs();
            let secs = (current as i64 + direction)
                .clamp(MIN_INTERVAL_SECS as i64, MAX_INTERVAL_SECS as i64) as u64;
            if secs == current {
                return KeyAction::None;
            }
            app.interval = Duration::from_secs(secs);
            persist_setting(app, |config| config.refresh_interval_secs = secs);
            KeyAction::IntervalChanged
        }
        SettingsOption::Quorum => {
            let current = app.board.quorum().percent();
            let percent = (current + QUORUM_STEP_PERCENT * direction as f64)
                .clamp(0.0, 100.0)
                .round();
            if percent == current {
                return KeyAction::None;
            }
            if let Ok(quorum) = Quorum::from_percent(percent) {
                app.set_quorum(quorum);
                persist_setting(app, |config| config.quorum_percent = percent);
            }
            KeyAction::None
        }
    }
}

/// Save the whole session, creating the configuration file if needed.
fn save_session(app: &mut App) {
    let Some(path) = app.config_path.clone() else {
        app.notify("❌ No configuration directory available.");
        return;
    };
    match save_config_to(&path, &app.session_config()) {
        Ok(()) => app.notify("✅ Session settings saved."),
        Err(e) => {
            warn!("could not save configuration: {}", e);
            app.notify("❌ Failed to save configuration.");
        }
    }
}

/// Write a changed setting back to the saved configuration, when there is one.
fn persist_setting(app: &mut App, update: impl FnOnce(&mut SavedConfig)) {
    let Some(path) = app.config_path.clone() else {
        app.notify("ℹ️ Setting changed for this session only.");
        return;
    };
    match load_config_from(&path) {
        Ok(Some(mut config)) => {
            update(&mut config);
            match save_config_to(&path, &config) {
                Ok(()) => app.notify("✅ Setting updated."),
                Err(e) => {
                    warn!("could not save setting: {}", e);
                    app.notify("❌ Failed to save setting.");
                }
            }
        }
        Ok(None) => app.notify("ℹ️ Setting changed for this session only."),
        Err(e) => {
            warn!("could not read configuration: {}", e);
            app.notify("❌ Failed to save setting.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorSettings;
    use crate::poller::PollQuery;

    fn app() -> App {
        App::new(&MonitorSettings {
            endpoint: "http://localhost/polls/get_chart_data/".to_string(),
            query: PollQuery {
                comp_slug: None,
                event_slug: "agm".to_string(),
                question_no: 1,
            },
            question_count: Some(2),
            quorum: Quorum::from_percent(50.0).unwrap(),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            auto_refresh: false,
        })
    }

    fn saved() -> SavedConfig {
        SavedConfig {
            endpoint: "http://localhost/polls/get_chart_data/".to_string(),
            comp_slug: None,
            event_slug: "agm".to_string(),
            question_no: 1,
            question_count: Some(2),
            quorum_percent: 50.0,
            refresh_interval_secs: 5,
            auto_refresh: false,
        }
    }

    #[test]
    fn results_keys_map_to_actions() {
        let mut app = app();
        assert_eq!(handle_key_event(&mut app, KeyCode::Char('q')), KeyAction::Quit);
        assert_eq!(handle_key_event(&mut app, KeyCode::Char('a')), KeyAction::ToggleRefresh);
        assert_eq!(handle_key_event(&mut app, KeyCode::Char('r')), KeyAction::RefreshNow);
        assert_eq!(handle_key_event(&mut app, KeyCode::Char('x')), KeyAction::None);
    }

    #[test]
    fn arrows_walk_through_questions() {
        let mut app = app();
        assert_eq!(handle_key_event(&mut app, KeyCode::Left), KeyAction::None);
        assert_eq!(handle_key_event(&mut app, KeyCode::Right), KeyAction::QuestionChanged);
        assert_eq!(app.query.question_no, 2);
        assert_eq!(handle_key_event(&mut app, KeyCode::Right), KeyAction::None);
        assert_eq!(handle_key_event(&mut app, KeyCode::Left), KeyAction::QuestionChanged);
        assert_eq!(app.query.question_no, 1);
    }

    #[test]
    fn tab_cycles_between_modes() {
        let mut app = app();
        handle_key_event(&mut app, KeyCode::Tab);
        assert_eq!(app.mode, AppMode::Settings);
        handle_key_event(&mut app, KeyCode::Tab);
        assert_eq!(app.mode, AppMode::Results);
    }

    #[test]
    fn interval_adjustments_are_clamped_and_reported() {
        let mut app = app();
        app.mode = AppMode::Settings;
        assert_eq!(handle_key_event(&mut app, KeyCode::Right), KeyAction::IntervalChanged);
        assert_eq!(app.interval, Duration::from_secs(6));

        app.interval = Duration::from_secs(MIN_INTERVAL_SECS);
        assert_eq!(handle_key_event(&mut app, KeyCode::Left), KeyAction::None);
        assert_eq!(app.interval, Duration::from_secs(MIN_INTERVAL_SECS));
        assert!(app.notification.as_deref().unwrap().contains("session"));
    }

    #[test]
    fn quorum_adjustments_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config_to(&path, &saved()).unwrap();

        let mut app = app();
        app.config_path = Some(path.clone());
        app.mode = AppMode::Settings;
        handle_key_event(&mut app, KeyCode::Down);
        assert_eq!(app.selected_setting(), SettingsOption::Quorum);

        handle_key_event(&mut app, KeyCode::Right);
        assert_eq!(app.board.quorum().percent(), 55.0);
        assert_eq!(load_config_from(&path).unwrap().unwrap().quorum_percent, 55.0);
        assert_eq!(app.notification.as_deref(), Some("✅ Setting updated."));
    }

    #[test]
    fn session_can_be_saved_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("votewatch").join("config.json");

        let mut app = app();
        app.config_path = Some(path.clone());
        app.mode = AppMode::Settings;
        handle_key_event(&mut app, KeyCode::Right);
        assert!(app.notification.as_deref().unwrap().contains("session"));

        handle_key_event(&mut app, KeyCode::Char('s'));
        let saved = load_config_from(&path).unwrap().unwrap();
        assert_eq!(saved.refresh_interval_secs, 6);
        assert_eq!(saved.event_slug, "agm");
    }

    #[test]
    fn reset_removes_the_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config_to(&path, &saved()).unwrap();

        let mut app = app();
        app.config_path = Some(path.clone());
        app.mode = AppMode::Settings;
        handle_key_event(&mut app, KeyCode::Char('r'));
        assert!(!path.exists());
        assert!(app.notification.as_deref().unwrap().starts_with("✅"));
    }
}
