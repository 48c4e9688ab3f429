use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use clap::Parser;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::board::Quorum;
use crate::error::ConfigError;
use crate::poller::PollQuery;

pub const DEFAULT_QUORUM_PERCENT: f64 = 50.0;
pub const DEFAULT_INTERVAL_SECS: u64 = 5;
pub const MIN_INTERVAL_SECS: u64 = 1;
pub const MAX_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("static slug pattern"));

#[derive(Parser)]
#[command(name = "votewatch", version, about = "Live terminal dashboard for vote results")]
pub struct Cli {
    /// Chart-data endpoint, e.g. https://vote.example.org/polls/get_chart_data/
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Company slug, sent as `comp_slug`
    #[arg(long)]
    pub comp: Option<String>,
    /// Event slug
    #[arg(long)]
    pub event: Option<String>,
    /// Question number to watch (from 1)
    #[arg(long)]
    pub question: Option<u32>,
    /// Number of questions in the event, bounds question navigation
    #[arg(long)]
    pub questions: Option<u32>,
    /// Quorum as a percentage of the electorate
    #[arg(long)]
    pub quorum: Option<f64>,
    /// Auto-refresh period in seconds
    #[arg(long)]
    pub interval: Option<u64>,
    /// HTTP timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
    /// Fetch once and print the results as JSON
    #[arg(long)]
    pub json: bool,
    /// Start with auto-refresh switched on
    #[arg(long)]
    pub auto: bool,
    /// Forget the saved configuration and exit
    #[arg(long)]
    pub reset: bool,
    /// Where to write logs in TUI mode
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// True when nothing on the command line says what to watch.
    pub fn is_bare(&self) -> bool {
        self.endpoint.is_none() && self.event.is_none()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SavedConfig {
    pub endpoint: String,
    #[serde(default)]
    pub comp_slug: Option<String>,
    pub event_slug: String,
    #[serde(default = "default_question")]
    pub question_no: u32,
    #[serde(default)]
    pub question_count: Option<u32>,
    #[serde(default = "default_quorum")]
    pub quorum_percent: f64,
    #[serde(default = "default_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub auto_refresh: bool,
}

fn default_question() -> u32 {
    1
}

fn default_quorum() -> f64 {
    DEFAULT_QUORUM_PERCENT
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("votewatch").join("config.json"))
}

/// Load the saved configuration, if any. A corrupt file is logged and ignored.
pub fn load_config() -> Option<SavedConfig> {
    let path = config_path()?;
    match load_config_from(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("ignoring saved configuration: {}", e);
            None
        }
    }
}

pub fn load_config_from(path: &Path) -> Result<Option<SavedConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn save_config(config: &SavedConfig) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_config_to(&path, config)
}

pub fn save_config_to(path: &Path, config: &SavedConfig) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).map_err(io_err)
}

/// Delete the saved configuration. Returns whether there was one.
pub fn reset_config() -> Result<bool, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    reset_config_at(&path)
}

pub fn reset_config_at(path: &Path) -> Result<bool, ConfigError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn validate_slug(slug: &str) -> Result<(), ConfigError> {
    if SLUG.is_match(slug) {
        Ok(())
    } else {
        Err(ConfigError::InvalidSlug(slug.to_string()))
    }
}

pub fn validate_interval(secs: u64) -> Result<Duration, ConfigError> {
    if (MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&secs) {
        Ok(Duration::from_secs(secs))
    } else {
        Err(ConfigError::InvalidInterval(secs))
    }
}

/// Everything one monitoring session needs, after flags and saved settings are merged.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub endpoint: String,
    pub query: PollQuery,
    pub question_count: Option<u32>,
    pub quorum: Quorum,
    pub interval: Duration,
    pub timeout: Duration,
    pub auto_refresh: bool,
}

impl MonitorSettings {
    /// Command-line flags win over the saved configuration.
    pub fn resolve(cli: &Cli, saved: Option<&SavedConfig>) -> Result<Self, ConfigError> {
        let endpoint = cli
            .endpoint
            .clone()
            .or_else(|| saved.map(|s| s.endpoint.clone()))
            .filter(|e| !e.trim().is_empty())
            .ok_or(ConfigError::Missing("endpoint"))?;
        let event_slug = cli
            .event
            .clone()
            .or_else(|| saved.map(|s| s.event_slug.clone()))
            .ok_or(ConfigError::Missing("event"))?;
        validate_slug(&event_slug)?;

        let comp_slug = cli.comp.clone().or_else(|| saved.and_then(|s| s.comp_slug.clone()));
        if let Some(comp) = &comp_slug {
            validate_slug(comp)?;
        }

        let question_no = cli.question.or(saved.map(|s| s.question_no)).unwrap_or(1);
        if question_no == 0 {
            return Err(ConfigError::InvalidQuestion);
        }
        let question_count = cli.questions.or(saved.and_then(|s| s.question_count));

        let quorum = Quorum::from_percent(
            cli.quorum
                .or(saved.map(|s| s.quorum_percent))
                .unwrap_or(DEFAULT_QUORUM_PERCENT),
        )?;
        let interval = validate_interval(
            cli.interval
                .or(saved.map(|s| s.refresh_interval_secs))
                .unwrap_or(DEFAULT_INTERVAL_SECS),
        )?;

        Ok(MonitorSettings {
            endpoint,
            query: PollQuery {
                comp_slug,
                event_slug,
                question_no,
            },
            question_count,
            quorum,
            interval,
            timeout: Duration::from_secs(cli.timeout.max(1)),
            auto_refresh: cli.auto || saved.is_some_and(|s| s.auto_refresh),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("votewatch").chain(args.iter().copied()))
    }

    fn saved() -> SavedConfig {
        SavedConfig {
            endpoint: "http://localhost:8000/polls/get_chart_data/".to_string(),
            comp_slug: Some("acme".to_string()),
            event_slug: "agm-2024".to_string(),
            question_no: 2,
            question_count: Some(4),
            quorum_percent: 33.0,
            refresh_interval_secs: 3,
            auto_refresh: true,
        }
    }

    #[test]
    fn saved_config_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        assert_eq!(load_config_from(&path).unwrap(), None);
        save_config_to(&path, &saved()).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), Some(saved()));

        assert!(reset_config_at(&path).unwrap());
        assert!(!reset_config_at(&path).unwrap());
        assert_eq!(load_config_from(&path).unwrap(), None);
    }

    #[test]
    fn corrupt_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Corrupt(_))));
    }

    #[test]
    fn older_configs_get_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"endpoint": "http://x/", "event_slug": "agm"}"#).unwrap();
        let config = load_config_from(&path).unwrap().unwrap();
        assert_eq!(config.question_no, 1);
        assert_eq!(config.quorum_percent, DEFAULT_QUORUM_PERCENT);
        assert_eq!(config.refresh_interval_secs, DEFAULT_INTERVAL_SECS);
        assert!(!config.auto_refresh);
    }

    #[test]
    fn flags_override_saved_settings() {
        let args = cli(&["--event", "board-vote", "--question", "5", "--quorum", "75"]);
        let settings = MonitorSettings::resolve(&args, Some(&saved())).unwrap();
        assert_eq!(settings.endpoint, saved().endpoint);
        assert_eq!(settings.query.event_slug, "board-vote");
        assert_eq!(settings.query.comp_slug.as_deref(), Some("acme"));
        assert_eq!(settings.query.question_no, 5);
        assert_eq!(settings.quorum.fraction(), 0.75);
        assert_eq!(settings.interval, Duration::from_secs(3));
        assert_eq!(settings.question_count, Some(4));
        assert!(settings.auto_refresh);
    }

    #[test]
    fn flags_alone_are_enough() {
        let args = cli(&["--endpoint", "http://x/polls/get_chart_data/", "--event", "agm"]);
        let settings = MonitorSettings::resolve(&args, None).unwrap();
        assert_eq!(settings.query.question_no, 1);
        assert_eq!(settings.query.comp_slug, None);
        assert_eq!(settings.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(!settings.auto_refresh);
    }

    #[test]
    fn missing_event_is_reported() {
        let args = cli(&["--endpoint", "http://x/"]);
        assert!(matches!(
            MonitorSettings::resolve(&args, None),
            Err(ConfigError::Missing("event"))
        ));
    }

    #[test]
    fn bad_values_are_rejected() {
        let base = ["--endpoint", "http://x/", "--event"];
        let with = |extra: &[&str]| {
            let mut args: Vec<&str> = base.to_vec();
            args.extend_from_slice(extra);
            MonitorSettings::resolve(&cli(&args), None)
        };
        assert!(matches!(with(&["agm 2024"]), Err(ConfigError::InvalidSlug(_))));
        assert!(matches!(with(&["agm", "--comp", "a/b"]), Err(ConfigError::InvalidSlug(_))));
        assert!(matches!(with(&["agm", "--quorum", "120"]), Err(ConfigError::InvalidQuorum(_))));
        assert!(matches!(with(&["agm", "--interval", "0"]), Err(ConfigError::InvalidInterval(0))));
        assert!(matches!(with(&["agm", "--question", "0"]), Err(ConfigError::InvalidQuestion)));
    }

    #[test]
    fn slugs_allow_letters_digits_dashes_and_underscores() {
        assert!(validate_slug("agm-2024_final").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("ag m").is_err());
        assert!(validate_slug("é").is_err());
    }
}
