//! Wire schema of the chart-data endpoint.
//!
//! The server answers one request with every chart of a question at once:
//!
//! ```json
//! {
//!   "chart_data": {
//!     "global": {"nb_votes": 6, "total_votes": 10, "labels": ["A", "B"], "values": [4, 2]},
//!     "chart1": {"nb_votes": 2, "total_votes": 4, "labels": ["A", "B"], "values": [2, 0]}
//!   },
//!   "nb_charts": 1,
//!   "backgroundColor": ["rgba(255, 99, 132, 0.2)"],
//!   "borderColor": ["rgba(255, 99, 132, 1)"]
//! }
//! ```
//!
//! Bodies are decoded into [`WireResponse`] and then validated into a
//! [`PollResponse`]; nothing downstream ever sees an unvalidated aggregate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::PollError;

const GROUP_PREFIX: &str = "chart";

/// Addresses one chart inside a batched response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetKey {
    /// Aggregate over every voter group of the event.
    Global,
    /// One voter group, numbered from 1.
    Group(u32),
}

impl TargetKey {
    pub fn title(&self) -> String {
        match self {
            TargetKey::Global => "Global results".to_string(),
            TargetKey::Group(n) => format!("Group {}", n),
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKey::Global => f.write_str("global"),
            TargetKey::Group(n) => write!(f, "{}{}", GROUP_PREFIX, n),
        }
    }
}

impl FromStr for TargetKey {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(TargetKey::Global);
        }
        s.strip_prefix(GROUP_PREFIX)
            .filter(|n| !n.starts_with('+'))
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .map(TargetKey::Group)
            .ok_or_else(|| PollError::Invalid(format!("unknown chart key '{}'", s)))
    }
}

impl Serialize for TargetKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Vote tally of one chart target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteAggregate {
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default)]
    pub nb_votes: u64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<f64>,
}

impl VoteAggregate {
    /// Participation as a fraction in `[0, 1]`. An empty electorate counts as 0.
    pub fn fraction(&self) -> f64 {
        if self.total_votes == 0 {
            0.0
        } else {
            self.nb_votes as f64 / self.total_votes as f64
        }
    }

    fn validate(&self, key: TargetKey) -> Result<(), PollError> {
        if self.labels.len() != self.values.len() {
            return Err(PollError::Invalid(format!(
                "{}: {} labels but {} values",
                key,
                self.labels.len(),
                self.values.len()
            )));
        }
        if let Some(bad) = self.values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(PollError::Invalid(format!("{}: value {} is not a vote count", key, bad)));
        }
        if self.nb_votes > self.total_votes {
            return Err(PollError::Invalid(format!(
                "{}: {} votes cast out of {} possible",
                key, self.nb_votes, self.total_votes
            )));
        }
        Ok(())
    }
}

/// Colours shared by every chart, one per label slot, as CSS colour strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    pub background: Vec<String>,
    pub border: Vec<String>,
}

/// The body exactly as the server sends it.
#[derive(Debug, Deserialize)]
pub struct WireResponse {
    pub chart_data: BTreeMap<String, VoteAggregate>,
    #[serde(default)]
    pub nb_charts: Option<u32>,
    #[serde(default, rename = "backgroundColor")]
    pub background_color: Vec<String>,
    #[serde(default, rename = "borderColor")]
    pub border_color: Vec<String>,
}

/// A validated poll response.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResponse {
    pub charts: BTreeMap<TargetKey, VoteAggregate>,
    pub palette: Palette,
}

impl PollResponse {
    pub fn parse(body: &[u8]) -> Result<Self, PollError> {
        let wire: WireResponse = serde_json::from_slice(body)?;
        Self::from_wire(wire)
    }

    pub fn from_wire(wire: WireResponse) -> Result<Self, PollError> {
        let mut charts = BTreeMap::new();
        for (raw_key, aggregate) in wire.chart_data {
            let key: TargetKey = raw_key.parse()?;
            aggregate.validate(key)?;
            charts.insert(key, aggregate);
        }

        if let Some(nb_charts) = wire.nb_charts {
            let missing = (1..=nb_charts).find(|n| !charts.contains_key(&TargetKey::Group(*n)));
            if let Some(missing) = missing {
                return Err(PollError::Invalid(format!(
                    "nb_charts is {} but {} is missing",
                    nb_charts,
                    TargetKey::Group(missing)
                )));
            }
        }

        Ok(PollResponse {
            charts,
            palette: Palette {
                background: wire.background_color,
                border: wire.border_color,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "chart_data": {
            "global": {"nb_votes": 6, "total_votes": 10, "labels": ["A", "B"], "values": [4, 2]},
            "chart1": {"nb_votes": 2, "total_votes": 4, "labels": ["A", "B"], "values": [1.5, 0.5]}
        },
        "nb_charts": 1,
        "backgroundColor": ["rgba(255, 99, 132, 0.2)", "rgba(54, 162, 235, 0.2)"],
        "borderColor": ["rgba(255, 99, 132, 1)", "rgba(54, 162, 235, 1)"]
    }"#;

    #[test]
    fn target_keys_parse_and_print() {
        assert_eq!("global".parse::<TargetKey>().unwrap(), TargetKey::Global);
        assert_eq!("chart12".parse::<TargetKey>().unwrap(), TargetKey::Group(12));
        assert_eq!(TargetKey::Group(3).to_string(), "chart3");
        assert!("chart0".parse::<TargetKey>().is_err());
        assert!("chart".parse::<TargetKey>().is_err());
        assert!("chart+1".parse::<TargetKey>().is_err());
        assert!("groups".parse::<TargetKey>().is_err());
    }

    #[test]
    fn global_sorts_before_groups() {
        let mut keys = vec![TargetKey::Group(2), TargetKey::Global, TargetKey::Group(1)];
        keys.sort();
        assert_eq!(keys, vec![TargetKey::Global, TargetKey::Group(1), TargetKey::Group(2)]);
    }

    #[test]
    fn parses_nested_response() {
        let response = PollResponse::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(response.charts.len(), 2);

        let global = &response.charts[&TargetKey::Global];
        assert_eq!(global.nb_votes, 6);
        assert_eq!(global.total_votes, 10);
        assert_eq!(global.labels, vec!["A", "B"]);
        assert_eq!(global.values, vec![4.0, 2.0]);

        assert_eq!(response.charts[&TargetKey::Group(1)].values, vec![1.5, 0.5]);
        assert_eq!(response.palette.background.len(), 2);
        assert_eq!(response.palette.border[1], "rgba(54, 162, 235, 1)");
    }

    #[test]
    fn missing_counts_default_to_zero() {
        let body = r#"{"chart_data": {"global": {"labels": [], "values": []}}}"#;
        let response = PollResponse::parse(body.as_bytes()).unwrap();
        let global = &response.charts[&TargetKey::Global];
        assert_eq!(global.total_votes, 0);
        assert_eq!(global.nb_votes, 0);
        assert_eq!(global.fraction(), 0.0);
        assert!(response.palette.background.is_empty());
    }

    #[test]
    fn rejects_mismatched_labels_and_values() {
        let body = r#"{"chart_data": {"global":
            {"nb_votes": 1, "total_votes": 2, "labels": ["A"], "values": [1, 0]}}}"#;
        let err = PollResponse::parse(body.as_bytes()).unwrap_err();
        assert!(matches!(err, PollError::Invalid(_)));
    }

    #[test]
    fn rejects_more_votes_than_voters() {
        let body = r#"{"chart_data": {"global":
            {"nb_votes": 11, "total_votes": 10, "labels": [], "values": []}}}"#;
        assert!(matches!(PollResponse::parse(body.as_bytes()), Err(PollError::Invalid(_))));
    }

    #[test]
    fn rejects_negative_values() {
        let body = r#"{"chart_data": {"global":
            {"nb_votes": 1, "total_votes": 1, "labels": ["A"], "values": [-1]}}}"#;
        assert!(matches!(PollResponse::parse(body.as_bytes()), Err(PollError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_keys() {
        let body = r#"{"chart_data": {"summary": {"nb_votes": 0, "total_votes": 0}}}"#;
        assert!(matches!(PollResponse::parse(body.as_bytes()), Err(PollError::Invalid(_))));
    }

    #[test]
    fn rejects_missing_group_announced_by_nb_charts() {
        let body = r#"{"chart_data": {"global": {}, "chart1": {}}, "nb_charts": 2}"#;
        let err = PollResponse::parse(body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("chart2"));
    }

    #[test]
    fn wrong_types_are_decode_errors() {
        let body = r#"{"chart_data": {"global": {"nb_votes": "six"}}}"#;
        assert!(matches!(PollResponse::parse(body.as_bytes()), Err(PollError::Decode(_))));
        assert!(matches!(PollResponse::parse(b"<html>"), Err(PollError::Decode(_))));
    }
}
