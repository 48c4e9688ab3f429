//! In-memory widget model of the results screen.
//!
//! Every chart target owns a progress bar and at most one chart instance.
//! [`Board::apply`] writes into them only when the vote count actually
//! moved; the renderer draws whatever the board currently holds.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ratatui::style::Color;
use serde::Serialize;

use crate::error::ConfigError;
use crate::results::{Palette, PollResponse, TargetKey, VoteAggregate};
use crate::ui::utils::palette_color;

/// Minimum participation above which a result counts as valid, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quorum(f64);

impl Quorum {
    pub fn from_percent(percent: f64) -> Result<Self, ConfigError> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(ConfigError::InvalidQuorum(percent));
        }
        Ok(Quorum(percent))
    }

    pub fn fraction(&self) -> f64 {
        self.0 / 100.0
    }

    pub fn percent(&self) -> f64 {
        self.0
    }

    /// Strictly above: reaching the quorum exactly is not enough.
    pub fn is_reached(&self, fraction: f64) -> bool {
        fraction > self.fraction()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Affirmative,
    Warning,
}

impl Tone {
    pub fn for_fraction(fraction: f64, quorum: Quorum) -> Self {
        if quorum.is_reached(fraction) {
            Tone::Affirmative
        } else {
            Tone::Warning
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressBar {
    pub max: u64,
    pub value: u64,
    pub label: String,
    /// Fill width in percent, always finite.
    pub percent: f64,
    pub tone: Tone,
}

impl ProgressBar {
    fn from_aggregate(aggregate: &VoteAggregate, quorum: Quorum) -> Self {
        let fraction = aggregate.fraction();
        ProgressBar {
            max: aggregate.total_votes,
            value: aggregate.nb_votes,
            label: format!("{} / {}", aggregate.nb_votes, aggregate.total_votes),
            percent: fraction * 100.0,
            tone: Tone::for_fraction(fraction, quorum),
        }
    }

    pub fn ratio(&self) -> f64 {
        (self.percent / 100.0).clamp(0.0, 1.0)
    }

    fn fraction(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.value as f64 / self.max as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartBar {
    pub label: String,
    pub value: f64,
    pub fill: Color,
    pub border: Color,
}

/// A built chart. Dropping it releases its slot in the board's live count.
#[derive(Debug)]
pub struct ChartInstance {
    pub bars: Vec<ChartBar>,
    live: Arc<AtomicUsize>,
}

impl ChartInstance {
    fn build(aggregate: &VoteAggregate, palette: &Palette, live: &Arc<AtomicUsize>) -> Self {
        let bars = aggregate
            .labels
            .iter()
            .zip(&aggregate.values)
            .enumerate()
            .map(|(i, (label, value))| ChartBar {
                label: label.clone(),
                value: *value,
                fill: palette_color(&palette.background, i),
                border: palette_color(&palette.border, i),
            })
            .collect();
        live.fetch_add(1, Ordering::SeqCst);
        ChartInstance {
            bars,
            live: Arc::clone(live),
        }
    }

    pub fn max_value(&self) -> f64 {
        self.bars.iter().map(|b| b.value).fold(0.0, f64::max)
    }
}

impl Drop for ChartInstance {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct ChartTarget {
    pub key: TargetKey,
    pub bar: Option<ProgressBar>,
    pub chart: Option<ChartInstance>,
}

impl ChartTarget {
    fn new(key: TargetKey) -> Self {
        ChartTarget {
            key,
            bar: None,
            chart: None,
        }
    }

    pub fn shown_votes(&self) -> Option<u64> {
        self.bar.as_ref().map(|bar| bar.value)
    }
}

/// JSON view of one target, printed in `--json` mode.
#[derive(Debug, Serialize)]
pub struct TargetSnapshot {
    pub key: TargetKey,
    pub title: String,
    pub nb_votes: u64,
    pub total_votes: u64,
    pub participation_percent: f64,
    pub quorum_reached: bool,
    pub results: Vec<(String, f64)>,
}

pub struct Board {
    quorum: Quorum,
    targets: BTreeMap<TargetKey, ChartTarget>,
    live_charts: Arc<AtomicUsize>,
    redraws: u64,
}

impl Board {
    pub fn new(quorum: Quorum) -> Self {
        Board {
            quorum,
            targets: BTreeMap::new(),
            live_charts: Arc::new(AtomicUsize::new(0)),
            redraws: 0,
        }
    }

    pub fn quorum(&self) -> Quorum {
        self.quorum
    }

    /// Change the quorum and recolour the bars already on screen.
    pub fn set_quorum(&mut self, quorum: Quorum) {
        self.quorum = quorum;
        for bar in self.targets.values_mut().filter_map(|t| t.bar.as_mut()) {
            bar.tone = Tone::for_fraction(bar.fraction(), quorum);
        }
    }

    /// Apply one poll response. Returns the keys whose widgets were rewritten.
    pub fn apply(&mut self, response: &PollResponse) -> Vec<TargetKey> {
        let mut updated = Vec::new();
        for (key, aggregate) in &response.charts {
            let target = self.targets.entry(*key).or_insert_with(|| ChartTarget::new(*key));
            if target.shown_votes() == Some(aggregate.nb_votes) {
                continue;
            }

            target.bar = Some(ProgressBar::from_aggregate(aggregate, self.quorum));
            // Release the old chart before building its replacement.
            target.chart.take();
            target.chart = Some(ChartInstance::build(
                aggregate,
                &response.palette,
                &self.live_charts,
            ));

            self.redraws += 1;
            updated.push(*key);
        }
        updated
    }

    /// Forget every target, as when leaving the page.
    pub fn clear(&mut self) {
        self.targets.clear();
    }

    pub fn targets(&self) -> impl Iterator<Item = &ChartTarget> {
        self.targets.values()
    }

    pub fn target(&self, key: TargetKey) -> Option<&ChartTarget> {
        self.targets.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Number of widget rewrites since the board was created.
    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    pub fn live_charts(&self) -> usize {
        self.live_charts.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<TargetSnapshot> {
        self.targets
            .values()
            .filter_map(|target| {
                let bar = target.bar.as_ref()?;
                Some(TargetSnapshot {
                    key: target.key,
                    title: target.key.title(),
                    nb_votes: bar.value,
                    total_votes: bar.max,
                    participation_percent: (bar.percent * 100.0).round() / 100.0,
                    quorum_reached: bar.tone == Tone::Affirmative,
                    results: target
                        .chart
                        .as_ref()
                        .map(|c| c.bars.iter().map(|b| (b.label.clone(), b.value)).collect())
                        .unwrap_or_default(),
                })
            })
            .collect()
    }
}
