use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Wall time of a single pipeline stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Per-stage timings for one analysis.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming::new(label, elapsed_ms));
    }

    /// Append every stage of `other`, prefixing its labels.
    pub fn extend_prefixed(&mut self, prefix: &str, other: &TimingBreakdown) {
        for stage in &other.stages {
            self.push(format!("{prefix}.{}", stage.label), stage.elapsed_ms);
        }
    }

    pub fn stage_ms(&self, label: &str) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.elapsed_ms)
    }
}

/// Lap timer feeding a [`TimingBreakdown`].
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    lap: Instant,
    timings: TimingBreakdown,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

impl Stopwatch {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            lap: now,
            timings: TimingBreakdown::default(),
        }
    }

    /// Record the time since the previous lap under `label`.
    pub fn lap(&mut self, label: &str) -> f64 {
        let now = Instant::now();
        let ms = now.duration_since(self.lap).as_secs_f64() * 1000.0;
        self.lap = now;
        self.timings.push(label, ms);
        ms
    }

    pub fn finish(mut self) -> TimingBreakdown {
        self.timings.total_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        self.timings
    }
}
