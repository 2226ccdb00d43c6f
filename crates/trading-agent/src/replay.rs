//! Recorded analysis feed.
//!
//! Replays per-symbol technical snapshots and trend assessments from a JSON
//! file so the pipeline can run without a live analysis engine. Each
//! analysis call for a symbol returns its next frame; once the frames run
//! out the last one keeps repeating.

use std::collections::HashMap;
use std::path::Path;

use analysis_core::{
    AnalysisError, MarketContext, TechnicalAnalyzer, TechnicalSnapshot, TrendAssessment,
    TrendClassifier,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One recorded analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub snapshot: TechnicalSnapshot,
    pub trend: TrendAssessment,
}

pub struct SnapshotReplay {
    frames: HashMap<String, Vec<ReplayFrame>>,
    /// Index of the frame last served per symbol
    cursors: Mutex<HashMap<String, usize>>,
}

impl SnapshotReplay {
    pub fn new(frames: HashMap<String, Vec<ReplayFrame>>) -> Result<Self> {
        for (symbol, list) in &frames {
            if list.is_empty() {
                bail!("replay feed has no frames for {}", symbol);
            }
        }
        Ok(Self {
            frames,
            cursors: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let frames: HashMap<String, Vec<ReplayFrame>> =
            serde_json::from_str(json).context("replay feed is not valid JSON")?;
        Self::new(frames)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read replay feed {}", path.display()))?;
        let replay = Self::from_json(&raw)
            .with_context(|| format!("failed to load replay feed {}", path.display()))?;
        tracing::info!(
            "Replay feed loaded from {} ({} symbols)",
            path.display(),
            replay.frames.len()
        );
        Ok(replay)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }

    fn frames_for(&self, symbol: &str) -> Result<&[ReplayFrame], AnalysisError> {
        self.frames
            .get(symbol)
            .map(Vec::as_slice)
            .ok_or_else(|| AnalysisError::InsufficientData(format!("no recorded data for {}", symbol)))
    }
}

#[async_trait]
impl TechnicalAnalyzer for SnapshotReplay {
    async fn get_multi_timeframe_analysis(
        &self,
        symbol: &str,
        _context: &MarketContext,
    ) -> Result<TechnicalSnapshot, AnalysisError> {
        let frames = self.frames_for(symbol)?;
        let mut cursors = self.cursors.lock().await;
        let index = match cursors.get(symbol) {
            Some(&i) => (i + 1).min(frames.len() - 1),
            None => 0,
        };
        cursors.insert(symbol.to_string(), index);
        Ok(frames[index].snapshot.clone())
    }
}

#[async_trait]
impl TrendClassifier for SnapshotReplay {
    /// Trend recorded alongside the frame most recently served for `symbol`
    async fn analyze_primary_trend(
        &self,
        symbol: &str,
        _snapshot: &TechnicalSnapshot,
    ) -> Result<TrendAssessment, AnalysisError> {
        let frames = self.frames_for(symbol)?;
        let index = self.cursors.lock().await.get(symbol).copied().unwrap_or(0);
        Ok(frames[index].trend.clone())
    }
}
