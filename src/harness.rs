//! Seam to the external request harness: where a variant is injected, what
//! comes back, and per-technique bypass statistics.

use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::assembly::AssembledVariants;
use crate::error::{EvasionError, Result};
use crate::registry::TechniqueId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum InjectionPoint {
    Query(String),
    Header(String),
    Body(String),
    Path,
}

impl fmt::Display for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionPoint::Query(name) => write!(f, "query:{}", name),
            InjectionPoint::Header(name) => write!(f, "header:{}", name),
            InjectionPoint::Body(name) => write!(f, "body:{}", name),
            InjectionPoint::Path => f.write_str("path"),
        }
    }
}

/// Parses `query:<name>`, `header:<name>`, `body:<name>` or `path`.
impl FromStr for InjectionPoint {
    type Err = EvasionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("path") {
            return Ok(InjectionPoint::Path);
        }
        let invalid = || EvasionError::InvalidConfig(format!("invalid injection point: {}", s));
        let (kind, name) = s.split_once(':').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }
        match kind.to_lowercase().as_str() {
            "query" => Ok(InjectionPoint::Query(name.to_string())),
            "header" => Ok(InjectionPoint::Header(name.to_string())),
            "body" => Ok(InjectionPoint::Body(name.to_string())),
            _ => Err(invalid()),
        }
    }
}

/// What the harness reports back for one sent variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessOutcome {
    pub status_code: u16,
    pub blocked: bool,
    pub response_time_ms: u64,
    pub injection_point: InjectionPoint,
}

/// Sends one variant to a target. Retry and backoff belong to the
/// implementation.
#[async_trait]
pub trait RequestHarness: Send + Sync {
    async fn send(&self, target: &str, variant: &str, point: &InjectionPoint) -> Result<HarnessOutcome>;
}

/// Sends every variant in technique order, one at a time. Failed sends are
/// logged and left out.
pub async fn send_all(
    harness: &dyn RequestHarness,
    target: &str,
    point: &InjectionPoint,
    assembled: &AssembledVariants,
) -> Vec<(TechniqueId, HarnessOutcome)> {
    let mut outcomes = Vec::with_capacity(assembled.total_variants());
    for entry in assembled.iter() {
        for variant in &entry.variants {
            match harness.send(target, variant, point).await {
                Ok(outcome) => outcomes.push((entry.technique, outcome)),
                Err(e) => tracing::warn!(technique = %entry.technique, "harness send failed: {}", e),
            }
        }
    }
    outcomes
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueSummary {
    pub technique: TechniqueId,
    pub sent: usize,
    pub blocked: usize,
    pub passed: usize,
    pub avg_response_ms: f64,
}

impl TechniqueSummary {
    /// Share of sent variants that were not blocked.
    pub fn bypass_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.passed as f64 / self.sent as f64
        }
    }
}

/// Per-technique counts, in order of first appearance.
pub fn summarize_outcomes<'a, I>(outcomes: I) -> Vec<TechniqueSummary>
where
    I: IntoIterator<Item = &'a (TechniqueId, HarnessOutcome)>,
{
    let mut index: AHashMap<TechniqueId, usize> = AHashMap::new();
    let mut summaries: Vec<TechniqueSummary> = Vec::new();
    let mut total_ms: Vec<u64> = Vec::new();

    for (technique, outcome) in outcomes {
        let i = *index.entry(*technique).or_insert_with(|| {
            summaries.push(TechniqueSummary {
                technique: *technique,
                sent: 0,
                blocked: 0,
                passed: 0,
                avg_response_ms: 0.0,
            });
            total_ms.push(0);
            summaries.len() - 1
        });
        let s = &mut summaries[i];
        s.sent += 1;
        if outcome.blocked {
            s.blocked += 1;
        } else {
            s.passed += 1;
        }
        total_ms[i] += outcome.response_time_ms;
    }

    for (s, ms) in summaries.iter_mut().zip(total_ms) {
        s.avg_response_ms = ms as f64 / s.sent as f64;
    }
    summaries
}
