//! Fingerprint run for one target: baseline, then probes, then scoring.
//!
//! The baseline must succeed; probes may fail individually and only reduce
//! the evidence available to the classifier.

use std::sync::Arc;

use url::Url;

use super::detector::{classify, ProbeObservation, WafFingerprint};
use super::signatures::{load_signatures, WafSignature};
use super::transport::{HttpTransport, ProbeTransport};
use crate::concurrent::ConcurrentProbe;
use crate::error::{EvasionError, Result};

/// A malicious-looking request sent in a query parameter.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub name: &'static str,
    pub parameter: &'static str,
    pub payload: &'static str,
}

pub const DEFAULT_PROBES: &[Probe] = &[
    Probe { name: "xss", parameter: "q", payload: "<script>alert(1)</script>" },
    Probe { name: "sqli", parameter: "id", payload: "1' OR '1'='1' UNION SELECT NULL--" },
    Probe { name: "cmd", parameter: "cmd", payload: ";cat /etc/passwd" },
    Probe { name: "path", parameter: "file", payload: "../../../../etc/passwd" },
    Probe { name: "xxe", parameter: "xml", payload: "<!DOCTYPE x [<!ENTITY e SYSTEM \"file:///etc/passwd\">]><x>&e;</x>" },
];

#[derive(Clone)]
pub struct FingerprintEngine {
    transport: Arc<dyn ProbeTransport>,
    signatures: Arc<Vec<WafSignature>>,
    probes: Vec<Probe>,
}

impl FingerprintEngine {
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self {
            transport,
            signatures: load_signatures(),
            probes: DEFAULT_PROBES.to_vec(),
        }
    }

    /// Engine over real HTTP with a per-request timeout.
    pub fn http(timeout_secs: u64) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(timeout_secs)?)))
    }

    pub fn with_signatures(mut self, signatures: Arc<Vec<WafSignature>>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn with_probes(mut self, probes: Vec<Probe>) -> Self {
        self.probes = probes;
        self
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub async fn fingerprint(&self, target: &str) -> Result<WafFingerprint> {
        let base = parse_target(target)?;

        tracing::debug!(target = target, "fingerprint: sending baseline");
        let baseline = self
            .transport
            .fetch(base.as_str())
            .await
            .map_err(|e| EvasionError::BaselineFailed {
                url: target.to_string(),
                reason: failure_reason(e),
            })?;
        tracing::debug!(status = baseline.status, "fingerprint: baseline captured");

        let mut observations = Vec::with_capacity(self.probes.len());
        let mut failed = 0usize;
        for probe in &self.probes {
            let url = probe_url(&base, probe);
            match self.transport.fetch(url.as_str()).await {
                Ok(response) => {
                    tracing::debug!(probe = probe.name, status = response.status, "probe captured");
                    observations.push(ProbeObservation {
                        probe: probe.name.to_string(),
                        response,
                    });
                }
                Err(e) => {
                    tracing::warn!(probe = probe.name, "probe failed, skipping its evidence: {}", e);
                    failed += 1;
                }
            }
        }
        tracing::debug!(captured = observations.len(), failed, "fingerprint: probes captured");

        let fingerprint = classify(&self.signatures, &baseline, &observations, failed);
        if fingerprint.is_classified() {
            tracing::info!(target = target, waf = %fingerprint.waf_type, confidence = fingerprint.confidence, "WAF classified");
        } else {
            tracing::info!(target = target, confidence = fingerprint.confidence, "no WAF signature matched");
        }
        Ok(fingerprint)
    }
}

/// Fingerprints independent targets concurrently. Each target keeps its own
/// result; results follow completion order.
pub async fn fingerprint_many(
    engine: Arc<FingerprintEngine>,
    targets: Vec<String>,
    concurrency: usize,
) -> Vec<(String, Result<WafFingerprint>)> {
    let executor = ConcurrentProbe::new(concurrency);
    let results = executor
        .execute(targets, move |target: String| {
            let engine = engine.clone();
            async move {
                let result = engine.fingerprint(&target).await;
                (target, result)
            }
        })
        .await;

    let (completed, errors) = executor.get_stats();
    tracing::debug!(completed, errors, "multi-target fingerprint finished");
    results.into_iter().flatten().collect()
}

/// Accepts only absolute http(s) URLs.
pub fn parse_target(target: &str) -> Result<Url> {
    let url = Url::parse(target).map_err(|e| EvasionError::InvalidTarget {
        url: target.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EvasionError::InvalidTarget {
            url: target.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn probe_url(base: &Url, probe: &Probe) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair(probe.parameter, probe.payload);
    url
}

fn failure_reason(err: EvasionError) -> String {
    match err {
        EvasionError::Request { reason, .. } => reason,
        other => other.to_string(),
    }
}
