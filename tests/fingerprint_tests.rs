use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use waf_evader::waf::{
    fingerprint_many, FingerprintEngine, ProbeResponse, ProbeTransport, WafType, ACCEPTANCE_THRESHOLD,
    DEFAULT_PROBES,
};
use waf_evader::EvasionError;

/// Answers the bare target with `baseline` and every probe URL with `probe`.
/// Probe names listed in `failing` error out instead.
struct MockTransport {
    baseline: Option<ProbeResponse>,
    probe: ProbeResponse,
    failing: Vec<&'static str>,
    calls: AtomicUsize,
}

impl MockTransport {
    fn new(baseline: ProbeResponse, probe: ProbeResponse) -> Self {
        Self {
            baseline: Some(baseline),
            probe,
            failing: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProbeTransport for MockTransport {
    async fn fetch(&self, url: &str) -> waf_evader::Result<ProbeResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !url.contains('?') {
            return self.baseline.clone().ok_or_else(|| EvasionError::Request {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        let failing = DEFAULT_PROBES
            .iter()
            .filter(|p| self.failing.contains(&p.name))
            .any(|p| url.contains(&format!("{}=", p.parameter)));
        if failing {
            return Err(EvasionError::Request {
                url: url.to_string(),
                reason: "timed out after 5000ms".to_string(),
            });
        }
        Ok(self.probe.clone())
    }
}

fn response(status: u16, headers: &[(&str, &str)], body: &str) -> ProbeResponse {
    ProbeResponse {
        status,
        headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        body: body.to_string(),
    }
}

fn cloudflare_transport() -> MockTransport {
    MockTransport::new(
        response(200, &[("server", "cloudflare")], "<html>welcome</html>"),
        response(
            403,
            &[("server", "cloudflare"), ("cf-ray", "8a1b2c3d4e5f-AMS")],
            "<title>Attention Required! | Cloudflare</title>",
        ),
    )
}

#[tokio::test]
async fn test_cloudflare_is_classified() {
    let engine = FingerprintEngine::new(Arc::new(cloudflare_transport()));
    let fp = engine.fingerprint("https://shop.example.com/").await.unwrap();

    assert_eq!(fp.waf_type, WafType::Cloudflare);
    assert!(fp.confidence >= ACCEPTANCE_THRESHOLD);
    assert!(fp.confidence <= 1.0);
    assert!(fp.evidence.iter().any(|e| e.contains("cloudflare")));
    assert!(fp.evidence.iter().any(|e| e.contains("attention required")));
    assert_eq!(fp.status_codes[0], 200);
    assert!(fp.status_codes[1..].iter().all(|s| *s == 403));
    assert_eq!(fp.behavior.status_changes, DEFAULT_PROBES.len());
    assert_eq!(fp.probes_failed, 0);
}

#[tokio::test]
async fn test_plain_site_is_unknown() {
    let transport = MockTransport::new(
        response(200, &[("server", "nginx")], "hello"),
        response(200, &[("server", "nginx")], "hello"),
    );
    let fp = FingerprintEngine::new(Arc::new(transport))
        .fingerprint("http://plain.example.com")
        .await
        .unwrap();
    assert_eq!(fp.waf_type, WafType::Unknown);
    assert!(fp.confidence <= ACCEPTANCE_THRESHOLD);
    assert!(!fp.behavior.status_changed());
}

#[tokio::test]
async fn test_terminal_state_is_consistent() {
    let cases = vec![
        cloudflare_transport(),
        MockTransport::new(response(200, &[], ""), response(200, &[], "")),
        MockTransport::new(response(200, &[], ""), response(406, &[], "Not Acceptable")),
        MockTransport::new(response(200, &[("x-iinfo", "1")], ""), response(403, &[], "")),
    ];
    for transport in cases {
        let fp = FingerprintEngine::new(Arc::new(transport))
            .fingerprint("http://t.example.com")
            .await
            .unwrap();
        if fp.waf_type == WafType::Unknown {
            assert!(fp.confidence <= ACCEPTANCE_THRESHOLD);
        } else {
            assert!(fp.confidence > ACCEPTANCE_THRESHOLD);
        }
        assert!((0.0..=1.0).contains(&fp.confidence));
    }
}

#[tokio::test]
async fn test_baseline_failure_is_fatal() {
    let mut transport = cloudflare_transport();
    transport.baseline = None;
    let err = FingerprintEngine::new(Arc::new(transport))
        .fingerprint("http://down.example.com")
        .await
        .unwrap_err();
    assert!(err.is_fatal_network());
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_probe_failures_are_tolerated() {
    let mut transport = cloudflare_transport();
    transport.failing = vec!["xss", "sqli"];
    let transport = Arc::new(transport);
    let fp = FingerprintEngine::new(transport.clone())
        .fingerprint("https://shop.example.com")
        .await
        .unwrap();

    assert_eq!(fp.probes_failed, 2);
    assert_eq!(fp.probes_sent, DEFAULT_PROBES.len());
    assert_eq!(fp.status_codes.len(), 1 + DEFAULT_PROBES.len() - 2);
    assert_eq!(fp.waf_type, WafType::Cloudflare);
    assert!(!fp.evidence.iter().any(|e| e.starts_with("Probe xss") || e.starts_with("Probe sqli")));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1 + DEFAULT_PROBES.len());
}

#[tokio::test]
async fn test_invalid_target_sends_nothing() {
    let transport = Arc::new(cloudflare_transport());
    let err = FingerprintEngine::new(transport.clone())
        .fingerprint("ftp://files.example.com")
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rate_limited_behavior() {
    let transport = MockTransport::new(
        response(200, &[], "ok"),
        response(429, &[], "Too many requests: rate limit exceeded"),
    );
    let fp = FingerprintEngine::new(Arc::new(transport))
        .fingerprint("http://busy.example.com")
        .await
        .unwrap();
    assert!(fp.behavior.rate_limited);
    assert_eq!(fp.behavior.blocked_probes, DEFAULT_PROBES.len());
}

#[tokio::test]
async fn test_many_targets_keep_their_own_results() {
    let engine = Arc::new(FingerprintEngine::new(Arc::new(cloudflare_transport())));
    let targets = vec![
        "https://a.example.com".to_string(),
        "not a url".to_string(),
        "https://b.example.com".to_string(),
    ];
    let results: HashMap<String, _> = fingerprint_many(engine, targets, 2).await.into_iter().collect();

    assert_eq!(results.len(), 3);
    assert_eq!(results["https://a.example.com"].as_ref().unwrap().waf_type, WafType::Cloudflare);
    assert_eq!(results["https://b.example.com"].as_ref().unwrap().waf_type, WafType::Cloudflare);
    assert!(results["not a url"].is_err());
}
