use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::signatures::WafSignature;
use super::transport::ProbeResponse;
use crate::error::EvasionError;

/// Scores above this classify; anything at or below is `Unknown`.
pub const ACCEPTANCE_THRESHOLD: f64 = 0.3;

const HEADER_WEIGHT: f64 = 0.3;
const BASELINE_CONTENT_WEIGHT: f64 = 0.2;
const PROBE_CONTENT_WEIGHT: f64 = 0.3;
const STATUS_WEIGHT: f64 = 0.2;

const LARGE_ERROR_BODY: usize = 5000;
const RATE_LIMIT_MIN_RESPONSES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WafType {
    Cloudflare,
    Imperva,
    Akamai,
    F5BigIP,
    ModSecurity,
    AwsWaf,
    AzureWaf,
    Sucuri,
    Wordfence,
    Barracuda,
    Fortiweb,
    Wallarm,
    Unknown,
}

impl WafType {
    pub const ALL: [WafType; 13] = [
        WafType::Cloudflare,
        WafType::Imperva,
        WafType::Akamai,
        WafType::F5BigIP,
        WafType::ModSecurity,
        WafType::AwsWaf,
        WafType::AzureWaf,
        WafType::Sucuri,
        WafType::Wordfence,
        WafType::Barracuda,
        WafType::Fortiweb,
        WafType::Wallarm,
        WafType::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WafType::Cloudflare => "Cloudflare",
            WafType::Imperva => "Imperva Incapsula",
            WafType::Akamai => "Akamai Kona Site Defender",
            WafType::F5BigIP => "F5 BIG-IP ASM",
            WafType::ModSecurity => "ModSecurity",
            WafType::AwsWaf => "AWS WAF",
            WafType::AzureWaf => "Azure WAF",
            WafType::Sucuri => "Sucuri CloudProxy",
            WafType::Wordfence => "Wordfence",
            WafType::Barracuda => "Barracuda WAF",
            WafType::Fortiweb => "Fortinet FortiWeb",
            WafType::Wallarm => "Wallarm",
            WafType::Unknown => "Unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, WafType::Unknown)
    }
}

impl fmt::Display for WafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WafType {
    type Err = EvasionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['_', ' '], "-");
        let waf = match key.as_str() {
            "cloudflare" => WafType::Cloudflare,
            "imperva" | "incapsula" | "imperva-incapsula" => WafType::Imperva,
            "akamai" | "kona" => WafType::Akamai,
            "f5" | "f5-bigip" | "bigip" | "big-ip" | "f5bigip" => WafType::F5BigIP,
            "modsecurity" | "modsec" | "mod-security" => WafType::ModSecurity,
            "aws" | "aws-waf" | "awswaf" => WafType::AwsWaf,
            "azure" | "azure-waf" | "azurewaf" => WafType::AzureWaf,
            "sucuri" => WafType::Sucuri,
            "wordfence" => WafType::Wordfence,
            "barracuda" => WafType::Barracuda,
            "fortiweb" | "fortinet" => WafType::Fortiweb,
            "wallarm" => WafType::Wallarm,
            "unknown" | "generic" => WafType::Unknown,
            _ => return Err(EvasionError::InvalidConfig(format!("unknown WAF type: {}", s))),
        };
        Ok(waf)
    }
}

/// A probe response tagged with the probe that produced it.
#[derive(Debug, Clone)]
pub struct ProbeObservation {
    pub probe: String,
    pub response: ProbeResponse,
}

/// Signals read from probe responses, independent of any signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorFlags {
    /// Probes whose status differed from the baseline.
    pub status_changes: usize,
    pub script_keyword: bool,
    pub sql_keyword: bool,
    pub command_keyword: bool,
    pub challenge: bool,
    pub large_error_body: bool,
    pub rate_limited: bool,
    /// Probes that looked like a block page.
    pub blocked_probes: usize,
}

impl BehaviorFlags {
    pub fn from_responses(baseline: &ProbeResponse, probes: &[ProbeObservation]) -> Self {
        let mut flags = BehaviorFlags::default();
        let mut throttled = 0usize;

        for obs in probes {
            let resp = &obs.response;
            let body = resp.body.to_lowercase();

            if resp.status != baseline.status {
                flags.status_changes += 1;
            }
            flags.script_keyword |= body.contains("script");
            flags.sql_keyword |= body.contains("sql");
            flags.command_keyword |= body.contains("command");
            flags.challenge |= body.contains("challenge");
            if resp.status >= 400 && resp.body.len() > LARGE_ERROR_BODY {
                flags.large_error_body = true;
            }
            if resp.status == 429 || resp.status == 503 {
                throttled += 1;
            }
            if is_blocked_response(resp.status, &resp.body) {
                flags.blocked_probes += 1;
            }
        }

        flags.rate_limited = throttled >= RATE_LIMIT_MIN_RESPONSES;
        flags
    }

    pub fn status_changed(&self) -> bool {
        self.status_changes > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WafFingerprint {
    pub waf_type: WafType,
    /// In [0, 1]. Above the acceptance threshold exactly when classified.
    pub confidence: f64,
    pub evidence: Vec<String>,
    /// Baseline response headers, names lowercased.
    pub headers: Vec<(String, String)>,
    /// Baseline status first, then each successful probe in order.
    pub status_codes: Vec<u16>,
    pub behavior: BehaviorFlags,
    pub probes_sent: usize,
    pub probes_failed: usize,
}

impl WafFingerprint {
    pub fn is_classified(&self) -> bool {
        !self.waf_type.is_unknown()
    }
}

/// Raw score and evidence for one signature, before the base weight.
pub fn raw_score(sig: &WafSignature, baseline: &ProbeResponse, probes: &[ProbeObservation]) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut evidence = Vec::new();

    let header_lines: Vec<String> = baseline
        .headers
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v).to_lowercase())
        .collect();
    for pattern in sig.header_patterns {
        if let Some(line) = header_lines.iter().find(|l| l.contains(pattern)) {
            score += HEADER_WEIGHT;
            evidence.push(format!("Header: {}", line));
        }
    }

    let baseline_body = baseline.body.to_lowercase();
    for pattern in sig.content_patterns {
        if baseline_body.contains(pattern) {
            score += BASELINE_CONTENT_WEIGHT;
            evidence.push(format!("Baseline body: {}", pattern));
        }
    }

    for obs in probes {
        let body = obs.response.body.to_lowercase();
        for pattern in sig.content_patterns {
            if body.contains(pattern) {
                score += PROBE_CONTENT_WEIGHT;
                evidence.push(format!("Probe {} body: {}", obs.probe, pattern));
            }
        }
        if sig.expected_status.contains(&obs.response.status) {
            score += STATUS_WEIGHT;
            evidence.push(format!("Probe {} status: {}", obs.probe, obs.response.status));
        }
    }

    (score, evidence)
}

/// Scores every signature and picks the winner. Signatures are ranked on
/// the unclamped weighted score; the first signature reaching the top score
/// wins ties. Only the reported confidence is clamped to [0, 1].
pub fn classify(
    signatures: &[WafSignature],
    baseline: &ProbeResponse,
    probes: &[ProbeObservation],
    probes_failed: usize,
) -> WafFingerprint {
    let mut best: Option<(&WafSignature, f64, Vec<String>)> = None;

    for sig in signatures {
        let (raw, evidence) = raw_score(sig, baseline, probes);
        let score = raw * sig.confidence;
        tracing::debug!(waf = sig.name(), raw, score, "signature scored");

        let better = match &best {
            Some((_, top, _)) => score > *top,
            None => true,
        };
        if better {
            best = Some((sig, score, evidence));
        }
    }

    let mut status_codes = Vec::with_capacity(probes.len() + 1);
    status_codes.push(baseline.status);
    status_codes.extend(probes.iter().map(|o| o.response.status));

    let (waf_type, confidence, evidence) = match best {
        Some((sig, score, evidence)) if score > ACCEPTANCE_THRESHOLD => {
            (sig.waf_type, score.clamp(0.0, 1.0), evidence)
        }
        Some((_, score, _)) => (WafType::Unknown, score.clamp(0.0, 1.0), Vec::new()),
        None => (WafType::Unknown, 0.0, Vec::new()),
    };

    WafFingerprint {
        waf_type,
        confidence,
        evidence,
        headers: baseline.headers.clone(),
        status_codes,
        behavior: BehaviorFlags::from_responses(baseline, probes),
        probes_sent: probes.len() + probes_failed,
        probes_failed,
    }
}

/// Quick check whether a response looks like a WAF block page.
pub fn is_blocked_response(status: u16, body: &str) -> bool {
    const BLOCK_PATTERNS: &[&str] = &[
        "access denied",
        "forbidden",
        "blocked",
        "firewall",
        "security policy",
        "request rejected",
        "suspicious activity",
        "rate limit",
        "captcha",
        "challenge",
        "ray id",
        "incident id",
        "reference #",
        "not acceptable",
    ];

    if !matches!(status, 403 | 406 | 429 | 503) {
        return false;
    }
    let body_lower = body.to_lowercase();
    BLOCK_PATTERNS.iter().any(|p| body_lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waf::signatures::load_signatures;

    fn resp(status: u16, headers: &[(&str, &str)], body: &str) -> ProbeResponse {
        ProbeResponse {
            status,
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body: body.to_string(),
        }
    }

    fn probe(name: &str, response: ProbeResponse) -> ProbeObservation {
        ProbeObservation {
            probe: name.to_string(),
            response,
        }
    }

    #[test]
    fn test_waf_type_parsing() {
        assert_eq!("cloudflare".parse::<WafType>().unwrap(), WafType::Cloudflare);
        assert_eq!("Mod_Security".parse::<WafType>().unwrap(), WafType::ModSecurity);
        assert_eq!("big-ip".parse::<WafType>().unwrap(), WafType::F5BigIP);
        assert!("shieldy".parse::<WafType>().is_err());
    }

    #[test]
    fn test_header_and_probe_scoring() {
        let table = load_signatures();
        let cf = &table[0];
        let baseline = resp(200, &[("server", "cloudflare")], "<html>ok</html>");
        let probes = vec![probe("xss", resp(403, &[], "Attention Required! | Cloudflare"))];

        let (raw, evidence) = raw_score(cf, &baseline, &probes);
        // header 0.3 + probe content 0.3 + probe status 0.2
        assert!((raw - 0.8).abs() < 1e-9, "raw = {}", raw);
        assert_eq!(evidence.len(), 3);
    }

    #[test]
    fn test_no_signal_is_unknown() {
        let baseline = resp(200, &[("server", "nginx")], "hello");
        let probes = vec![probe("xss", resp(200, &[], "hello"))];
        let fp = classify(&load_signatures(), &baseline, &probes, 0);
        assert_eq!(fp.waf_type, WafType::Unknown);
        assert!(fp.confidence <= ACCEPTANCE_THRESHOLD);
        assert!(fp.evidence.is_empty());
    }

    #[test]
    fn test_plain_site_with_all_probes_passing_is_unknown() {
        let baseline = resp(200, &[("server", "nginx")], "hello");
        let probes: Vec<_> = ["xss", "sqli", "cmd", "path", "xxe"]
            .iter()
            .map(|name| probe(name, resp(200, &[("server", "nginx")], "hello")))
            .collect();
        let fp = classify(&load_signatures(), &baseline, &probes, 0);
        assert_eq!(fp.waf_type, WafType::Unknown);
        assert!(fp.confidence <= ACCEPTANCE_THRESHOLD);
        assert!(fp.evidence.is_empty());
    }

    #[test]
    fn test_strong_match_beats_earlier_saturated_match() {
        let baseline = resp(
            200,
            &[("server", "Sucuri/Cloudproxy"), ("x-sucuri-id", "18005")],
            "<html>ok</html>",
        );
        let probes: Vec<_> = ["xss", "sqli", "cmd", "path", "xxe"]
            .iter()
            .map(|name| probe(name, resp(403, &[], "Access Denied - Sucuri Website Firewall")))
            .collect();
        let fp = classify(&load_signatures(), &baseline, &probes, 0);
        assert_eq!(fp.waf_type, WafType::Sucuri);
        assert!((fp.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_goes_to_first_signature() {
        let sig = |waf_type| WafSignature {
            waf_type,
            header_patterns: &["x-shared", "x-other"],
            content_patterns: &[],
            expected_status: &[],
            confidence: 1.0,
        };
        let sigs = vec![sig(WafType::Sucuri), sig(WafType::Wallarm)];
        let baseline = resp(200, &[("x-shared", "1"), ("x-other", "1")], "");

        let fp = classify(&sigs, &baseline, &[], 0);
        assert_eq!(fp.waf_type, WafType::Sucuri);
        assert!((fp.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_behavior_flags() {
        let baseline = resp(200, &[], "fine");
        let big = "x".repeat(LARGE_ERROR_BODY + 1);
        let probes = vec![
            probe("xss", resp(403, &[], "script blocked")),
            probe("sqli", resp(429, &[], "rate limit: sql")),
            probe("cmd", resp(503, &[], "Please complete the challenge")),
            probe("path", resp(500, &[], &big)),
        ];
        let flags = BehaviorFlags::from_responses(&baseline, &probes);
        assert_eq!(flags.status_changes, 4);
        assert!(flags.script_keyword && flags.sql_keyword);
        assert!(!flags.command_keyword);
        assert!(flags.challenge);
        assert!(flags.large_error_body);
        assert!(flags.rate_limited);
        assert_eq!(flags.blocked_probes, 3);
    }

    #[test]
    fn test_single_throttle_is_not_rate_limiting() {
        let baseline = resp(200, &[], "");
        let probes = vec![probe("xss", resp(429, &[], ""))];
        assert!(!BehaviorFlags::from_responses(&baseline, &probes).rate_limited);
    }

    #[test]
    fn test_is_blocked_response() {
        assert!(is_blocked_response(403, "Access Denied"));
        assert!(is_blocked_response(406, "Not Acceptable!"));
        assert!(!is_blocked_response(200, "access denied"));
        assert!(!is_blocked_response(403, "plain page"));
    }
}
