use std::sync::Arc;

use once_cell::sync::Lazy;

use super::detector::WafType;

/// Static fingerprint for one WAF product.
///
/// Header patterns match case-insensitively against header names and
/// values. Content patterns match case-insensitively against bodies.
#[derive(Debug, Clone)]
pub struct WafSignature {
    pub waf_type: WafType,
    pub header_patterns: &'static [&'static str],
    pub content_patterns: &'static [&'static str],
    pub expected_status: &'static [u16],
    /// Multiplier applied to the raw match score.
    pub confidence: f64,
}

impl WafSignature {
    pub fn name(&self) -> &'static str {
        self.waf_type.name()
    }
}

static SIGNATURES: Lazy<Arc<Vec<WafSignature>>> = Lazy::new(|| Arc::new(builtin_signatures()));

/// Process-wide signature table, built once.
pub fn load_signatures() -> Arc<Vec<WafSignature>> {
    Arc::clone(&SIGNATURES)
}

fn builtin_signatures() -> Vec<WafSignature> {
    vec![
        WafSignature {
            waf_type: WafType::Cloudflare,
            header_patterns: &["cloudflare", "cf-ray", "cf-cache-status", "__cfduid", "cf_clearance"],
            content_patterns: &["attention required", "cloudflare ray id", "cf-error-details", "cf-browser-verification"],
            expected_status: &[403, 503],
            confidence: 0.95,
        },
        WafSignature {
            waf_type: WafType::Imperva,
            header_patterns: &["x-iinfo", "incap_ses", "visid_incap", "x-cdn: incapsula"],
            content_patterns: &["incapsula incident id", "_incapsula_resource", "powered by incapsula"],
            expected_status: &[403],
            confidence: 0.9,
        },
        WafSignature {
            waf_type: WafType::Akamai,
            header_patterns: &["akamaighost", "akamai", "x-akamai-transformed", "ak_bmsc"],
            content_patterns: &["access denied", "reference #", "errors.edgesuite.net"],
            expected_status: &[403],
            confidence: 0.85,
        },
        WafSignature {
            waf_type: WafType::F5BigIP,
            header_patterns: &["bigipserver", "x-wa-info", "ts01", "f5"],
            content_patterns: &["the requested url was rejected", "support id"],
            expected_status: &[403],
            confidence: 0.85,
        },
        WafSignature {
            waf_type: WafType::ModSecurity,
            header_patterns: &["mod_security", "modsecurity", "nyob"],
            content_patterns: &["mod_security", "modsecurity", "not acceptable", "this error was generated by mod_security"],
            expected_status: &[403, 406, 501],
            confidence: 0.8,
        },
        WafSignature {
            waf_type: WafType::AwsWaf,
            header_patterns: &["awselb", "x-amzn-requestid", "x-amz-cf-id", "awsalb"],
            content_patterns: &["request blocked", "generated by cloudfront"],
            expected_status: &[403],
            confidence: 0.8,
        },
        WafSignature {
            waf_type: WafType::AzureWaf,
            header_patterns: &["x-azure-ref", "x-msedge-ref", "azure"],
            content_patterns: &["the request is blocked", "azure front door"],
            expected_status: &[403],
            confidence: 0.8,
        },
        WafSignature {
            waf_type: WafType::Sucuri,
            header_patterns: &["sucuri", "x-sucuri-id", "x-sucuri-cache"],
            content_patterns: &["sucuri website firewall", "access denied - sucuri"],
            expected_status: &[403],
            confidence: 0.9,
        },
        WafSignature {
            waf_type: WafType::Wordfence,
            header_patterns: &["wordfence", "wfvt_"],
            content_patterns: &["generated by wordfence", "your access to this site has been limited"],
            expected_status: &[403, 503],
            confidence: 0.85,
        },
        WafSignature {
            waf_type: WafType::Barracuda,
            header_patterns: &["barra_counter_session", "barracuda"],
            content_patterns: &["barracuda networks", "you have been blocked"],
            expected_status: &[403],
            confidence: 0.8,
        },
        WafSignature {
            waf_type: WafType::Fortiweb,
            header_patterns: &["fortiwafsid", "fortigate", "fortiweb"],
            content_patterns: &["fortigate", ".fgd_icon", "server unavailable!"],
            expected_status: &[403, 500],
            confidence: 0.8,
        },
        WafSignature {
            waf_type: WafType::Wallarm,
            header_patterns: &["nginx-wallarm", "wallarm"],
            content_patterns: &["wallarm"],
            expected_status: &[403],
            confidence: 0.75,
        },
    ]
}
