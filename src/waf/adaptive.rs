use super::detector::WafType;
use crate::registry::{TechniqueId, TechniqueRegistry};

use TechniqueId::*;

/// Broad priority order for unidentified WAFs. Covers every technique so the
/// intersection with any attack type loses nothing.
pub const GENERIC_TECHNIQUES: &[TechniqueId] = &[
    Url, Unicode, Hex, Base64, MixedCase, Utf8, DecimalEntity, HexEntity, BestFit, Octal, Binary,
    UnixCommand, WindowsCommand, PathTraversal,
];

const CLOUDFLARE: &[TechniqueId] = &[
    Unicode, BestFit, Utf8, HexEntity, DecimalEntity, MixedCase, Url, Hex, Base64,
    UnixCommand, WindowsCommand, PathTraversal,
];

const IMPERVA: &[TechniqueId] = &[
    Utf8, Url, MixedCase, Unicode, HexEntity, Hex, BestFit, Base64,
    UnixCommand, WindowsCommand, PathTraversal,
];

const AKAMAI: &[TechniqueId] = &[
    Url, Unicode, BestFit, Utf8, DecimalEntity, MixedCase, Octal,
    UnixCommand, WindowsCommand, PathTraversal,
];

const F5_BIGIP: &[TechniqueId] = &[
    Url, Utf8, Hex, MixedCase, Unicode, Base64,
    UnixCommand, WindowsCommand, PathTraversal,
];

const MODSECURITY: &[TechniqueId] = &[
    MixedCase, Url, Utf8, Hex, Octal, DecimalEntity, Binary,
    UnixCommand, WindowsCommand, PathTraversal,
];

const AWS_WAF: &[TechniqueId] = &[
    Unicode, Utf8, Url, BestFit, HexEntity, Base64, Hex,
    UnixCommand, WindowsCommand, PathTraversal,
];

const AZURE_WAF: &[TechniqueId] = &[
    Url, Unicode, MixedCase, Utf8, Base64,
    UnixCommand, WindowsCommand, PathTraversal,
];

const SUCURI: &[TechniqueId] = &[
    Unicode, DecimalEntity, Url, MixedCase, Hex,
    UnixCommand, PathTraversal,
];

const WORDFENCE: &[TechniqueId] = &[
    DecimalEntity, HexEntity, Unicode, Url, MixedCase, Base64,
    UnixCommand, PathTraversal,
];

const BARRACUDA: &[TechniqueId] = &[
    Url, Hex, MixedCase, Unicode, Utf8,
    UnixCommand, WindowsCommand, PathTraversal,
];

const FORTIWEB: &[TechniqueId] = &[
    Utf8, Unicode, Url, Octal, MixedCase,
    UnixCommand, WindowsCommand, PathTraversal,
];

const WALLARM: &[TechniqueId] = &[
    BestFit, Unicode, Utf8, Base64, Url,
    UnixCommand, WindowsCommand, PathTraversal,
];

/// Static priority list for a WAF: techniques most likely to slip past it
/// come first.
pub fn optimal_techniques(waf: &WafType) -> &'static [TechniqueId] {
    match waf {
        WafType::Cloudflare => CLOUDFLARE,
        WafType::Imperva => IMPERVA,
        WafType::Akamai => AKAMAI,
        WafType::F5BigIP => F5_BIGIP,
        WafType::ModSecurity => MODSECURITY,
        WafType::AwsWaf => AWS_WAF,
        WafType::AzureWaf => AZURE_WAF,
        WafType::Sucuri => SUCURI,
        WafType::Wordfence => WORDFENCE,
        WafType::Barracuda => BARRACUDA,
        WafType::Fortiweb => FORTIWEB,
        WafType::Wallarm => WALLARM,
        WafType::Unknown => GENERIC_TECHNIQUES,
    }
}

/// WAF priority order restricted to techniques applicable to the attack
/// type. The WAF list decides the order, not the registry.
pub fn prioritize(waf: &WafType, registry: &TechniqueRegistry, attack_type: &str) -> Vec<TechniqueId> {
    let (applicable, _) = registry.applicable_techniques(attack_type);
    optimal_techniques(waf)
        .iter()
        .copied()
        .filter(|t| applicable.contains(t))
        .collect()
}
