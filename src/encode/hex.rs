use rand::{Rng, RngCore};

use super::{map_bytes, map_special_bytes, Transform, VariantSet};
use crate::registry::TechniqueId;

/// Hex escapes over raw bytes.
pub struct HexTransform;

impl Transform for HexTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::Hex
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(plain(payload, false));
        out.push(plain(payload, true));
        out.push(map_bytes(payload, "", |b| format!("\\x{:02x}", b)));
        out.push(map_bytes(payload, "", |b| format!("\\x{:02X}", b)));
        out.push(map_bytes(payload, "", |b| format!("%{:02x}", b)));
        out.push(format!("0x{}", plain(payload, false)));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        out.push(map_bytes(payload, "", |b| format!("\\x{{{:02x}}}", b)));
        out.push(map_bytes(payload, "", |b| format!("\\u{{{:x}}}", b)));
        out.push(map_special_bytes(payload, |b| format!("\\x{:02x}", b)));
        out.push(map_special_bytes(payload, |b| format!("%{:02X}", b)));
        out.push(map_bytes(payload, " ", |b| format!("0x{:02x}", b)));
        out.push(map_bytes(payload, "", |b| format!("0x{:02x}", b)));

        // Case of each hex digit chosen independently.
        out.push(map_bytes(payload, "", |b| format!("\\x{:02x}", b)).chars().map(|c| {
            if c.is_ascii_hexdigit() && c.is_ascii_alphabetic() && rng.gen_bool(0.5) {
                c.to_ascii_uppercase()
            } else {
                c
            }
        }).collect::<String>());
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        // Concatenation forms for JS, SQL and shell sinks.
        out.push(map_bytes(payload, "+", |b| format!("'\\x{:02x}'", b)));
        out.push(format!(
            "String.fromCharCode({})",
            map_bytes(payload, ",", |b| format!("0x{:02x}", b))
        ));
        out.push(format!(
            "CONCAT({})",
            map_bytes(payload, ",", |b| format!("0x{:02x}", b))
        ));
        out.push(format!("UNHEX('{}')", plain(payload, true)));
        out.push(format!("X'{}'", plain(payload, true)));
        out.push(map_bytes(payload, "||", |b| format!("CHR(0x{:02x})", b)));

        // Per-byte random choice among equivalent escape forms.
        let forms: [fn(u8) -> String; 4] = [
            |b| format!("\\x{:02x}", b),
            |b| format!("\\x{:02X}", b),
            |b| format!("%{:02x}", b),
            |b| format!("\\x{{{:02x}}}", b),
        ];
        let mixed: String = payload
            .bytes()
            .map(|b| forms[rng.gen_range(0..forms.len())](b))
            .collect();
        out.push(mixed);
    }

    fn force_encode(&self, payload: &str) -> String {
        plain(payload, false)
    }

    fn randomized(&self) -> bool {
        true
    }
}

fn plain(payload: &str, upper: bool) -> String {
    if upper {
        map_bytes(payload, "", |b| format!("{:02X}", b))
    } else {
        map_bytes(payload, "", |b| format!("{:02x}", b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EvasionLevel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(payload: &str, level: EvasionLevel) -> Vec<String> {
        HexTransform.generate(payload, level, &mut StdRng::seed_from_u64(3))
    }

    #[test]
    fn test_basic_forms() {
        let out = run("<a", EvasionLevel::Basic);
        assert!(out.contains(&"3c61".to_string()));
        assert!(out.contains(&"3C61".to_string()));
        assert!(out.contains(&"\\x3c\\x61".to_string()));
        assert!(out.contains(&"%3c%61".to_string()));
    }

    #[test]
    fn test_multibyte_split_per_byte() {
        let out = run("é", EvasionLevel::Basic);
        assert!(out.contains(&"\\xc3\\xa9".to_string()));
    }

    #[test]
    fn test_medium_brace_and_partial() {
        let out = run("a<", EvasionLevel::Medium);
        assert!(out.contains(&"\\x{61}\\x{3c}".to_string()));
        assert!(out.contains(&"a\\x3c".to_string()));
    }

    #[test]
    fn test_advanced_concatenation() {
        let out = run("ab", EvasionLevel::Advanced);
        assert!(out.contains(&"String.fromCharCode(0x61,0x62)".to_string()));
        assert!(out.contains(&"UNHEX('6162')".to_string()));
    }
}
