use rand::RngCore;

use super::{map_bytes, map_special_bytes, Transform, VariantSet};
use crate::registry::TechniqueId;

/// Octal escapes over raw bytes.
pub struct OctalTransform;

impl Transform for OctalTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::Octal
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(map_bytes(payload, "", |b| format!("\\{:o}", b)));
        out.push(map_bytes(payload, "", |b| format!("\\{:03o}", b)));
        out.push(map_bytes(payload, " ", |b| format!("{:03o}", b)));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        out.push(map_bytes(payload, " ", |b| format!("0{:o}", b)));
        out.push(map_bytes(payload, ",", |b| format!("0{:03o}", b)));
        out.push(map_bytes(payload, "", |b| format!("\\0{:03o}", b)));
        out.push(map_special_bytes(payload, |b| format!("\\{:03o}", b)));
        out.push(format!("$'{}'", map_bytes(payload, "", |b| format!("\\{:03o}", b))));
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        let escaped = map_bytes(payload, "", |b| format!("\\{:03o}", b));
        out.push(format!("$(printf '{}')", escaped));
        out.push(format!("`echo -e '{}'`", escaped));

        // Radix rotation, forward and backward.
        out.push(
            payload
                .bytes()
                .enumerate()
                .map(|(i, b)| radix_form(b, i % 3))
                .collect::<String>(),
        );
        out.push(
            payload
                .bytes()
                .enumerate()
                .map(|(i, b)| radix_form(b, 2 - i % 3))
                .collect::<String>(),
        );
    }

    fn force_encode(&self, payload: &str) -> String {
        map_bytes(payload, "", |b| format!("\\{:03o}", b))
    }
}

fn radix_form(b: u8, radix: usize) -> String {
    match radix {
        0 => format!("\\{:03o}", b),
        1 => format!("\\x{:02x}", b),
        _ => format!("&#{};", b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EvasionLevel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_basic_octal() {
        let out = OctalTransform.generate("<", EvasionLevel::Basic, &mut StdRng::seed_from_u64(0));
        assert_eq!(out, vec!["\\74".to_string(), "\\074".to_string(), "074".to_string()]);
    }

    #[test]
    fn test_ansi_c_quoting() {
        let out = OctalTransform.generate("id", EvasionLevel::Medium, &mut StdRng::seed_from_u64(0));
        assert!(out.contains(&"$'\\151\\144'".to_string()));
    }

    #[test]
    fn test_mixed_radix_rotation() {
        let out = OctalTransform.generate("abc", EvasionLevel::Advanced, &mut StdRng::seed_from_u64(0));
        assert!(out.contains(&"\\141\\x62&#99;".to_string()));
    }
}
