use rand::{Rng, RngCore};

use super::{map_bytes, Transform, VariantSet};
use crate::registry::TechniqueId;

/// Percent encoding over raw bytes.
pub struct UrlTransform;

impl Transform for UrlTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::Url
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(urlencoding::encode(payload).into_owned());
        out.push(encode_all(payload, true));
        out.push(encode_all(payload, false));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        // Hex digit case alternates per byte.
        out.push(
            payload
                .bytes()
                .enumerate()
                .map(|(i, b)| if i % 2 == 0 { format!("%{:02X}", b) } else { format!("%{:02x}", b) })
                .collect::<String>(),
        );
        out.push(form_encode(payload));

        let standard = urlencoding::encode(payload).into_owned();
        out.push(urlencoding::encode(&standard).into_owned());
        out.push(encode_all(&encode_all(payload, true), true));
        out.push(partial_ratio(payload, 0.5, rng));
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        let full = encode_all(payload, true);
        // Triple encoding of each escape, then of the whole string.
        out.push(full.replace('%', "%2525"));
        out.push(encode_all(&encode_all(&full, true), true));

        // IIS %u form.
        out.push(
            payload
                .encode_utf16()
                .map(|u| format!("%u{:04X}", u))
                .collect::<String>(),
        );

        // Only the percent sign of each escape is re-encoded.
        out.push(encode_specials(payload).replace('%', "%25"));
        out.push(partial_ratio(payload, 0.25, rng));
        out.push(partial_ratio(payload, 0.75, rng));
    }

    fn force_encode(&self, payload: &str) -> String {
        encode_all(payload, true)
    }

    fn randomized(&self) -> bool {
        true
    }
}

/// Percent-encodes every byte, including unreserved characters.
pub fn encode_all(payload: &str, upper: bool) -> String {
    if upper {
        map_bytes(payload, "", |b| format!("%{:02X}", b))
    } else {
        map_bytes(payload, "", |b| format!("%{:02x}", b))
    }
}

fn encode_specials(payload: &str) -> String {
    super::map_special_bytes(payload, |b| format!("%{:02X}", b))
}

/// application/x-www-form-urlencoded: spaces become '+'.
fn form_encode(payload: &str) -> String {
    payload
        .split(' ')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

/// Specials are always encoded; alphanumerics with probability `ratio`.
fn partial_ratio(payload: &str, ratio: f64, rng: &mut dyn RngCore) -> String {
    let mut out = String::with_capacity(payload.len() * 3);
    for ch in payload.chars() {
        if super::is_special(ch) || rng.gen_bool(ratio) {
            let mut buf = [0u8; 4];
            for b in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", b));
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EvasionLevel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_basic_standard_and_full() {
        let out = UrlTransform.generate("a b", EvasionLevel::Basic, &mut StdRng::seed_from_u64(0));
        assert!(out.contains(&"a%20b".to_string()));
        assert!(out.contains(&"%61%20%62".to_string()));
    }

    #[test]
    fn test_double_encoding() {
        let out = UrlTransform.generate("<", EvasionLevel::Medium, &mut StdRng::seed_from_u64(0));
        assert!(out.contains(&"%253C".to_string()));
    }

    #[test]
    fn test_partial_ratio_keeps_specials_encoded() {
        let mut rng = StdRng::seed_from_u64(11);
        let v = partial_ratio("<ab>", 0.0, &mut rng);
        assert_eq!(v, "%3Cab%3E");
    }

    #[test]
    fn test_iis_unicode_form() {
        let out = UrlTransform.generate("/", EvasionLevel::Advanced, &mut StdRng::seed_from_u64(0));
        assert!(out.contains(&"%u002F".to_string()));
    }

    #[test]
    fn test_form_encode() {
        assert_eq!(form_encode("1 OR 1"), "1+OR+1");
    }
}
