use ::base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use ::base64::Engine as _;
use rand::RngCore;

use super::{Transform, VariantSet};
use crate::registry::TechniqueId;

pub struct Base64Transform;

impl Transform for Base64Transform {
    fn id(&self) -> TechniqueId {
        TechniqueId::Base64
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        let bytes = payload.as_bytes();
        out.push(STANDARD.encode(bytes));
        out.push(STANDARD_NO_PAD.encode(bytes));
        out.push(URL_SAFE.encode(bytes));
        out.push(URL_SAFE_NO_PAD.encode(bytes));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        let standard = STANDARD.encode(payload.as_bytes());
        let trimmed = standard.trim_end_matches('=');

        // Padding manipulation: lenient decoders ignore surplus or encoded '='.
        out.push(format!("{}=", standard));
        out.push(format!("{}==", standard));
        out.push(format!("{}===", trimmed));
        out.push(percent_specials(&standard));
        out.push(format!("{}%3D%3D", trimmed));

        out.push(STANDARD.encode(standard.as_bytes()));
        out.push(line_wrapped(&standard, 4, "\n"));
        out.push(line_wrapped(&standard, 76, "\r\n"));

        // Interleaved whitespace; most decoders skip it.
        out.push(interleave(&standard, &[' ', '\t', '\n'], 7));
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        let bytes = payload.as_bytes();
        let standard = STANDARD.encode(bytes);

        out.push(chunked(bytes));
        out.push(STANDARD.encode(utf16le(payload)));
        out.push(STANDARD.encode(STANDARD.encode(standard.as_bytes()).as_bytes()));
        out.push(standard.chars().rev().collect::<String>());
        out.push(format!("data:text/html;base64,{}", standard));
        out.push(format!("atob('{}')", standard));
        out.push(format!("FROM_BASE64('{}')", standard));
        out.push(interleave(&standard, &['.', '*', '!'], 10));
    }

    fn force_encode(&self, payload: &str) -> String {
        STANDARD.encode(payload.as_bytes())
    }
}

fn percent_specials(encoded: &str) -> String {
    encoded
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

fn line_wrapped(encoded: &str, width: usize, sep: &str) -> String {
    let chars: Vec<char> = encoded.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Encodes every 2-byte group on its own so padding lands mid-string.
fn chunked(bytes: &[u8]) -> String {
    let mut out = String::new();
    for chunk in bytes.chunks(2) {
        out.push_str(&STANDARD.encode(chunk));
    }
    out
}

fn utf16le(payload: &str) -> Vec<u8> {
    payload.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Inserts a filler every `every` characters, cycling through `fillers`.
fn interleave(encoded: &str, fillers: &[char], every: usize) -> String {
    let every = every.max(1);
    let mut out = String::with_capacity(encoded.len() * 2);
    let mut next = fillers.iter().cycle();
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % every == 0 {
            if let Some(f) = next.next() {
                out.push(*f);
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EvasionLevel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(payload: &str, level: EvasionLevel) -> Vec<String> {
        let mut rng = StdRng::seed_from_u64(1);
        Base64Transform.generate(payload, level, &mut rng)
    }

    #[test]
    fn test_basic_padded_and_unpadded() {
        let out = run("ab", EvasionLevel::Basic);
        assert!(out.contains(&"YWI=".to_string()));
        assert!(out.contains(&"YWI".to_string()));
    }

    #[test]
    fn test_medium_adds_padding_forms() {
        let basic = run("1 == 1", EvasionLevel::Basic);
        let medium = run("1 == 1", EvasionLevel::Medium);
        assert!(medium.contains(&"MSA9PSAx".to_string()));
        assert!(medium.contains(&"MSA9PSAx=".to_string()));
        assert!(!basic.contains(&"MSA9PSAx=".to_string()));
    }

    #[test]
    fn test_chunked_has_inner_padding() {
        assert_eq!(chunked(b"abc"), "YWI=Yw==");
    }

    #[test]
    fn test_interleave_cycles_fillers() {
        assert_eq!(interleave("abcdefg", &['.', '*'], 2), "ab.cd*ef.g");
        assert_eq!(interleave("ab", &[' '], 7), "ab");
    }

    #[test]
    fn test_same_output_for_any_rng() {
        let a = Base64Transform.generate("<svg>", EvasionLevel::Advanced, &mut StdRng::seed_from_u64(1));
        let b = Base64Transform.generate("<svg>", EvasionLevel::Advanced, &mut StdRng::seed_from_u64(2));
        assert_eq!(a, b);
        assert!(!Base64Transform.randomized());
    }

    #[test]
    fn test_line_wrapped() {
        assert_eq!(line_wrapped("abcdefgh", 4, "\n"), "abcd\nefgh");
    }
}
