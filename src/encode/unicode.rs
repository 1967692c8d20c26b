use rand::RngCore;

use super::{Transform, VariantSet};
use crate::registry::TechniqueId;

/// Unicode escapes over whole code points. Astral characters use UTF-16
/// surrogate pairs in the `\uXXXX` forms.
pub struct UnicodeTransform;

impl Transform for UnicodeTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::Unicode
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(escape_all(payload, js_escape));
        out.push(escape_specials(payload, js_escape));
        out.push(escape_all(payload, es6_escape));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        out.push(escape_all(payload, js_escape_upper));
        out.push(escape_all(payload, |c| utf16_units(c, "%u", true)));
        out.push(escape_all(payload, |c| format!("\\U{:08X}", c as u32)));
        out.push(escape_all(payload, css_escape));
        out.push(escape_specials(payload, es6_escape));
        out.push(escape_specials(payload, |c| utf16_units(c, "%u", true)));
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        out.push(escape_all(payload, |c| format!("\\u{{{:06x}}}", c as u32)));
        out.push(escape_all(payload, |c| format!("\\N{{U+{:04X}}}", c as u32)));
        out.push(escape_specials(payload, css_escape));

        // Alternating escaped/literal characters.
        out.push(
            payload
                .chars()
                .enumerate()
                .map(|(i, c)| if i % 2 == 0 { js_escape(c) } else { c.to_string() })
                .collect::<String>(),
        );

        let forms: [fn(char) -> String; 4] = [js_escape, js_escape_upper, es6_escape, css_escape];
        out.push(
            payload
                .chars()
                .enumerate()
                .map(|(i, c)| forms[i % forms.len()](c))
                .collect::<String>(),
        );
    }

    fn force_encode(&self, payload: &str) -> String {
        escape_all(payload, js_escape)
    }
}

fn utf16_units(c: char, prefix: &str, upper: bool) -> String {
    let mut buf = [0u16; 2];
    c.encode_utf16(&mut buf)
        .iter()
        .map(|u| {
            if upper {
                format!("{}{:04X}", prefix, u)
            } else {
                format!("{}{:04x}", prefix, u)
            }
        })
        .collect()
}

fn js_escape(c: char) -> String {
    utf16_units(c, "\\u", false)
}

fn js_escape_upper(c: char) -> String {
    utf16_units(c, "\\u", true)
}

fn es6_escape(c: char) -> String {
    format!("\\u{{{:x}}}", c as u32)
}

/// CSS escapes take up to six hex digits terminated by a space.
fn css_escape(c: char) -> String {
    format!("\\{:x} ", c as u32)
}

fn escape_all<F>(payload: &str, f: F) -> String
where
    F: Fn(char) -> String,
{
    payload.chars().map(f).collect()
}

/// Alphanumeric-preserving partial mode.
fn escape_specials<F>(payload: &str, f: F) -> String
where
    F: Fn(char) -> String,
{
    payload
        .chars()
        .map(|c| if super::is_special(c) { f(c) } else { c.to_string() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EvasionLevel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(payload: &str, level: EvasionLevel) -> Vec<String> {
        UnicodeTransform.generate(payload, level, &mut StdRng::seed_from_u64(5))
    }

    #[test]
    fn test_full_and_partial() {
        let out = run("a<", EvasionLevel::Basic);
        assert_eq!(out[0], "\\u0061\\u003c");
        assert_eq!(out[1], "a\\u003c");
    }

    #[test]
    fn test_code_point_granularity() {
        // One escape for a two-byte character, not two.
        let out = run("é", EvasionLevel::Basic);
        assert!(out.contains(&"\\u00e9".to_string()));
        assert!(out.contains(&"\\u{e9}".to_string()));
    }

    #[test]
    fn test_astral_surrogate_pair() {
        assert_eq!(js_escape('😀'), "\\ud83d\\ude00");
        assert_eq!(es6_escape('😀'), "\\u{1f600}");
    }

    #[test]
    fn test_medium_percent_u() {
        let out = run("<", EvasionLevel::Medium);
        assert!(out.contains(&"%u003C".to_string()));
        assert!(out.contains(&"\\U0000003C".to_string()));
    }
}
