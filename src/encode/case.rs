use once_cell::sync::Lazy;
use rand::{Rng, RngCore};
use regex::Regex;

use super::{Transform, VariantSet};
use crate::registry::TechniqueId;

static WORD_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Za-z]").expect("static regex"));

const VOWELS: &str = "aeiouAEIOU";

pub struct MixedCaseTransform;

impl Transform for MixedCaseTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::MixedCase
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(payload.to_uppercase());
        out.push(payload.to_lowercase());
        out.push(alternating(payload, true));
        out.push(alternating(payload, false));
        out.push(word_boundary(payload));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        out.push(map_letters(payload, |c| {
            if VOWELS.contains(c) {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        }));
        out.push(map_letters(payload, |c| {
            if VOWELS.contains(c) {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        }));
        out.push(map_letters(payload, |c| {
            if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        }));
        out.push(random_ratio(payload, 0.5, rng));
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        out.push(leetspeak(payload));
        out.push(zebra(payload, 2));
        out.push(zebra(payload, 3));
        out.push(random_ratio(payload, 0.25, rng));
        out.push(random_ratio(payload, 0.75, rng));
    }

    fn force_encode(&self, payload: &str) -> String {
        super::url::encode_all(payload, true)
    }

    fn randomized(&self) -> bool {
        true
    }
}

fn map_letters<F>(payload: &str, f: F) -> String
where
    F: Fn(char) -> char,
{
    payload
        .chars()
        .map(|c| if c.is_ascii_alphabetic() { f(c) } else { c })
        .collect()
}

/// Alternates case over letters only; other characters do not advance the
/// phase.
fn alternating(payload: &str, upper_first: bool) -> String {
    let mut upper = upper_first;
    payload
        .chars()
        .map(|c| {
            if !c.is_ascii_alphabetic() {
                return c;
            }
            let mapped = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = !upper;
            mapped
        })
        .collect()
}

fn word_boundary(payload: &str) -> String {
    let lowered = payload.to_lowercase();
    WORD_START
        .replace_all(&lowered, |caps: &regex::Captures| caps[0].to_uppercase())
        .into_owned()
}

/// Letters in stripes of `width`, switching case between stripes.
fn zebra(payload: &str, width: usize) -> String {
    let mut seen = 0usize;
    payload
        .chars()
        .map(|c| {
            if !c.is_ascii_alphabetic() {
                return c;
            }
            let stripe = (seen / width.max(1)) % 2 == 0;
            seen += 1;
            if stripe {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

fn leetspeak(payload: &str) -> String {
    payload
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            'a' => '4',
            'e' => '3',
            'i' => '1',
            'o' => '0',
            's' => '5',
            't' => '7',
            'g' => '9',
            'b' => '8',
            _ => c,
        })
        .collect()
}

fn random_ratio(payload: &str, ratio: f64, rng: &mut dyn RngCore) -> String {
    payload
        .chars()
        .map(|c| {
            if !c.is_ascii_alphabetic() {
                c
            } else if rng.gen_bool(ratio) {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EvasionLevel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_alternating_skips_non_letters() {
        assert_eq!(alternating("union select", true), "UnIoN sElEcT");
        assert_eq!(alternating("union select", false), "uNiOn SeLeCt");
    }

    #[test]
    fn test_word_boundary() {
        assert_eq!(word_boundary("UNION select from"), "Union Select From");
    }

    #[test]
    fn test_zebra() {
        assert_eq!(zebra("script", 2), "SCriPT");
    }

    #[test]
    fn test_leetspeak() {
        assert_eq!(leetspeak("select"), "53l3c7");
    }

    #[test]
    fn test_digits_only_force_encoded() {
        let out = MixedCaseTransform.generate("123", EvasionLevel::Basic, &mut StdRng::seed_from_u64(0));
        assert_eq!(out, vec!["%31%32%33".to_string()]);
    }

    #[test]
    fn test_random_ratio_preserves_letters() {
        let mut rng = StdRng::seed_from_u64(42);
        let v = random_ratio("select", 0.5, &mut rng);
        assert_eq!(v.to_lowercase(), "select");
    }
}
