//! Best-fit and homograph substitution.
//!
//! Confusables come from the Cyrillic, Greek, mathematical alphanumeric and
//! modifier-letter blocks; punctuation uses fullwidth and best-fit forms that
//! legacy code pages fold back to ASCII. The Medium and Advanced tiers add
//! invisible characters, combining marks, bidi controls and ligatures.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use smallvec::SmallVec;

use super::{Transform, VariantSet};
use crate::registry::TechniqueId;

const ZERO_WIDTH_SPACE: char = '\u{200B}';
const INVISIBLES: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{2060}'];
const COMBINING_MARKS: [char; 4] = ['\u{0301}', '\u{0308}', '\u{0336}', '\u{0338}'];

const RLO: char = '\u{202E}';
const LRO: char = '\u{202D}';
const PDF: char = '\u{202C}';
const LRI: char = '\u{2066}';
const PDI: char = '\u{2069}';

fn cyrillic(c: char) -> Option<char> {
    let mapped = match c {
        'a' => 'а',
        'c' => 'с',
        'd' => 'ԁ',
        'e' => 'е',
        'h' => 'һ',
        'i' => 'і',
        'j' => 'ј',
        'o' => 'о',
        'p' => 'р',
        'q' => 'ԛ',
        's' => 'ѕ',
        'w' => 'ԝ',
        'x' => 'х',
        'y' => 'у',
        'A' => 'А',
        'B' => 'В',
        'C' => 'С',
        'E' => 'Е',
        'H' => 'Н',
        'I' => 'І',
        'J' => 'Ј',
        'K' => 'К',
        'M' => 'М',
        'O' => 'О',
        'P' => 'Р',
        'S' => 'Ѕ',
        'T' => 'Т',
        'X' => 'Х',
        'Y' => 'Ү',
        _ => return None,
    };
    Some(mapped)
}

fn greek(c: char) -> Option<char> {
    let mapped = match c {
        'a' => 'α',
        'i' => 'ι',
        'k' => 'κ',
        'o' => 'ο',
        'p' => 'ρ',
        't' => 'τ',
        'u' => 'υ',
        'v' => 'ν',
        'x' => 'χ',
        'A' => 'Α',
        'B' => 'Β',
        'E' => 'Ε',
        'H' => 'Η',
        'I' => 'Ι',
        'K' => 'Κ',
        'M' => 'Μ',
        'N' => 'Ν',
        'O' => 'Ο',
        'P' => 'Ρ',
        'T' => 'Τ',
        'X' => 'Χ',
        'Y' => 'Υ',
        'Z' => 'Ζ',
        _ => return None,
    };
    Some(mapped)
}

fn modifier_letter(c: char) -> Option<char> {
    let mapped = match c {
        'a' => 'ᵃ',
        'b' => 'ᵇ',
        'c' => 'ᶜ',
        'd' => 'ᵈ',
        'e' => 'ᵉ',
        'f' => 'ᶠ',
        'g' => 'ᵍ',
        'h' => 'ʰ',
        'i' => 'ⁱ',
        'j' => 'ʲ',
        'k' => 'ᵏ',
        'l' => 'ˡ',
        'm' => 'ᵐ',
        'n' => 'ⁿ',
        'o' => 'ᵒ',
        'p' => 'ᵖ',
        'r' => 'ʳ',
        's' => 'ˢ',
        't' => 'ᵗ',
        'u' => 'ᵘ',
        'v' => 'ᵛ',
        'w' => 'ʷ',
        'x' => 'ˣ',
        'y' => 'ʸ',
        'z' => 'ᶻ',
        _ => return None,
    };
    Some(mapped)
}

/// Mathematical alphanumeric symbols. The bold and monospace ranges have no
/// reserved holes, so plain offsets work.
fn math(c: char, upper_base: u32, lower_base: u32, digit_base: u32) -> Option<char> {
    let offset = match c {
        'A'..='Z' => upper_base + (c as u32 - 'A' as u32),
        'a'..='z' => lower_base + (c as u32 - 'a' as u32),
        '0'..='9' => digit_base + (c as u32 - '0' as u32),
        _ => return None,
    };
    char::from_u32(offset)
}

fn math_bold(c: char) -> Option<char> {
    math(c, 0x1D400, 0x1D41A, 0x1D7CE)
}

fn math_monospace(c: char) -> Option<char> {
    math(c, 0x1D670, 0x1D68A, 0x1D7F6)
}

fn fullwidth(c: char) -> Option<char> {
    match c {
        '!'..='~' => char::from_u32(c as u32 + 0xFEE0),
        ' ' => Some('\u{3000}'),
        _ => None,
    }
}

/// Punctuation look-alikes that Windows best-fit tables map to ASCII.
fn best_fit_punctuation(c: char) -> SmallVec<[char; 4]> {
    let alts: &[char] = match c {
        '<' => &['＜', '‹', '˂'],
        '>' => &['＞', '›', '˃'],
        '\'' => &['ʼ', '′', '＇'],
        '"' => &['″', '＂', '“'],
        '/' => &['∕', '⁄', '／'],
        '\\' => &['∖', '＼'],
        '.' => &['․', '．'],
        '(' => &['⁽', '（'],
        ')' => &['⁾', '）'],
        '=' => &['⁼', '＝'],
        ';' => &['\u{037E}', '；'],
        ':' => &['꞉', '：'],
        '-' => &['‐', '－'],
        _ => &[],
    };
    alts.iter().copied().collect()
}

/// Every confusable known for a character, best-fit forms first.
pub fn confusables(c: char) -> SmallVec<[char; 4]> {
    let mut alts = best_fit_punctuation(c);
    let tables: [fn(char) -> Option<char>; 6] =
        [cyrillic, greek, math_bold, math_monospace, modifier_letter, fullwidth];
    for f in tables {
        if let Some(alt) = f(c) {
            if !alts.contains(&alt) {
                alts.push(alt);
            }
        }
    }
    alts
}

fn substitute<F>(payload: &str, f: F) -> String
where
    F: Fn(char) -> Option<char>,
{
    payload.chars().map(|c| f(c).unwrap_or(c)).collect()
}

fn interleave(payload: &str, sep: char) -> String {
    let mut out = String::with_capacity(payload.len() * 4);
    let mut chars = payload.chars();
    if let Some(first) = chars.next() {
        out.push(first);
    }
    for c in chars {
        out.push(sep);
        out.push(c);
    }
    out
}

/// Compatibility characters that case-fold or normalize to ASCII sequences.
fn ligature_fold(payload: &str) -> String {
    payload
        .replace("ffi", "ﬃ")
        .replace("ffl", "ﬄ")
        .replace("ff", "ﬀ")
        .replace("fi", "ﬁ")
        .replace("fl", "ﬂ")
        .replace("st", "ﬆ")
}

fn case_fold_specials(payload: &str) -> String {
    payload
        .chars()
        .map(|c| match c {
            's' => 'ſ',
            'k' | 'K' => '\u{212A}',
            'i' => 'ı',
            _ => c,
        })
        .collect()
}

pub struct BestFitTransform;

impl Transform for BestFitTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::BestFit
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(
            payload
                .chars()
                .map(|c| best_fit_punctuation(c).first().copied().unwrap_or(c))
                .collect::<String>(),
        );
        out.push(
            payload
                .chars()
                .map(|c| if super::is_special(c) { fullwidth(c).unwrap_or(c) } else { c })
                .collect::<String>(),
        );
        out.push(substitute(payload, cyrillic));
        out.push(substitute(payload, fullwidth));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        out.push(substitute(payload, greek));
        out.push(substitute(payload, math_bold));
        out.push(substitute(payload, math_monospace));
        out.push(substitute(payload, modifier_letter));
        out.push(interleave(payload, ZERO_WIDTH_SPACE));

        let mut scattered = String::with_capacity(payload.len() * 4);
        for (i, c) in payload.chars().enumerate() {
            if i > 0 && rng.gen_bool(0.4) {
                scattered.push(INVISIBLES[rng.gen_range(0..INVISIBLES.len())]);
            }
            scattered.push(c);
        }
        out.push(scattered);
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        let mut marked = String::with_capacity(payload.len() * 4);
        for c in payload.chars() {
            marked.push(c);
            if c.is_alphabetic() {
                marked.push(COMBINING_MARKS[rng.gen_range(0..COMBINING_MARKS.len())]);
            }
        }
        out.push(marked);

        let reversed: String = payload.chars().rev().collect();
        out.push(format!("{}{}{}", RLO, reversed, PDF));
        out.push(format!("{}{}{}", LRO, payload, PDF));
        out.push(format!("{}{}{}", LRI, payload, PDI));

        out.push(ligature_fold(payload));
        out.push(case_fold_specials(payload));

        // Random confusable per character, half of the time.
        let mixed: String = payload
            .chars()
            .map(|c| {
                let alts = confusables(c);
                if rng.gen_bool(0.5) {
                    alts.choose(&mut *rng).copied().unwrap_or(c)
                } else {
                    c
                }
            })
            .collect();
        out.push(mixed);
    }

    fn force_encode(&self, payload: &str) -> String {
        if payload.chars().count() == 1 {
            format!("{}{}", ZERO_WIDTH_SPACE, payload)
        } else {
            interleave(payload, ZERO_WIDTH_SPACE)
        }
    }

    fn randomized(&self) -> bool {
        true
    }
}
