//! HTML numeric entities, decimal and hex, plus named-entity substitution.
//!
//! Numeric forms work on raw bytes like the other byte-level families; named
//! entities only exist for ASCII punctuation and are applied per character.

use rand::{Rng, RngCore};

use super::{map_bytes, map_special_bytes, Transform, VariantSet};
use crate::registry::TechniqueId;

/// HTML5 named references for ASCII punctuation.
const NAMED_ENTITIES: &[(char, &str)] = &[
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&apos;"),
    ('&', "&amp;"),
    ('(', "&lpar;"),
    (')', "&rpar;"),
    ('/', "&sol;"),
    ('\\', "&bsol;"),
    ('=', "&equals;"),
    (':', "&colon;"),
    (';', "&semi;"),
    (',', "&comma;"),
    ('.', "&period;"),
    ('!', "&excl;"),
    ('#', "&num;"),
    ('$', "&dollar;"),
    ('%', "&percnt;"),
    ('*', "&ast;"),
    ('+', "&plus;"),
    ('?', "&quest;"),
    ('@', "&commat;"),
    ('[', "&lsqb;"),
    (']', "&rsqb;"),
    ('^', "&Hat;"),
    ('_', "&lowbar;"),
    ('`', "&grave;"),
    ('{', "&lcub;"),
    ('|', "&verbar;"),
    ('}', "&rcub;"),
    ('\t', "&Tab;"),
    ('\n', "&NewLine;"),
];

fn named(c: char) -> Option<&'static str> {
    NAMED_ENTITIES.iter().find(|(k, _)| *k == c).map(|(_, v)| *v)
}

/// Replaces every character that has a named reference.
fn named_substitution(payload: &str) -> String {
    payload
        .chars()
        .map(|c| named(c).map(str::to_string).unwrap_or_else(|| c.to_string()))
        .collect()
}

fn decimal(b: u8) -> String {
    format!("&#{};", b)
}

fn hex_lower(b: u8) -> String {
    format!("&#x{:x};", b)
}

/// Puts `filler` between characters.
fn fragmented(encoded_chars: &[String], filler: &str) -> String {
    encoded_chars.join(filler)
}

pub struct DecimalEntityTransform;

impl Transform for DecimalEntityTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::DecimalEntity
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(map_special_bytes(payload, decimal));
        out.push(named_substitution(payload));
        out.push(html_escape::encode_safe(payload).into_owned());
        out.push(map_bytes(payload, "", decimal));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        out.push(map_special_bytes(payload, |b| format!("&#{:07};", b)));
        out.push(map_bytes(payload, "", |b| format!("&#{:04};", b)));
        out.push(map_special_bytes(payload, |b| format!("&#{}", b)));
        out.push(map_bytes(payload, "", |b| format!("&#{}", b)));

        // Alternating decimal/hex by byte position.
        out.push(
            payload
                .bytes()
                .enumerate()
                .map(|(i, b)| if i % 2 == 0 { decimal(b) } else { hex_lower(b) })
                .collect::<String>(),
        );

        // Named where possible, otherwise decimal, chosen per character.
        let mixed: String = payload
            .chars()
            .map(|c| match named(c) {
                Some(n) if rng.gen_bool(0.5) => n.to_string(),
                _ if super::is_special(c) => map_special_bytes(&c.to_string(), decimal),
                _ => c.to_string(),
            })
            .collect();
        out.push(mixed);
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        // Invalid padding: more zeros than any parser expects.
        out.push(map_bytes(payload, "", |b| format!("&#{:020};", b)));
        out.push(map_special_bytes(payload, |b| format!("&#{};;", b)));

        let per_char: Vec<String> = payload.bytes().map(decimal).collect();
        out.push(fragmented(&per_char, "&#9;"));
        out.push(fragmented(&per_char, "&#10;"));
        out.push(fragmented(&per_char, "&Tab;"));
        out.push(fragmented(&per_char, "<!---->"));

        // Random radix per byte.
        out.push(
            payload
                .bytes()
                .map(|b| match rng.gen_range(0..3) {
                    0 => decimal(b),
                    1 => hex_lower(b),
                    _ => format!("&#X{:X};", b),
                })
                .collect::<String>(),
        );
    }

    fn force_encode(&self, payload: &str) -> String {
        map_bytes(payload, "", decimal)
    }

    fn randomized(&self) -> bool {
        true
    }
}

pub struct HexEntityTransform;

impl Transform for HexEntityTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::HexEntity
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(map_special_bytes(payload, hex_lower));
        out.push(map_special_bytes(payload, |b| format!("&#X{:X};", b)));
        out.push(map_bytes(payload, "", hex_lower));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        out.push(map_bytes(payload, "", |b| format!("&#x{:04x};", b)));
        out.push(map_special_bytes(payload, |b| format!("&#x{:x}", b)));
        out.push(map_bytes(payload, "", |b| format!("&#X{:02x};", b)));
        out.push(
            payload
                .bytes()
                .map(|b| {
                    let x = if rng.gen_bool(0.5) { 'x' } else { 'X' };
                    let digits = if rng.gen_bool(0.5) {
                        format!("{:x}", b)
                    } else {
                        format!("{:X}", b)
                    };
                    format!("&#{}{};", x, digits)
                })
                .collect::<String>(),
        );
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        out.push(map_bytes(payload, "", |b| format!("&#x{:016x};", b)));
        out.push(
            payload
                .bytes()
                .enumerate()
                .map(|(i, b)| if i % 2 == 0 { hex_lower(b) } else { decimal(b) })
                .collect::<String>(),
        );

        let per_char: Vec<String> = payload.bytes().map(hex_lower).collect();
        out.push(fragmented(&per_char, "&#x9;"));
        out.push(fragmented(&per_char, "&#xa;"));
        out.push(fragmented(&per_char, "<!---->"));

        // Random zero padding per byte.
        out.push(
            payload
                .bytes()
                .map(|b| format!("&#x{}{:x};", "0".repeat(rng.gen_range(0..6)), b))
                .collect::<String>(),
        );
    }

    fn force_encode(&self, payload: &str) -> String {
        map_bytes(payload, "", hex_lower)
    }

    fn randomized(&self) -> bool {
        true
    }
}
