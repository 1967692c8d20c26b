//! UTF-8 byte-level encodings.
//!
//! Overlong and malformed sequences cannot live in a Rust `String`, so every
//! form that produces invalid UTF-8 is emitted percent-encoded.

use rand::{Rng, RngCore};

use super::{map_bytes, Transform, VariantSet};
use crate::registry::TechniqueId;

const BOM: &str = "%EF%BB%BF";

pub struct Utf8Transform;

impl Transform for Utf8Transform {
    fn id(&self) -> TechniqueId {
        TechniqueId::Utf8
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(map_bytes(payload, "", |b| format!("\\x{:02X}", b)));
        out.push(map_bytes(payload, "", |b| format!("%{:02X}", b)));
        out.push(map_bytes(payload, "", |b| format!("\\{:03o}", b)));
        out.push(map_bytes(payload, ",", |b| b.to_string()));
        out.push(map_bytes(payload, " ", |b| format!("{:08b}", b)));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        out.push(overlong_specials(payload, overlong2));
        out.push(overlong_all(payload, overlong2));
        out.push(overlong_specials(payload, overlong3));
        out.push(format!("{}{}", BOM, map_bytes(payload, "", |b| format!("%{:02X}", b))));
        out.push(format!("\u{FEFF}{}", payload));
        out.push(format!("{}{}", BOM, urlencoding::encode(payload)));
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        out.push(overlong_specials(payload, overlong4));
        out.push(overlong_all(payload, overlong3));

        // Truncated sequence: a lead byte with its continuation missing.
        out.push(format!("%C0{}", map_bytes(payload, "", |b| format!("%{:02X}", b))));
        out.push(
            payload
                .chars()
                .map(|c| {
                    if super::is_special(c) && c.is_ascii() {
                        format!("%C0%{:02X}", c as u8)
                    } else {
                        pct_char(c)
                    }
                })
                .collect::<String>(),
        );

        out.push(cesu8(payload));
        out.push(format!("%ED%A0%80{}", map_bytes(payload, "", |b| format!("%{:02X}", b))));

        // Random mix of plain and overlong forms.
        out.push(
            payload
                .chars()
                .map(|c| {
                    if c.is_ascii() {
                        match rng.gen_range(0..3) {
                            0 => pct_bytes(&overlong2(c as u8)),
                            1 => pct_bytes(&overlong3(c as u8)),
                            _ => format!("%{:02X}", c as u8),
                        }
                    } else {
                        pct_char(c)
                    }
                })
                .collect::<String>(),
        );
    }

    fn force_encode(&self, payload: &str) -> String {
        map_bytes(payload, "", |b| format!("%{:02X}", b))
    }

    fn randomized(&self) -> bool {
        true
    }
}

/// Two-byte overlong form of an ASCII byte.
pub fn overlong2(b: u8) -> [u8; 2] {
    [0xC0 | (b >> 6), 0x80 | (b & 0x3F)]
}

pub fn overlong3(b: u8) -> [u8; 3] {
    [0xE0, 0x80 | (b >> 6), 0x80 | (b & 0x3F)]
}

pub fn overlong4(b: u8) -> [u8; 4] {
    [0xF0, 0x80, 0x80 | (b >> 6), 0x80 | (b & 0x3F)]
}

fn pct_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("%{:02X}", b)).collect()
}

fn pct_char(c: char) -> String {
    let mut buf = [0u8; 4];
    pct_bytes(c.encode_utf8(&mut buf).as_bytes())
}

fn overlong_specials<F, A>(payload: &str, f: F) -> String
where
    F: Fn(u8) -> A,
    A: AsRef<[u8]>,
{
    payload
        .chars()
        .map(|c| {
            if c.is_ascii() && super::is_special(c) {
                pct_bytes(f(c as u8).as_ref())
            } else if c.is_ascii() {
                c.to_string()
            } else {
                pct_char(c)
            }
        })
        .collect()
}

fn overlong_all<F, A>(payload: &str, f: F) -> String
where
    F: Fn(u8) -> A,
    A: AsRef<[u8]>,
{
    payload
        .chars()
        .map(|c| if c.is_ascii() { pct_bytes(f(c as u8).as_ref()) } else { pct_char(c) })
        .collect()
}

/// CESU-8: astral characters as two separately encoded surrogates.
fn cesu8(payload: &str) -> String {
    let mut out = String::new();
    for c in payload.chars() {
        if (c as u32) < 0x10000 {
            out.push_str(&pct_char(c));
            continue;
        }
        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units).iter() {
            let u = *unit as u32;
            out.push_str(&pct_bytes(&[
                0xE0 | (u >> 12) as u8,
                0x80 | ((u >> 6) & 0x3F) as u8,
                0x80 | (u & 0x3F) as u8,
            ]));
        }
    }
    out
}
