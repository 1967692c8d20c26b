//! Encoding transform library.
//!
//! Every technique turns one payload into an ordered set of unique variants.
//! Generation is tiered: the Basic tier runs first, then Medium and Advanced
//! append to the same set, so a lower level's output is always contained in
//! a higher level's output. Techniques that draw randomness only do so from
//! the Medium tier upward.

pub mod base64;
pub mod binary;
pub mod case;
pub mod command;
pub mod entity;
pub mod hex;
pub mod homograph;
pub mod octal;
pub mod path;
pub mod unicode;
pub mod url;
pub mod utf8;

use ahash::AHashSet;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EvasionError;
use crate::registry::TechniqueId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvasionLevel {
    Basic,
    Medium,
    Advanced,
}

impl EvasionLevel {
    pub const ALL: [EvasionLevel; 3] = [EvasionLevel::Basic, EvasionLevel::Medium, EvasionLevel::Advanced];

    pub fn name(&self) -> &'static str {
        match self {
            EvasionLevel::Basic => "basic",
            EvasionLevel::Medium => "medium",
            EvasionLevel::Advanced => "advanced",
        }
    }
}

impl Default for EvasionLevel {
    fn default() -> Self {
        EvasionLevel::Basic
    }
}

impl fmt::Display for EvasionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvasionLevel {
    type Err = EvasionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" | "1" => Ok(EvasionLevel::Basic),
            "medium" | "2" => Ok(EvasionLevel::Medium),
            "advanced" | "3" => Ok(EvasionLevel::Advanced),
            _ => Err(EvasionError::UnknownLevel(s.to_string())),
        }
    }
}

/// Ordered, exact-match deduplicating collector for one (payload, technique)
/// call. Empty strings and strings equal to the source payload are dropped.
#[derive(Debug, Clone)]
pub struct VariantSet {
    source: String,
    seen: AHashSet<String>,
    variants: Vec<String>,
}

impl VariantSet {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            seen: AHashSet::new(),
            variants: Vec::new(),
        }
    }

    /// Returns true when the candidate was new.
    pub fn push(&mut self, candidate: impl Into<String>) -> bool {
        let candidate = candidate.into();
        if candidate.is_empty() || candidate == self.source {
            return false;
        }
        if !self.seen.insert(candidate.clone()) {
            return false;
        }
        self.variants.push(candidate);
        true
    }

    pub fn extend<I, S>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for c in candidates {
            self.push(c);
        }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.seen.contains(candidate)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.variants
    }

    pub fn into_vec(self) -> Vec<String> {
        self.variants
    }
}

/// One technique family.
///
/// Implementors fill the three tiers; `generate` handles level gating, the
/// empty-payload rule and the force-encode fallback.
pub trait Transform: Send + Sync {
    fn id(&self) -> TechniqueId;

    fn basic(&self, payload: &str, out: &mut VariantSet);

    fn medium(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore);

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore);

    /// Encoding of every character, used when the Basic tier finds nothing
    /// it would normally transform.
    fn force_encode(&self, payload: &str) -> String;

    /// Whether output may differ between runs with different random sources.
    fn randomized(&self) -> bool {
        false
    }

    fn generate(&self, payload: &str, level: EvasionLevel, rng: &mut dyn RngCore) -> Vec<String> {
        if payload.is_empty() {
            return Vec::new();
        }
        let mut out = VariantSet::new(payload);
        self.basic(payload, &mut out);
        if out.is_empty() {
            out.push(self.force_encode(payload));
        }
        if level >= EvasionLevel::Medium {
            self.medium(payload, &mut out, rng);
        }
        if level >= EvasionLevel::Advanced {
            self.advanced(payload, &mut out, rng);
        }
        out.into_vec()
    }
}

static BASE64: base64::Base64Transform = base64::Base64Transform;
static HEX: hex::HexTransform = hex::HexTransform;
static OCTAL: octal::OctalTransform = octal::OctalTransform;
static DECIMAL_ENTITY: entity::DecimalEntityTransform = entity::DecimalEntityTransform;
static HEX_ENTITY: entity::HexEntityTransform = entity::HexEntityTransform;
static URL: url::UrlTransform = url::UrlTransform;
static UNICODE: unicode::UnicodeTransform = unicode::UnicodeTransform;
static UTF8: utf8::Utf8Transform = utf8::Utf8Transform;
static BINARY: binary::BinaryTransform = binary::BinaryTransform;
static BEST_FIT: homograph::BestFitTransform = homograph::BestFitTransform;
static MIXED_CASE: case::MixedCaseTransform = case::MixedCaseTransform;
static UNIX_COMMAND: command::UnixCommandTransform = command::UnixCommandTransform;
static WINDOWS_COMMAND: command::WindowsCommandTransform = command::WindowsCommandTransform;
static PATH_TRAVERSAL: path::PathTraversalTransform = path::PathTraversalTransform;

/// Dispatcher from identifier to implementation.
pub fn transform_for(id: TechniqueId) -> &'static dyn Transform {
    match id {
        TechniqueId::Base64 => &BASE64,
        TechniqueId::Hex => &HEX,
        TechniqueId::Octal => &OCTAL,
        TechniqueId::DecimalEntity => &DECIMAL_ENTITY,
        TechniqueId::HexEntity => &HEX_ENTITY,
        TechniqueId::Url => &URL,
        TechniqueId::Unicode => &UNICODE,
        TechniqueId::Utf8 => &UTF8,
        TechniqueId::Binary => &BINARY,
        TechniqueId::BestFit => &BEST_FIT,
        TechniqueId::MixedCase => &MIXED_CASE,
        TechniqueId::UnixCommand => &UNIX_COMMAND,
        TechniqueId::WindowsCommand => &WINDOWS_COMMAND,
        TechniqueId::PathTraversal => &PATH_TRAVERSAL,
    }
}

/// Characters that filters commonly key on. Families with a "partial" mode
/// only touch these.
pub(crate) fn is_special(c: char) -> bool {
    !c.is_ascii_alphanumeric()
}

/// Encodes each byte of `payload` with `f`, joining with `sep`.
pub(crate) fn map_bytes<F>(payload: &str, sep: &str, f: F) -> String
where
    F: Fn(u8) -> String,
{
    payload.bytes().map(f).collect::<Vec<_>>().join(sep)
}

/// Encodes only the bytes of special characters, leaving alphanumerics as-is.
pub(crate) fn map_special_bytes<F>(payload: &str, f: F) -> String
where
    F: Fn(u8) -> String,
{
    let mut out = String::with_capacity(payload.len() * 4);
    for ch in payload.chars() {
        if is_special(ch) {
            let mut buf = [0u8; 4];
            for b in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&f(b));
            }
        } else {
            out.push(ch);
        }
    }
    out
}
