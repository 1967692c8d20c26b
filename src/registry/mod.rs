// Technique registry: which transforms apply to which attack class.
// Built once, read-only afterwards.

pub mod attack;
pub mod technique;

pub use attack::AttackType;
pub use technique::{Category, TechniqueId};

use ahash::AHashMap;
use once_cell::sync::Lazy;

use TechniqueId::*;

/// Techniques used when an attack type is not in the table. Downstream
/// selection branches on this exact list.
pub const FALLBACK_TECHNIQUES: [TechniqueId; 3] = [Base64, Hex, Unicode];

static DEFAULT_REGISTRY: Lazy<TechniqueRegistry> = Lazy::new(TechniqueRegistry::builtin);

#[derive(Debug, Clone)]
pub struct TechniqueRegistry {
    table: AHashMap<String, Vec<TechniqueId>>,
}

impl TechniqueRegistry {
    /// Process-wide registry with the built-in table.
    pub fn global() -> &'static TechniqueRegistry {
        &DEFAULT_REGISTRY
    }

    /// Build a registry from an explicit table. Lists are deduplicated,
    /// keeping the first occurrence.
    pub fn from_table<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<TechniqueId>)>,
        S: Into<String>,
    {
        let table = entries
            .into_iter()
            .map(|(name, list)| (name.into().to_lowercase(), dedup_ordered(list)))
            .collect();
        Self { table }
    }

    fn builtin() -> Self {
        Self::from_table(AttackType::ALL.iter().map(|a| (a.name(), builtin_list(*a))))
    }

    /// Ordered technique list for an attack type name and whether the name is
    /// known. Unknown names yield `FALLBACK_TECHNIQUES` with `false`.
    pub fn applicable_techniques(&self, attack_type: &str) -> (&[TechniqueId], bool) {
        let key = canonical_key(attack_type);
        match self.table.get(&key) {
            Some(list) => (list.as_slice(), true),
            None => (&FALLBACK_TECHNIQUES, false),
        }
    }

    /// Typed lookup; falls back like `applicable_techniques` when the table
    /// was built without this attack type.
    pub fn techniques_for(&self, attack_type: AttackType) -> &[TechniqueId] {
        self.applicable_techniques(attack_type.name()).0
    }

    pub fn category(&self, technique: TechniqueId) -> Category {
        technique.category()
    }

    pub fn is_applicable(&self, attack_type: &str, technique: TechniqueId) -> bool {
        self.applicable_techniques(attack_type).0.contains(&technique)
    }

    pub fn attack_types(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(|k| k.as_str())
    }
}

impl Default for TechniqueRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn canonical_key(name: &str) -> String {
    match name.parse::<AttackType>() {
        Ok(attack) => attack.name().to_string(),
        Err(_) => name.trim().to_lowercase(),
    }
}

fn dedup_ordered(list: Vec<TechniqueId>) -> Vec<TechniqueId> {
    let mut seen = ahash::AHashSet::with_capacity(list.len());
    list.into_iter().filter(|t| seen.insert(*t)).collect()
}

fn builtin_list(attack: AttackType) -> Vec<TechniqueId> {
    match attack {
        AttackType::Xss => vec![
            DecimalEntity, HexEntity, Unicode, Url, Hex, MixedCase, BestFit, Utf8, Base64, Octal,
        ],
        AttackType::Sqli => vec![
            Base64, Hex, Url, MixedCase, Unicode, BestFit, DecimalEntity, Octal, Utf8, Binary,
        ],
        AttackType::UnixCommandInjection => vec![
            UnixCommand, Base64, Hex, Octal, Url, MixedCase, Utf8, Unicode,
        ],
        AttackType::WindowsCommandInjection => vec![
            WindowsCommand, Base64, Url, MixedCase, Unicode, Utf8, Hex,
        ],
        AttackType::PathTraversal => vec![PathTraversal, Url, Utf8, Unicode, Hex, BestFit],
        AttackType::FileAccess => vec![PathTraversal, Url, Utf8, Base64, Unicode],
        AttackType::LdapInjection => vec![Url, Hex, Unicode, MixedCase, Utf8],
        AttackType::Ssrf => vec![Url, Hex, Octal, DecimalEntity, Unicode, Utf8, BestFit],
        AttackType::Xxe => vec![DecimalEntity, HexEntity, Utf8, Unicode, Url, Base64],
        AttackType::Generic => vec![Base64, Hex, Unicode, Url, DecimalEntity, MixedCase],
        AttackType::All => TechniqueId::ALL.to_vec(),
    }
}
