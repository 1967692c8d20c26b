//! Variant assembly: runs techniques against payloads, isolates failures and
//! keeps per-technique results ordered and unique.

use std::panic::{self, AssertUnwindSafe};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::encode::{transform_for, EvasionLevel, Transform};
use crate::error::Result;
use crate::registry::{Category, TechniqueId, TechniqueRegistry};

/// Where randomized techniques draw from. Each call gets its own generator,
/// so parallel workers never share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngPolicy {
    Entropy,
    Seeded(u64),
}

impl RngPolicy {
    fn rng_for(&self, technique: TechniqueId, stream: u64) -> StdRng {
        match self {
            RngPolicy::Entropy => StdRng::from_entropy(),
            RngPolicy::Seeded(seed) => {
                StdRng::seed_from_u64(mix(*seed ^ ((technique as u64) << 32) ^ stream))
            }
        }
    }
}

/// splitmix64 finalizer; spreads neighbouring seeds apart.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Result of one technique on one payload. A failed technique carries the
/// fault message and no variants.
#[derive(Debug, Clone)]
pub struct TechniqueOutcome {
    pub technique: TechniqueId,
    pub variants: Vec<String>,
    pub failure: Option<String>,
}

impl TechniqueOutcome {
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueVariants {
    pub technique: TechniqueId,
    pub category: Category,
    pub variants: Vec<String>,
}

/// Technique → variants for one payload, in technique order. Techniques that
/// produced nothing are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledVariants {
    pub payload: String,
    pub level: EvasionLevel,
    pub entries: Vec<TechniqueVariants>,
    /// Techniques whose execution faulted, with the reason.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<(TechniqueId, String)>,
}

impl AssembledVariants {
    pub fn get(&self, technique: TechniqueId) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.technique == technique)
            .map(|e| e.variants.as_slice())
    }

    pub fn techniques(&self) -> Vec<TechniqueId> {
        self.entries.iter().map(|e| e.technique).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_variants(&self) -> usize {
        self.entries.iter().map(|e| e.variants.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TechniqueVariants> {
        self.entries.iter()
    }
}

pub struct Assembler<'r> {
    registry: &'r TechniqueRegistry,
    rng: RngPolicy,
}

impl Assembler<'static> {
    /// Assembler over the process-wide registry with entropy-seeded RNGs.
    pub fn global() -> Self {
        Self::new(TechniqueRegistry::global())
    }
}

impl<'r> Assembler<'r> {
    pub fn new(registry: &'r TechniqueRegistry) -> Self {
        Self {
            registry,
            rng: RngPolicy::Entropy,
        }
    }

    /// Fixed-seed generators: randomized techniques become reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = RngPolicy::Seeded(seed);
        self
    }

    pub fn with_rng_policy(mut self, policy: RngPolicy) -> Self {
        self.rng = policy;
        self
    }

    pub fn registry(&self) -> &TechniqueRegistry {
        self.registry
    }

    /// Runs a technique by name. Only an unknown name is an error; a
    /// technique that yields nothing, or faults, returns an empty list.
    pub fn apply_technique(&self, payload: &str, technique: &str, level: EvasionLevel) -> Result<Vec<String>> {
        let id: TechniqueId = technique.parse()?;
        Ok(self.apply(payload, id, level).variants)
    }

    pub fn apply(&self, payload: &str, technique: TechniqueId, level: EvasionLevel) -> TechniqueOutcome {
        self.apply_stream(payload, technique, level, 0)
    }

    fn apply_stream(&self, payload: &str, technique: TechniqueId, level: EvasionLevel, stream: u64) -> TechniqueOutcome {
        self.apply_transform(transform_for(technique), payload, level, stream)
    }

    /// Runs one transform inside the failure boundary: a panic becomes an
    /// outcome with no variants and the panic message as its failure.
    fn apply_transform(&self, transform: &dyn Transform, payload: &str, level: EvasionLevel, stream: u64) -> TechniqueOutcome {
        let technique = transform.id();
        let mut rng = self.rng.rng_for(technique, stream);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            transform.generate(payload, level, &mut rng)
        }));

        match result {
            Ok(variants) => {
                tracing::debug!(technique = %technique, level = %level, count = variants.len(), "technique applied");
                TechniqueOutcome {
                    technique,
                    variants,
                    failure: None,
                }
            }
            Err(cause) => {
                let reason = panic_message(cause.as_ref());
                tracing::warn!(technique = %technique, payload_len = payload.len(), reason = %reason, "technique failed; treating as zero variants");
                TechniqueOutcome {
                    technique,
                    variants: Vec::new(),
                    failure: Some(reason),
                }
            }
        }
    }

    /// Technique order for a run. With a filter (e.g. a WAF priority list)
    /// the filter's order wins and only techniques applicable to the attack
    /// type survive; without one, registry order is used.
    pub fn plan(&self, attack_type: &str, filter: Option<&[TechniqueId]>) -> Vec<TechniqueId> {
        let (applicable, _) = self.registry.applicable_techniques(attack_type);
        match filter {
            Some(order) => {
                let mut seen = ahash::AHashSet::new();
                order
                    .iter()
                    .copied()
                    .filter(|t| applicable.contains(t) && seen.insert(*t))
                    .collect()
            }
            None => applicable.to_vec(),
        }
    }

    /// Requested techniques that `plan` would drop for this attack type.
    pub fn inapplicable(&self, attack_type: &str, requested: &[TechniqueId]) -> Vec<TechniqueId> {
        let (applicable, _) = self.registry.applicable_techniques(attack_type);
        requested.iter().copied().filter(|t| !applicable.contains(t)).collect()
    }

    pub fn assemble(
        &self,
        payload: &str,
        attack_type: &str,
        level: EvasionLevel,
        filter: Option<&[TechniqueId]>,
    ) -> AssembledVariants {
        let plan = self.plan(attack_type, filter);
        let transforms = resolve(&plan);
        self.assemble_planned(payload, &transforms, level, 0)
    }

    /// One worker per payload; results keep the input order.
    pub fn assemble_batch(
        &self,
        payloads: &[String],
        attack_type: &str,
        level: EvasionLevel,
        filter: Option<&[TechniqueId]>,
    ) -> Vec<AssembledVariants> {
        self.assemble_batch_with(payloads, attack_type, level, filter, &|_| {})
    }

    /// `assemble_batch` that calls `on_done` with each finished payload's
    /// index, from whichever worker finished it.
    pub fn assemble_batch_with(
        &self,
        payloads: &[String],
        attack_type: &str,
        level: EvasionLevel,
        filter: Option<&[TechniqueId]>,
        on_done: &(dyn Fn(usize) + Sync),
    ) -> Vec<AssembledVariants> {
        let plan = self.plan(attack_type, filter);
        self.assemble_batch_planned(payloads, &resolve(&plan), level, on_done)
    }

    fn assemble_batch_planned(
        &self,
        payloads: &[String],
        transforms: &[&dyn Transform],
        level: EvasionLevel,
        on_done: &(dyn Fn(usize) + Sync),
    ) -> Vec<AssembledVariants> {
        tracing::debug!(payloads = payloads.len(), techniques = transforms.len(), level = %level, "batch assembly");
        payloads
            .par_iter()
            .enumerate()
            .map(|(i, payload)| {
                let assembled = self.assemble_planned(payload, transforms, level, i as u64);
                on_done(i);
                assembled
            })
            .collect()
    }

    fn assemble_planned(&self, payload: &str, transforms: &[&dyn Transform], level: EvasionLevel, stream: u64) -> AssembledVariants {
        let mut entries = Vec::with_capacity(transforms.len());
        let mut failures = Vec::new();

        for &transform in transforms {
            let technique = transform.id();
            let outcome = self.apply_transform(transform, payload, level, stream);
            if let Some(reason) = outcome.failure {
                failures.push((technique, reason));
                continue;
            }
            if outcome.variants.is_empty() {
                continue;
            }
            entries.push(TechniqueVariants {
                technique,
                category: technique.category(),
                variants: outcome.variants,
            });
        }

        AssembledVariants {
            payload: payload.to_string(),
            level,
            entries,
            failures,
        }
    }
}

fn resolve(plan: &[TechniqueId]) -> Vec<&'static dyn Transform> {
    plan.iter().map(|t| transform_for(*t)).collect()
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "technique panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::VariantSet;

    #[test]
    fn test_unknown_technique_is_error() {
        let assembler = Assembler::global();
        let err = assembler.apply_technique("x", "rot13", EvasionLevel::Basic).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_payload_yields_empty_mapping() {
        let assembler = Assembler::global();
        for level in EvasionLevel::ALL {
            assert!(assembler.assemble("", "all", level, None).is_empty());
        }
        assert!(assembler.apply_technique("", "hex", EvasionLevel::Advanced).unwrap().is_empty());
    }

    #[test]
    fn test_plan_respects_filter_order() {
        let assembler = Assembler::global();
        let filter = [TechniqueId::MixedCase, TechniqueId::PathTraversal, TechniqueId::Hex];
        let plan = assembler.plan("xss", Some(&filter[..]));
        assert_eq!(plan, vec![TechniqueId::MixedCase, TechniqueId::Hex]);
    }

    #[test]
    fn test_inapplicable_lists_dropped_techniques() {
        let assembler = Assembler::global();
        let requested = [TechniqueId::PathTraversal, TechniqueId::Hex, TechniqueId::UnixCommand];
        assert_eq!(
            assembler.inapplicable("xss", &requested),
            vec![TechniqueId::PathTraversal, TechniqueId::UnixCommand]
        );
        assert!(assembler.inapplicable("all", &requested).is_empty());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let registry = TechniqueRegistry::global();
        let a = Assembler::new(registry).with_seed(99).assemble("<svg onload=x>", "xss", EvasionLevel::Advanced, None);
        let b = Assembler::new(registry).with_seed(99).assemble("<svg onload=x>", "xss", EvasionLevel::Advanced, None);
        assert_eq!(a.entries.len(), b.entries.len());
        for (x, y) in a.entries.iter().zip(b.entries.iter()) {
            assert_eq!(x.variants, y.variants);
        }
    }

    struct Faulty;

    impl Transform for Faulty {
        fn id(&self) -> TechniqueId {
            TechniqueId::Hex
        }

        fn basic(&self, payload: &str, _out: &mut VariantSet) {
            if payload.contains("boom") {
                panic!("cannot encode {}", payload);
            }
        }

        fn medium(&self, _payload: &str, _out: &mut VariantSet, _rng: &mut dyn rand::RngCore) {}

        fn advanced(&self, _payload: &str, _out: &mut VariantSet, _rng: &mut dyn rand::RngCore) {}

        fn force_encode(&self, payload: &str) -> String {
            format!("[{}]", payload)
        }
    }

    #[test]
    fn test_faulting_transform_is_isolated() {
        let assembler = Assembler::global();
        let transforms: Vec<&dyn Transform> = vec![transform_for(TechniqueId::Base64), &Faulty, transform_for(TechniqueId::Url)];

        let result = assembler.assemble_planned("boom<x>", &transforms, EvasionLevel::Basic, 0);
        assert_eq!(result.techniques(), vec![TechniqueId::Base64, TechniqueId::Url]);
        assert_eq!(result.get(TechniqueId::Hex), None);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].0, TechniqueId::Hex);
        assert!(result.failures[0].1.contains("cannot encode"));

        let outcome = assembler.apply_transform(&Faulty, "boom", EvasionLevel::Medium, 0);
        assert!(outcome.failed());
        assert!(outcome.variants.is_empty());
    }

    #[test]
    fn test_batch_continues_past_a_fault() {
        let assembler = Assembler::global().with_seed(3);
        let transforms: Vec<&dyn Transform> = vec![&Faulty, transform_for(TechniqueId::Base64)];
        let payloads = vec!["boom".to_string(), "ok".to_string(), "boom again".to_string()];

        let results = assembler.assemble_batch_planned(&payloads, &transforms, EvasionLevel::Basic, &|_| {});
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].failures.len(), 1);
        assert!(results[1].failures.is_empty());
        assert_eq!(results[1].get(TechniqueId::Hex), Some(&["[ok]".to_string()][..]));
        assert_eq!(results[2].failures.len(), 1);
        for result in &results {
            assert!(result.get(TechniqueId::Base64).is_some());
        }
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
