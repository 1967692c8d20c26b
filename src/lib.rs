pub mod assembly;
pub mod concurrent;
pub mod config;
pub mod encode;
pub mod error;
pub mod harness;
pub mod http_client;
pub mod output;
pub mod payloads;
pub mod registry;
pub mod waf;

// re-export the types most callers need
pub use crate::assembly::{AssembledVariants, Assembler, RngPolicy, TechniqueOutcome, TechniqueVariants};
pub use crate::config::{EngineConfig, PayloadSource};
pub use crate::encode::{transform_for, EvasionLevel, Transform, VariantSet};
pub use crate::error::{EvasionError, Result};
pub use crate::registry::{AttackType, Category, TechniqueId, TechniqueRegistry, FALLBACK_TECHNIQUES};
pub use crate::waf::{FingerprintEngine, WafFingerprint, WafType};
