// WAF fingerprinting and adaptive technique selection.
// Network access only happens through a ProbeTransport.

pub mod adaptive;
pub mod detector;
pub mod engine;
pub mod signatures;
pub mod transport;

pub use adaptive::{optimal_techniques, prioritize, GENERIC_TECHNIQUES};
pub use detector::{
    classify, is_blocked_response, BehaviorFlags, ProbeObservation, WafFingerprint, WafType,
    ACCEPTANCE_THRESHOLD,
};
pub use engine::{fingerprint_many, parse_target, FingerprintEngine, Probe, DEFAULT_PROBES};
pub use signatures::{load_signatures, WafSignature};
pub use transport::{HttpTransport, ProbeResponse, ProbeTransport};
