pub mod writer_csv;
pub mod writer_jsonl;

pub use writer_csv::{write_summary_csv, write_variants_csv};
pub use writer_jsonl::{
    flatten, write_fingerprint_json, write_fingerprints_json, write_variants_jsonl, VariantRecord,
};
