use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::assembly::AssembledVariants;
use crate::encode::EvasionLevel;
use crate::registry::{Category, TechniqueId};
use crate::waf::WafFingerprint;

/// One generated variant, flattened for line-oriented output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub payload: String,
    pub technique: TechniqueId,
    pub category: Category,
    pub level: EvasionLevel,
    pub variant: String,
}

pub fn flatten(results: &[AssembledVariants]) -> Vec<VariantRecord> {
    results
        .iter()
        .flat_map(|r| {
            r.iter().flat_map(move |entry| {
                entry.variants.iter().map(move |v| VariantRecord {
                    payload: r.payload.clone(),
                    technique: entry.technique,
                    category: entry.category,
                    level: r.level,
                    variant: v.clone(),
                })
            })
        })
        .collect()
}

pub fn write_variants_jsonl(path: &Path, results: &[AssembledVariants]) -> anyhow::Result<usize> {
    let mut f = BufWriter::new(File::create(path)?);
    let records = flatten(results);
    for it in &records {
        let line = serde_json::to_string(it)?;
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")?;
    }
    f.flush()?;
    Ok(records.len())
}

pub fn write_fingerprint_json(path: &Path, fingerprint: &WafFingerprint) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(fingerprint)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Several targets' fingerprints as one JSON object keyed by target.
pub fn write_fingerprints_json(path: &Path, results: &[(String, WafFingerprint)]) -> anyhow::Result<()> {
    let map: serde_json::Map<String, serde_json::Value> = results
        .iter()
        .map(|(target, fp)| Ok((target.clone(), serde_json::to_value(fp)?)))
        .collect::<Result<_, serde_json::Error>>()?;
    std::fs::write(path, serde_json::to_string_pretty(&map)?)?;
    Ok(())
}
