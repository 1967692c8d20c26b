use csv::Writer;
use std::fs::File;
use std::path::Path;

use crate::assembly::AssembledVariants;
use crate::harness::TechniqueSummary;
use crate::output::writer_jsonl::flatten;

pub fn write_variants_csv(path: &Path, results: &[AssembledVariants]) -> anyhow::Result<usize> {
    let f = File::create(path)?;
    let mut w = Writer::from_writer(f);
    w.write_record(["payload", "technique", "category", "level", "variant"])?;
    let records = flatten(results);
    for it in &records {
        w.write_record([
            it.payload.as_str(),
            it.technique.name(),
            it.category.name(),
            it.level.name(),
            it.variant.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(records.len())
}

pub fn write_summary_csv(path: &Path, summaries: &[TechniqueSummary]) -> anyhow::Result<()> {
    let f = File::create(path)?;
    let mut w = Writer::from_writer(f);
    w.write_record(["technique", "sent", "blocked", "passed", "bypass_rate", "avg_response_ms"])?;
    for s in summaries {
        w.write_record(&[
            s.technique.name().to_string(),
            s.sent.to_string(),
            s.blocked.to_string(),
            s.passed.to_string(),
            format!("{:.3}", s.bypass_rate()),
            format!("{:.1}", s.avg_response_ms),
        ])?;
    }
    w.flush()?;
    Ok(())
}
