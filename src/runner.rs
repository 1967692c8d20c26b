use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{Cli, Commands};
use waf_evader::config::MAX_TIMEOUT_SECS;
use waf_evader::output::{write_fingerprint_json, write_fingerprints_json, write_variants_csv, write_variants_jsonl};
use waf_evader::waf::{fingerprint_many, optimal_techniques, prioritize, FingerprintEngine};
use waf_evader::{
    transform_for, AssembledVariants, Assembler, AttackType, EngineConfig, EvasionLevel, PayloadSource,
    TechniqueId, TechniqueRegistry, WafFingerprint, WafType,
};

fn print_banner() {
    println!(r#"
 __        ___    _____   _____                 _
 \ \      / / \  |  ___| | ____|_   ____ _  __| | ___ _ __
  \ \ /\ / / _ \ | |_    |  _| \ \ / / _` |/ _` |/ _ \ '__|
   \ V  V / ___ \|  _|   | |___ \ V / (_| | (_| |  __/ |
    \_/\_/_/   \_\_|     |_____| \_/ \__,_|\__,_|\___|_|
    "#);
}

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Keep reqwest/hyper at INFO so debug mode stays readable.
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!(
        "waf_evader={crate},reqwest=info,hyper=info,h2=info",
        crate = crate_level
    );
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate { payloads, file, attack, level, techniques, waf, target, fingerprint, seed, timeout, config, out } => {
            let config = match config {
                Some(path) => EngineConfig::from_json_file(Path::new(&path)).await?,
                None => {
                    let payload_source = match file {
                        Some(f) => PayloadSource::File(PathBuf::from(f)),
                        None => PayloadSource::Inline(payloads),
                    };
                    EngineConfig {
                        attack_type: attack.parse()?,
                        level: level.parse()?,
                        payload_source,
                        target,
                        fingerprint,
                        seed,
                        timeout_secs: timeout,
                        ..Default::default()
                    }
                    .validate()?
                }
            };
            run_generate(config, techniques, waf, out).await
        }
        Commands::Fingerprint { targets, timeout, concurrency, out } => {
            run_fingerprint(targets, timeout, concurrency, out).await
        }
        Commands::Techniques { attack, waf } => run_techniques(attack, waf),
    }
}

async fn run_generate(
    config: EngineConfig,
    techniques: Vec<String>,
    waf: Option<String>,
    out: Option<String>,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let registry = TechniqueRegistry::global();
    let attack = config.attack_type.name();

    let explicit = techniques
        .iter()
        .map(|t| t.parse::<TechniqueId>())
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(attack, level = %config.level, fingerprint = config.fingerprint, seed = ?config.seed, "Starting generation");
    if out.is_some() {
        print_banner();
    }

    // Technique order: explicit list, then a fingerprinted WAF, then a named WAF.
    let filter: Option<Vec<TechniqueId>> = if !explicit.is_empty() {
        Some(explicit.clone())
    } else if config.fingerprint {
        let target = config.target.as_deref().context("--fingerprint needs --target")?;
        let engine = FingerprintEngine::http(config.timeout_secs)?;
        let fp = engine.fingerprint(target).await?;
        print_fingerprint(target, &fp);
        Some(prioritize(&fp.waf_type, registry, attack))
    } else if let Some(name) = waf {
        let waf: WafType = name.parse()?;
        Some(prioritize(&waf, registry, attack))
    } else {
        None
    };

    let payloads = config.payload_source.load().await?;
    if payloads.is_empty() {
        anyhow::bail!("no payloads to transform");
    }

    let mut assembler = Assembler::global();
    if let Some(seed) = config.seed {
        assembler = assembler.with_seed(seed);
    }
    if !explicit.is_empty() {
        let dropped = assembler.inapplicable(attack, &explicit);
        if !dropped.is_empty() {
            let names: Vec<&str> = dropped.iter().map(|t| t.name()).collect();
            tracing::warn!(attack, dropped = %names.join(","), "requested techniques do not apply");
            println!("[!] Skipping technique(s) not applicable to {}: {}", attack, names.join(", "));
        }
    }
    let plan = assembler.plan(attack, filter.as_deref());
    if plan.is_empty() {
        anyhow::bail!("no applicable techniques for attack type '{}'", attack);
    }
    println!(
        "[~] {} payload(s), level {}, techniques: {}",
        payloads.len(),
        config.level,
        plan.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ")
    );

    let pb = ProgressBar::new(payloads.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let bar = pb.clone();
    let level = config.level;
    let results = tokio::task::spawn_blocking(move || {
        assembler.assemble_batch_with(&payloads, attack, level, Some(plan.as_slice()), &|_| bar.inc(1))
    })
    .await
    .context("variant generation worker panicked")?;
    pb.finish_and_clear();

    let total: usize = results.iter().map(|r| r.total_variants()).sum();
    match out {
        Some(path) => {
            let path = Path::new(&path);
            let written = if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                write_variants_csv(path, &results)
            } else {
                write_variants_jsonl(path, &results)
            }
            .with_context(|| format!("failed to write {}", path.display()))?;
            println!("[+] Wrote {} variants to {}", written, path.display());
        }
        None => print_variants(&results),
    }

    let failures: usize = results.iter().map(|r| r.failures.len()).sum();
    println!(
        "[*] {} variants from {} payload(s) in {:.2}s{}",
        total,
        results.len(),
        started.elapsed().as_secs_f64(),
        if failures > 0 { format!(" ({} technique failure(s))", failures) } else { String::new() }
    );
    Ok(())
}

fn print_variants(results: &[AssembledVariants]) {
    for result in results {
        println!("\n[>] Payload: {}", result.payload);
        if result.is_empty() {
            println!("    (no variants)");
        }
        for entry in result.iter() {
            println!("  [{}] {} variant(s)", entry.technique, entry.variants.len());
            for v in &entry.variants {
                println!("    {}", v);
            }
        }
        for (technique, reason) in &result.failures {
            println!("  [!] {} failed: {}", technique, reason);
        }
    }
}

async fn run_fingerprint(
    targets: Vec<String>,
    timeout: u64,
    concurrency: usize,
    out: Option<String>,
) -> anyhow::Result<()> {
    print_banner();
    let engine = Arc::new(FingerprintEngine::http(timeout.clamp(1, MAX_TIMEOUT_SECS))?);
    let single = targets.len() == 1;

    println!("[>] Fingerprinting {} target(s)...", targets.len());
    let results = fingerprint_many(engine, targets, concurrency).await;

    let mut found: Vec<(String, WafFingerprint)> = Vec::new();
    for (target, result) in results {
        match result {
            Ok(fp) => {
                print_fingerprint(&target, &fp);
                found.push((target, fp));
            }
            Err(e) => eprintln!("[-] {}: {}", target, e),
        }
    }

    if let Some(path) = out {
        let path = Path::new(&path);
        if single && found.len() == 1 {
            write_fingerprint_json(path, &found[0].1)
        } else {
            write_fingerprints_json(path, &found)
        }
        .with_context(|| format!("failed to write {}", path.display()))?;
        println!("[+] Fingerprint report written to {}", path.display());
    }

    if found.is_empty() {
        anyhow::bail!("no target could be fingerprinted");
    }
    Ok(())
}

fn print_fingerprint(target: &str, fp: &WafFingerprint) {
    println!("\n{}", "=".repeat(60));
    println!("[*] {}", target);
    if fp.is_classified() {
        println!("[+] WAF: {} (confidence {:.2})", fp.waf_type, fp.confidence);
    } else {
        println!("[-] No WAF identified (best score {:.2})", fp.confidence);
    }
    for e in &fp.evidence {
        println!("    - {}", e);
    }
    let b = &fp.behavior;
    println!(
        "    status codes: {:?} | changed: {} | blocked probes: {} | rate limited: {} | challenge: {}",
        fp.status_codes, b.status_changes, b.blocked_probes, b.rate_limited, b.challenge
    );
    if fp.probes_failed > 0 {
        println!("    [!] {} of {} probes failed", fp.probes_failed, fp.probes_sent);
    }
    let order: Vec<&str> = optimal_techniques(&fp.waf_type).iter().map(|t| t.name()).collect();
    println!("    suggested order: {}", order.join(", "));
}

fn run_techniques(attack: Option<String>, waf: Option<String>) -> anyhow::Result<()> {
    let registry = TechniqueRegistry::global();
    let waf: Option<WafType> = waf.map(|w| w.parse()).transpose()?;

    let list: Vec<TechniqueId> = match &attack {
        Some(name) => {
            let (applicable, known) = registry.applicable_techniques(name);
            if !known {
                println!("[!] Unknown attack type '{}', using fallback list", name);
            }
            match &waf {
                Some(w) => prioritize(w, registry, name),
                None => applicable.to_vec(),
            }
        }
        None => match &waf {
            Some(w) => optimal_techniques(w).to_vec(),
            None => TechniqueId::ALL.to_vec(),
        },
    };

    for t in &list {
        println!(
            "  {:<16} {:<8} {:<5} {}",
            t.name(),
            t.category().name(),
            if transform_for(*t).randomized() { "rand" } else { "" },
            t.description()
        );
    }
    if attack.is_none() {
        let types: Vec<&str> = AttackType::ALL.iter().map(|a| a.name()).collect();
        println!("\nAttack types: {}", types.join(", "));
        let levels: Vec<&str> = EvasionLevel::ALL.iter().map(|l| l.name()).collect();
        println!("Levels: {}", levels.join(", "));
    }
    Ok(())
}
