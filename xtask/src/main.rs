use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "halo-atomic workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmarks once per atomic backend
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,

        /// Only run these backends (default: all)
        #[arg(long, value_delimiter = ',')]
        backends: Vec<String>,
    },
}

/// Baseline name and the cargo feature selecting it. `native` is whatever
/// the target picks on its own.
const BACKENDS: &[(&str, Option<&str>)] = &[
    ("native", None),
    ("generic-cas", Some("backend-generic-cas")),
    ("ppc", Some("backend-ppc")),
    ("alpha", Some("backend-alpha")),
    ("fallback", Some("backend-fallback")),
];

const BENCHES: &[&str] = &["atomic_benchmark", "lockfree_benchmark"];

#[derive(Serialize)]
struct Summary {
    baseline: &'static str,
    /// workload -> backend -> operations per second
    workloads: BTreeMap<String, BTreeMap<String, f64>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench {
            quick,
            report_only,
            backends,
        } => {
            let selected: Vec<_> = BACKENDS
                .iter()
                .filter(|(name, _)| backends.is_empty() || backends.iter().any(|b| b == name))
                .copied()
                .collect();
            if selected.is_empty() {
                anyhow::bail!("no known backend in {:?}", backends);
            }
            if !report_only {
                run_benchmarks(&selected, quick)?;
            }
            generate_report(&selected)?;
        }
    }

    Ok(())
}

fn run_benchmarks(backends: &[(&'static str, Option<&'static str>)], quick: bool) -> Result<()> {
    println!("Running benchmarks for {} backend(s)...", backends.len());

    for (name, feature) in backends {
        for bench in BENCHES {
            println!("\n>>> {bench} on backend: {name}");
            let start = Instant::now();

            let mut cmd = Command::new("cargo");
            cmd.env("CARGO_INCREMENTAL", "0");
            cmd.arg("bench").arg("--bench").arg(bench);
            if let Some(feature) = feature {
                cmd.arg("--features").arg(feature);
            }

            // Args for the test runner (Criterion) go after --
            cmd.arg("--");
            cmd.arg("--save-baseline").arg(name);

            if quick {
                cmd.arg("--measurement-time").arg("0.1");
                cmd.arg("--noplot");
                cmd.arg("--sample-size").arg("10");
            }

            let status = cmd
                .status()
                .with_context(|| format!("failed to run {bench} for {name}"))?;

            if status.success() {
                println!("Finished {bench} on {name} in {:.2?}", start.elapsed());
            } else {
                eprintln!("Warning: {bench} failed on backend {name}");
            }
        }
    }

    Ok(())
}

fn generate_report(backends: &[(&'static str, Option<&'static str>)]) -> Result<()> {
    println!("\n>>> Generating Report...");
    let mut results: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();

    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    collect_results(criterion_dir, &mut results);
    results.retain(|_, by_backend| {
        by_backend.retain(|name, _| backends.iter().any(|(b, _)| b == name));
        !by_backend.is_empty()
    });

    let out_dir = Path::new("benchmark_results");
    fs::create_dir_all(out_dir)?;

    let summary = Summary {
        baseline: "native",
        workloads: results,
    };
    let json_path = out_dir.join("summary.json");
    fs::write(&json_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("writing {}", json_path.display()))?;

    use std::io::Write;
    let report_path = out_dir.join("report.md");
    let mut file = fs::File::create(&report_path)?;

    writeln!(file, "# Backend Benchmark Report")?;
    writeln!(file)?;

    write!(file, "| Workload |")?;
    for (name, _) in backends {
        write!(file, " {name} (Ops/s) | vs native |")?;
    }
    writeln!(file)?;

    write!(file, "|---|")?;
    for _ in backends {
        write!(file, "---|---|")?;
    }
    writeln!(file)?;

    for (workload, by_backend) in &summary.workloads {
        write!(file, "| {workload} |")?;
        let native_ops = by_backend.get("native").copied().unwrap_or(0.0);

        for (name, _) in backends {
            if let Some(ops) = by_backend.get(*name) {
                let rel = if native_ops > 0.0 { ops / native_ops } else { 0.0 };
                write!(file, " {} | **{rel:.2}x** |", format_ops(*ops))?;
            } else {
                write!(file, " N/A | - |")?;
            }
        }
        writeln!(file)?;
    }

    println!("Report written to {}", report_path.display());
    println!("Summary written to {}", json_path.display());
    Ok(())
}

fn format_ops(ops: f64) -> String {
    if ops > 1_000_000.0 {
        format!("{:.2}M", ops / 1_000_000.0)
    } else if ops > 1_000.0 {
        format!("{:.2}K", ops / 1_000.0)
    } else {
        format!("{ops:.0}")
    }
}

fn collect_results(dir: &Path, results: &mut BTreeMap<String, BTreeMap<String, f64>>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_results(&path, results);
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) != Some("estimates.json") {
            continue;
        }

        // Structure: .../group/workload/baseline/estimates.json
        let Some(baseline_dir) = path.parent() else { continue };
        let Some(workload_dir) = baseline_dir.parent() else { continue };
        let Some(baseline_name) = baseline_dir.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(workload_name) = workload_dir.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if baseline_name == "report" || baseline_name == "new" || baseline_name == "base" || workload_name == "report" {
            continue;
        }
        let group = workload_dir
            .parent()
            .and_then(|g| g.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let mut elements = 1.0;
        let mut is_throughput = false;
        let bench_json = baseline_dir.join("benchmark.json");
        if let Some(t) = read_json(&bench_json).and_then(|json| json.get("throughput")?.get("Elements")?.as_f64()) {
            elements = t;
            is_throughput = true;
        }

        let Some(time_ns) = read_json(&path).and_then(|json| json.get("mean")?.get("point_estimate")?.as_f64())
        else {
            continue;
        };
        if time_ns <= 0.0 {
            continue;
        }
        let metric = if is_throughput {
            (elements * 1e9) / time_ns
        } else {
            1e9 / time_ns
        };

        results
            .entry(format!("{group}/{workload_name}"))
            .or_default()
            .insert(baseline_name.to_string(), metric);
    }
}

fn read_json(path: &Path) -> Option<serde_json::Value> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}
