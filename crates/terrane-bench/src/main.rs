use std::path::PathBuf;
use std::process;

use terrane_bench::report;
use terrane_bench::runner::BenchmarkRunner;
use terrane_bench::scenes;
use terrane_world::WorldGenConfig;

fn usage() {
    eprintln!("Usage: bench-runner [OPTIONS]");
    eprintln!("  --radius <n>                   Run a single scene of this chunk radius");
    eprintln!("  --store <dir>                  Directory for scratch stores (default: temp dir)");
    eprintln!("  --config <path>                World generation RON config");
    eprintln!("  --threads <n>                  Worker threads (default: all cores)");
    eprintln!("  --repeats <n>                  Repeats per scene (default: 5)");
    eprintln!("  --baseline <path>              Load baseline JSON for comparison");
    eprintln!("  --output <path>                Save current results as JSON baseline");
    eprintln!("  --regression-threshold <pct>   Regression threshold percentage (default: 10)");
}

fn value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i).map(|s| s.parse()) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("missing or invalid value for {flag}");
            usage();
            process::exit(2);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut radius: Option<i32> = None;
    let mut store_dir: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut baseline_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut regression_threshold = 10.0f64;
    let mut threads = 0usize;
    let mut repeats = 5u32;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--radius" => {
                i += 1;
                radius = Some(value(&args, i, "--radius"));
            }
            "--store" => {
                i += 1;
                store_dir = Some(value(&args, i, "--store"));
            }
            "--config" => {
                i += 1;
                config_path = Some(value(&args, i, "--config"));
            }
            "--threads" => {
                i += 1;
                threads = value(&args, i, "--threads");
            }
            "--repeats" => {
                i += 1;
                repeats = value(&args, i, "--repeats");
            }
            "--baseline" => {
                i += 1;
                baseline_path = Some(value(&args, i, "--baseline"));
            }
            "--output" => {
                i += 1;
                output_path = Some(value(&args, i, "--output"));
            }
            "--regression-threshold" => {
                i += 1;
                regression_threshold = value(&args, i, "--regression-threshold");
            }
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match &config_path {
        Some(path) => match WorldGenConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: {e}");
                process::exit(1);
            }
        },
        None => WorldGenConfig::default(),
    };
    log::info!("World seed {}", config.seed);

    let scratch_is_temp = store_dir.is_none();
    let store_root = store_dir.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("terrane-bench-{}", process::id()))
    });

    let runner = match BenchmarkRunner::new(config, threads, &store_root, repeats) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("ERROR: {e}");
            process::exit(1);
        }
    };

    let scene_configs = match radius {
        Some(r) => vec![scenes::scene_for_radius(r, true)],
        None => scenes::standard_scenes(),
    };

    let mut results = Vec::new();
    for config in &scene_configs {
        match runner.run_scene(config) {
            Ok(result) => results.push(result),
            Err(e) => {
                eprintln!("ERROR: scene '{}' failed: {e}", config.name);
                process::exit(1);
            }
        }
    }

    if scratch_is_temp {
        if let Err(e) = std::fs::remove_dir_all(runner.store_root()) {
            log::warn!("failed to remove {}: {e}", runner.store_root().display());
        }
    }

    println!("\n## Benchmark Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let baseline = report::Baseline {
            timestamp: run_label(),
            results: results.clone(),
        };
        match report::save_baseline(path, &baseline) {
            Ok(()) => log::info!("Saved baseline to {}", path.display()),
            Err(e) => log::error!("failed to save baseline {}: {e}", path.display()),
        }
    }

    if let Some(ref path) = baseline_path {
        if let Some(baseline) = report::load_baseline(path) {
            let regressions = report::compare(&results, &baseline, regression_threshold);
            println!(
                "{}",
                report::format_comparison(&regressions, regression_threshold)
            );
            if !regressions.is_empty() {
                eprintln!(
                    "ERROR: {} regressions detected, exiting with code 1",
                    regressions.len()
                );
                process::exit(1);
            }
        } else {
            log::warn!("Baseline file not found: {}", path.display());
        }
    }

    log::info!("Benchmark complete.");
}

/// Seconds since the epoch, tagged with the pid.
fn run_label() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("bench-{secs}-{}", process::id())
}
