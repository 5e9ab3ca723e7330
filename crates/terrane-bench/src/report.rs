use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete baseline containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// Load a baseline from a JSON file. Returns None if the file doesn't exist or doesn't parse.
pub fn load_baseline(path: &Path) -> Option<Baseline> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

pub fn save_baseline(path: &Path, baseline: &Baseline) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(baseline).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Compare current results against a baseline phase by phase. Returns
/// `("scene/phase", percent change)` for every mean that slowed by more than
/// the threshold.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<(String, f64)> {
    let mut regressions = Vec::new();

    for result in current {
        let Some(base) = baseline
            .results
            .iter()
            .find(|b| b.scene_name == result.scene_name)
        else {
            continue;
        };
        for ((phase, now), (_, then)) in result.phases().into_iter().zip(base.phases()) {
            if then.mean_ms <= 0.0 {
                continue;
            }
            let pct_change = (now.mean_ms - then.mean_ms) / then.mean_ms * 100.0;
            if pct_change > threshold_pct {
                regressions.push((format!("{}/{}", result.scene_name, phase), pct_change));
            }
        }
    }

    regressions
}

/// Format results as a markdown summary table.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Chunks | Sparse | Decorations | Data (KiB) | Generate (ms) | Gen P95 (ms) | Write (ms) | Read (ms) | Chunks/s |\n");
    out.push_str("|-------|--------|--------|-------------|------------|---------------|--------------|------------|-----------|----------|\n");

    for r in results {
        let chunks_per_sec = if r.generate.mean_ms > 0.0 {
            r.chunk_count as f64 / (r.generate.mean_ms / 1000.0)
        } else {
            0.0
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.0} |\n",
            r.scene_name,
            r.chunk_count,
            r.sparse_chunks,
            r.decorations,
            r.data_bytes / 1024,
            r.generate.mean_ms,
            r.generate.p95_ms,
            r.write.mean_ms,
            r.read.mean_ms,
            chunks_per_sec,
        ));
    }

    out
}

pub fn format_comparison(regressions: &[(String, f64)], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "All phases within {:.0}% threshold. No regressions detected.\n",
            threshold_pct
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "REGRESSIONS DETECTED (>{:.0}% threshold):\n",
        threshold_pct
    ));
    for (label, pct) in regressions {
        out.push_str(&format!("  - {}: +{:.1}%\n", label, pct));
    }
    out
}
