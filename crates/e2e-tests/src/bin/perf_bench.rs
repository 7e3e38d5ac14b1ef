use std::collections::BTreeMap;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use flatmut_index::{FlatIndex, VectorIndex};
use flatmut_types::MetricType;

const DEFAULT_ITERATIONS: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "perf_bench", about = "flatmut performance benchmark harness")]
struct Args {
    #[arg(long, value_enum, default_value = "small")]
    tier: DatasetTier,
    #[arg(long, default_value = "l2")]
    metric: MetricType,
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

#[derive(Clone, Copy, Debug, Serialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum DatasetTier {
    Small,
    Medium,
}

impl DatasetTier {
    /// (vectors, dimension, queries)
    fn shape(self) -> (usize, usize, usize) {
        match self {
            DatasetTier::Small => (10_000, 64, 16),
            DatasetTier::Medium => (100_000, 128, 32),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct StepMetrics {
    p50_ms: f64,
    p90_ms: f64,
    p99_ms: f64,
    samples: usize,
}

#[derive(Debug, Serialize)]
struct BenchmarkOutput {
    tier: DatasetTier,
    metric: MetricType,
    iterations: usize,
    steps: BTreeMap<String, StepMetrics>,
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    let (n, dim, nq) = args.tier.shape();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut random = |count: usize| -> Vec<f32> {
        (0..count * dim).map(|_| rng.random_range(-1.0..1.0)).collect()
    };

    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for _ in 0..args.iterations {
        let data = random(n);
        let queries = random(nq);
        let churn = random(n / 10);

        let mut index = FlatIndex::new(dim, args.metric).map_err(|e| e.to_string())?;

        let started = Instant::now();
        index.add(&data).map_err(|e| e.to_string())?;
        record(&mut samples, "add", started);

        let started = Instant::now();
        index.search(&queries, 10, None).map_err(|e| e.to_string())?;
        record(&mut samples, "search_k10", started);

        let victims: Vec<u64> = (0..n as u64).step_by(10).collect();
        let started = Instant::now();
        index.mark_deleted(&victims).map_err(|e| e.to_string())?;
        record(&mut samples, "mark_deleted", started);

        let started = Instant::now();
        index.add(&churn).map_err(|e| e.to_string())?;
        record(&mut samples, "recycle", started);

        if args.metric.is_primary() {
            let radius = if args.metric.is_similarity() { 4.0 } else { dim as f32 / 2.0 };
            let started = Instant::now();
            index
                .range_search(&queries, radius, None)
                .map_err(|e| e.to_string())?;
            record(&mut samples, "range_search", started);
        }
    }

    let steps = samples
        .into_iter()
        .map(|(step, mut values)| {
            values.sort_by(f64::total_cmp);
            let metrics = StepMetrics {
                p50_ms: percentile(&values, 50.0),
                p90_ms: percentile(&values, 90.0),
                p99_ms: percentile(&values, 99.0),
                samples: values.len(),
            };
            (step, metrics)
        })
        .collect();

    let output = BenchmarkOutput {
        tier: args.tier,
        metric: args.metric,
        iterations: args.iterations,
        steps,
    };
    println!("{}", render_table(&output));
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| format!("Failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}

fn record(samples: &mut BTreeMap<String, Vec<f64>>, step: &str, started: Instant) {
    samples
        .entry(step.to_string())
        .or_default()
        .push(started.elapsed().as_secs_f64() * 1000.0);
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = (percentile / 100.0) * (values.len() as f64 - 1.0);
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        values[low]
    } else {
        let weight = rank - low as f64;
        values[low] + (values[high] - values[low]) * weight
    }
}

fn render_table(output: &BenchmarkOutput) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Benchmark Results (tier={:?}, metric={}, iterations={})",
        output.tier, output.metric, output.iterations
    ));
    lines.push("step\tp50_ms\tp90_ms\tp99_ms".to_string());
    for (step, metrics) in &output.steps {
        lines.push(format!(
            "{}\t{:.2}\t{:.2}\t{:.2}",
            step, metrics.p50_ms, metrics.p90_ms, metrics.p99_ms
        ));
    }
    lines.join("\n")
}
