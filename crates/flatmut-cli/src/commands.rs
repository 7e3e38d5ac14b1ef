//! Command implementations for the flatmut binary.
//!
//! Handles:
//! - search: k-NN over an index built from a vector file
//! - range: radius search over the same kind of index
//! - recycle: delete then insert, reporting the slot table before and after
//! - stats: counters of the loaded index
//!
//! Every command returns a serializable report; `main` prints it as JSON.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use flatmut_index::{FlatIndex, IndexStats, SearchHit, VectorIndex};
use flatmut_types::{Label, Settings, Slot};

use crate::cli::IndexArgs;

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Read a JSON array of equal-length vectors into one row-major buffer.
///
/// Returns the dimension and the flattened floats.
pub fn read_vectors(path: &Path) -> Result<(usize, Vec<f32>)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read vector file {:?}", path))?;
    let rows: Vec<Vec<f32>> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse vector file {:?}", path))?;

    let dim = match rows.first() {
        Some(first) if !first.is_empty() => first.len(),
        Some(_) => bail!("Vector file {:?} holds an empty vector", path),
        None => bail!("Vector file {:?} holds no vectors", path),
    };
    let mut flat = Vec::with_capacity(rows.len() * dim);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != dim {
            bail!(
                "Vector {} in {:?} has {} components, expected {}",
                i,
                path,
                row.len(),
                dim
            );
        }
        flat.extend_from_slice(row);
    }
    Ok((dim, flat))
}

/// Build an index from `args`, apply its deletions, and return it.
///
/// The dimension comes from the data file; the metric from `--metric` when
/// given, else from settings.
pub fn build_index(settings: &Settings, args: &IndexArgs) -> Result<FlatIndex> {
    let (dim, data) = read_vectors(&args.data)?;

    let mut settings = settings.clone();
    settings.dimension = dim;
    if let Some(metric) = args.metric {
        settings.metric = metric;
    }
    if args.include_tombstones {
        settings.exclude_tombstones = false;
    }
    if settings.initial_capacity < data.len() / dim {
        settings.initial_capacity = data.len() / dim;
    }

    let mut index = FlatIndex::from_settings(&settings).context("Failed to create index")?;
    let labels = index.add(&data).context("Failed to add vectors")?;
    info!(count = labels.len(), dim = dim, metric = %settings.metric, "Loaded vectors");

    if !args.delete.is_empty() {
        let pending = index
            .mark_deleted(&args.delete)
            .context("Failed to delete labels")?;
        info!(deleted = args.delete.len(), pending = pending, "Deleted labels");
    }
    Ok(index)
}

fn read_queries(index: &FlatIndex, path: &Path) -> Result<Vec<f32>> {
    let (dim, queries) = read_vectors(path)?;
    if dim != index.dimension() {
        bail!(
            "Queries have dimension {}, index has {}",
            dim,
            index.dimension()
        );
    }
    Ok(queries)
}

/// Run k-NN search.
pub fn search(
    settings: &Settings,
    args: &IndexArgs,
    queries: &Path,
    k: usize,
) -> Result<Vec<Vec<SearchHit>>> {
    let index = build_index(settings, args)?;
    let queries = read_queries(&index, queries)?;
    index.search(&queries, k, None).context("Search failed")
}

/// Run range search.
pub fn range(
    settings: &Settings,
    args: &IndexArgs,
    queries: &Path,
    radius: f32,
) -> Result<Vec<Vec<SearchHit>>> {
    let index = build_index(settings, args)?;
    let queries = read_queries(&index, queries)?;
    index
        .range_search(&queries, radius, None)
        .context("Range search failed")
}

/// One row of the slot table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotEntry {
    pub slot: Slot,
    pub label: Label,
    pub deleted: bool,
}

/// What a delete-then-insert round did to the slot table.
#[derive(Debug, Clone, Serialize)]
pub struct RecycleReport {
    /// Slot table after deletion, before insertion
    pub before: Vec<SlotEntry>,
    /// Free slots in recycling order
    pub free_slots: Vec<Slot>,
    /// Labels minted for the inserted vectors
    pub inserted: Vec<Label>,
    /// Slot table after insertion
    pub after: Vec<SlotEntry>,
    pub stats: IndexStats,
}

fn slot_table(index: &FlatIndex) -> Vec<SlotEntry> {
    let storage = index.storage();
    (0..storage.physical_count())
        .filter_map(|slot| {
            storage.label_of(slot).map(|label| SlotEntry {
                slot,
                label,
                deleted: storage.is_deleted(slot),
            })
        })
        .collect()
}

/// Delete `args.delete`, insert the vectors in `insert`, and report slot reuse.
pub fn recycle(settings: &Settings, args: &IndexArgs, insert: &Path) -> Result<RecycleReport> {
    let mut index = build_index(settings, args)?;
    let (dim, fresh) = read_vectors(insert)?;
    if dim != index.dimension() {
        bail!(
            "Inserted vectors have dimension {}, index has {}",
            dim,
            index.dimension()
        );
    }

    let before = slot_table(&index);
    let free_slots = index.storage().free_slots().collect();
    let inserted = index.add(&fresh).context("Failed to insert vectors")?;
    Ok(RecycleReport {
        before,
        free_slots,
        inserted,
        after: slot_table(&index),
        stats: index.stats(),
    })
}

/// Index statistics after loading and deletion.
pub fn stats(settings: &Settings, args: &IndexArgs) -> Result<IndexStats> {
    Ok(build_index(settings, args)?.stats())
}

/// Print a report as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatmut_types::MetricType;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    fn args(data: &Path) -> IndexArgs {
        IndexArgs {
            data: data.to_path_buf(),
            metric: None,
            delete: Vec::new(),
            include_tombstones: false,
        }
    }

    const BASE: &str = "[[0,0],[1,0],[0,1],[5,5]]";

    #[test]
    fn test_read_vectors() {
        let file = json_file("[[1.0, 2.0, 3.0], [4, 5, 6]]");
        let (dim, flat) = read_vectors(file.path()).unwrap();
        assert_eq!(dim, 3);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_read_vectors_rejects_ragged_and_empty() {
        let ragged = json_file("[[1.0, 2.0], [3.0]]");
        assert!(read_vectors(ragged.path()).is_err());

        let empty = json_file("[]");
        assert!(read_vectors(empty.path()).is_err());

        assert!(read_vectors(&PathBuf::from("/nonexistent/vectors.json")).is_err());
    }

    #[test]
    fn test_search_command() {
        let base = json_file(BASE);
        let queries = json_file("[[0.0, 0.0], [5.0, 4.0]]");
        let settings = Settings::default();

        let results = search(&settings, &args(base.path()), queries.path(), 1).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0][0].label, 0);
        assert_eq!(results[1][0].label, 3);
    }

    #[test]
    fn test_search_with_delete_and_metric() {
        let base = json_file(BASE);
        let queries = json_file("[[1.0, 1.0]]");
        let mut a = args(base.path());
        a.metric = Some(MetricType::InnerProduct);
        a.delete = vec![3];

        let results = search(&Settings::default(), &a, queries.path(), 1).unwrap();
        assert_ne!(results[0][0].label, 3);
        assert_eq!(results[0][0].distance, 1.0);
    }

    #[test]
    fn test_search_rejects_query_dimension() {
        let base = json_file(BASE);
        let queries = json_file("[[0.0, 0.0, 0.0]]");
        assert!(search(&Settings::default(), &args(base.path()), queries.path(), 1).is_err());
    }

    #[test]
    fn test_range_command() {
        let base = json_file(BASE);
        let queries = json_file("[[0.0, 0.0]]");
        let results = range(&Settings::default(), &args(base.path()), queries.path(), 1.5).unwrap();
        assert_eq!(results[0].len(), 3);
    }

    #[test]
    fn test_recycle_command() {
        let base = json_file(BASE);
        let fresh = json_file("[[7, 7], [8, 8], [9, 9]]");
        let mut a = args(base.path());
        a.delete = vec![2, 0];

        let report = recycle(&Settings::default(), &a, fresh.path()).unwrap();
        assert_eq!(report.free_slots, vec![0, 2]);
        assert_eq!(report.inserted, vec![4, 5, 6]);
        assert_eq!(
            report.after,
            vec![
                SlotEntry { slot: 0, label: 4, deleted: false },
                SlotEntry { slot: 1, label: 1, deleted: false },
                SlotEntry { slot: 2, label: 5, deleted: false },
                SlotEntry { slot: 3, label: 3, deleted: false },
                SlotEntry { slot: 4, label: 6, deleted: false },
            ]
        );
        assert!(report.before[0].deleted);
        assert_eq!(report.stats.pending_removals, 0);
        assert_eq!(report.stats.live, 5);
    }

    #[test]
    fn test_stats_command_reports_pending() {
        let base = json_file(BASE);
        let mut a = args(base.path());
        a.delete = vec![1];
        let stats = stats(&Settings::default(), &a).unwrap();
        assert_eq!(stats.live, 3);
        assert_eq!(stats.physical, 4);
        assert_eq!(stats.pending_removals, 1);
    }

    #[test]
    fn test_unknown_label_fails() {
        let base = json_file(BASE);
        let mut a = args(base.path());
        a.delete = vec![99];
        assert!(stats(&Settings::default(), &a).is_err());
    }
}
