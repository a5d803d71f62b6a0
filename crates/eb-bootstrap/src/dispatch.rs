//! Batch dispatcher: a bounded worker pool mapping the engine over a manifest.
//!
//! Each input file is one task, so a worker finishes a file before it picks up
//! the next. Output paths depend only on `(input, realization)` and every
//! input file is scheduled exactly once (manifest entries are compared after
//! resolving `.`, `..` and symlinks), so workers never write the same path.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use eb_core::{Error, Result, RunConfig};
use rayon::prelude::*;

use crate::engine::generate;
use crate::report::{BatchReport, FileOutcome, FileStatus};
use crate::sampler::SeedSource;

/// Read a manifest: whitespace-separated input paths, possibly spanning lines.
///
/// # Errors
/// [`Error::ManifestUnreadable`] if the file cannot be read.
pub fn read_manifest(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|source| Error::ManifestUnreadable { path: path.to_path_buf(), source })?;
    Ok(text.split_whitespace().map(PathBuf::from).collect())
}

/// Read `manifest` and bootstrap every listed file on `jobs` workers.
///
/// Only an unreadable manifest, an invalid config or a pool that cannot be
/// built is an error; per-file failures are recorded in the report.
pub fn run_batch(
    manifest: impl AsRef<Path>,
    jobs: usize,
    config: &RunConfig,
    seeds: &dyn SeedSource,
) -> Result<BatchReport> {
    let files = read_manifest(manifest)?;
    run_files(&files, jobs, config, seeds)
}

/// Bootstrap `files` on a pool of exactly `jobs` workers, one file per task.
///
/// Blocks until every file has finished. Repeated paths are processed once.
pub fn run_files(
    files: &[PathBuf],
    jobs: usize,
    config: &RunConfig,
    seeds: &dyn SeedSource,
) -> Result<BatchReport> {
    if jobs == 0 {
        return Err(Error::Validation("job count must be >= 1".to_string()));
    }
    config.validate()?;

    let files = dedup(files);
    if files.is_empty() {
        log::warn!("manifest lists no input files");
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("evboot-worker-{i}"))
        .build()
        .map_err(|e| Error::Computation(format!("failed to create thread pool: {e}")))?;

    let outcomes: Vec<FileOutcome> = pool.install(|| {
        files.par_iter().with_max_len(1).map(|f| process_isolated(f, config, seeds)).collect()
    });
    Ok(BatchReport::new(jobs, config, outcomes))
}

/// Keep the first occurrence of each file. Paths that cannot be resolved
/// (missing inputs) are compared as written; they never produce outputs.
fn dedup(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(files.len());
    for f in files {
        let key = std::fs::canonicalize(f).unwrap_or_else(|_| f.clone());
        if seen.insert(key) {
            out.push(f.clone());
        } else {
            log::warn!("{} listed more than once; processing it once", f.display());
        }
    }
    out
}

/// Run the engine on one file; a panic is turned into a failed outcome so it
/// cannot take down the rest of the batch.
fn process_isolated(input: &Path, config: &RunConfig, seeds: &dyn SeedSource) -> FileOutcome {
    catch_unwind(AssertUnwindSafe(|| generate(input, config, seeds))).unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("{}: worker panicked: {msg}", input.display());
        FileOutcome::new(input).fail(FileStatus::Failed, format!("panic: {msg}"))
    })
}
