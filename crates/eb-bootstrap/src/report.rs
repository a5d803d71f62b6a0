//! Per-file and batch run summaries (serialized as the CLI's JSON output).

use std::path::{Path, PathBuf};

use eb_core::{EnergyWindow, RunConfig};
use serde::Serialize;

/// How processing of one input file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Every realization was written.
    Ok,
    /// The input could not be opened or parsed; nothing was written.
    Unreadable,
    /// The input was read but a later step failed; `outputs` lists what was
    /// written before the failure.
    Failed,
}

/// Outcome of the engine on one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Input path as listed.
    pub input: PathBuf,
    /// Final status.
    pub status: FileStatus,
    /// Rows in the input events table.
    pub n_rows: usize,
    /// Rows inside the energy window (sample size of each realization).
    pub n_eligible: usize,
    /// Realization files written, in realization order.
    pub outputs: Vec<PathBuf>,
    /// Error message for non-`ok` statuses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    pub(crate) fn new(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            status: FileStatus::Ok,
            n_rows: 0,
            n_eligible: 0,
            outputs: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn fail(mut self, status: FileStatus, error: impl ToString) -> Self {
        self.status = status;
        self.error = Some(error.to_string());
        self
    }

    /// Whether every realization was written.
    pub fn is_ok(&self) -> bool {
        self.status == FileStatus::Ok
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Worker pool size.
    pub jobs: usize,
    /// Realizations requested per file.
    pub realizations: usize,
    /// Energy window used for every file.
    pub window: EnergyWindow,
    /// Files that completed with status `ok`.
    pub n_ok: usize,
    /// Files that were unreadable or failed.
    pub n_failed: usize,
    /// Total realization files written.
    pub n_outputs: usize,
    /// Per-file outcomes in manifest order.
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    pub(crate) fn new(jobs: usize, config: &RunConfig, files: Vec<FileOutcome>) -> Self {
        let n_ok = files.iter().filter(|f| f.is_ok()).count();
        let n_outputs = files.iter().map(|f| f.outputs.len()).sum();
        Self {
            jobs,
            realizations: config.realizations,
            window: config.window,
            n_ok,
            n_failed: files.len() - n_ok,
            n_outputs,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_and_json_shape() {
        let ok = FileOutcome {
            outputs: vec![PathBuf::from("a_bs_0.fits"), PathBuf::from("a_bs_1.fits")],
            n_rows: 10,
            n_eligible: 7,
            ..FileOutcome::new(Path::new("a.fits"))
        };
        let bad = FileOutcome::new(Path::new("missing.fits"))
            .fail(FileStatus::Unreadable, "I/O error: No such file or directory");
        let report = BatchReport::new(2, &RunConfig::new(EnergyWindow::default(), 2), vec![ok, bad]);
        assert_eq!(report.n_ok, 1);
        assert_eq!(report.n_failed, 1);
        assert_eq!(report.n_outputs, 2);

        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["files"][0]["status"], "ok");
        assert!(v["files"][0].get("error").is_none());
        assert_eq!(v["files"][1]["status"], "unreadable");
        assert_eq!(v["files"][1]["input"], "missing.fits");
        assert_eq!(v["window"]["emax"], 300000.0);
    }
}
