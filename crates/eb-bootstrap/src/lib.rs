//! # eb-bootstrap
//!
//! Bootstrap realizations of photon event lists.
//!
//! - [`EligibleIndexSet`]: rows whose `ENERGY` lies in the inclusive window.
//! - [`draw_realization`]: `count` uniform draws with replacement, sorted.
//! - [`generate`]: the per-file engine, writing `<stem>_bs_<r><ext>` siblings.
//! - [`run_batch`]: a bounded rayon pool mapping the engine over a manifest,
//!   one file per task.
//!
//! ```no_run
//! use eb_bootstrap::{EntropySeeds, run_batch};
//! use eb_core::{EnergyWindow, RunConfig};
//!
//! let config = RunConfig::new(EnergyWindow::new(100.0, 300_000.0), 100);
//! let report = run_batch("events.txt", 8, &config, &EntropySeeds).unwrap();
//! println!("{} files ok, {} failed", report.n_ok, report.n_failed);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod eligible;
pub mod engine;
pub mod naming;
pub mod report;
pub mod sampler;
pub mod synth;

pub use dispatch::{read_manifest, run_batch, run_files};
pub use eligible::EligibleIndexSet;
pub use engine::{generate, generate_from};
pub use naming::realization_path;
pub use report::{BatchReport, FileOutcome, FileStatus};
pub use sampler::{EntropySeeds, FixedSeeds, SeedSource, draw_realization};
pub use synth::{SyntheticEventsConfig, synthetic_event_list};
