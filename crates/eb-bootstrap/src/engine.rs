//! Realization engine: one input file in, `realizations` output files out.

use std::path::Path;

use eb_core::{Result, RunConfig};
use eb_fits::EventFile;

use crate::eligible::EligibleIndexSet;
use crate::naming::realization_path;
use crate::report::{FileOutcome, FileStatus};
use crate::sampler::{SeedSource, draw_realization};

/// Bootstrap one event file.
///
/// Never returns an error: an unreadable input yields
/// [`FileStatus::Unreadable`] with nothing written, and a failure part-way
/// through yields [`FileStatus::Failed`] listing the files already written.
/// Both are logged at `error` level.
pub fn generate(input: &Path, config: &RunConfig, seeds: &dyn SeedSource) -> FileOutcome {
    let mut outcome = FileOutcome::new(input);
    if let Err(e) = config.validate() {
        log::error!("{}: {e}", input.display());
        return outcome.fail(FileStatus::Failed, e);
    }
    let file = match EventFile::open(input) {
        Ok(f) => f,
        Err(e) => {
            log::error!("{} not found or unreadable: {e}", input.display());
            return outcome.fail(FileStatus::Unreadable, e);
        }
    };
    match generate_from(&file, config, seeds, &mut outcome) {
        Ok(()) => outcome,
        Err(e) => {
            log::error!("{}: {e}", input.display());
            outcome.fail(FileStatus::Failed, e)
        }
    }
}

/// Bootstrap an already opened event file, recording progress in `outcome`.
///
/// Realizations are produced sequentially; realization `r` is written to
/// [`realization_path`]`(file.path(), r)`, replacing any existing file.
pub fn generate_from(
    file: &EventFile,
    config: &RunConfig,
    seeds: &dyn SeedSource,
    outcome: &mut FileOutcome,
) -> Result<()> {
    let energies = file.energies()?;
    let eligible = EligibleIndexSet::from_energies(&energies, &config.window);
    outcome.n_rows = file.n_rows();
    outcome.n_eligible = eligible.len();
    if eligible.is_empty() {
        log::warn!(
            "{}: no events in [{}, {}] MeV; realizations will be empty",
            file.path().display(),
            config.window.emin,
            config.window.emax
        );
    }

    for realization in 0..config.realizations {
        let mut rng = seeds.rng_for(realization)?;
        let rows = draw_realization(&eligible, &mut rng);
        let subset = file.subset(&rows)?;

        let out = realization_path(file.path(), realization)?;
        if out.exists() {
            log::debug!("overwriting {}", out.display());
            std::fs::remove_file(&out)?;
        }
        subset.write_to(&out)?;
        log::debug!("wrote {} ({} rows)", out.display(), subset.n_rows());
        outcome.outputs.push(out);
    }
    Ok(())
}
