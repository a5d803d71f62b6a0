use anyhow::{Context, Result};
use std::path::PathBuf;

use eb_bootstrap::{EligibleIndexSet, SyntheticEventsConfig, synthetic_event_list};
use eb_core::EnergyWindow;
use eb_fits::EventFile;

use crate::write_json;

// ---------------------------------------------------------------------------
// generate-events
// ---------------------------------------------------------------------------

pub fn cmd_generate_events(
    n_events: usize,
    emin: f64,
    emax: f64,
    seed: u64,
    output: &PathBuf,
) -> Result<()> {
    let config = SyntheticEventsConfig { n_events, emin, emax, seed, ..Default::default() };
    let builder = synthetic_event_list(&config)?;
    builder.write_to(output).with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(path = %output.display(), n_events, seed, "synthetic event list written");
    Ok(())
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

pub fn cmd_inspect(input: &PathBuf, emin: f64, emax: f64, output: Option<&PathBuf>) -> Result<()> {
    let window = EnergyWindow::new(emin, emax);
    window.validate()?;
    let file =
        EventFile::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let energies = file.energies()?;
    let eligible = EligibleIndexSet::from_energies(&energies, &window);

    let finite = energies.iter().copied().filter(|e| e.is_finite());
    let energy_min = finite.clone().reduce(f64::min);
    let energy_max = finite.reduce(f64::max);

    let columns: Vec<serde_json::Value> = file
        .columns()
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "repeat": c.form.repeat,
                "type": format!("{:?}", c.form.kind),
                "offset": c.offset,
            })
        })
        .collect();

    let output_json = serde_json::json!({
        "input": input,
        "extname": file.extname(),
        "n_rows": file.n_rows(),
        "row_len": file.row_len(),
        "columns": columns,
        "energy_min": energy_min,
        "energy_max": energy_max,
        "window": window,
        "n_eligible": eligible.len(),
        "primary_bytes": file.primary_bytes().len(),
        "trailer_bytes": file.trailer_bytes().len(),
    });

    write_json(output, output_json)
}
