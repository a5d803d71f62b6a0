//! Common data types for evboot

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default lower energy bound (MeV), the usual LAT data-server query floor.
pub const DEFAULT_EMIN: f64 = 100.0;

/// Default upper energy bound (MeV).
pub const DEFAULT_EMAX: f64 = 300_000.0;

/// Inclusive energy window `[emin, emax]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyWindow {
    /// Lower bound (inclusive).
    pub emin: f64,
    /// Upper bound (inclusive).
    pub emax: f64,
}

impl EnergyWindow {
    /// Create a window without validation.
    pub fn new(emin: f64, emax: f64) -> Self {
        Self { emin, emax }
    }

    /// Whether `energy` lies inside the window. Both bounds are inclusive and
    /// NaN never matches.
    #[inline]
    pub fn contains(&self, energy: f64) -> bool {
        energy >= self.emin && energy <= self.emax
    }

    /// Check that both bounds are finite and ordered.
    pub fn validate(&self) -> Result<()> {
        if !(self.emin.is_finite() && self.emax.is_finite()) {
            return Err(Error::Validation(format!(
                "energy bounds must be finite, got [{}, {}]",
                self.emin, self.emax
            )));
        }
        if self.emin > self.emax {
            return Err(Error::Validation(format!(
                "emin must not exceed emax, got [{}, {}]",
                self.emin, self.emax
            )));
        }
        Ok(())
    }
}

impl Default for EnergyWindow {
    fn default() -> Self {
        Self { emin: DEFAULT_EMIN, emax: DEFAULT_EMAX }
    }
}

/// Per-file bootstrap settings shared by single-file and batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Energy pre-filter applied before resampling.
    pub window: EnergyWindow,
    /// Number of realizations written per input file.
    pub realizations: usize,
}

impl RunConfig {
    /// Create a config for `realizations` draws inside `window`.
    pub fn new(window: EnergyWindow, realizations: usize) -> Self {
        Self { window, realizations }
    }

    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Validate the window and the realization count.
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        if self.realizations == 0 {
            return Err(Error::Validation("realization count must be >= 1".to_string()));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { window: EnergyWindow::default(), realizations: 1 }
    }
}
