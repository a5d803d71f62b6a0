//! Synthetic LAT-like event lists for demos and tests.
//!
//! Energies are log-uniform in `[emin, emax]`, arrival times uniform over the
//! observation and sorted, with one good-time interval covering it. The
//! generator is fully deterministic given `seed`.

use eb_core::{Error, Result};
use eb_fits::{EventListBuilder, GoodTimeInterval};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for [`synthetic_event_list`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticEventsConfig {
    /// Number of photons.
    pub n_events: usize,
    /// Lowest energy (MeV, > 0).
    pub emin: f64,
    /// Highest energy (MeV).
    pub emax: f64,
    /// Observation start (s).
    pub t_start: f64,
    /// Observation stop (s).
    pub t_stop: f64,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for SyntheticEventsConfig {
    fn default() -> Self {
        Self {
            n_events: 1000,
            emin: 30.0,
            emax: 500_000.0,
            t_start: 239_557_417.0,
            t_stop: 239_643_817.0,
            seed: 42,
        }
    }
}

/// Build a synthetic event list from `config`.
pub fn synthetic_event_list(config: &SyntheticEventsConfig) -> Result<EventListBuilder> {
    if !(config.emin > 0.0 && config.emin.is_finite() && config.emax.is_finite())
        || config.emin > config.emax
    {
        return Err(Error::Validation(format!(
            "synthetic energies need 0 < emin <= emax, got [{}, {}]",
            config.emin, config.emax
        )));
    }
    if !(config.t_start.is_finite() && config.t_stop.is_finite()) || config.t_start > config.t_stop
    {
        return Err(Error::Validation(format!(
            "synthetic times need t_start <= t_stop, got [{}, {}]",
            config.t_start, config.t_stop
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let log_ratio = (config.emax / config.emin).ln();
    let energies: Vec<f64> = (0..config.n_events)
        .map(|_| {
            let u: f64 = rng.random();
            config.emin * (u * log_ratio).exp()
        })
        .collect();
    let span = config.t_stop - config.t_start;
    let mut times: Vec<f64> = (0..config.n_events)
        .map(|_| config.t_start + span * rng.random::<f64>())
        .collect();
    times.sort_by(f64::total_cmp);

    Ok(EventListBuilder::new()
        .energies(energies)
        .times(times)
        .gti(GoodTimeInterval { start: config.t_start, stop: config.t_stop }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eb_fits::EventFile;
    use std::path::PathBuf;

    #[test]
    fn same_seed_same_bytes() {
        let cfg = SyntheticEventsConfig { n_events: 50, seed: 7, ..Default::default() };
        let a = synthetic_event_list(&cfg).unwrap().to_bytes();
        let b = synthetic_event_list(&cfg).unwrap().to_bytes();
        assert_eq!(a, b);
        let c = synthetic_event_list(&SyntheticEventsConfig { seed: 8, ..cfg }).unwrap().to_bytes();
        assert_ne!(a, c);
    }

    #[test]
    fn energies_stay_in_range() {
        let cfg = SyntheticEventsConfig { n_events: 500, emin: 100.0, emax: 1000.0, ..Default::default() };
        let bytes = synthetic_event_list(&cfg).unwrap().to_bytes();
        let f = EventFile::from_bytes(bytes, PathBuf::from("synth.fits")).unwrap();
        assert_eq!(f.n_rows(), 500);
        // Stored as f32, so allow for rounding at the edges.
        for e in f.energies().unwrap() {
            assert!((99.99..=1000.01).contains(&e), "energy {e} out of range");
        }
    }

    #[test]
    fn rejects_non_positive_emin() {
        let cfg = SyntheticEventsConfig { emin: 0.0, ..Default::default() };
        assert!(synthetic_event_list(&cfg).is_err());
    }
}
