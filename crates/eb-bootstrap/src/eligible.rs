//! Energy pre-filter.

use eb_core::EnergyWindow;

/// Ascending row indices whose energy lies in an inclusive window.
///
/// Built once per input file and shared by all of its realizations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EligibleIndexSet {
    indices: Vec<usize>,
}

impl EligibleIndexSet {
    /// Scan `energies` once, keeping rows with `emin <= energy <= emax`.
    pub fn from_energies(energies: &[f64], window: &EnergyWindow) -> Self {
        let indices = energies
            .iter()
            .enumerate()
            .filter(|&(_, &e)| window.contains(e))
            .map(|(i, _)| i)
            .collect();
        Self { indices }
    }

    /// Number of eligible rows (the sample size of every realization).
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether no row passed the filter.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Eligible row indices, ascending.
    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Whether `row` is eligible.
    pub fn contains(&self, row: usize) -> bool {
        self.indices.binary_search(&row).is_ok()
    }
}
