//! # eb-fits
//!
//! Native FITS reader/writer for photon event lists.
//!
//! Covers the subset evboot needs: locate the `BINTABLE` extension carrying an
//! `ENERGY` column, decode that column, and write copies of the file whose
//! events table holds a chosen subset of rows. Everything before the events HDU
//! (the primary block) and everything after it (the trailer, usually `GTI`) is
//! carried as opaque bytes.
//!
//! ## Example
//!
//! ```no_run
//! use eb_fits::EventFile;
//!
//! let f = EventFile::open("events.fits").unwrap();
//! let energies = f.energies().unwrap();
//! let keep: Vec<usize> = (0..f.n_rows()).filter(|&i| energies[i] > 1000.0).collect();
//! f.subset(&keep).unwrap().write_to("events_hi.fits").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod column;
pub mod error;
pub mod file;
pub mod header;
pub mod synth;

pub use column::{Column, ColumnKind, TForm};
pub use error::{FitsError, Result};
pub use file::{ENERGY_COLUMN, EventFile, TableSubset};
pub use header::{BLOCK_LEN, CARD_LEN, Card, Header, Value};
pub use synth::{EventListBuilder, GoodTimeInterval};
