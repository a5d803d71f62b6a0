//! Builder for small LAT-style event files.
//!
//! Produces a primary HDU, an `EVENTS` table (`ENERGY` E, `TIME` D,
//! `EVENT_ID` J) and a `GTI` table. Used by tests and `evboot generate-events`.

use std::path::Path;

use crate::error::Result;
use crate::header::{Card, Header, padded_len};

/// One good-time interval row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodTimeInterval {
    /// Interval start (mission elapsed time, s).
    pub start: f64,
    /// Interval stop (mission elapsed time, s).
    pub stop: f64,
}

/// Builder for a synthetic event list.
#[derive(Debug, Clone, Default)]
pub struct EventListBuilder {
    energies: Vec<f64>,
    times: Vec<f64>,
    gti: Vec<GoodTimeInterval>,
    primary_cards: Vec<Card>,
}

impl EventListBuilder {
    /// Empty event list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Photon energies in MeV, one row each (stored as single precision).
    pub fn energies(mut self, energies: impl IntoIterator<Item = f64>) -> Self {
        self.energies = energies.into_iter().collect();
        self
    }

    /// Arrival times. Rows without an explicit time get their row index.
    pub fn times(mut self, times: impl IntoIterator<Item = f64>) -> Self {
        self.times = times.into_iter().collect();
        self
    }

    /// Append a good-time interval.
    pub fn gti(mut self, interval: GoodTimeInterval) -> Self {
        self.gti.push(interval);
        self
    }

    /// Extra card for the primary header.
    pub fn primary_card(mut self, card: Card) -> Self {
        self.primary_cards.push(card);
        self
    }

    /// Serialize the whole file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut primary = vec![
            Card::logical("SIMPLE", true, Some("file does conform to FITS standard")),
            Card::integer("BITPIX", 8, Some("number of bits per data pixel")),
            Card::integer("NAXIS", 0, Some("number of data axes")),
            Card::logical("EXTEND", true, Some("FITS dataset may contain extensions")),
            Card::string("TELESCOP", "GLAST", Some("name of telescope generating data")),
            Card::string("INSTRUME", "LAT", Some("name of instrument generating data")),
        ];
        primary.extend(self.primary_cards.iter().cloned());
        let mut out = Header::new(primary).to_bytes();

        let n = self.energies.len();
        let events = table_header(
            "EVENTS",
            n,
            &[("ENERGY", "E", Some("MeV")), ("TIME", "D", Some("s")), ("EVENT_ID", "J", None)],
        );
        out.extend_from_slice(&events.to_bytes());
        let start = out.len();
        for (i, &e) in self.energies.iter().enumerate() {
            let t = self.times.get(i).copied().unwrap_or(i as f64);
            out.extend_from_slice(&(e as f32).to_be_bytes());
            out.extend_from_slice(&t.to_be_bytes());
            out.extend_from_slice(&(i as i32).to_be_bytes());
        }
        pad_data(&mut out, start);

        let gti = table_header(
            "GTI",
            self.gti.len(),
            &[("START", "D", Some("s")), ("STOP", "D", Some("s"))],
        );
        out.extend_from_slice(&gti.to_bytes());
        let start = out.len();
        for g in &self.gti {
            out.extend_from_slice(&g.start.to_be_bytes());
            out.extend_from_slice(&g.stop.to_be_bytes());
        }
        pad_data(&mut out, start);
        out
    }

    /// Write the file to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

fn table_header(extname: &str, n_rows: usize, fields: &[(&str, &str, Option<&str>)]) -> Header {
    let row_len: usize = fields
        .iter()
        .map(|(_, form, _)| match *form {
            "E" | "J" => 4,
            _ => 8,
        })
        .sum();
    let mut h = Header::new(vec![
        Card::string("XTENSION", "BINTABLE", Some("binary table extension")),
        Card::integer("BITPIX", 8, Some("8-bit bytes")),
        Card::integer("NAXIS", 2, Some("2-dimensional binary table")),
        Card::integer("NAXIS1", row_len as i64, Some("width of table in bytes")),
        Card::integer("NAXIS2", n_rows as i64, Some("number of rows in table")),
        Card::integer("PCOUNT", 0, Some("size of special data area")),
        Card::integer("GCOUNT", 1, Some("one data group (required keyword)")),
        Card::integer("TFIELDS", fields.len() as i64, Some("number of fields in each row")),
    ]);
    for (i, (name, form, unit)) in fields.iter().enumerate() {
        let n = i + 1;
        h.push(Card::string(&format!("TTYPE{n}"), name, None));
        h.push(Card::string(&format!("TFORM{n}"), form, None));
        if let Some(unit) = unit {
            h.push(Card::string(&format!("TUNIT{n}"), unit, None));
        }
    }
    h.push(Card::string("EXTNAME", extname, Some("name of this binary table extension")));
    h
}

fn pad_data(out: &mut Vec<u8>, start: usize) {
    let len = out.len() - start;
    out.resize(start + padded_len(len), 0);
}
