//! Top-level event-file interface: locate the events table, read `ENERGY`,
//! write row subsets.

use std::fs;
use std::io::{BufWriter, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::column::Column;
use crate::error::{FitsError, Result};
use crate::header::{BLOCK_LEN, Card, Header, Value, checked_padded_len, overflow, padded_len};

/// Name of the column the energy filter reads.
pub const ENERGY_COLUMN: &str = "ENERGY";

/// Location and layout of the events `BINTABLE`.
#[derive(Debug, Clone)]
struct EventsHdu {
    header: Header,
    /// Offset of the events header (end of the primary block).
    header_start: usize,
    /// Offset of the first row.
    data_start: usize,
    /// Offset just past the padded data unit (start of the trailer).
    data_end: usize,
    row_len: usize,
    n_rows: usize,
    /// `row_len * n_rows`, never past the end of the data unit.
    main_len: usize,
    /// Supplemental area (`PCOUNT` bytes following the rows).
    heap_len: usize,
    columns: Vec<Column>,
    energy: usize,
}

/// Bytes of an open file: mapped for files on disk, owned for `from_bytes`.
enum Storage {
    Owned(Vec<u8>),
    Mapped(memmap2::Mmap),
}

impl Storage {
    /// Conforming files are a whole number of 2880-byte blocks.
    fn is_block_aligned(&self) -> bool {
        self.len() % BLOCK_LEN == 0
    }
}

impl Deref for Storage {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            Storage::Owned(v) => v,
            Storage::Mapped(m) => m,
        }
    }
}

/// A FITS photon event list opened for resampling.
///
/// The file is split into three parts: the primary block (every HDU before the
/// events table), the events table itself, and the trailer (everything after
/// it). Only the events table is interpreted.
pub struct EventFile {
    data: Storage,
    events: EventsHdu,
    path: PathBuf,
}

impl std::fmt::Debug for EventFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFile")
            .field("path", &self.path)
            .field("n_rows", &self.events.n_rows)
            .field("row_len", &self.events.row_len)
            .finish()
    }
}

impl EventFile {
    /// Open a FITS file via memory-mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: the map is only read. Input files are never written while a
        // resampling run holds them open.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::from_storage(Storage::Mapped(mmap), path)
    }

    /// Parse a FITS file from a byte vector (for testing).
    pub fn from_bytes(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        Self::from_storage(Storage::Owned(data), path)
    }

    fn from_storage(data: Storage, path: PathBuf) -> Result<Self> {
        let events = locate_events(&data)?;
        if !data.is_block_aligned() {
            log::warn!(
                "{}: file length {} is not a multiple of {BLOCK_LEN}",
                path.display(),
                data.len()
            );
        }
        log::debug!(
            "{}: events table at byte {} ({} rows x {} bytes)",
            path.display(),
            events.header_start,
            events.n_rows,
            events.row_len
        );
        Ok(Self { data, events, path })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of rows in the events table (`NAXIS2`).
    pub fn n_rows(&self) -> usize {
        self.events.n_rows
    }

    /// Bytes per row (`NAXIS1`).
    pub fn row_len(&self) -> usize {
        self.events.row_len
    }

    /// Events table header.
    pub fn events_header(&self) -> &Header {
        &self.events.header
    }

    /// Events table columns.
    pub fn columns(&self) -> &[Column] {
        &self.events.columns
    }

    /// `EXTNAME` of the events table, if set.
    pub fn extname(&self) -> Option<String> {
        self.events.header.opt_str("EXTNAME")
    }

    /// Every byte before the events header.
    pub fn primary_bytes(&self) -> &[u8] {
        &self.data[..self.events.header_start]
    }

    /// Every byte after the padded events data unit.
    pub fn trailer_bytes(&self) -> &[u8] {
        &self.data[self.events.data_end..]
    }

    /// Raw bytes of one row.
    pub fn row(&self, index: usize) -> Result<&[u8]> {
        if index >= self.events.n_rows {
            return Err(FitsError::RowOutOfRange { row: index, n_rows: self.events.n_rows });
        }
        let start = self.events.data_start + index * self.events.row_len;
        Ok(&self.data[start..start + self.events.row_len])
    }

    fn main_table(&self) -> &[u8] {
        let start = self.events.data_start;
        &self.data[start..start + self.events.main_len]
    }

    fn heap(&self) -> &[u8] {
        let start = self.events.data_start + self.events.main_len;
        &self.data[start..start + self.events.heap_len]
    }

    /// Physical `ENERGY` values of all rows, in row order.
    pub fn energies(&self) -> Result<Vec<f64>> {
        let col = &self.events.columns[self.events.energy];
        let row_len = self.events.row_len;
        if row_len == 0 {
            return Ok(Vec::new());
        }
        self.main_table().chunks_exact(row_len).map(|row| col.read_f64(row)).collect()
    }

    /// A copy of this file whose events table holds `rows` (in the given
    /// order, repeats allowed).
    pub fn subset<'a>(&'a self, rows: &'a [usize]) -> Result<TableSubset<'a>> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.events.n_rows) {
            return Err(FitsError::RowOutOfRange { row: bad, n_rows: self.events.n_rows });
        }
        let mut header = self.events.header.clone();
        header.set_int("NAXIS2", rows.len() as i64)?;
        if let Some(theap) = self.events.header.opt_int("THEAP")? {
            let gap = usize::try_from(theap)
                .ok()
                .and_then(|t| t.checked_sub(self.events.main_len))
                .ok_or_else(|| FitsError::BadKeyword {
                    key: "THEAP".to_string(),
                    detail: format!("heap offset {theap} lies inside the main table"),
                })?;
            let shifted = self
                .events
                .row_len
                .checked_mul(rows.len())
                .and_then(|n| n.checked_add(gap))
                .and_then(|n| i64::try_from(n).ok())
                .ok_or_else(|| overflow("THEAP"))?;
            header.set_int("THEAP", shifted)?;
        }
        Ok(TableSubset { file: self, header, rows })
    }
}

/// Events table restricted to a row selection, ready to be written.
///
/// Rows are copied straight from the source file at write time.
pub struct TableSubset<'a> {
    file: &'a EventFile,
    header: Header,
    rows: &'a [usize],
}

impl TableSubset<'_> {
    /// Rows in the output table.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Updated events header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Stream the complete file into `w`.
    pub fn write_into<W: Write>(&self, w: &mut W) -> Result<()> {
        let file = self.file;
        w.write_all(file.primary_bytes())?;
        w.write_all(&self.header.to_bytes())?;
        for &r in self.rows {
            w.write_all(file.row(r)?)?;
        }
        let heap = file.heap();
        w.write_all(heap)?;
        let data_len = file.row_len() * self.rows.len() + heap.len();
        w.write_all(&vec![0u8; padded_len(data_len) - data_len])?;
        w.write_all(file.trailer_bytes())?;
        Ok(())
    }

    /// Serialize the complete file to memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_into(&mut out)?;
        Ok(out)
    }

    /// Create (or truncate) `path` and write the complete file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut w = BufWriter::new(fs::File::create(path.as_ref())?);
        self.write_into(&mut w)?;
        w.flush()?;
        Ok(())
    }
}

/// Walk HDUs from the start of the file until the first `BINTABLE` with an
/// `ENERGY` column. HDUs after it are not parsed.
fn locate_events(data: &[u8]) -> Result<EventsHdu> {
    let (primary, primary_header_len) = Header::parse(data, 0).map_err(|e| match e {
        FitsError::Truncated { .. } => FitsError::BadMagic,
        other => other,
    })?;
    if primary.cards().first().map(Card::keyword) != Some("SIMPLE")
        || primary.opt_logical("SIMPLE") != Some(true)
    {
        return Err(FitsError::BadMagic);
    }

    let mut pos = checked_padded_len(primary.data_len()?)?
        .checked_add(primary_header_len)
        .ok_or_else(|| overflow("data size"))?;
    while pos < data.len() {
        let header_start = pos;
        let (header, header_len) = Header::parse(data, pos)?;
        let data_start = header_start + header_len;
        let data_len = header.data_len()?;
        let data_end = data_start
            .checked_add(checked_padded_len(data_len)?)
            .ok_or_else(|| overflow("data size"))?;
        if data_start.checked_add(data_len).is_none_or(|end| end > data.len()) {
            return Err(FitsError::Truncated { what: "data unit", offset: data_start });
        }

        let is_bintable = matches!(
            header.get("XTENSION").and_then(Card::value),
            Some(Value::Str(ref s)) if s == "BINTABLE"
        );
        if is_bintable {
            let columns = Column::from_header(&header)?;
            if let Some(energy) = columns.iter().position(|c| c.name == ENERGY_COLUMN) {
                columns[energy].ensure_numeric_scalar()?;
                let row_len = header.usize("NAXIS1")?;
                let n_rows = header.usize("NAXIS2")?;
                let main_len = row_len
                    .checked_mul(n_rows)
                    .filter(|&n| n <= data_len)
                    .ok_or_else(|| FitsError::BadKeyword {
                        key: "NAXIS2".to_string(),
                        detail: format!("{n_rows} rows of {row_len} bytes exceed the data unit"),
                    })?;
                return Ok(EventsHdu {
                    header,
                    header_start,
                    data_start,
                    data_end: data_end.min(data.len()),
                    row_len,
                    n_rows,
                    main_len,
                    heap_len: data_len - main_len,
                    columns,
                    energy,
                });
            }
        }
        pos = data_end;
    }
    Err(FitsError::NoEventsTable(ENERGY_COLUMN.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::BLOCK_LEN;
    use crate::synth::{EventListBuilder, GoodTimeInterval};
    use approx::assert_relative_eq;

    fn sample_file() -> EventFile {
        let bytes = EventListBuilder::new()
            .energies([50.0, 100.0, 150.0, 200.0])
            .gti(GoodTimeInterval { start: 0.0, stop: 10.0 })
            .to_bytes();
        EventFile::from_bytes(bytes, PathBuf::from("sample.fits")).unwrap()
    }

    #[test]
    fn locates_events_after_primary() {
        let f = sample_file();
        assert_eq!(f.n_rows(), 4);
        assert_eq!(f.primary_bytes().len(), BLOCK_LEN);
        assert_eq!(f.extname().as_deref(), Some("EVENTS"));
        assert_eq!(f.columns()[0].name, ENERGY_COLUMN);
        let e = f.energies().unwrap();
        assert_eq!(e.len(), 4);
        assert_relative_eq!(e[2], 150.0);
        assert_relative_eq!(e[3], 200.0);
    }

    #[test]
    fn subset_rewrites_only_naxis2() {
        let f = sample_file();
        let rows = [1usize, 1, 3];
        let sub = f.subset(&rows).unwrap();
        assert_eq!(sub.n_rows(), 3);

        let out = EventFile::from_bytes(sub.to_bytes().unwrap(), PathBuf::from("out.fits"))
            .unwrap();
        assert_eq!(out.n_rows(), 3);
        assert_eq!(out.primary_bytes(), f.primary_bytes());
        assert_eq!(out.trailer_bytes(), f.trailer_bytes());
        assert_eq!(out.energies().unwrap(), vec![100.0, 100.0, 200.0]);
        assert_eq!(out.row(2).unwrap(), f.row(3).unwrap());

        let before = f.events_header().cards();
        let after = out.events_header().cards();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after) {
            if a.keyword() != "NAXIS2" {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn empty_subset_is_a_valid_file() {
        let f = sample_file();
        let bytes = f.subset(&[]).unwrap().to_bytes().unwrap();
        assert_eq!(bytes.len() % BLOCK_LEN, 0);
        let out = EventFile::from_bytes(bytes, PathBuf::from("empty.fits")).unwrap();
        assert_eq!(out.n_rows(), 0);
        assert!(out.energies().unwrap().is_empty());
        assert_eq!(out.trailer_bytes(), f.trailer_bytes());
    }

    #[test]
    fn out_of_range_rows_are_rejected() {
        let f = sample_file();
        assert!(matches!(f.subset(&[0, 4]), Err(FitsError::RowOutOfRange { row: 4, n_rows: 4 })));
        assert!(f.row(9).is_err());
    }

    #[test]
    fn garbage_is_bad_magic() {
        let err = EventFile::from_bytes(b"not a fits file".to_vec(), PathBuf::from("x")).unwrap_err();
        assert!(matches!(err, FitsError::BadMagic));
    }

    #[test]
    fn truncated_rows_are_detected() {
        let mut bytes = EventListBuilder::new().energies(vec![1.0; 400]).to_bytes();
        bytes.truncate(2 * BLOCK_LEN + 100);
        let err = EventFile::from_bytes(bytes, PathBuf::from("t.fits")).unwrap_err();
        assert!(matches!(err, FitsError::Truncated { .. }), "got {err:?}");
    }

    #[test]
    fn table_without_energy_is_not_an_event_list() {
        let primary = Header::new(vec![
            Card::logical("SIMPLE", true, None),
            Card::integer("BITPIX", 8, None),
            Card::integer("NAXIS", 0, None),
        ]);
        let table = Header::new(vec![
            Card::string("XTENSION", "BINTABLE", None),
            Card::integer("BITPIX", 8, None),
            Card::integer("NAXIS", 2, None),
            Card::integer("NAXIS1", 8, None),
            Card::integer("NAXIS2", 0, None),
            Card::integer("PCOUNT", 0, None),
            Card::integer("GCOUNT", 1, None),
            Card::integer("TFIELDS", 1, None),
            Card::string("TTYPE1", "TIME", None),
            Card::string("TFORM1", "D", None),
        ]);
        let mut bytes = primary.to_bytes();
        bytes.extend_from_slice(&table.to_bytes());
        let err = EventFile::from_bytes(bytes, PathBuf::from("gti.fits")).unwrap_err();
        assert!(matches!(err, FitsError::NoEventsTable(_)));
    }

    fn energy_table(naxis2: i64, gcount: i64) -> Vec<u8> {
        let primary = Header::new(vec![
            Card::logical("SIMPLE", true, None),
            Card::integer("BITPIX", 8, None),
            Card::integer("NAXIS", 0, None),
        ]);
        let table = Header::new(vec![
            Card::string("XTENSION", "BINTABLE", None),
            Card::integer("BITPIX", 8, None),
            Card::integer("NAXIS", 2, None),
            Card::integer("NAXIS1", 4, None),
            Card::integer("NAXIS2", naxis2, None),
            Card::integer("PCOUNT", 0, None),
            Card::integer("GCOUNT", gcount, None),
            Card::integer("TFIELDS", 1, None),
            Card::string("TTYPE1", "ENERGY", None),
            Card::string("TFORM1", "E", None),
        ]);
        let mut bytes = primary.to_bytes();
        bytes.extend_from_slice(&table.to_bytes());
        bytes
    }

    #[test]
    fn oversized_row_count_is_an_error() {
        let bytes = energy_table((1 << 62) - 1, 1);
        let err = EventFile::from_bytes(bytes, PathBuf::from("huge.fits")).unwrap_err();
        assert!(matches!(err, FitsError::BadKeyword { .. }), "got {err:?}");
    }

    #[test]
    fn rows_beyond_the_data_unit_are_rejected() {
        // GCOUNT = 0 declares an empty data unit for a 3-row table.
        let err = EventFile::from_bytes(energy_table(3, 0), PathBuf::from("g.fits")).unwrap_err();
        assert!(matches!(err, FitsError::BadKeyword { ref key, .. } if key == "NAXIS2"));
    }

    #[test]
    fn theap_is_shifted_with_the_main_table() {
        let primary = Header::new(vec![
            Card::logical("SIMPLE", true, None),
            Card::integer("BITPIX", 8, None),
            Card::integer("NAXIS", 0, None),
        ]);
        // 3 rows x 4 bytes, 4-byte gap, 8-byte heap.
        let table = Header::new(vec![
            Card::string("XTENSION", "BINTABLE", None),
            Card::integer("BITPIX", 8, None),
            Card::integer("NAXIS", 2, None),
            Card::integer("NAXIS1", 4, None),
            Card::integer("NAXIS2", 3, None),
            Card::integer("PCOUNT", 12, None),
            Card::integer("GCOUNT", 1, None),
            Card::integer("TFIELDS", 1, None),
            Card::string("TTYPE1", "ENERGY", None),
            Card::string("TFORM1", "E", None),
            Card::integer("THEAP", 16, None),
        ]);
        let mut bytes = primary.to_bytes();
        bytes.extend_from_slice(&table.to_bytes());
        for e in [10.0f32, 20.0, 30.0] {
            bytes.extend_from_slice(&e.to_be_bytes());
        }
        bytes.extend_from_slice(&[0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8]);
        bytes.resize(padded_len(bytes.len()), 0);

        let f = EventFile::from_bytes(bytes, PathBuf::from("heap.fits")).unwrap();
        let rows = [2usize];
        let sub = f.subset(&rows).unwrap();
        assert_eq!(sub.header().int("THEAP").unwrap(), 8);
        let out = EventFile::from_bytes(sub.to_bytes().unwrap(), PathBuf::from("o.fits")).unwrap();
        assert_eq!(out.energies().unwrap(), vec![30.0]);
        assert_eq!(out.heap(), f.heap());
    }
}
