//! Error types for FITS parsing and writing.

use thiserror::Error;

/// FITS reader/writer error.
#[derive(Error, Debug)]
pub enum FitsError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with a `SIMPLE = T` primary header.
    #[error("not a FITS file (missing SIMPLE = T)")]
    BadMagic,

    /// Read past the end of the buffer.
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Cursor position.
        offset: usize,
        /// Bytes requested.
        need: usize,
        /// Bytes available.
        have: usize,
    },

    /// Header or data unit extends past the end of the file.
    #[error("truncated {what} at offset {offset}")]
    Truncated {
        /// What was being read.
        what: &'static str,
        /// Byte offset where it starts.
        offset: usize,
    },

    /// Required keyword absent.
    #[error("missing keyword {0}")]
    MissingKeyword(String),

    /// Keyword present but its value has the wrong type or range.
    #[error("bad value for keyword {key}: {detail}")]
    BadKeyword {
        /// Keyword name.
        key: String,
        /// Description.
        detail: String,
    },

    /// Column format the reader does not decode.
    #[error("unsupported column {name}: {detail}")]
    UnsupportedColumn {
        /// Column name.
        name: String,
        /// Description.
        detail: String,
    },

    /// No binary table with an `ENERGY` column was found.
    #[error("no BINTABLE extension with column {0}")]
    NoEventsTable(String),

    /// Row index beyond the table.
    #[error("row {row} out of range for table with {n_rows} rows")]
    RowOutOfRange {
        /// Requested row.
        row: usize,
        /// Table length.
        n_rows: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FitsError>;
