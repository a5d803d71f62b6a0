//! Binary table column layout (`TTYPEn` / `TFORMn`) and scalar decoding.

use crate::buffer::FBuffer;
use crate::error::{FitsError, Result};
use crate::header::{Header, overflow};

/// Binary table field type code (the letter in `TFORMn`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `L` logical.
    Logical,
    /// `X` bit array.
    Bit,
    /// `B` unsigned byte.
    UInt8,
    /// `I` 16-bit integer.
    Int16,
    /// `J` 32-bit integer.
    Int32,
    /// `K` 64-bit integer.
    Int64,
    /// `A` character.
    Char,
    /// `E` single precision float.
    Float32,
    /// `D` double precision float.
    Float64,
    /// `C` single precision complex.
    Complex32,
    /// `M` double precision complex.
    Complex64,
    /// `P` 32-bit array descriptor.
    Descriptor32,
    /// `Q` 64-bit array descriptor.
    Descriptor64,
}

impl ColumnKind {
    fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'L' => Self::Logical,
            'X' => Self::Bit,
            'B' => Self::UInt8,
            'I' => Self::Int16,
            'J' => Self::Int32,
            'K' => Self::Int64,
            'A' => Self::Char,
            'E' => Self::Float32,
            'D' => Self::Float64,
            'C' => Self::Complex32,
            'M' => Self::Complex64,
            'P' => Self::Descriptor32,
            'Q' => Self::Descriptor64,
            _ => return None,
        })
    }

    /// Bytes per element (descriptors count as one element).
    fn elem_size(self) -> usize {
        match self {
            Self::Logical | Self::UInt8 | Self::Char => 1,
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 | Self::Complex32 | Self::Descriptor32 => 8,
            Self::Complex64 | Self::Descriptor64 => 16,
            Self::Bit => 0,
        }
    }
}

/// Parsed `TFORMn` value: repeat count and field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TForm {
    /// Repeat count (defaults to 1).
    pub repeat: usize,
    /// Field type.
    pub kind: ColumnKind,
}

impl TForm {
    /// Parse e.g. `E`, `1D`, `16A`, `1PE(12)`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let digits = s.bytes().take_while(u8::is_ascii_digit).count();
        let repeat = if digits == 0 { 1 } else { s[..digits].parse().ok()? };
        let code = s[digits..].chars().next()?;
        Some(Self { repeat, kind: ColumnKind::from_code(code.to_ascii_uppercase())? })
    }

    /// Bytes this field occupies in a row, or `None` if the repeat count is
    /// too large to address.
    pub fn width(&self) -> Option<usize> {
        match self.kind {
            ColumnKind::Bit => Some(self.repeat.div_ceil(8)),
            ColumnKind::Descriptor32 | ColumnKind::Descriptor64 => {
                Some(self.kind.elem_size() * self.repeat.min(1))
            }
            k => k.elem_size().checked_mul(self.repeat),
        }
    }
}

/// One column of a binary table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// `TTYPEn` (empty if absent).
    pub name: String,
    /// `TFORMn`.
    pub form: TForm,
    /// Byte offset of the field within a row.
    pub offset: usize,
    /// `TSCALn` (default 1).
    pub scale: f64,
    /// `TZEROn` (default 0).
    pub zero: f64,
}

impl Column {
    /// Read the column layout of a `BINTABLE` header and check that the field
    /// widths add up to `NAXIS1`.
    pub fn from_header(header: &Header) -> Result<Vec<Column>> {
        let n_fields = header.usize("TFIELDS")?;
        let row_len = header.usize("NAXIS1")?;
        let mut columns = Vec::with_capacity(n_fields);
        let mut offset = 0usize;
        for i in 1..=n_fields {
            let key = format!("TFORM{i}");
            let raw = header.opt_str(&key).ok_or_else(|| FitsError::MissingKeyword(key.clone()))?;
            let form = TForm::parse(&raw).ok_or_else(|| FitsError::BadKeyword {
                key: key.clone(),
                detail: format!("unrecognised format '{raw}'"),
            })?;
            let name = header.opt_str(&format!("TTYPE{i}")).unwrap_or_default();
            let scale = header.opt_float(&format!("TSCAL{i}"))?.unwrap_or(1.0);
            let zero = header.opt_float(&format!("TZERO{i}"))?.unwrap_or(0.0);
            columns.push(Column { name, form, offset, scale, zero });
            offset = form
                .width()
                .and_then(|w| offset.checked_add(w))
                .ok_or_else(|| overflow(&key))?;
        }
        if offset != row_len {
            return Err(FitsError::BadKeyword {
                key: "NAXIS1".to_string(),
                detail: format!("row width {row_len} does not match column sum {offset}"),
            });
        }
        Ok(columns)
    }

    /// Check that the column holds one numeric value per row.
    pub fn ensure_numeric_scalar(&self) -> Result<()> {
        let numeric = matches!(
            self.form.kind,
            ColumnKind::UInt8
                | ColumnKind::Int16
                | ColumnKind::Int32
                | ColumnKind::Int64
                | ColumnKind::Float32
                | ColumnKind::Float64
        );
        if !numeric || self.form.repeat != 1 {
            return Err(FitsError::UnsupportedColumn {
                name: self.name.clone(),
                detail: format!("expected a numeric scalar, got {:?}", self.form),
            });
        }
        Ok(())
    }

    /// Decode this column's physical value (`zero + scale * raw`) from a row.
    pub fn read_f64(&self, row: &[u8]) -> Result<f64> {
        let mut buf = FBuffer::new(row);
        buf.set_pos(self.offset);
        let raw = match self.form.kind {
            ColumnKind::UInt8 => buf.read_u8()? as f64,
            ColumnKind::Int16 => buf.read_i16()? as f64,
            ColumnKind::Int32 => buf.read_i32()? as f64,
            ColumnKind::Int64 => buf.read_i64()? as f64,
            ColumnKind::Float32 => buf.read_f32()? as f64,
            ColumnKind::Float64 => buf.read_f64()?,
            _ => {
                return Err(FitsError::UnsupportedColumn {
                    name: self.name.clone(),
                    detail: format!("cannot decode {:?} as a number", self.form.kind),
                });
            }
        };
        Ok(self.zero + self.scale * raw)
    }
}
