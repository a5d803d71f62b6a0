//! FITS header cards and header units.
//!
//! A header is a run of 80-byte ASCII cards terminated by an `END` card and
//! padded with spaces to a whole 2880-byte block. Cards keep their original
//! bytes so an unmodified header re-serializes identically.

use crate::error::{FitsError, Result};

/// Size of one FITS logical record.
pub const BLOCK_LEN: usize = 2880;

/// Size of one header card.
pub const CARD_LEN: usize = 80;

/// Round `n` up to a whole number of blocks.
///
/// Only for lengths of buffers already in memory; sizes read from a header go
/// through [`checked_padded_len`].
#[inline]
pub fn padded_len(n: usize) -> usize {
    n.div_ceil(BLOCK_LEN) * BLOCK_LEN
}

/// Round a header-declared size up to a whole number of blocks.
pub fn checked_padded_len(n: usize) -> Result<usize> {
    n.div_ceil(BLOCK_LEN).checked_mul(BLOCK_LEN).ok_or_else(|| overflow("data size"))
}

/// Parsed value of a header card.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Quoted character string (trailing blanks removed).
    Str(String),
    /// `T` / `F`.
    Logical(bool),
    /// Integer.
    Int(i64),
    /// Real number.
    Float(f64),
    /// Value indicator present but the field is blank.
    Undefined,
}

/// A single 80-byte header card.
#[derive(Clone, PartialEq, Eq)]
pub struct Card {
    raw: [u8; CARD_LEN],
}

impl std::fmt::Debug for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({:?})", String::from_utf8_lossy(&self.raw).trim_end())
    }
}

impl Card {
    /// Build a card from raw bytes.
    pub fn from_bytes(raw: [u8; CARD_LEN]) -> Self {
        Self { raw }
    }

    /// Build a card from text, truncated or blank-padded to 80 columns.
    pub fn from_text(text: &str) -> Self {
        let mut raw = [b' '; CARD_LEN];
        for (dst, src) in raw.iter_mut().zip(text.bytes()) {
            *dst = src;
        }
        Self { raw }
    }

    /// `KEY     =                  123 / comment`
    pub fn integer(key: &str, value: i64, comment: Option<&str>) -> Self {
        Self::with_value_field(key, &format!("{value:>20}"), comment)
    }

    /// `KEY     =                    T / comment`
    pub fn logical(key: &str, value: bool, comment: Option<&str>) -> Self {
        Self::with_value_field(key, &format!("{:>20}", if value { "T" } else { "F" }), comment)
    }

    /// `KEY     =       1.0000000E+02 / comment`
    pub fn float(key: &str, value: f64, comment: Option<&str>) -> Self {
        Self::with_value_field(key, &format!("{value:>20.10E}"), comment)
    }

    /// `KEY     = 'text    '           / comment`
    ///
    /// Quotes inside `value` are doubled; the quoted text is padded to at
    /// least eight characters.
    pub fn string(key: &str, value: &str, comment: Option<&str>) -> Self {
        let quoted = format!("'{:<8}'", value.replace('\'', "''"));
        Self::with_value_field(key, &format!("{quoted:<20}"), comment)
    }

    /// The `END` card.
    pub fn end() -> Self {
        Self::from_text("END")
    }

    fn with_value_field(key: &str, field: &str, comment: Option<&str>) -> Self {
        let mut text = format!("{key:<8}= {field}");
        if let Some(c) = comment {
            text.push_str(" / ");
            text.push_str(c);
        }
        Self::from_text(&text)
    }

    /// Raw card bytes.
    pub fn as_bytes(&self) -> &[u8; CARD_LEN] {
        &self.raw
    }

    /// Keyword (columns 1-8, trailing blanks removed).
    pub fn keyword(&self) -> &str {
        std::str::from_utf8(&self.raw[..8]).unwrap_or("").trim_end()
    }

    /// Whether the card carries a value indicator (`= ` in columns 9-10).
    pub fn has_value(&self) -> bool {
        &self.raw[8..10] == b"= "
    }

    /// Parsed value, or `None` for commentary cards.
    pub fn value(&self) -> Option<Value> {
        if !self.has_value() {
            return None;
        }
        let field = String::from_utf8_lossy(&self.raw[10..]);
        let field = field.trim_start();
        if let Some(rest) = field.strip_prefix('\'') {
            return Some(Value::Str(parse_quoted(rest).0));
        }
        let token = field.split('/').next().unwrap_or("").trim();
        Some(parse_token(token))
    }

    /// Comment following the value, if any.
    pub fn comment(&self) -> Option<String> {
        if !self.has_value() {
            return None;
        }
        let field = String::from_utf8_lossy(&self.raw[10..]).into_owned();
        let trimmed = field.trim_start();
        let after_value = match trimmed.strip_prefix('\'') {
            Some(rest) => parse_quoted(rest).1,
            None => trimmed,
        };
        let (_, comment) = after_value.split_once('/')?;
        let comment = comment.trim();
        (!comment.is_empty()).then(|| comment.to_string())
    }
}

/// Parse the body of a quoted string (opening quote already stripped).
/// Returns the unescaped text and whatever follows the closing quote.
fn parse_quoted(s: &str) -> (String, &str) {
    let mut out = String::new();
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if let Some(&(_, '\'')) = chars.peek() {
                out.push('\'');
                chars.next();
                continue;
            }
            return (out.trim_end().to_string(), &s[i + 1..]);
        }
        out.push(c);
    }
    (out.trim_end().to_string(), "")
}

fn parse_token(token: &str) -> Value {
    match token {
        "" => Value::Undefined,
        "T" => Value::Logical(true),
        "F" => Value::Logical(false),
        _ => {
            if let Ok(v) = token.parse::<i64>() {
                return Value::Int(v);
            }
            match token.replace(['D', 'd'], "E").parse::<f64>() {
                Ok(v) => Value::Float(v),
                Err(_) => Value::Str(token.to_string()),
            }
        }
    }
}

/// An ordered list of header cards (the `END` card is implicit).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    /// Create a header from cards (without `END`).
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Parse a header starting at `offset`. Returns the header and the
    /// block-aligned number of bytes it occupies.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut cards = Vec::new();
        let mut pos = offset;
        loop {
            if pos + CARD_LEN > data.len() {
                return Err(FitsError::Truncated { what: "header", offset });
            }
            let mut raw = [0u8; CARD_LEN];
            raw.copy_from_slice(&data[pos..pos + CARD_LEN]);
            pos += CARD_LEN;
            let card = Card::from_bytes(raw);
            if card.keyword() == "END" {
                break;
            }
            cards.push(card);
        }
        let len = padded_len(pos - offset);
        if offset + len > data.len() {
            return Err(FitsError::Truncated { what: "header", offset });
        }
        Ok((Self { cards }, len))
    }

    /// Cards in order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// First card with the given keyword.
    pub fn get(&self, key: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.keyword() == key)
    }

    /// Integer value of an optional keyword.
    pub fn opt_int(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key).and_then(Card::value) {
            None => Ok(None),
            Some(Value::Int(v)) => Ok(Some(v)),
            Some(other) => Err(FitsError::BadKeyword {
                key: key.to_string(),
                detail: format!("expected integer, got {other:?}"),
            }),
        }
    }

    /// Integer value of a required keyword.
    pub fn int(&self, key: &str) -> Result<i64> {
        self.opt_int(key)?.ok_or_else(|| FitsError::MissingKeyword(key.to_string()))
    }

    /// Non-negative integer value of a required keyword, as `usize`.
    pub fn usize(&self, key: &str) -> Result<usize> {
        let v = self.int(key)?;
        usize::try_from(v).map_err(|_| FitsError::BadKeyword {
            key: key.to_string(),
            detail: format!("expected non-negative integer, got {v}"),
        })
    }

    /// Real value of an optional keyword (integers are widened).
    pub fn opt_float(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key).and_then(Card::value) {
            None => Ok(None),
            Some(Value::Int(v)) => Ok(Some(v as f64)),
            Some(Value::Float(v)) => Ok(Some(v)),
            Some(other) => Err(FitsError::BadKeyword {
                key: key.to_string(),
                detail: format!("expected number, got {other:?}"),
            }),
        }
    }

    /// String value of an optional keyword.
    pub fn opt_str(&self, key: &str) -> Option<String> {
        match self.get(key).and_then(Card::value) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Logical value of an optional keyword.
    pub fn opt_logical(&self, key: &str) -> Option<bool> {
        match self.get(key).and_then(Card::value) {
            Some(Value::Logical(b)) => Some(b),
            _ => None,
        }
    }

    /// Replace the value of an existing integer keyword, keeping its comment
    /// and position.
    pub fn set_int(&mut self, key: &str, value: i64) -> Result<()> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.keyword() == key)
            .ok_or_else(|| FitsError::MissingKeyword(key.to_string()))?;
        let comment = card.comment();
        *card = Card::integer(key, value, comment.as_deref());
        Ok(())
    }

    /// Append a card.
    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Serialize: cards, `END`, blank padding to a whole block.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(padded_len((self.cards.len() + 1) * CARD_LEN));
        for card in &self.cards {
            out.extend_from_slice(card.as_bytes());
        }
        out.extend_from_slice(Card::end().as_bytes());
        out.resize(padded_len(out.len()), b' ');
        out
    }

    /// Size in bytes of the data unit this header describes, before padding.
    ///
    /// `|BITPIX|/8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`; a random-groups
    /// primary (`GROUPS = T`, `NAXIS1 = 0`) skips `NAXIS1`.
    pub fn data_len(&self) -> Result<usize> {
        let bitpix = self.int("BITPIX")?;
        if !matches!(bitpix, 8 | 16 | 32 | 64 | -32 | -64) {
            return Err(FitsError::BadKeyword {
                key: "BITPIX".to_string(),
                detail: format!("unsupported value {bitpix}"),
            });
        }
        let naxis = self.usize("NAXIS")?;
        if naxis == 0 {
            return Ok(0);
        }
        let groups = self.opt_logical("GROUPS").unwrap_or(false);
        let mut product: usize = 1;
        for i in 1..=naxis {
            let n = self.usize(&format!("NAXIS{i}"))?;
            if i == 1 && groups && n == 0 {
                continue;
            }
            product = product.checked_mul(n).ok_or_else(|| overflow("NAXISn"))?;
        }
        let pcount = self.opt_int("PCOUNT")?.unwrap_or(0).max(0) as usize;
        let gcount = self.opt_int("GCOUNT")?.unwrap_or(1).max(0) as usize;
        let bytes = (bitpix.unsigned_abs() / 8) as usize;
        product
            .checked_add(pcount)
            .and_then(|n| n.checked_mul(gcount))
            .and_then(|n| n.checked_mul(bytes))
            .ok_or_else(|| overflow("data size"))
    }
}

pub(crate) fn overflow(what: &str) -> FitsError {
    FitsError::BadKeyword { key: what.to_string(), detail: "size overflows usize".to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_card_layout_is_fixed_format() {
        let c = Card::integer("NAXIS2", 7, Some("number of rows"));
        let text = String::from_utf8_lossy(c.as_bytes()).into_owned();
        assert_eq!(&text[..30], "NAXIS2  =                    7");
        assert_eq!(c.keyword(), "NAXIS2");
        assert_eq!(c.value(), Some(Value::Int(7)));
        assert_eq!(c.comment().as_deref(), Some("number of rows"));
    }

    #[test]
    fn string_card_with_embedded_quote_and_slash() {
        let c = Card::string("OBSERVER", "O'Neil / LAT", Some("who"));
        assert_eq!(c.value(), Some(Value::Str("O'Neil / LAT".to_string())));
        assert_eq!(c.comment().as_deref(), Some("who"));
    }

    #[test]
    fn parses_logical_float_and_fortran_exponent() {
        let t = Card::from_text("SIMPLE  =                    T / conforms");
        assert_eq!(t.value(), Some(Value::Logical(true)));
        let d = Card::from_text("TSTART  =   2.39557417000000D+08");
        assert_eq!(d.value(), Some(Value::Float(2.39557417e8)));
        let f = Card::float("TZERO1", 0.5, None);
        assert_eq!(f.value(), Some(Value::Float(0.5)));
    }

    #[test]
    fn commentary_cards_have_no_value() {
        let c = Card::from_text("COMMENT   a = b");
        assert!(!c.has_value());
        assert_eq!(c.value(), None);
        assert_eq!(c.keyword(), "COMMENT");
    }

    #[test]
    fn header_roundtrip_is_block_aligned() {
        let h = Header::new(vec![
            Card::logical("SIMPLE", true, None),
            Card::integer("BITPIX", 8, None),
            Card::integer("NAXIS", 0, None),
        ]);
        let bytes = h.to_bytes();
        assert_eq!(bytes.len(), BLOCK_LEN);
        let (parsed, len) = Header::parse(&bytes, 0).unwrap();
        assert_eq!(len, BLOCK_LEN);
        assert_eq!(parsed, h);
        assert_eq!(parsed.to_bytes(), bytes);
    }

    #[test]
    fn set_int_keeps_comment_and_position() {
        let mut h = Header::new(vec![
            Card::integer("NAXIS1", 16, Some("width of table in bytes")),
            Card::integer("NAXIS2", 10, Some("number of rows in table")),
            Card::integer("PCOUNT", 0, None),
        ]);
        h.set_int("NAXIS2", 7).unwrap();
        assert_eq!(h.cards()[1].keyword(), "NAXIS2");
        assert_eq!(h.int("NAXIS2").unwrap(), 7);
        assert_eq!(h.cards()[1].comment().as_deref(), Some("number of rows in table"));
        assert!(matches!(h.set_int("THEAP", 1), Err(FitsError::MissingKeyword(_))));
    }

    #[test]
    fn data_len_for_bintable_counts_heap() {
        let h = Header::new(vec![
            Card::string("XTENSION", "BINTABLE", None),
            Card::integer("BITPIX", 8, None),
            Card::integer("NAXIS", 2, None),
            Card::integer("NAXIS1", 16, None),
            Card::integer("NAXIS2", 10, None),
            Card::integer("PCOUNT", 40, None),
            Card::integer("GCOUNT", 1, None),
        ]);
        assert_eq!(h.data_len().unwrap(), 200);
    }

    #[test]
    fn declared_sizes_that_overflow_are_rejected() {
        let h = Header::new(vec![
            Card::integer("BITPIX", 8, None),
            Card::integer("NAXIS", 2, None),
            Card::integer("NAXIS1", 1 << 40, None),
            Card::integer("NAXIS2", 1 << 40, None),
        ]);
        assert!(matches!(h.data_len(), Err(FitsError::BadKeyword { .. })));
        assert!(matches!(checked_padded_len(usize::MAX - 3), Err(FitsError::BadKeyword { .. })));
        assert_eq!(checked_padded_len(BLOCK_LEN + 1).unwrap(), 2 * BLOCK_LEN);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let bytes = Card::logical("SIMPLE", true, None).as_bytes().to_vec();
        assert!(matches!(Header::parse(&bytes, 0), Err(FitsError::Truncated { .. })));
    }
}
