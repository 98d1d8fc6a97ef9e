//! Reading numeric columns from FITS binary table extensions.

use crate::error::{Error, Result};
use crate::hdu::{Hdu, HduInfo};
use crate::header::Header;

/// The data type of a column in a FITS binary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryColumnType {
    /// L -- logical, stored as a single byte.
    Logical,
    /// X -- bit array.
    Bit,
    /// B -- unsigned byte.
    Byte,
    /// I -- 16-bit signed integer.
    Short,
    /// J -- 32-bit signed integer.
    Int,
    /// K -- 64-bit signed integer.
    Long,
    /// E -- 32-bit IEEE float.
    Float,
    /// D -- 64-bit IEEE float.
    Double,
    /// C -- pair of 32-bit IEEE floats.
    ComplexFloat,
    /// M -- pair of 64-bit IEEE floats.
    ComplexDouble,
    /// A -- ASCII character.
    Ascii,
    /// P -- 32-bit variable-length array descriptor.
    VarArrayP,
    /// Q -- 64-bit variable-length array descriptor.
    VarArrayQ,
}

impl BinaryColumnType {
    /// Bytes occupied by `repeat` elements of this type in one row.
    pub fn byte_width(self, repeat: usize) -> usize {
        match self {
            BinaryColumnType::Bit => repeat.div_ceil(8),
            BinaryColumnType::Logical | BinaryColumnType::Byte | BinaryColumnType::Ascii => repeat,
            BinaryColumnType::Short => 2 * repeat,
            BinaryColumnType::Int | BinaryColumnType::Float => 4 * repeat,
            BinaryColumnType::Long
            | BinaryColumnType::Double
            | BinaryColumnType::ComplexFloat
            | BinaryColumnType::VarArrayP => 8 * repeat,
            BinaryColumnType::ComplexDouble | BinaryColumnType::VarArrayQ => 16 * repeat,
        }
    }
}

/// Describes one column in a binary table.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryColumnDescriptor {
    /// Column name (from TTYPEn), if present.
    pub name: Option<String>,
    /// Repeat count from TFORMn.
    pub repeat: usize,
    pub col_type: BinaryColumnType,
    /// Byte offset of the column within a row.
    pub offset: usize,
}

/// Parse a TFORMn value like "1J", "10E", "20A", "D", "1PB(200)".
pub fn parse_tform_binary(s: &str) -> Result<(usize, BinaryColumnType)> {
    let s = s.trim();
    let s = s.split_once('(').map_or(s, |(head, _)| head);
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or(Error::InvalidValue)?;
    let (repeat_str, code) = s.split_at(split);
    let repeat = if repeat_str.is_empty() {
        1
    } else {
        repeat_str.parse::<usize>().map_err(|_| Error::InvalidValue)?
    };

    let col_type = match code.as_bytes() {
        [b'P', _] => BinaryColumnType::VarArrayP,
        [b'Q', _] => BinaryColumnType::VarArrayQ,
        [b'L'] => BinaryColumnType::Logical,
        [b'X'] => BinaryColumnType::Bit,
        [b'B'] => BinaryColumnType::Byte,
        [b'I'] => BinaryColumnType::Short,
        [b'J'] => BinaryColumnType::Int,
        [b'K'] => BinaryColumnType::Long,
        [b'E'] => BinaryColumnType::Float,
        [b'D'] => BinaryColumnType::Double,
        [b'C'] => BinaryColumnType::ComplexFloat,
        [b'M'] => BinaryColumnType::ComplexDouble,
        [b'A'] => BinaryColumnType::Ascii,
        _ => return Err(Error::InvalidValue),
    };
    Ok((repeat, col_type))
}

/// Extract binary table column descriptors from a table header.
pub fn parse_binary_table_columns(
    header: &Header,
    tfields: usize,
) -> Result<Vec<BinaryColumnDescriptor>> {
    let mut columns = Vec::with_capacity(tfields);
    let mut offset = 0usize;
    for i in 1..=tfields {
        let tform = header
            .string(&format!("TFORM{i}"))
            .ok_or(Error::MissingKeyword("TFORMn"))?;
        let (repeat, col_type) = parse_tform_binary(tform)?;
        let name = header
            .string(&format!("TTYPE{i}"))
            .map(|s| String::from(s.trim()));
        columns.push(BinaryColumnDescriptor {
            name,
            repeat,
            col_type,
            offset,
        });
        offset += col_type.byte_width(repeat);
    }
    Ok(columns)
}

/// Read the first element of every row of the numeric column named `name`,
/// converted to `f64`.
///
/// Returns `Ok(None)` if the table has no column with that name. Column
/// names compare case-insensitively, as FITS readers conventionally do.
pub fn read_column_f64(fits_data: &[u8], hdu: &Hdu, name: &str) -> Result<Option<Vec<f64>>> {
    let (naxis1, naxis2, tfields) = match &hdu.info {
        HduInfo::BinaryTable {
            naxis1,
            naxis2,
            tfields,
        } => (*naxis1, *naxis2, *tfields),
        _ => return Err(Error::InvalidHeader("not a binary table HDU")),
    };

    let columns = parse_binary_table_columns(&hdu.header, tfields)?;
    let Some(col) = columns.iter().find(|c| {
        c.name
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    }) else {
        return Ok(None);
    };

    let width = match col.col_type {
        BinaryColumnType::Byte => 1,
        BinaryColumnType::Short => 2,
        BinaryColumnType::Int | BinaryColumnType::Float => 4,
        BinaryColumnType::Long | BinaryColumnType::Double => 8,
        _ => return Err(Error::InvalidValue),
    };
    if col.repeat == 0 || col.offset + width > naxis1 {
        return Err(Error::InvalidValue);
    }
    if hdu.data_start + naxis1 * naxis2 > fits_data.len() {
        return Err(Error::UnexpectedEof);
    }

    let values = (0..naxis2)
        .map(|row| {
            let at = hdu.data_start + row * naxis1 + col.offset;
            let cell = &fits_data[at..at + width];
            match col.col_type {
                BinaryColumnType::Byte => cell[0] as f64,
                BinaryColumnType::Short => i16::from_be_bytes([cell[0], cell[1]]) as f64,
                BinaryColumnType::Int => {
                    i32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]) as f64
                }
                BinaryColumnType::Float => {
                    f32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]) as f64
                }
                BinaryColumnType::Long => i64::from_be_bytes(eight(cell)) as f64,
                _ => f64::from_be_bytes(eight(cell)),
            }
        })
        .collect();
    Ok(Some(values))
}

fn eight(cell: &[u8]) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&cell[..8]);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::padded_byte_len;
    use crate::hdu::parse_fits;
    use crate::header::Card;

    #[test]
    fn tform_variants() {
        assert_eq!(parse_tform_binary("1J").unwrap(), (1, BinaryColumnType::Int));
        assert_eq!(parse_tform_binary("D").unwrap(), (1, BinaryColumnType::Double));
        assert_eq!(parse_tform_binary("20A").unwrap(), (20, BinaryColumnType::Ascii));
        assert_eq!(parse_tform_binary("1PB(200)").unwrap(), (1, BinaryColumnType::VarArrayP));
        assert!(parse_tform_binary("3Z").is_err());
        assert!(parse_tform_binary("").is_err());
    }

    /// A primary HDU plus a two-column table: 8-byte `tag` (A) and `t` (D).
    fn table_file(times: &[f64]) -> Vec<u8> {
        let mut data = Header::from_cards(vec![
            Card::new("SIMPLE", true, None),
            Card::new("BITPIX", 8i64, None),
            Card::new("NAXIS", 0i64, None),
        ])
        .to_bytes();
        let table = Header::from_cards(vec![
            Card::new("XTENSION", "BINTABLE", None),
            Card::new("BITPIX", 8i64, None),
            Card::new("NAXIS", 2i64, None),
            Card::new("NAXIS1", 16i64, None),
            Card::new("NAXIS2", times.len(), None),
            Card::new("PCOUNT", 0i64, None),
            Card::new("GCOUNT", 1i64, None),
            Card::new("TFIELDS", 2i64, None),
            Card::new("TTYPE1", "tag", None),
            Card::new("TFORM1", "8A", None),
            Card::new("TTYPE2", "t", None),
            Card::new("TFORM2", "1D", None),
            Card::new("EXTNAME", "TIMES", None),
        ]);
        data.extend_from_slice(&table.to_bytes());
        let start = data.len();
        for t in times {
            data.extend_from_slice(b"row     ");
            data.extend_from_slice(&t.to_be_bytes());
        }
        data.resize(start + padded_byte_len(16 * times.len()), 0);
        data
    }

    #[test]
    fn read_double_column_by_name() {
        let bytes = table_file(&[1.25, 2.5, 3.75]);
        let fits = parse_fits(&bytes).unwrap();
        let hdu = fits.find_by_name("TIMES").unwrap();
        let col = read_column_f64(&bytes, hdu, "T").unwrap();
        assert_eq!(col, Some(vec![1.25, 2.5, 3.75]));
    }

    #[test]
    fn missing_column_is_none() {
        let bytes = table_file(&[1.0]);
        let fits = parse_fits(&bytes).unwrap();
        let hdu = fits.find_by_name("TIMES").unwrap();
        assert_eq!(read_column_f64(&bytes, hdu, "nope").unwrap(), None);
    }

    #[test]
    fn ascii_column_is_not_numeric() {
        let bytes = table_file(&[1.0]);
        let fits = parse_fits(&bytes).unwrap();
        let hdu = fits.find_by_name("TIMES").unwrap();
        assert!(matches!(read_column_f64(&bytes, hdu, "tag"), Err(Error::InvalidValue)));
    }

    #[test]
    fn non_table_hdu_is_rejected() {
        let bytes = table_file(&[1.0]);
        let fits = parse_fits(&bytes).unwrap();
        assert!(read_column_f64(&bytes, fits.primary(), "t").is_err());
    }
}
