use crate::block::padded_byte_len;
use crate::error::{Error, Result};
use crate::header::{header_byte_len, parse_header_blocks, Header};

/// Describes the kind and shape of data in a single HDU.
#[derive(Debug, Clone, PartialEq)]
pub enum HduInfo {
    /// Primary HDU, possibly carrying image data.
    Primary {
        /// BITPIX value (8, 16, 32, 64, -32, -64).
        bitpix: i64,
        /// Axis dimensions (NAXIS1, NAXIS2, ...).
        naxes: Vec<usize>,
    },
    /// Image extension (XTENSION = 'IMAGE').
    Image { bitpix: i64, naxes: Vec<usize> },
    /// Binary table extension (XTENSION = 'BINTABLE').
    BinaryTable {
        /// Row width in bytes.
        naxis1: usize,
        /// Number of rows.
        naxis2: usize,
        /// Number of columns.
        tfields: usize,
    },
    /// Any other extension; its data is skipped over but never decoded.
    Other { xtension: String },
}

/// A single Header Data Unit parsed from a FITS byte stream.
#[derive(Debug, Clone)]
pub struct Hdu {
    pub info: HduInfo,
    pub header: Header,
    /// Byte offset where the data segment begins.
    pub data_start: usize,
    /// Length of the data segment in bytes (unpadded).
    pub data_len: usize,
}

impl Hdu {
    /// Returns `true` for primary or IMAGE HDUs holding at least one pixel.
    pub fn has_image_data(&self) -> bool {
        match &self.info {
            HduInfo::Primary { naxes, .. } | HduInfo::Image { naxes, .. } => {
                !naxes.is_empty() && self.data_len > 0
            }
            _ => false,
        }
    }

    pub fn extname(&self) -> Option<&str> {
        self.header.string("EXTNAME").map(str::trim)
    }
}

/// All HDUs parsed from a complete FITS file.
#[derive(Debug, Clone)]
pub struct FitsData {
    /// All HDUs in the file, with the primary HDU at index 0.
    pub hdus: Vec<Hdu>,
}

impl FitsData {
    /// Returns the primary (first) HDU.
    pub fn primary(&self) -> &Hdu {
        &self.hdus[0]
    }

    /// Finds the first HDU whose EXTNAME matches `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Hdu> {
        self.hdus.iter().find(|hdu| hdu.extname() == Some(name))
    }

    /// The first HDU that carries image pixels.
    pub fn first_image(&self) -> Option<&Hdu> {
        self.hdus.iter().find(|hdu| hdu.has_image_data())
    }
}

fn required(header: &Header, keyword: &'static str) -> Result<i64> {
    header.integer(keyword).ok_or(Error::MissingKeyword(keyword))
}

fn axes(header: &Header) -> Result<Vec<usize>> {
    let naxis = required(header, "NAXIS")?;
    if naxis < 0 {
        return Err(Error::InvalidHeader("negative NAXIS"));
    }
    (1..=naxis)
        .map(|i| {
            header
                .integer(&format!("NAXIS{i}"))
                .ok_or(Error::MissingKeyword("NAXISn"))
                .and_then(|d| usize::try_from(d).map_err(|_| Error::InvalidHeader("negative NAXISn")))
        })
        .collect()
}

/// Data size in bytes: `|BITPIX|/8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`.
fn compute_data_byte_len(header: &Header, is_primary: bool) -> Result<usize> {
    let bitpix = required(header, "BITPIX")?;
    let naxes = axes(header)?;
    if naxes.is_empty() {
        return Ok(0);
    }
    let bytes_per_value = (bitpix.unsigned_abs() / 8) as usize;
    let (pcount, gcount) = if is_primary {
        (0, 1)
    } else {
        let pcount = header.integer("PCOUNT").unwrap_or(0).max(0) as usize;
        let gcount = header.integer("GCOUNT").unwrap_or(1).max(1) as usize;
        (pcount, gcount)
    };
    naxes
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .and_then(|pixels| pixels.checked_add(pcount))
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes_per_value))
        .ok_or(Error::InvalidHeader("data size overflow"))
}

fn parse_hdu_info(header: &Header, is_primary: bool) -> Result<HduInfo> {
    if is_primary {
        let bitpix = required(header, "BITPIX")?;
        return Ok(HduInfo::Primary {
            bitpix,
            naxes: axes(header)?,
        });
    }

    let xtension = header
        .string("XTENSION")
        .ok_or(Error::MissingKeyword("XTENSION"))?
        .trim();
    match xtension {
        "IMAGE" => Ok(HduInfo::Image {
            bitpix: required(header, "BITPIX")?,
            naxes: axes(header)?,
        }),
        "BINTABLE" => Ok(HduInfo::BinaryTable {
            naxis1: required(header, "NAXIS1")? as usize,
            naxis2: required(header, "NAXIS2")? as usize,
            tfields: required(header, "TFIELDS")? as usize,
        }),
        other => Ok(HduInfo::Other {
            xtension: String::from(other),
        }),
    }
}

/// Parse a complete FITS byte stream into a [`FitsData`] containing all HDUs.
pub fn parse_fits(data: &[u8]) -> Result<FitsData> {
    let mut hdus: Vec<Hdu> = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let remaining = &data[offset..];
        // Trailing garbage after a valid primary HDU is tolerated.
        let header_len = match header_byte_len(remaining) {
            Ok(len) => len,
            Err(_) if !hdus.is_empty() => break,
            Err(e) => return Err(e),
        };
        let header = Header::from_cards(parse_header_blocks(&remaining[..header_len])?);

        let is_primary = hdus.is_empty();
        if is_primary && header.cards().first().map(|c| c.keyword_str()) != Some("SIMPLE") {
            return Err(Error::InvalidHeader("first HDU must be primary"));
        }

        let info = parse_hdu_info(&header, is_primary)?;
        let data_len = compute_data_byte_len(&header, is_primary)?;
        let data_start = offset + header_len;
        if data_start + data_len > data.len() {
            return Err(Error::UnexpectedEof);
        }

        hdus.push(Hdu {
            info,
            header,
            data_start,
            data_len,
        });
        offset = data_start + padded_byte_len(data_len);
    }

    if hdus.is_empty() {
        return Err(Error::UnexpectedEof);
    }
    Ok(FitsData { hdus })
}
