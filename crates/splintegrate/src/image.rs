//! Image pixel data: decoding from and encoding to big-endian FITS bytes,
//! and the n-dimensional [`PixelArray`] view used to slice and flip frames.

use bytemuck::pod_collect_to_vec;
use ndarray::{ArrayD, Axis, IxDyn};

use crate::block::pad_data;
use crate::error::{Error, Result};
use crate::hdu::{Hdu, HduInfo};
use crate::header::Header;

/// Image pixel data extracted from a FITS HDU, typed by BITPIX, in file order
/// (NAXIS1 varies fastest).
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Returns the number of bytes per pixel for a given BITPIX value.
fn bytes_per_pixel(bitpix: i64) -> Result<usize> {
    match bitpix {
        8 | 16 | 32 | 64 | -32 | -64 => Ok((bitpix.unsigned_abs() / 8) as usize),
        _ => Err(Error::InvalidBitpix(bitpix)),
    }
}

fn hdu_bitpix_naxes(hdu: &Hdu) -> Result<(i64, &[usize])> {
    match &hdu.info {
        HduInfo::Primary { bitpix, naxes } | HduInfo::Image { bitpix, naxes } => {
            Ok((*bitpix, naxes))
        }
        _ => Err(Error::InvalidHeader("not an image HDU")),
    }
}

/// Decode big-endian bytes into an `ImageData` variant based on BITPIX.
fn decode_pixels(raw: &[u8], bitpix: i64) -> Result<ImageData> {
    Ok(match bitpix {
        8 => ImageData::U8(raw.to_vec()),
        16 => {
            let mut pixels: Vec<i16> = pod_collect_to_vec(raw);
            pixels.iter_mut().for_each(|v| *v = i16::from_be(*v));
            ImageData::I16(pixels)
        }
        32 => {
            let mut pixels: Vec<i32> = pod_collect_to_vec(raw);
            pixels.iter_mut().for_each(|v| *v = i32::from_be(*v));
            ImageData::I32(pixels)
        }
        64 => {
            let mut pixels: Vec<i64> = pod_collect_to_vec(raw);
            pixels.iter_mut().for_each(|v| *v = i64::from_be(*v));
            ImageData::I64(pixels)
        }
        -32 => {
            let mut pixels: Vec<f32> = pod_collect_to_vec(raw);
            pixels
                .iter_mut()
                .for_each(|v| *v = f32::from_bits(u32::from_be(v.to_bits())));
            ImageData::F32(pixels)
        }
        -64 => {
            let mut pixels: Vec<f64> = pod_collect_to_vec(raw);
            pixels
                .iter_mut()
                .for_each(|v| *v = f64::from_bits(u64::from_be(v.to_bits())));
            ImageData::F64(pixels)
        }
        other => return Err(Error::InvalidBitpix(other)),
    })
}

/// Read raw image pixel data from a FITS byte stream for the given HDU.
fn read_image_data(fits_data: &[u8], hdu: &Hdu) -> Result<ImageData> {
    let (bitpix, _) = hdu_bitpix_naxes(hdu)?;
    bytes_per_pixel(bitpix)?;
    let end = hdu.data_start + hdu.data_len;
    let raw = fits_data
        .get(hdu.data_start..end)
        .ok_or(Error::UnexpectedEof)?;
    decode_pixels(raw, bitpix)
}

/// Read the pixels of an image HDU shaped by its NAXISn keywords.
pub fn read_pixel_array(fits_data: &[u8], hdu: &Hdu) -> Result<PixelArray> {
    let (_, naxes) = hdu_bitpix_naxes(hdu)?;
    PixelArray::from_image_data(read_image_data(fits_data, hdu)?, naxes)
}

/// Serialize pixels into big-endian, block-padded FITS data bytes.
pub fn serialize_image(data: &ImageData) -> Vec<u8> {
    let mut buf: Vec<u8> = match data {
        ImageData::U8(v) => v.clone(),
        ImageData::I16(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        ImageData::I32(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        ImageData::I64(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        ImageData::F32(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        ImageData::F64(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
    };
    pad_data(&mut buf);
    buf
}

/// Extract BSCALE and BZERO from a header, defaulting to 1.0 and 0.0.
pub fn extract_bscale_bzero(header: &Header) -> (f64, f64) {
    (
        header.float("BSCALE").unwrap_or(1.0),
        header.float("BZERO").unwrap_or(0.0),
    )
}

/// An n-dimensional pixel array in C order: the last axis is NAXIS1.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelArray {
    U8(ArrayD<u8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// Apply the same generic expression to whichever array a `PixelArray` holds.
macro_rules! each_array {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            PixelArray::U8($arr) => $body,
            PixelArray::I16($arr) => $body,
            PixelArray::I32($arr) => $body,
            PixelArray::I64($arr) => $body,
            PixelArray::F32($arr) => $body,
            PixelArray::F64($arr) => $body,
        }
    };
}

/// Like `each_array!` but rewraps the result in the same variant.
macro_rules! map_array {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            PixelArray::U8($arr) => PixelArray::U8($body),
            PixelArray::I16($arr) => PixelArray::I16($body),
            PixelArray::I32($arr) => PixelArray::I32($body),
            PixelArray::I64($arr) => PixelArray::I64($body),
            PixelArray::F32($arr) => PixelArray::F32($body),
            PixelArray::F64($arr) => PixelArray::F64($body),
        }
    };
}

impl PixelArray {
    /// Shape `naxes` (NAXIS1 first) onto file-ordered pixels.
    pub fn from_image_data(data: ImageData, naxes: &[usize]) -> Result<Self> {
        let shape: Vec<usize> = naxes.iter().rev().copied().collect();
        let shape = IxDyn(&shape);
        Ok(match data {
            ImageData::U8(v) => PixelArray::U8(ArrayD::from_shape_vec(shape, v)?),
            ImageData::I16(v) => PixelArray::I16(ArrayD::from_shape_vec(shape, v)?),
            ImageData::I32(v) => PixelArray::I32(ArrayD::from_shape_vec(shape, v)?),
            ImageData::I64(v) => PixelArray::I64(ArrayD::from_shape_vec(shape, v)?),
            ImageData::F32(v) => PixelArray::F32(ArrayD::from_shape_vec(shape, v)?),
            ImageData::F64(v) => PixelArray::F64(ArrayD::from_shape_vec(shape, v)?),
        })
    }

    /// Flatten back to file order.
    pub fn to_image_data(&self) -> ImageData {
        match self {
            PixelArray::U8(a) => ImageData::U8(a.iter().copied().collect()),
            PixelArray::I16(a) => ImageData::I16(a.iter().copied().collect()),
            PixelArray::I32(a) => ImageData::I32(a.iter().copied().collect()),
            PixelArray::I64(a) => ImageData::I64(a.iter().copied().collect()),
            PixelArray::F32(a) => ImageData::F32(a.iter().copied().collect()),
            PixelArray::F64(a) => ImageData::F64(a.iter().copied().collect()),
        }
    }

    pub fn bitpix(&self) -> i64 {
        match self {
            PixelArray::U8(_) => 8,
            PixelArray::I16(_) => 16,
            PixelArray::I32(_) => 32,
            PixelArray::I64(_) => 64,
            PixelArray::F32(_) => -32,
            PixelArray::F64(_) => -64,
        }
    }

    pub fn ndim(&self) -> usize {
        each_array!(self, a => a.ndim())
    }

    pub fn shape(&self) -> &[usize] {
        each_array!(self, a => a.shape())
    }

    /// FITS axis lengths (NAXIS1 first).
    pub fn naxes(&self) -> Vec<usize> {
        self.shape().iter().rev().copied().collect()
    }

    /// Length of the leading (slowest) axis.
    pub fn leading_len(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    /// The `index`-th sub-array along the leading axis, as an owned array.
    ///
    /// # Panics
    ///
    /// Panics if the array is 0-dimensional or `index` is out of bounds.
    pub fn frame(&self, index: usize) -> PixelArray {
        map_array!(self, a => a.index_axis(Axis(0), index).to_owned())
    }

    /// A copy with `axis` reversed.
    pub fn inverted(&self, axis: usize) -> PixelArray {
        map_array!(self, a => {
            let mut out = a.clone();
            out.invert_axis(Axis(axis));
            out
        })
    }

    /// Replace the array by its physical `f64` values.
    pub fn scaled(&self, bscale: f64, bzero: f64) -> PixelArray {
        PixelArray::F64(each_array!(self, a => a.mapv(|raw| bzero + bscale * raw as f64)))
    }
}
