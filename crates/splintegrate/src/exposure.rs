//! Reading the frame layout and timing of one multi-integration file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::bintable::read_column_f64;
use crate::error::{Error, Result};
use crate::hdu::{parse_fits, FitsData};
use crate::header::Header;
use crate::keys;
use crate::split::SplitOptions;

/// Timestamps of one integration, from the `INT_TIMES` table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingRow {
    /// Mid-integration time, BJD_TDB.
    pub mid_bjd: f64,
    /// Integration start time, MJD_UTC.
    pub start_mjd: f64,
}

/// Where the frames of one file sit inside the full exposure.
///
/// Frames `0..frame_count` of the file are global integrations
/// `int_start..int_start + frame_count` (1-based).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExposureMetadata {
    /// 1-based global index of the first frame in this file.
    pub int_start: i64,
    /// Frames in this file. Zero only for a missing input.
    pub frame_count: usize,
    /// Integrations in the whole exposure.
    pub original_frame_count: i64,
    pub detector: Option<String>,
    /// Per-frame timestamps, possibly empty. Only trusted when the row count
    /// equals `frame_count`.
    pub timing_rows: Vec<TimingRow>,
}

/// A header convention other than the current one was needed to work out
/// the frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFallback {
    /// The input file does not exist; the exposure is empty.
    MissingInput,
    /// `INTSTART` missing, start taken as `SEGSTART + 1`.
    StartFromOffset,
    /// `INTEND` is zero, frame count taken from `NINTS`.
    EndIsZero,
    /// `INTEND` missing, frame count taken from `NINTS`.
    NoEndKey,
    /// `INTEND` and `NINTS` missing, frame count derived from `SEGEND`.
    EndFromOffset,
    /// Exposure total taken from the older `NINT` keyword.
    OriginalFromExposureTotal,
}

impl fmt::Display for MetadataFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            MetadataFallback::MissingInput => "No file found",
            MetadataFallback::StartFromOffset => "INTSTART not found, using SEGSTART + 1",
            MetadataFallback::EndIsZero => "INTEND is 0, reverting to using NINTS",
            MetadataFallback::NoEndKey => "INTEND not found, reverting to using NINTS",
            MetadataFallback::EndFromOffset => {
                "INTEND and NINTS not found, deriving the frame count from SEGEND"
            }
            MetadataFallback::OriginalFromExposureTotal => {
                "taking the exposure's integration total from NINT"
            }
        };
        f.write_str(msg)
    }
}

/// One input file, ready to be split into single-frame files.
#[derive(Debug, Clone)]
pub struct Exposure {
    path: PathBuf,
    out_dir: PathBuf,
    base_name: String,
    options: SplitOptions,
    header: Header,
    metadata: ExposureMetadata,
    fallbacks: Vec<MetadataFallback>,
}

impl Exposure {
    /// Read the primary header and timing table of `path` and make sure
    /// `out_dir` exists.
    ///
    /// A missing input is not an error: a warning is logged, recorded as
    /// [`MetadataFallback::MissingInput`], and the returned exposure is
    /// empty (`frame_count() == 0`). Nothing is created on disk in that
    /// case; the Python releases of splintegrate created `out_dir` anyway.
    pub fn open(
        path: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
        options: SplitOptions,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let out_dir = out_dir.as_ref().to_path_buf();
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut exposure = Exposure {
            path,
            out_dir,
            base_name,
            options,
            header: Header::new(),
            metadata: ExposureMetadata::default(),
            fallbacks: Vec::new(),
        };

        if !exposure.path.exists() {
            let fallback = MetadataFallback::MissingInput;
            warn!(path = %exposure.path.display(), "{fallback}");
            exposure.fallbacks.push(fallback);
            return Ok(exposure);
        }

        let bytes = fs::read(&exposure.path)?;
        let fits = parse_fits(&bytes)?;
        exposure.header = fits.primary().header.clone();

        let (mut metadata, fallbacks) = frame_layout(&exposure.header)?;
        for fallback in &fallbacks {
            warn!(path = %exposure.path.display(), "{fallback}");
        }
        metadata.timing_rows = read_timing_rows(&bytes, &fits, &exposure.path)?;
        debug!(
            path = %exposure.path.display(),
            int_start = metadata.int_start,
            frames = metadata.frame_count,
            original = metadata.original_frame_count,
            timing_rows = metadata.timing_rows.len(),
            "read exposure layout"
        );
        exposure.metadata = metadata;
        exposure.fallbacks = fallbacks;

        fs::create_dir_all(&exposure.out_dir)?;
        Ok(exposure)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Input file name without its extension; prefix of every output name.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    /// The input's primary header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn metadata(&self) -> &ExposureMetadata {
        &self.metadata
    }

    pub fn frame_count(&self) -> usize {
        self.metadata.frame_count
    }

    /// `true` when the input file was not found.
    pub fn is_empty(&self) -> bool {
        self.metadata.frame_count == 0
    }

    /// Fallbacks taken while reading the frame layout, in the order taken,
    /// or `[MissingInput]` for a missing input.
    pub fn fallbacks(&self) -> &[MetadataFallback] {
        &self.fallbacks
    }
}

/// Work out the frame range of a file from its primary header.
///
/// The timing rows of the returned metadata are left empty.
pub fn frame_layout(header: &Header) -> Result<(ExposureMetadata, Vec<MetadataFallback>)> {
    let mut fallbacks = Vec::new();

    let int_start = match header.integer(keys::INTSTART) {
        Some(start) => start,
        None => {
            let offset = header
                .integer(keys::SEGSTART)
                .ok_or(Error::MissingKeyword(keys::INTSTART))?;
            fallbacks.push(MetadataFallback::StartFromOffset);
            offset
                .checked_add(1)
                .ok_or(Error::InvalidHeader("SEGSTART out of range"))?
        }
    };

    let nints = header.integer(keys::NINTS);
    let (count, original) = match (header.integer(keys::INTEND), nints) {
        (Some(end), _) if end != 0 => {
            let original = match nints {
                Some(n) => n,
                None => {
                    fallbacks.push(MetadataFallback::OriginalFromExposureTotal);
                    exposure_total(header)?
                }
            };
            (span(int_start, end, 1)?, original)
        }
        (Some(_), nints) => {
            fallbacks.push(MetadataFallback::EndIsZero);
            let n = nints.ok_or(Error::MissingKeyword(keys::NINTS))?;
            (n, n)
        }
        (None, Some(n)) => {
            fallbacks.push(MetadataFallback::NoEndKey);
            (n, n)
        }
        (None, None) => {
            let end = header
                .integer(keys::SEGEND)
                .ok_or(Error::MissingKeyword(keys::INTEND))?;
            fallbacks.push(MetadataFallback::EndFromOffset);
            fallbacks.push(MetadataFallback::OriginalFromExposureTotal);
            (span(int_start, end, 2)?, exposure_total(header)?)
        }
    };

    let frame_count = usize::try_from(count)
        .ok()
        .filter(|&n| n >= 1)
        .ok_or(Error::InvalidFrameRange {
            start: int_start,
            count,
        })?;
    // Frame numbers run from int_start - 1 (file names) to
    // int_start + count - 1 (ON_NINT).
    if int_start.checked_sub(1).is_none() || int_start.checked_add(count).is_none() {
        return Err(Error::InvalidHeader("INTSTART out of range"));
    }

    let metadata = ExposureMetadata {
        int_start,
        frame_count,
        original_frame_count: original,
        detector: header.string(keys::DETECTOR).map(|d| String::from(d.trim())),
        timing_rows: Vec::new(),
    };
    Ok((metadata, fallbacks))
}

/// `end - start + extra`, or an error if the header values overflow.
fn span(start: i64, end: i64, extra: i64) -> Result<i64> {
    end.checked_sub(start)
        .and_then(|d| d.checked_add(extra))
        .ok_or(Error::InvalidHeader("INTSTART/INTEND out of range"))
}

fn exposure_total(header: &Header) -> Result<i64> {
    header
        .integer(keys::NINT)
        .ok_or(Error::MissingKeyword(keys::NINT))
}

fn read_timing_rows(bytes: &[u8], fits: &FitsData, path: &Path) -> Result<Vec<TimingRow>> {
    let Some(hdu) = fits.find_by_name(keys::INT_TIMES_EXTNAME) else {
        return Ok(Vec::new());
    };
    let mid = read_column_f64(bytes, hdu, keys::MID_BJD_COLUMN)?;
    let start = read_column_f64(bytes, hdu, keys::START_MJD_COLUMN)?;
    match (mid, start) {
        (Some(mid), Some(start)) => Ok(mid
            .into_iter()
            .zip(start)
            .map(|(mid_bjd, start_mjd)| TimingRow { mid_bjd, start_mjd })
            .collect()),
        _ => {
            warn!(
                path = %path.display(),
                "INT_TIMES lacks {} or {}, ignoring it",
                keys::MID_BJD_COLUMN,
                keys::START_MJD_COLUMN
            );
            Ok(Vec::new())
        }
    }
}
