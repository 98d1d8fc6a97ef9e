//! Writing one single-integration FITS file per frame of an exposure.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::exposure::{Exposure, ExposureMetadata};
use crate::hdu::parse_fits;
use crate::header::{Card, Header};
use crate::image::{extract_bscale_bzero, read_pixel_array, serialize_image, PixelArray};
use crate::keys;
use crate::orient::{reorient, resolve_detector, DetectorGroup};

/// How an [`Exposure`] is split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitOptions {
    /// Replace output files that already exist.
    pub overwrite: bool,
    /// Reorient each frame into detector coordinates.
    pub flip_to_detector: bool,
    /// Detector name to use instead of the header's `DETECTOR`.
    pub detector: Option<String>,
    /// Make `FLIP2DET` record whether the frame was actually flipped.
    ///
    /// Without it `FLIP2DET` is always `T`, which is what earlier releases
    /// wrote and what existing pipelines expect.
    pub accurate_flip_flag: bool,
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Written(PathBuf),
    /// The output already existed and overwriting was off.
    Skipped(PathBuf),
}

/// Summary of a [`Exposure::split_with`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    /// The run stopped early because cancellation was requested.
    pub cancelled: bool,
}

impl SplitReport {
    fn record(&mut self, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Written(path) => self.written.push(path.clone()),
            FrameOutcome::Skipped(path) => self.skipped.push(path.clone()),
        }
    }
}

impl Exposure {
    /// Write every frame to its own file.
    pub fn split(&self) -> Result<SplitReport> {
        self.split_with(&AtomicBool::new(false), |_| {})
    }

    /// Like [`Exposure::split`], checking `cancel` before each frame and
    /// reporting each frame to `on_frame` once it is done.
    ///
    /// Detector and array rank are checked before the first write, so a
    /// reorientation error leaves no output behind.
    pub fn split_with(
        &self,
        cancel: &AtomicBool,
        mut on_frame: impl FnMut(&FrameOutcome),
    ) -> Result<SplitReport> {
        if self.is_empty() {
            return Err(Error::EmptyExposure(self.path().to_path_buf()));
        }
        let metadata = self.metadata();
        let options = self.options();
        let frame_count = metadata.frame_count;

        let bytes = fs::read(self.path())?;
        let fits = parse_fits(&bytes)?;
        let sci = fits
            .find_by_name(keys::SCI_EXTNAME)
            .filter(|hdu| hdu.has_image_data())
            .or_else(|| fits.first_image())
            .ok_or(Error::MissingImage(keys::SCI_EXTNAME))?;

        let mut cube = read_pixel_array(&bytes, sci)?;
        let (bscale, bzero) = extract_bscale_bzero(&sci.header);
        let scaled = bscale != 1.0 || bzero != 0.0;
        if scaled {
            cube = cube.scaled(bscale, bzero);
        }

        // Several frames need a stack; a 2-D image holds exactly one.
        if frame_count > 1 && (cube.ndim() < 3 || cube.leading_len() < frame_count) {
            return Err(Error::FrameCountMismatch {
                expected: frame_count,
                available: if cube.ndim() < 3 { 1 } else { cube.leading_len() },
            });
        }

        let group = if options.flip_to_detector {
            let detector = resolve_detector(
                options.detector.as_deref(),
                metadata.detector.as_deref(),
            )?;
            let group = DetectorGroup::for_detector(&detector)?;
            let frame_rank = if frame_count == 1 { cube.ndim() } else { cube.ndim() - 1 };
            group.axis(frame_rank)?;
            debug!(detector = %detector, ?group, "reorienting frames");
            Some(group)
        } else {
            None
        };
        let flip_flag = group.is_some() || !options.accurate_flip_flag;

        let mut report = SplitReport::default();
        for index in 0..frame_count {
            if cancel.load(Ordering::Relaxed) {
                info!(path = %self.path().display(), "split cancelled");
                report.cancelled = true;
                break;
            }

            let sliced;
            let mut frame = &cube;
            if frame_count > 1 {
                sliced = cube.frame(index);
                frame = &sliced;
            }
            let flipped;
            if let Some(group) = group {
                flipped = reorient(frame, group)?;
                frame = &flipped;
            }

            let mut header = derive_frame_header(self.header(), metadata, index, flip_flag)
                .with_image_structure(frame.bitpix(), &frame.naxes());
            if scaled {
                header.remove(keys::BSCALE);
                header.remove(keys::BZERO);
            }

            let path = self.frame_path(index);
            let outcome = if path.exists() && !options.overwrite {
                info!("Found {}. Not overwriting", path.display());
                FrameOutcome::Skipped(path)
            } else if self.write_frame(&path, &header, frame)? {
                debug!(path = %path.display(), index, "wrote frame");
                FrameOutcome::Written(path)
            } else {
                info!("Found {}. Not overwriting", path.display());
                FrameOutcome::Skipped(path)
            };
            on_frame(&outcome);
            report.record(&outcome);
        }

        info!(
            path = %self.path().display(),
            written = report.written.len(),
            skipped = report.skipped.len(),
            "split exposure"
        );
        Ok(report)
    }

    /// Output path of local frame `index`.
    ///
    /// The file number is `int_start + index - 1`, one less than the frame's
    /// `ON_NINT`, so a segment starting at integration 1 writes `_I00000`.
    pub fn frame_path(&self, index: usize) -> PathBuf {
        let number = index as i64 + self.metadata().int_start - 1;
        self.out_dir()
            .join(format!("{}_I{:05}.fits", self.base_name(), number))
    }

    /// Write through a temporary file in the output directory, then rename.
    ///
    /// Returns `false` if the target appeared in the meantime and overwriting
    /// is off.
    fn write_frame(&self, path: &Path, header: &Header, frame: &PixelArray) -> Result<bool> {
        let dir = match self.out_dir() {
            d if d.as_os_str().is_empty() => Path::new("."),
            d => d,
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&header.to_bytes())?;
        tmp.write_all(&serialize_image(&frame.to_image_data()))?;
        tmp.flush()?;

        if self.options().overwrite {
            tmp.persist(path).map_err(|e| e.error)?;
            return Ok(true);
        }
        match tmp.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error.into()),
        }
    }
}

/// Build the header of local frame `index` from the exposure's primary
/// header. The source header is not modified.
///
/// The image structure keywords are left as they were in `source`.
pub fn derive_frame_header(
    source: &Header,
    metadata: &ExposureMetadata,
    index: usize,
    flip_flag: bool,
) -> Header {
    let mut header = source.clone();
    header.set_with_comment(keys::FLIP2DET, flip_flag, keys::FLIP2DET_COMMENT);
    header.set(keys::NINTS, 1i64);

    header.insert_after(
        keys::NINTS,
        Card::new(
            keys::ON_NINT,
            metadata.int_start + index as i64,
            Some(keys::ON_NINT_COMMENT),
        ),
    );
    header.insert_after(
        keys::ON_NINT,
        Card::new(
            keys::TOT_NINT,
            metadata.original_frame_count,
            Some(keys::TOT_NINT_COMMENT),
        ),
    );
    header.insert_after(
        keys::TOT_NINT,
        Card::new(keys::SEGNINT, metadata.frame_count, Some(keys::SEGNINT_COMMENT)),
    );

    if metadata.timing_rows.len() == metadata.frame_count {
        let row = metadata.timing_rows[index];
        header.insert_after(
            keys::TIME_OBS,
            Card::new(keys::BJDMID, row.mid_bjd, Some(keys::BJDMID_COMMENT)),
        );
        header.insert_after(
            keys::BJDMID,
            Card::new(keys::MJDSTART, row.start_mjd, Some(keys::MJDSTART_COMMENT)),
        );
    }

    header.set(keys::NINTS, 1i64);
    header.insert_before(
        keys::NINTS,
        Card::new(keys::NINT, 1i64, Some(keys::NINT_COMMENT)),
    );
    header.push_comment(keys::PROVENANCE);
    header
}
