//! Detector-specific axis reversal into a common display orientation.
//!
//! Detectors read out in one of two directions. Group A frames are mirrored
//! along the column axis (NAXIS1), group B frames along the row axis
//! (NAXIS2). Both flips are their own inverse.

use crate::error::{Error, Result};
use crate::image::PixelArray;

const GROUP_A: &[&str] = &["NRCA1", "NRCA3", "NRCB2", "NRCB4", "NRCALONG"];
const GROUP_B: &[&str] = &["NRCA2", "NRCA4", "NRCB1", "NRCB3", "NRCBLONG"];

/// Readout convention of a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorGroup {
    /// Reverse the last (column) axis.
    A,
    /// Reverse the second-to-last (row) axis.
    B,
}

impl DetectorGroup {
    /// Look up the group of a detector name, ignoring case and padding.
    pub fn for_detector(name: &str) -> Result<Self> {
        let name = name.trim();
        let known = |group: &[&str]| group.iter().any(|d| d.eq_ignore_ascii_case(name));
        if known(GROUP_A) {
            Ok(DetectorGroup::A)
        } else if known(GROUP_B) {
            Ok(DetectorGroup::B)
        } else {
            Err(Error::UnsupportedDetector(String::from(name)))
        }
    }

    /// Index of the axis this group reverses in an array of rank `ndim`.
    pub fn axis(self, ndim: usize) -> Result<usize> {
        if !(2..=3).contains(&ndim) {
            return Err(Error::UnsupportedRank(ndim));
        }
        Ok(match self {
            DetectorGroup::A => ndim - 1,
            DetectorGroup::B => ndim - 2,
        })
    }
}

/// Pick the detector name: an explicit override wins over the one read
/// from the exposure's `DETECTOR` card.
pub fn resolve_detector(explicit: Option<&str>, recorded: Option<&str>) -> Result<String> {
    explicit
        .or(recorded)
        .map(|name| String::from(name.trim()))
        .filter(|name| !name.is_empty())
        .ok_or(Error::MissingDetector)
}

/// Reorient a 2-D frame or 3-D stack for `group`.
pub fn reorient(pixels: &PixelArray, group: DetectorGroup) -> Result<PixelArray> {
    let axis = group.axis(pixels.ndim())?;
    Ok(pixels.inverted(axis))
}
