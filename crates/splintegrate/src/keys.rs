//! Header keywords read from input exposures and written to split frames.

/// 1-based global index of the first integration in this segment.
pub const INTSTART: &str = "INTSTART";
/// 0-based offset of the first integration (older files).
pub const SEGSTART: &str = "SEGSTART";
/// 1-based global index of the last integration in this segment.
pub const INTEND: &str = "INTEND";
/// 0-based offset of the last integration (older files).
pub const SEGEND: &str = "SEGEND";
/// Number of integrations. Set to 1 on every split frame.
pub const NINTS: &str = "NINTS";
/// Integrations in the whole exposure (older files); frames-in-file on output.
pub const NINT: &str = "NINT";
pub const DETECTOR: &str = "DETECTOR";
/// Exposure start time; the timing keys are inserted after it.
pub const TIME_OBS: &str = "TIME-OBS";

pub const ON_NINT: &str = "ON_NINT";
pub const TOT_NINT: &str = "TOT_NINT";
pub const SEGNINT: &str = "SEGNINT";
pub const BJDMID: &str = "BJDMID";
pub const MJDSTART: &str = "MJDSTART";
pub const FLIP2DET: &str = "FLIP2DET";

pub const BSCALE: &str = "BSCALE";
pub const BZERO: &str = "BZERO";

/// EXTNAME of the science image extension.
pub const SCI_EXTNAME: &str = "SCI";
/// EXTNAME of the per-integration timing table.
pub const INT_TIMES_EXTNAME: &str = "INT_TIMES";
pub const MID_BJD_COLUMN: &str = "int_mid_BJD_TDB";
pub const START_MJD_COLUMN: &str = "int_start_MJD_UTC";

pub const ON_NINT_COMMENT: &str = "This is INT of TOT_NINT";
pub const TOT_NINT_COMMENT: &str = "Total number of NINT in original exposure";
pub const SEGNINT_COMMENT: &str = "Total number of NINT in the segment or file";
pub const BJDMID_COMMENT: &str = "Mid-Exposure time (MBJD_TDB)";
pub const MJDSTART_COMMENT: &str = "Exposure start time (MJD_UTC)";
pub const NINT_COMMENT: &str = "Number of ints";
pub const FLIP2DET_COMMENT: &str = "Flipped to detector coordinates?";

pub const PROVENANCE: &str = "Extracted from a multi-integration file by splintegrate";
