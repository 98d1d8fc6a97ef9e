use std::path::PathBuf;

/// All errors that can occur while reading, deriving or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed FITS header block.
    #[error("invalid FITS header: {0}")]
    InvalidHeader(&'static str),
    /// Premature end of data while reading.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Unrecognized BITPIX value.
    #[error("invalid BITPIX value: {0}")]
    InvalidBitpix(i64),
    /// Malformed keyword name in a header card.
    #[error("invalid keyword name")]
    InvalidKeyword,
    /// A header value could not be parsed correctly.
    #[error("invalid header value")]
    InvalidValue,
    /// A required keyword was not found in the header.
    #[error("missing required keyword: {0}")]
    MissingKeyword(&'static str),
    /// No HDU in the file carries image data.
    #[error("no image data found (looked for EXTNAME {0})")]
    MissingImage(&'static str),
    /// The segment keywords describe an empty or inverted frame range.
    #[error("invalid frame range: start {start}, count {count}")]
    InvalidFrameRange { start: i64, count: i64 },
    /// The data cube holds fewer frames than the header claims.
    #[error("data cube has {available} frames, header claims {expected}")]
    FrameCountMismatch { expected: usize, available: usize },
    /// `split` was called on an exposure whose input file was not found.
    #[error("exposure has no frames: {0}")]
    EmptyExposure(PathBuf),
    /// Reorientation was requested but no detector name is known.
    #[error("reorientation requested but no detector name is available")]
    MissingDetector,
    /// Reorientation was requested for a detector with no known readout layout.
    #[error("unsupported detector for reorientation: {0}")]
    UnsupportedDetector(String),
    /// Reorientation only handles 2-D frames and 3-D stacks.
    #[error("cannot reorient an array of rank {0}")]
    UnsupportedRank(usize),
    /// A shell-style input pattern could not be parsed.
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    /// Pixel data did not match the shape declared by NAXISn.
    #[error("pixel data does not match its shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    /// An I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
