//! Split multi-integration FITS exposures into single-frame files.
//!
//! An [`Exposure`] reads one input file, works out which global frame
//! indices it holds, and [`Exposure::split`] writes one FITS file per frame
//! with a derived header.

pub mod bintable;
pub mod block;
pub mod discover;
pub mod error;
pub mod exposure;
pub mod hdu;
pub mod header;
pub mod image;
pub mod keys;
pub mod orient;
pub mod split;
pub mod value;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use error::{Error, Result};
pub use exposure::{Exposure, ExposureMetadata, MetadataFallback, TimingRow};
pub use header::Header;
pub use orient::DetectorGroup;
pub use split::{FrameOutcome, SplitOptions, SplitReport};
