//! In-process audio analysis.

mod decode;

pub use decode::{PeakEnvelope, decode_peak_envelope};
