//! Conversion pipeline for dbtools.
//!
//! Ties the format codecs together into one end-to-end operation
//! ([`pipeline::convert`]): read a file, decode it into a table, encode the
//! table in the target format and write it out.

pub mod pipeline;

pub use pipeline::{ConvertJob, ConvertReport, ProgressReporter, SilentProgress, check_extensions, convert};
