//! CLI library for testing purposes

pub mod convert;
pub mod formats;
pub mod view;

pub use convert::{Outcome, ToPoRequest, run_from_po, run_merge, run_to_po};
pub use formats::{parse_format, parse_language, resolve_format};
