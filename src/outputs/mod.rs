//! Output generation.
//!
//! - [`json`]: writes each normalized article as its own JSON file

pub mod json;
