//! Substring search support.
//!
//! Matching itself is delegated to each backend's query engine; this module
//! only turns user input into safe backend filter expressions.

pub mod pattern;
