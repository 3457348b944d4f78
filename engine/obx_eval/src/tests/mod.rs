//! Test modules relocated from implementation files.
//!
//! Inline test modules that grow past a couple hundred lines live here
//! instead.
