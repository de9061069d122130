//! Metakernel text format: probing and parsing.
//!
//! A metakernel lists kernel files for the toolkit inside a
//! `\begindata ... \begintext` section. Nothing here touches storage or the
//! toolkit; parsed paths are handed to the registry by the caller.

pub mod lexer;
pub mod parser;
pub mod sniff;
pub mod value;
