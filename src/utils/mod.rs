//! Utility modules for the scanner

pub mod target_parser;
