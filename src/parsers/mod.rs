//! Package file parsers

pub mod appx;

pub use appx::AppxReader;
