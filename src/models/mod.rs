//! Data models for package representation

mod arch;
mod installed;
mod manifest;
mod version;

pub use arch::*;
pub use installed::*;
pub use manifest::*;
pub use version::*;
