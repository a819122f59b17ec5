//! Processor architecture handling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppxError, Result};

/// Processor architecture a package targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// 32-bit x86
    X86,
    /// x86-64
    X64,
    /// 32-bit ARM
    Arm,
    /// 64-bit ARM
    Arm64,
    /// x86 code compiled for ARM64 emulation
    X86a64,
    /// Architecture independent
    Neutral,
}

impl Architecture {
    /// Get the manifest spelling of the architecture
    pub fn as_manifest_str(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
            Self::X86a64 => "x86a64",
            Self::Neutral => "neutral",
        }
    }

    /// Check whether a package built for this architecture runs on `host`
    pub fn is_compatible_with(&self, host: Architecture) -> bool {
        match (self, host) {
            (Self::Neutral, _) => true,
            (a, h) if *a == h => true,
            (Self::X86, Self::X64) => true,
            (Self::X86 | Self::X64 | Self::Arm | Self::X86a64, Self::Arm64) => true,
            _ => false,
        }
    }

    /// Get the current system architecture
    pub fn current() -> Self {
        #[cfg(target_arch = "x86_64")]
        return Self::X64;
        #[cfg(target_arch = "x86")]
        return Self::X86;
        #[cfg(target_arch = "aarch64")]
        return Self::Arm64;
        #[cfg(target_arch = "arm")]
        return Self::Arm;
        #[cfg(not(any(
            target_arch = "x86_64",
            target_arch = "x86",
            target_arch = "aarch64",
            target_arch = "arm"
        )))]
        return Self::Neutral;
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_manifest_str())
    }
}

impl FromStr for Architecture {
    type Err = AppxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "x86" => Ok(Self::X86),
            "x64" => Ok(Self::X64),
            "arm" => Ok(Self::Arm),
            "arm64" => Ok(Self::Arm64),
            "x86a64" => Ok(Self::X86a64),
            "neutral" => Ok(Self::Neutral),
            _ => Err(AppxError::InvalidArchitecture(format!(
                "Unknown architecture: {}",
                s
            ))),
        }
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Self::current()
    }
}
