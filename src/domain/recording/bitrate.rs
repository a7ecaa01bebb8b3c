//! Encoder bitrate value object

use std::fmt;
use std::str::FromStr;

use crate::domain::error::BitrateParseError;

/// Bitrates offered to the user, in kbps
pub const BITRATE_VALUES_KBPS: [u32; 6] = [64, 96, 128, 192, 256, 320];

/// Bitrate used when nothing is configured
pub const DEFAULT_BITRATE_KBPS: u32 = 256;

/// Requested encoder bitrate in kilobits per second.
/// Only values from [`BITRATE_VALUES_KBPS`] can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bitrate {
    kbps: u32,
}

impl Bitrate {
    /// Create a bitrate from a kbps value
    pub fn from_kbps(kbps: u32) -> Result<Self, BitrateParseError> {
        if BITRATE_VALUES_KBPS.contains(&kbps) {
            Ok(Self { kbps })
        } else {
            Err(BitrateParseError {
                input: kbps.to_string(),
            })
        }
    }

    pub const fn kbps(&self) -> u32 {
        self.kbps
    }

    pub const fn bits_per_second(&self) -> u32 {
        self.kbps * 1000
    }

    /// All selectable bitrates in ascending order
    pub fn all() -> impl Iterator<Item = Self> {
        BITRATE_VALUES_KBPS.iter().map(|&kbps| Self { kbps })
    }
}

impl Default for Bitrate {
    fn default() -> Self {
        Self {
            kbps: DEFAULT_BITRATE_KBPS,
        }
    }
}

impl FromStr for Bitrate {
    type Err = BitrateParseError;

    /// Accepts "128", "128k" and "128kbps"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let digits = lower
            .strip_suffix("kbps")
            .or_else(|| lower.strip_suffix('k'))
            .unwrap_or(&lower)
            .trim();

        let kbps: u32 = digits.parse().map_err(|_| BitrateParseError {
            input: s.to_string(),
        })?;

        Self::from_kbps(kbps).map_err(|_| BitrateParseError {
            input: s.to_string(),
        })
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kbps", self.kbps)
    }
}
