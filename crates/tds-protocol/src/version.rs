//! TDS protocol version definitions.

use core::fmt;

/// TDS protocol version.
///
/// Represents the version of the TDS protocol used for communication
/// with SQL Server. The raw value is the 32-bit version identifier carried
/// in the LOGIN7 header and echoed back (big-endian on the wire) in the
/// LOGINACK token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TdsVersion(u32);

impl TdsVersion {
    /// TDS 7.0 (SQL Server 7.0)
    pub const V7_0: Self = Self(0x0000_0070);

    /// TDS 7.1 (SQL Server 2000)
    pub const V7_1: Self = Self(0x0000_0071);

    /// TDS 7.1 Revision 1 / SP1 (SQL Server 2000 SP1)
    pub const V7_1_REV1: Self = Self(0x0100_0071);

    /// TDS 7.2 (SQL Server 2005)
    pub const V7_2: Self = Self(0x0209_0972);

    /// TDS 7.3A (SQL Server 2008)
    pub const V7_3A: Self = Self(0x0300_0A73);

    /// TDS 7.3B (SQL Server 2008 R2)
    pub const V7_3B: Self = Self(0x0300_0B73);

    /// TDS 7.4 (SQL Server 2012 and later)
    pub const V7_4: Self = Self(0x0400_0074);

    /// Create a new TDS version from a raw version identifier.
    #[must_use]
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// Get the raw version value as carried on the wire.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this version is TDS 7.3 (SQL Server 2008/2008 R2).
    ///
    /// Returns true for both TDS 7.3A (SQL Server 2008) and TDS 7.3B (SQL Server 2008 R2).
    #[must_use]
    pub const fn is_tds_7_3(self) -> bool {
        self.0 == Self::V7_3A.0 || self.0 == Self::V7_3B.0
    }

    /// Check if this version is TDS 7.4 (SQL Server 2012+).
    #[must_use]
    pub const fn is_tds_7_4(self) -> bool {
        self.0 == Self::V7_4.0
    }

    /// Check if the ALL_HEADERS prelude is required before SQL batch/RPC payloads.
    ///
    /// Introduced in TDS 7.1; all versions this crate supports are 7.1 or later.
    #[must_use]
    pub const fn requires_all_headers(self) -> bool {
        self.0 >= Self::V7_1.0
    }

    /// Check if this version's DONE tokens carry a 64-bit row count.
    ///
    /// TDS 7.2 and later use a `u64` `rowcount` field; earlier versions use `u32`.
    #[must_use]
    pub const fn has_wide_done_rowcount(self) -> bool {
        self.0 >= Self::V7_2.0
    }

    /// Get the minimum version between this version and another.
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Get the SQL Server version name for this TDS version.
    #[must_use]
    pub const fn sql_server_version_name(&self) -> &'static str {
        match self.0 {
            0x0000_0070 => "SQL Server 7.0",
            0x0000_0071 | 0x0100_0071 => "SQL Server 2000",
            0x0209_0972 => "SQL Server 2005",
            0x0300_0A73 => "SQL Server 2008",
            0x0300_0B73 => "SQL Server 2008 R2",
            0x0400_0074 => "SQL Server 2012+",
            _ => "Unknown SQL Server version",
        }
    }

    /// Parse a TDS version from a string representation.
    ///
    /// Accepts formats like "7.0", "7.1", "7.2", "7.3"/"7.3a", "7.3b", "7.4".
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "7.0" => Some(Self::V7_0),
            "7.1" => Some(Self::V7_1),
            "7.2" => Some(Self::V7_2),
            "7.3" | "7.3a" => Some(Self::V7_3A),
            "7.3b" => Some(Self::V7_3B),
            "7.4" => Some(Self::V7_4),
            _ => None,
        }
    }

    /// Get the major version number (always 7 for the versions this crate supports).
    #[must_use]
    pub const fn major(self) -> u8 {
        7
    }

    /// Get the minor version number (the logical TDS 7.x sub-version).
    #[must_use]
    pub const fn minor(self) -> u8 {
        match self.0 {
            0x0000_0070 => 0,
            0x0000_0071 | 0x0100_0071 => 1,
            0x0209_0972 => 2,
            0x0300_0A73 | 0x0300_0B73 => 3,
            0x0400_0074 => 4,
            _ => 0,
        }
    }

    /// Get the revision suffix for TDS 7.3 versions.
    ///
    /// Returns `Some('A')` for TDS 7.3A, `Some('B')` for TDS 7.3B, `None` otherwise.
    #[must_use]
    pub const fn revision_suffix(self) -> Option<char> {
        match self.0 {
            0x0300_0A73 => Some('A'),
            0x0300_0B73 => Some('B'),
            _ => None,
        }
    }
}

impl Default for TdsVersion {
    fn default() -> Self {
        Self::V7_2
    }
}

impl fmt::Display for TdsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(suffix) = self.revision_suffix() {
            write!(f, "TDS {}.{}{}", self.major(), self.minor(), suffix)
        } else {
            write!(f, "TDS {}.{}", self.major(), self.minor())
        }
    }
}

impl From<u32> for TdsVersion {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<TdsVersion> for u32 {
    fn from(version: TdsVersion) -> Self {
        version.0
    }
}
