//! Known Metrowerks linker releases and version-range arithmetic.
//!
//! The linker never writes its own version into a map, so everything this
//! crate knows about the producing toolchain is inferred from formatting
//! quirks. Each portion of a scanned map narrows a `[min, max]` bracket;
//! the map-wide answer is the intersection of the portion brackets.

use core::fmt;

/// Every MWLDEPPC release known to produce a distinct linker-map layout,
/// bracketed by `Unknown` (older than anything attested) and `Latest`.
///
/// Ordering follows release chronology, so ranges can be narrowed with
/// plain `min`/`max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    /// Oldest known version.
    Unknown,
    /// CodeWarrior for GCN 1.0
    V2_3_3Build126,
    /// CodeWarrior for GCN 1.1
    V2_3_3Build137,
    /// CodeWarrior for GCN 1.2.5
    V2_4_1Build47,
    /// CodeWarrior for GCN 1.3.2
    V2_4_2Build81,
    /// CodeWarrior for GCN 2.0
    V2_4_7Build92,
    /// CodeWarrior for GCN 2.5
    V2_4_7Build102,
    /// CodeWarrior for GCN 2.6
    V2_4_7Build107,
    /// CodeWarrior for GCN 2.7
    V3_0_4,
    /// CodeWarrior for GCN 3.0a3
    V4_1Build51213,
    /// CodeWarrior for GCN 3.0
    V4_2Build60320,
    /// CodeWarrior for Wii 1.0
    V4_2Build142,
    /// CodeWarrior for Wii 1.1
    V4_3Build151,
    /// CodeWarrior for Wii 1.3
    V4_3Build172,
    /// CodeWarrior for Wii 1.7
    V4_3Build213,
    /// Newest known version.
    Latest,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Version::Unknown => "unknown",
            Version::V2_3_3Build126 => "2.3.3 build 126",
            Version::V2_3_3Build137 => "2.3.3 build 137",
            Version::V2_4_1Build47 => "2.4.1 build 47",
            Version::V2_4_2Build81 => "2.4.2 build 81",
            Version::V2_4_7Build92 => "2.4.7 build 92",
            Version::V2_4_7Build102 => "2.4.7 build 102",
            Version::V2_4_7Build107 => "2.4.7 build 107",
            Version::V3_0_4 => "3.0.4",
            Version::V4_1Build51213 => "4.1 build 51213",
            Version::V4_2Build60320 => "4.2 build 60320",
            Version::V4_2Build142 => "4.2 build 142",
            Version::V4_3Build151 => "4.3 build 151",
            Version::V4_3Build172 => "4.3 build 172",
            Version::V4_3Build213 => "4.3 build 213",
            Version::Latest => "latest",
        };
        f.write_str(name)
    }
}

/// The bracket of linker versions consistent with everything a scanner has
/// seen so far. Starts fully open and only ever shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Version,
    pub max: Version,
}

impl VersionRange {
    /// The fully open bracket, `[Unknown, Latest]`.
    pub const OPEN: VersionRange = VersionRange {
        min: Version::Unknown,
        max: Version::Latest,
    };

    /// Narrows this bracket by another clue. Clues can only shrink the
    /// range, never widen it.
    pub fn narrow(&mut self, min: Version, max: Version) {
        self.min = self.min.max(min);
        self.max = self.max.min(max);
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        VersionRange::OPEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_chronology_is_total() {
        assert!(Version::Unknown < Version::V2_3_3Build126);
        assert!(Version::V2_4_7Build107 < Version::V3_0_4);
        assert!(Version::V4_2Build60320 < Version::V4_2Build142);
        assert!(Version::V4_3Build213 < Version::Latest);
    }

    #[test]
    fn narrowing_only_shrinks() {
        let mut range = VersionRange::OPEN;
        range.narrow(Version::V3_0_4, Version::Latest);
        assert_eq!(range.min, Version::V3_0_4);
        range.narrow(Version::V2_3_3Build137, Version::Latest);
        assert_eq!(range.min, Version::V3_0_4);
        range.narrow(Version::Unknown, Version::V4_2Build60320);
        assert_eq!(range.max, Version::V4_2Build60320);
        assert!(range.min <= range.max);
    }
}
