//! Branch islands and mixed-mode islands: small linker-generated bridge
//! functions inserted when a call target is out of range or in the other
//! instruction mode.
//!
//! Both portions have only ever been observed empty (Skylanders Swap Force
//! carries an empty Branch Islands portion); the unit grammar is datamined
//! from MWLDEPPC itself, so the scanners stay permissive of zero units.

use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::cursor::{Cursor, cap_string, pattern};
use crate::version::{Version, VersionRange};

// "  mixed mode island %s created for %s\r\n"
static RE_MIXED_MODE: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A  mixed mode island ([^\r\n]*) created for ([^\r\n]*)\r?\n"));
// "  safe mixed mode island %s created for %s\r\n"
static RE_MIXED_MODE_SAFE: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A  safe mixed mode island ([^\r\n]*) created for ([^\r\n]*)\r?\n"));
// "  branch island %s created for %s\r\n"
static RE_BRANCH: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A  branch island ([^\r\n]*) created for ([^\r\n]*)\r?\n"));
// "  safe branch island %s created for %s\r\n"
static RE_BRANCH_SAFE: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A  safe branch island ([^\r\n]*) created for ([^\r\n]*)\r?\n"));

/// One island: `first_name` is the island symbol, `second_name` the
/// function it was created for.
#[derive(Debug)]
pub struct IslandUnit {
    pub first_name: String,
    pub second_name: String,
    pub is_safe: bool,
}

#[derive(Debug)]
pub struct MixedModeIslands {
    pub units: Vec<IslandUnit>,
    pub versions: VersionRange,
}

#[derive(Debug)]
pub struct BranchIslands {
    pub units: Vec<IslandUnit>,
    pub versions: VersionRange,
}

fn scan_units(cursor: &mut Cursor<'_>, re: &Regex, re_safe: &Regex) -> Vec<IslandUnit> {
    let mut units = Vec::new();
    loop {
        if let Some(caps) = cursor.try_match(re) {
            units.push(IslandUnit {
                first_name: cap_string(&caps, 1),
                second_name: cap_string(&caps, 2),
                is_safe: false,
            });
            continue;
        }
        if let Some(caps) = cursor.try_match(re_safe) {
            units.push(IslandUnit {
                first_name: cap_string(&caps, 1),
                second_name: cap_string(&caps, 2),
                is_safe: true,
            });
            continue;
        }
        break;
    }
    units
}

fn print_units<W: Write>(
    w: &mut W,
    units: &[IslandUnit],
    noun: &str,
    line_number: &mut usize,
) -> io::Result<()> {
    for unit in units {
        if unit.is_safe {
            write!(
                w,
                "  safe {noun} island {} created for {}\r\n",
                unit.first_name, unit.second_name
            )?;
        } else {
            write!(
                w,
                "  {noun} island {} created for {}\r\n",
                unit.first_name, unit.second_name
            )?;
        }
        *line_number += 1;
    }
    Ok(())
}

impl MixedModeIslands {
    pub(crate) fn scan(cursor: &mut Cursor<'_>) -> MixedModeIslands {
        let mut versions = VersionRange::OPEN;
        // Islands appeared in CW for GCN 3.0a3 at the earliest.
        versions.narrow(Version::V4_1Build51213, Version::Latest);
        MixedModeIslands {
            units: scan_units(cursor, &RE_MIXED_MODE, &RE_MIXED_MODE_SAFE),
            versions,
        }
    }

    pub(crate) fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        write!(w, "\r\nMixed Mode Islands\r\n")?;
        *line_number += 2;
        print_units(w, &self.units, "mixed mode", line_number)
    }
}

impl BranchIslands {
    pub(crate) fn scan(cursor: &mut Cursor<'_>) -> BranchIslands {
        let mut versions = VersionRange::OPEN;
        versions.narrow(Version::V4_1Build51213, Version::Latest);
        BranchIslands {
            units: scan_units(cursor, &RE_BRANCH, &RE_BRANCH_SAFE),
            versions,
        }
    }

    pub(crate) fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        write!(w, "\r\nBranch Islands\r\n")?;
        *line_number += 2;
        print_units(w, &self.units, "branch", line_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_prefix_sets_the_flag() {
        let mut cursor = Cursor::new(
            b"  branch island _bi_0_foo created for foo\r\n\
              \x20 safe branch island _bi_1_bar created for bar\r\n",
        );
        let portion = BranchIslands::scan(&mut cursor);
        assert!(cursor.rest().is_empty());
        assert_eq!(portion.units.len(), 2);
        assert!(!portion.units[0].is_safe);
        assert!(portion.units[1].is_safe);
        assert_eq!(portion.versions.min, Version::V4_1Build51213);
    }

    #[test]
    fn empty_portions_are_fine() {
        let mut cursor = Cursor::new(b"");
        let portion = MixedModeIslands::scan(&mut cursor);
        assert!(portion.units.is_empty());
    }

    #[test]
    fn print_round_trips_with_header() {
        let input: &[u8] = b"  mixed mode island _mmi_0 created for vle_fn\r\n";
        let mut cursor = Cursor::new(input);
        let portion = MixedModeIslands::scan(&mut cursor);
        let mut out = Vec::new();
        let mut line_number = 1;
        portion.print(&mut out, &mut line_number).unwrap();
        let mut expected = b"\r\nMixed Mode Islands\r\n".to_vec();
        expected.extend_from_slice(input);
        assert_eq!(out, expected);
    }
}
