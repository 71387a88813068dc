//! The EPPC_PatternMatching portion: the linker's duplicate-function
//! reports.
//!
//! Two phases appear back to back. The merging phase is printed live while
//! the linker collapses duplicates (usually by replacing one body with a
//! branch to the other, rarely by interchanging the two first). The folding
//! phase is a redundant per-object summary printed after analysis
//! concludes.

use std::collections::HashMap;
use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::cursor::{Cursor, cap_bytes, cap_dec, cap_string, pattern};
use crate::error::{ScanError, ScanErrorKind};
use crate::version::{Version, VersionRange};
use crate::warn::WarningConfig;

// "--> duplicated code: symbol %s is duplicated by %s, size = %d \r\n\r\n"
static RE_MERGING_IS_DUPLICATED: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A--> duplicated code: symbol ([^\r\n]*) is duplicated by ([^\r\n]*), size = ([0-9]+) \r?\n\r?\n",
    )
});
// "--> the function %s will be replaced by a branch to %s\r\n\r\n\r\n"
static RE_MERGING_WILL_BE_REPLACED: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A--> the function ([^\r\n]*) will be replaced by a branch to ([^\r\n]*)\r?\n\r?\n\r?\n",
    )
});
// "--> the function %s was interchanged with %s, size=%d \r\n"
static RE_MERGING_WAS_INTERCHANGED: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A--> the function ([^\r\n]*) was interchanged with ([^\r\n]*), size=([0-9]+) \r?\n")
});
// "\r\n\r\n\r\nCode folded in file: %s \r\n"
static RE_FOLDING_HEADER: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A\r?\n\r?\n\r?\nCode folded in file: ([^\r\n]*) \r?\n"));
// "--> %s is duplicated by %s, size = %d \r\n\r\n"
static RE_FOLDING_IS_DUPLICATED: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A--> ([^\r\n]*) is duplicated by ([^\r\n]*), size = ([0-9]+) \r?\n\r?\n")
});
// "--> %s is duplicated by %s, size = %d, new branch function %s \r\n\r\n"
static RE_FOLDING_IS_DUPLICATED_NEW_BRANCH: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A--> ([^\r\n]*) is duplicated by ([^\r\n]*), size = ([0-9]+), new branch function ([^\r\n]*) \r?\n\r?\n",
    )
});

/// One merging event: `first_name` is a duplicate of `second_name`.
#[derive(Debug)]
pub struct MergingUnit {
    pub first_name: String,
    pub second_name: String,
    pub size: u32,
    /// When the function is more than just a BLR, it is replaced with a
    /// branch to the duplicate, trading a little overhead for space.
    pub will_be_replaced: bool,
    /// Rarely the linker removes a function outright, redirecting all
    /// references to the duplicate; even more rarely it changes its mind
    /// and branches after all.
    pub was_interchanged: bool,
}

/// The folding summary for one object file.
#[derive(Debug)]
pub struct FoldingUnit {
    pub object_name: String,
    pub units: Vec<FoldingRecord>,
}

#[derive(Debug)]
pub struct FoldingRecord {
    pub first_name: String,
    pub second_name: String,
    pub size: u32,
    pub new_branch_function: bool,
}

#[derive(Debug)]
pub struct EppcPatternMatching {
    pub merging_units: Vec<MergingUnit>,
    pub folding_units: Vec<FoldingUnit>,
    pub versions: VersionRange,
    /// First name, to merging units reporting it.
    pub merging_lookup: HashMap<String, Vec<usize>>,
    /// Object name, to first name, to (folding unit, record) indices.
    /// Shared across repeat-name objects on purpose.
    pub folding_lookup: HashMap<String, HashMap<String, Vec<(usize, usize)>>>,
}

impl EppcPatternMatching {
    /// Both phases must be present for the portion to count; the linker
    /// never prints one without the other.
    pub fn is_empty(&self) -> bool {
        self.merging_units.is_empty() || self.folding_units.is_empty()
    }

    pub(crate) fn scan(
        cursor: &mut Cursor<'_>,
        config: &WarningConfig,
    ) -> Result<EppcPatternMatching, ScanError> {
        let mut portion = EppcPatternMatching {
            merging_units: Vec::new(),
            folding_units: Vec::new(),
            versions: VersionRange::OPEN,
            merging_lookup: HashMap::new(),
            folding_lookup: HashMap::new(),
        };
        // EPPC_PatternMatching appeared in CW for Wii 1.0.
        portion
            .versions
            .narrow(Version::V4_2Build142, Version::Latest);

        loop {
            if let Some(caps) = cursor.try_match(&RE_MERGING_IS_DUPLICATED) {
                let first_name = cap_string(&caps, 1);
                let second_name = cap_string(&caps, 2);
                let size = cap_dec(&caps, 3);
                let will_be_replaced =
                    scan_replacement_epilogue(cursor, &first_name, &second_name)?;
                portion.push_merging_unit(
                    MergingUnit {
                        first_name,
                        second_name,
                        size,
                        will_be_replaced,
                        was_interchanged: false,
                    },
                    cursor.line_number(),
                    config,
                );
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_MERGING_WAS_INTERCHANGED) {
                let first_name = cap_string(&caps, 1);
                let second_name = cap_string(&caps, 2);
                let size = cap_dec(&caps, 3);
                let will_be_replaced =
                    scan_replacement_epilogue(cursor, &first_name, &second_name)?;
                let epilogue_line = cursor.line_number();
                let Some(epilogue) = cursor.try_match(&RE_MERGING_IS_DUPLICATED) else {
                    return Err(ScanError::new(
                        ScanErrorKind::EppcPatternMatchingMergingInterchangeMissingEpilogue,
                        epilogue_line,
                    ));
                };
                if cap_bytes(&epilogue, 1) != first_name.as_bytes() {
                    return Err(ScanError::new(
                        ScanErrorKind::EppcPatternMatchingMergingFirstNameMismatch,
                        epilogue_line,
                    ));
                }
                if cap_bytes(&epilogue, 2) != second_name.as_bytes() {
                    return Err(ScanError::new(
                        ScanErrorKind::EppcPatternMatchingMergingSecondNameMismatch,
                        epilogue_line,
                    ));
                }
                if cap_dec(&epilogue, 3) != size {
                    return Err(ScanError::new(
                        ScanErrorKind::EppcPatternMatchingMergingSizeMismatch,
                        epilogue_line,
                    ));
                }
                portion.push_merging_unit(
                    MergingUnit {
                        first_name,
                        second_name,
                        size,
                        will_be_replaced,
                        was_interchanged: true,
                    },
                    cursor.line_number(),
                    config,
                );
                continue;
            }
            break;
        }

        loop {
            let header_line = cursor.line_number();
            let Some(caps) = cursor.try_match(&RE_FOLDING_HEADER) else {
                break;
            };
            let object_name = cap_string(&caps, 1);
            if portion.folding_lookup.contains_key(&object_name) {
                config.folding_repeat_object(header_line + 3, &object_name);
            }
            let unit_index = portion.folding_units.len();
            portion.folding_units.push(FoldingUnit {
                object_name: object_name.clone(),
                units: Vec::new(),
            });
            let unit_lookup = portion.folding_lookup.entry(object_name.clone()).or_default();

            loop {
                let record_line = cursor.line_number();
                if let Some(caps) = cursor.try_match(&RE_FOLDING_IS_DUPLICATED) {
                    let first_name = cap_string(&caps, 1);
                    if unit_lookup.contains_key(&first_name) {
                        config.folding_odr_violation(record_line, &first_name, &object_name);
                    }
                    let folding_unit = &mut portion.folding_units[unit_index];
                    let record_index = folding_unit.units.len();
                    folding_unit.units.push(FoldingRecord {
                        first_name: first_name.clone(),
                        second_name: cap_string(&caps, 2),
                        size: cap_dec(&caps, 3),
                        new_branch_function: false,
                    });
                    unit_lookup
                        .entry(first_name)
                        .or_default()
                        .push((unit_index, record_index));
                    continue;
                }
                if let Some(caps) = cursor.try_match(&RE_FOLDING_IS_DUPLICATED_NEW_BRANCH) {
                    let first_name = cap_string(&caps, 1);
                    // The new branch function always repeats the first name.
                    if cap_bytes(&caps, 4) != first_name.as_bytes() {
                        return Err(ScanError::new(
                            ScanErrorKind::EppcPatternMatchingFoldingNewBranchFunctionNameMismatch,
                            record_line,
                        ));
                    }
                    if unit_lookup.contains_key(&first_name) {
                        config.folding_odr_violation(record_line, &first_name, &object_name);
                    }
                    let folding_unit = &mut portion.folding_units[unit_index];
                    let record_index = folding_unit.units.len();
                    folding_unit.units.push(FoldingRecord {
                        first_name: first_name.clone(),
                        second_name: cap_string(&caps, 2),
                        size: cap_dec(&caps, 3),
                        new_branch_function: true,
                    });
                    unit_lookup
                        .entry(first_name)
                        .or_default()
                        .push((unit_index, record_index));
                    continue;
                }
                break;
            }
        }
        Ok(portion)
    }

    fn push_merging_unit(&mut self, unit: MergingUnit, line_number: usize, config: &WarningConfig) {
        if self.merging_lookup.contains_key(&unit.first_name) {
            config.merging_odr_violation(line_number.saturating_sub(5), &unit.first_name);
        }
        let index = self.merging_units.len();
        self.merging_lookup
            .entry(unit.first_name.clone())
            .or_default()
            .push(index);
        self.merging_units.push(unit);
    }

    pub(crate) fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        for unit in &self.merging_units {
            unit.print(w, line_number)?;
        }
        for unit in &self.folding_units {
            unit.print(w, line_number)?;
        }
        Ok(())
    }
}

impl MergingUnit {
    fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        if self.was_interchanged {
            write!(
                w,
                "--> the function {} was interchanged with {}, size={} \r\n",
                self.first_name, self.second_name, self.size
            )?;
            *line_number += 1;
            if self.will_be_replaced {
                write!(
                    w,
                    "--> the function {} will be replaced by a branch to {}\r\n\r\n\r\n",
                    self.first_name, self.second_name
                )?;
                *line_number += 3;
            }
            write!(
                w,
                "--> duplicated code: symbol {} is duplicated by {}, size = {} \r\n\r\n",
                self.first_name, self.second_name, self.size
            )?;
            *line_number += 2;
        } else {
            write!(
                w,
                "--> duplicated code: symbol {} is duplicated by {}, size = {} \r\n\r\n",
                self.first_name, self.second_name, self.size
            )?;
            *line_number += 2;
            if self.will_be_replaced {
                write!(
                    w,
                    "--> the function {} will be replaced by a branch to {}\r\n\r\n\r\n",
                    self.first_name, self.second_name
                )?;
                *line_number += 3;
            }
        }
        Ok(())
    }
}

impl FoldingUnit {
    fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        write!(w, "\r\n\r\n\r\nCode folded in file: {} \r\n", self.object_name)?;
        *line_number += 4;
        for record in &self.units {
            if record.new_branch_function {
                write!(
                    w,
                    "--> {} is duplicated by {}, size = {}, new branch function {} \r\n\r\n",
                    record.first_name, record.second_name, record.size, record.first_name
                )?;
            } else {
                write!(
                    w,
                    "--> {} is duplicated by {}, size = {} \r\n\r\n",
                    record.first_name, record.second_name, record.size
                )?;
            }
            *line_number += 2;
        }
        Ok(())
    }
}

/// The optional `will be replaced by a branch` epilogue shared by both
/// merging shapes. Its names must agree with the unit it follows.
fn scan_replacement_epilogue(
    cursor: &mut Cursor<'_>,
    first_name: &str,
    second_name: &str,
) -> Result<bool, ScanError> {
    let line_number = cursor.line_number();
    let Some(caps) = cursor.try_match(&RE_MERGING_WILL_BE_REPLACED) else {
        return Ok(false);
    };
    if cap_bytes(&caps, 1) != first_name.as_bytes() {
        return Err(ScanError::new(
            ScanErrorKind::EppcPatternMatchingMergingFirstNameMismatch,
            line_number,
        ));
    }
    if cap_bytes(&caps, 2) != second_name.as_bytes() {
        return Err(ScanError::new(
            ScanErrorKind::EppcPatternMatchingMergingSecondNameMismatch,
            line_number,
        ));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERGED_AND_FOLDED: &[u8] =
        b"--> duplicated code: symbol __save_gpr is duplicated by __restore_gpr, size = 48 \r\n\r\n\
          --> the function __save_gpr will be replaced by a branch to __restore_gpr\r\n\r\n\r\n\
          \r\n\r\n\r\nCode folded in file: dup.o \r\n\
          --> __save_gpr is duplicated by __restore_gpr, size = 48 \r\n\r\n";

    #[test]
    fn merging_then_folding() {
        let mut cursor = Cursor::new(MERGED_AND_FOLDED);
        let portion =
            EppcPatternMatching::scan(&mut cursor, &WarningConfig::silent()).unwrap();
        assert!(cursor.rest().is_empty());
        assert!(!portion.is_empty());
        assert_eq!(portion.versions.min, Version::V4_2Build142);
        let unit = &portion.merging_units[0];
        assert!(unit.will_be_replaced);
        assert!(!unit.was_interchanged);
        assert_eq!(unit.size, 48);
        assert_eq!(portion.folding_units[0].object_name, "dup.o");
    }

    #[test]
    fn replacement_epilogue_names_must_agree() {
        let mut cursor = Cursor::new(
            b"--> duplicated code: symbol fn_a is duplicated by fn_b, size = 48 \r\n\r\n\
              --> the function fn_c will be replaced by a branch to fn_b\r\n\r\n\r\n",
        );
        let err = EppcPatternMatching::scan(&mut cursor, &WarningConfig::silent()).unwrap_err();
        assert_eq!(
            err.kind,
            ScanErrorKind::EppcPatternMatchingMergingFirstNameMismatch
        );
    }

    #[test]
    fn interchange_requires_duplicated_epilogue() {
        let mut cursor =
            Cursor::new(b"--> the function fn_a was interchanged with fn_b, size=32 \r\n");
        let err = EppcPatternMatching::scan(&mut cursor, &WarningConfig::silent()).unwrap_err();
        assert_eq!(
            err.kind,
            ScanErrorKind::EppcPatternMatchingMergingInterchangeMissingEpilogue
        );
    }

    #[test]
    fn folding_new_branch_name_must_repeat() {
        let mut cursor = Cursor::new(
            b"--> duplicated code: symbol fn_a is duplicated by fn_b, size = 8 \r\n\r\n\
              \r\n\r\n\r\nCode folded in file: dup.o \r\n\
              --> fn_a is duplicated by fn_b, size = 8, new branch function fn_b \r\n\r\n",
        );
        let err = EppcPatternMatching::scan(&mut cursor, &WarningConfig::silent()).unwrap_err();
        assert_eq!(
            err.kind,
            ScanErrorKind::EppcPatternMatchingFoldingNewBranchFunctionNameMismatch
        );
    }

    #[test]
    fn merging_alone_counts_as_empty() {
        let mut cursor = Cursor::new(
            b"--> duplicated code: symbol fn_a is duplicated by fn_b, size = 8 \r\n\r\n",
        );
        let portion =
            EppcPatternMatching::scan(&mut cursor, &WarningConfig::silent()).unwrap();
        assert!(portion.is_empty());
        assert_eq!(portion.merging_units.len(), 1);
    }

    #[test]
    fn print_round_trips() {
        let mut cursor = Cursor::new(MERGED_AND_FOLDED);
        let portion =
            EppcPatternMatching::scan(&mut cursor, &WarningConfig::silent()).unwrap();
        let mut out = Vec::new();
        let mut line_number = 1;
        portion.print(&mut out, &mut line_number).unwrap();
        assert_eq!(out, MERGED_AND_FOLDED);
    }
}
