//! The LinkerOpts portion: per-reference addressing-optimization notes.
//!
//! Each line reports one reference the linker looked at while optimizing
//! near addressing, tagged by what happened to it. The portion has no
//! header of its own; scanning simply stops at the first line that matches
//! none of the four shapes.

use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::cursor::{Cursor, cap_string, pattern};
use crate::version::{Version, VersionRange};

// "  %s/ %s()/ %s - address not in near addressing range \r\n"
static RE_NOT_NEAR: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A  ([^\r\n]*)/ ([^\r\n]*)\(\)/ ([^\r\n]*) - address not in near addressing range \r?\n",
    )
});
// "  %s/ %s()/ %s - final address not yet computed \r\n"
static RE_NOT_COMPUTED: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A  ([^\r\n]*)/ ([^\r\n]*)\(\)/ ([^\r\n]*) - final address not yet computed \r?\n")
});
// "! %s/ %s()/ %s - optimized addressing \r\n"
static RE_OPTIMIZED: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A! ([^\r\n]*)/ ([^\r\n]*)\(\)/ ([^\r\n]*) - optimized addressing \r?\n")
});
// "  %s/ %s() - error disassembling function \r\n"
static RE_DISASSEMBLE_ERROR: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A  ([^\r\n]*)/ ([^\r\n]*)\(\) - error disassembling function \r?\n"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkerOptsKind {
    NotNear,
    NotComputed,
    Optimized,
    DisassembleError,
}

#[derive(Debug)]
pub struct LinkerOptsUnit {
    pub kind: LinkerOptsKind,
    pub module_name: String,
    /// Name of the function the reference sits in.
    pub name: String,
    /// Absent for disassembly errors, which never got far enough to name
    /// what was being referenced.
    pub reference_name: Option<String>,
}

#[derive(Debug)]
pub struct LinkerOpts {
    pub units: Vec<LinkerOptsUnit>,
    pub versions: VersionRange,
}

impl LinkerOpts {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub(crate) fn scan(cursor: &mut Cursor<'_>) -> LinkerOpts {
        let mut portion = LinkerOpts {
            units: Vec::new(),
            versions: VersionRange::OPEN,
        };
        // LinkerOpts appeared in CW for Wii 1.0.
        portion
            .versions
            .narrow(Version::V4_2Build142, Version::Latest);

        loop {
            if let Some(caps) = cursor.try_match(&RE_NOT_NEAR) {
                portion.units.push(LinkerOptsUnit {
                    kind: LinkerOptsKind::NotNear,
                    module_name: cap_string(&caps, 1),
                    name: cap_string(&caps, 2),
                    reference_name: Some(cap_string(&caps, 3)),
                });
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_DISASSEMBLE_ERROR) {
                portion.units.push(LinkerOptsUnit {
                    kind: LinkerOptsKind::DisassembleError,
                    module_name: cap_string(&caps, 1),
                    name: cap_string(&caps, 2),
                    reference_name: None,
                });
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_NOT_COMPUTED) {
                portion.units.push(LinkerOptsUnit {
                    kind: LinkerOptsKind::NotComputed,
                    module_name: cap_string(&caps, 1),
                    name: cap_string(&caps, 2),
                    reference_name: Some(cap_string(&caps, 3)),
                });
                continue;
            }
            // Never attested, but MWLDEPPC is capable of printing it.
            if let Some(caps) = cursor.try_match(&RE_OPTIMIZED) {
                portion.units.push(LinkerOptsUnit {
                    kind: LinkerOptsKind::Optimized,
                    module_name: cap_string(&caps, 1),
                    name: cap_string(&caps, 2),
                    reference_name: Some(cap_string(&caps, 3)),
                });
                continue;
            }
            break;
        }
        portion
    }

    pub(crate) fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        for unit in &self.units {
            unit.print(w, line_number)?;
        }
        Ok(())
    }
}

impl LinkerOptsUnit {
    fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        let reference_name = self.reference_name.as_deref().unwrap_or_default();
        match self.kind {
            LinkerOptsKind::NotNear => write!(
                w,
                "  {}/ {}()/ {} - address not in near addressing range \r\n",
                self.module_name, self.name, reference_name
            )?,
            LinkerOptsKind::NotComputed => write!(
                w,
                "  {}/ {}()/ {} - final address not yet computed \r\n",
                self.module_name, self.name, reference_name
            )?,
            LinkerOptsKind::Optimized => write!(
                w,
                "! {}/ {}()/ {} - optimized addressing \r\n",
                self.module_name, self.name, reference_name
            )?,
            LinkerOptsKind::DisassembleError => write!(
                w,
                "  {}/ {}() - error disassembling function \r\n",
                self.module_name, self.name
            )?,
        }
        *line_number += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTS: &[u8] =
        b"  main.o/ main()/ gHeap - address not in near addressing range \r\n\
          \x20 main.o/ main()/ gPool - final address not yet computed \r\n\
          \x20 stub.o/ stub() - error disassembling function \r\n";

    #[test]
    fn four_shapes_scan_in_order() {
        let mut cursor = Cursor::new(OPTS);
        let portion = LinkerOpts::scan(&mut cursor);
        assert!(cursor.rest().is_empty());
        assert_eq!(portion.units.len(), 3);
        assert_eq!(portion.units[0].kind, LinkerOptsKind::NotNear);
        assert_eq!(portion.units[1].kind, LinkerOptsKind::NotComputed);
        assert_eq!(portion.units[2].kind, LinkerOptsKind::DisassembleError);
        assert_eq!(portion.units[2].reference_name, None);
        assert_eq!(portion.versions.min, Version::V4_2Build142);
    }

    #[test]
    fn print_round_trips() {
        let mut cursor = Cursor::new(OPTS);
        let portion = LinkerOpts::scan(&mut cursor);
        let mut out = Vec::new();
        let mut line_number = 1;
        portion.print(&mut out, &mut line_number).unwrap();
        assert_eq!(out, OPTS);
        assert_eq!(line_number, 4);
    }

    #[test]
    fn unmatched_line_stops_the_loop() {
        let mut cursor = Cursor::new(b"\r\nMixed Mode Islands\r\n");
        let portion = LinkerOpts::scan(&mut cursor);
        assert!(portion.is_empty());
        assert_eq!(cursor.rest(), b"\r\nMixed Mode Islands\r\n");
    }
}
