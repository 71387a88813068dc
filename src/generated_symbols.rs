//! The `Linker generated symbols:` portion: name/address pairs for every
//! symbol the linker invented itself (`_stack_addr`, `_SDA_BASE_`,
//! section bounds, and so on).

use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::cursor::{Cursor, cap_hex, cap_string, pattern};
use crate::version::VersionRange;

// "%25s %08x\r\n"
static RE_UNIT: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A {0,25}([^\r\n]*) ([0-9a-f]{8})\r?\n"));

#[derive(Debug)]
pub struct GeneratedSymbol {
    pub name: String,
    pub value: u32,
}

#[derive(Debug)]
pub struct LinkerGeneratedSymbols {
    pub units: Vec<GeneratedSymbol>,
    pub versions: VersionRange,
}

impl LinkerGeneratedSymbols {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub(crate) fn scan(cursor: &mut Cursor<'_>) -> LinkerGeneratedSymbols {
        let mut portion = LinkerGeneratedSymbols {
            units: Vec::new(),
            versions: VersionRange::OPEN,
        };
        while let Some(caps) = cursor.try_match(&RE_UNIT) {
            portion.units.push(GeneratedSymbol {
                name: cap_string(&caps, 1),
                value: cap_hex(&caps, 2),
            });
        }
        portion
    }

    pub(crate) fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        write!(w, "\r\n\r\nLinker generated symbols:\r\n")?;
        *line_number += 3;
        for unit in &self.units {
            write!(w, "{:>25} {:08x}\r\n", unit.name, unit.value)?;
            *line_number += 1;
        }
        Ok(())
    }
}
