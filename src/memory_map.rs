//! The memory map portion: one line per output section, plus a trailing
//! block of debug sections.
//!
//! Ten prologue dialects are attested, keyed by which of three linker
//! options were in effect (`-romaddr`/`-rambuffer`, `-srec`, `-genbinary`)
//! and by era: CW for Wii 1.0 widened the name column from 15 to 20 and
//! grew the option columns. The two-line prologue under the `Memory map:`
//! header discriminates them exactly.

use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::cursor::{Cursor, cap_bytes, cap_dec, cap_hex, cap_string, pattern};
use crate::error::{ScanError, ScanErrorKind};
use crate::version::{Version, VersionRange};

static RE_SIMPLE_OLD_1: Lazy<Regex> =
    Lazy::new(|| pattern("\\A                   Starting Size     File\r?\n"));
static RE_SIMPLE_OLD_2: Lazy<Regex> =
    Lazy::new(|| pattern("\\A                   address           Offset\r?\n"));
static RE_ROMRAM_OLD_1: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                   Starting Size     File     ROM      RAM Buffer\r?\n")
});
static RE_ROMRAM_OLD_2: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                   address           Offset   Address  Address\r?\n")
});
static RE_SIMPLE_1: Lazy<Regex> =
    Lazy::new(|| pattern("\\A                       Starting Size     File\r?\n"));
static RE_SIMPLE_2: Lazy<Regex> =
    Lazy::new(|| pattern("\\A                       address           Offset\r?\n"));
static RE_ROMRAM_1: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                       Starting Size     File     ROM      RAM Buffer\r?\n")
});
static RE_ROMRAM_2: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                       address           Offset   Address  Address\r?\n")
});
static RE_SRECORD_1: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                       Starting Size     File       S-Record\r?\n")
});
static RE_SRECORD_2: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                       address           Offset     Line\r?\n")
});
static RE_BINFILE_1: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                       Starting Size     File     Bin File Bin File\r?\n")
});
static RE_BINFILE_2: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                       address           Offset   Offset   Name\r?\n")
});
static RE_ROMRAM_SRECORD_1: Lazy<Regex> = Lazy::new(|| {
    pattern(
        "\\A                       Starting Size     File     ROM      RAM Buffer  S-Record\r?\n",
    )
});
static RE_ROMRAM_SRECORD_2: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                       address           Offset   Address  Address     Line\r?\n")
});
static RE_ROMRAM_BINFILE_1: Lazy<Regex> = Lazy::new(|| {
    pattern(
        "\\A                       Starting Size     File     ROM      RAM Buffer Bin File Bin File\r?\n",
    )
});
static RE_ROMRAM_BINFILE_2: Lazy<Regex> = Lazy::new(|| {
    pattern(
        "\\A                       address           Offset   Address  Address    Offset   Name\r?\n",
    )
});
static RE_SRECORD_BINFILE_1: Lazy<Regex> = Lazy::new(|| {
    pattern(
        "\\A                       Starting Size     File        S-Record Bin File Bin File\r?\n",
    )
});
static RE_SRECORD_BINFILE_2: Lazy<Regex> = Lazy::new(|| {
    pattern("\\A                       address           Offset      Line     Offset   Name\r?\n")
});
static RE_ROMRAM_SRECORD_BINFILE_1: Lazy<Regex> = Lazy::new(|| {
    pattern(
        "\\A                       Starting Size     File     ROM      RAM Buffer    S-Record Bin File Bin File\r?\n",
    )
});
static RE_ROMRAM_SRECORD_BINFILE_2: Lazy<Regex> = Lazy::new(|| {
    pattern(
        "\\A                       address           Offset   Address  Address       Line     Offset   Name\r?\n",
    )
});

// "  %15s  %08x %08x %08x\r\n"
static RE_UNIT_SIMPLE_OLD: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A   {0,15}([^\r\n]*)  ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8})\r?\n")
});
// "  %15s  %08x %08x %08x %08x %08x\r\n"
static RE_UNIT_ROMRAM_OLD: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A   {0,15}([^\r\n]*)  ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8})\r?\n",
    )
});
// "  %15s           %06x %08x\r\n", widened to "%08x" in CW for GCN 2.7.
// The size can also overflow six digits on older linkers.
static RE_UNIT_DEBUG_OLD: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A   {0,15}([^\r\n]*)           ([0-9a-f]{6,8}) ([0-9a-f]{8})\r?\n")
});
// "  %20s %08x %08x %08x\r\n"
static RE_UNIT_SIMPLE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A   {0,20}([^\r\n]*) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8})\r?\n")
});
// "  %20s %08x %08x %08x %08x %08x\r\n"
static RE_UNIT_ROMRAM: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A   {0,20}([^\r\n]*) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8})\r?\n",
    )
});
// "  %20s %08x %08x %08x %10i\r\n"
static RE_UNIT_SRECORD: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A   {0,20}([^\r\n]*) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8})  {0,9}([0-9]+)\r?\n")
});
// "  %20s %08x %08x %08x %08x %s\r\n"
static RE_UNIT_BINFILE: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A   {0,20}([^\r\n]*) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([^\r\n]*)\r?\n",
    )
});
// "  %20s %08x %08x %08x %08x %08x %10i\r\n"
static RE_UNIT_ROMRAM_SRECORD: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A   {0,20}([^\r\n]*) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8})  {0,9}([0-9]+)\r?\n",
    )
});
// "  %20s %08x %08x %08x %08x %08x   %08x %s\r\n"
static RE_UNIT_ROMRAM_BINFILE: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A   {0,20}([^\r\n]*) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8})   ([0-9a-f]{8}) ([^\r\n]*)\r?\n",
    )
});
// "  %20s %08x %08x %08x  %10i %08x %s\r\n"
static RE_UNIT_SRECORD_BINFILE: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A   {0,20}([^\r\n]*) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8})   {0,9}([0-9]+) ([0-9a-f]{8}) ([^\r\n]*)\r?\n",
    )
});
// "  %20s %08x %08x %08x %08x %08x    %10i %08x %s\r\n"
static RE_UNIT_ROMRAM_SRECORD_BINFILE: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A   {0,20}([^\r\n]*) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8}) ([0-9a-f]{8})     {0,9}([0-9]+) ([0-9a-f]{8}) ([^\r\n]*)\r?\n",
    )
});
// "  %20s          %08x %08x\r\n"
static RE_UNIT_DEBUG: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A   {0,20}([^\r\n]*)          ([0-9a-f]{8}) ([0-9a-f]{8})\r?\n")
});

/// One output section. Columns a dialect does not carry stay zero/empty.
#[derive(Debug)]
pub struct MemoryMapNormalUnit {
    pub name: String,
    pub starting_address: u32,
    pub size: u32,
    pub file_offset: u32,
    pub rom_address: u32,
    pub ram_buffer_address: u32,
    pub srecord_line: u32,
    pub bin_file_offset: u32,
    pub bin_file_name: String,
}

/// One debug section; these never get addresses.
#[derive(Debug)]
pub struct MemoryMapDebugUnit {
    pub name: String,
    pub size: u32,
    pub file_offset: u32,
}

#[derive(Debug)]
pub struct MemoryMap {
    /// Enabled by the '-romaddr addr' and '-rambuffer addr' options.
    pub has_rom_ram: bool,
    /// Enabled by the '-srec [filename]' option.
    pub has_s_record: bool,
    /// Enabled by the '-genbinary keyword' option.
    pub has_bin_file: bool,
    pub normal_units: Vec<MemoryMapNormalUnit>,
    pub debug_units: Vec<MemoryMapDebugUnit>,
    pub versions: VersionRange,
}

impl MemoryMapNormalUnit {
    fn new(name: String, starting_address: u32, size: u32, file_offset: u32) -> Self {
        MemoryMapNormalUnit {
            name,
            starting_address,
            size,
            file_offset,
            rom_address: 0,
            ram_buffer_address: 0,
            srecord_line: 0,
            bin_file_offset: 0,
            bin_file_name: String::new(),
        }
    }
}

impl MemoryMap {
    fn new_old(has_rom_ram: bool) -> MemoryMap {
        let mut map = MemoryMap {
            has_rom_ram,
            has_s_record: false,
            has_bin_file: false,
            normal_units: Vec::new(),
            debug_units: Vec::new(),
            versions: VersionRange::OPEN,
        };
        map.versions
            .narrow(Version::Unknown, Version::V4_2Build60320);
        map
    }

    pub(crate) fn new(has_rom_ram: bool, has_s_record: bool, has_bin_file: bool) -> MemoryMap {
        let mut map = MemoryMap {
            has_rom_ram,
            has_s_record,
            has_bin_file,
            normal_units: Vec::new(),
            debug_units: Vec::new(),
            versions: VersionRange::OPEN,
        };
        map.versions.narrow(Version::V4_2Build142, Version::Latest);
        map
    }

    pub fn is_empty(&self) -> bool {
        self.normal_units.is_empty() || self.debug_units.is_empty()
    }

    /// Dispatches on the two prologue lines following the `Memory map:`
    /// header, then scans normal units and debug units in that dialect.
    pub(crate) fn scan_with_prologue(cursor: &mut Cursor<'_>) -> Result<MemoryMap, ScanError> {
        let line_number = cursor.line_number();
        let dialects: [(&Regex, &Regex, fn() -> MemoryMap, fn(&mut MemoryMap, &mut Cursor<'_>)); 10] = [
            (&*RE_SIMPLE_OLD_1, &*RE_SIMPLE_OLD_2, || MemoryMap::new_old(false), MemoryMap::scan_simple_old),
            (&*RE_ROMRAM_OLD_1, &*RE_ROMRAM_OLD_2, || MemoryMap::new_old(true), MemoryMap::scan_romram_old),
            (&*RE_SIMPLE_1, &*RE_SIMPLE_2, || MemoryMap::new(false, false, false), MemoryMap::scan_simple),
            (&*RE_ROMRAM_1, &*RE_ROMRAM_2, || MemoryMap::new(true, false, false), MemoryMap::scan_romram),
            (&*RE_SRECORD_1, &*RE_SRECORD_2, || MemoryMap::new(false, true, false), MemoryMap::scan_srecord),
            (&*RE_BINFILE_1, &*RE_BINFILE_2, || MemoryMap::new(false, false, true), MemoryMap::scan_binfile),
            (&*RE_ROMRAM_SRECORD_1, &*RE_ROMRAM_SRECORD_2, || MemoryMap::new(true, true, false), MemoryMap::scan_romram_srecord),
            (&*RE_ROMRAM_BINFILE_1, &*RE_ROMRAM_BINFILE_2, || MemoryMap::new(true, false, true), MemoryMap::scan_romram_binfile),
            (&*RE_SRECORD_BINFILE_1, &*RE_SRECORD_BINFILE_2, || MemoryMap::new(false, true, true), MemoryMap::scan_srecord_binfile),
            (&*RE_ROMRAM_SRECORD_BINFILE_1, &*RE_ROMRAM_SRECORD_BINFILE_2, || MemoryMap::new(true, true, true), MemoryMap::scan_romram_srecord_binfile),
        ];
        for (first, second, construct, scan) in dialects {
            if cursor.try_match(first).is_some() {
                if cursor.try_match(second).is_none() {
                    return Err(ScanError::new(
                        ScanErrorKind::MemoryMapBadPrologue,
                        cursor.line_number(),
                    ));
                }
                let mut map = construct();
                scan(&mut map, cursor);
                return Ok(map);
            }
        }
        Err(ScanError::new(
            ScanErrorKind::MemoryMapBadPrologue,
            line_number,
        ))
    }

    fn scan_simple_old(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_SIMPLE_OLD) {
            self.normal_units.push(MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            ));
        }
        self.scan_debug_old(cursor);
    }

    fn scan_romram_old(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_ROMRAM_OLD) {
            let mut unit = MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            );
            unit.rom_address = cap_hex(&caps, 5);
            unit.ram_buffer_address = cap_hex(&caps, 6);
            self.normal_units.push(unit);
        }
        self.scan_debug_old(cursor);
    }

    fn scan_debug_old(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_DEBUG_OLD) {
            let size = cap_bytes(&caps, 2);
            // Width 8 with a leading zero is the CW for GCN 2.7 layout; a
            // bare overflow of the six-digit field would not start with 0.
            if size.len() == 8 && size[0] == b'0' {
                self.versions.narrow(Version::V3_0_4, Version::Latest);
            }
            self.debug_units.push(MemoryMapDebugUnit {
                name: cap_string(&caps, 1),
                size: cap_hex(&caps, 2),
                file_offset: cap_hex(&caps, 3),
            });
        }
    }

    pub(crate) fn scan_simple(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_SIMPLE) {
            self.normal_units.push(MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            ));
        }
        self.scan_debug(cursor);
    }

    fn scan_romram(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_ROMRAM) {
            let mut unit = MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            );
            unit.rom_address = cap_hex(&caps, 5);
            unit.ram_buffer_address = cap_hex(&caps, 6);
            self.normal_units.push(unit);
        }
        self.scan_debug(cursor);
    }

    fn scan_srecord(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_SRECORD) {
            let mut unit = MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            );
            unit.srecord_line = cap_dec(&caps, 5);
            self.normal_units.push(unit);
        }
        self.scan_debug(cursor);
    }

    fn scan_binfile(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_BINFILE) {
            let mut unit = MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            );
            unit.bin_file_offset = cap_hex(&caps, 5);
            unit.bin_file_name = cap_string(&caps, 6);
            self.normal_units.push(unit);
        }
        self.scan_debug(cursor);
    }

    fn scan_romram_srecord(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_ROMRAM_SRECORD) {
            let mut unit = MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            );
            unit.rom_address = cap_hex(&caps, 5);
            unit.ram_buffer_address = cap_hex(&caps, 6);
            unit.srecord_line = cap_dec(&caps, 7);
            self.normal_units.push(unit);
        }
        self.scan_debug(cursor);
    }

    fn scan_romram_binfile(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_ROMRAM_BINFILE) {
            let mut unit = MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            );
            unit.rom_address = cap_hex(&caps, 5);
            unit.ram_buffer_address = cap_hex(&caps, 6);
            unit.bin_file_offset = cap_hex(&caps, 7);
            unit.bin_file_name = cap_string(&caps, 8);
            self.normal_units.push(unit);
        }
        self.scan_debug(cursor);
    }

    fn scan_srecord_binfile(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_SRECORD_BINFILE) {
            let mut unit = MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            );
            unit.srecord_line = cap_dec(&caps, 5);
            unit.bin_file_offset = cap_hex(&caps, 6);
            unit.bin_file_name = cap_string(&caps, 7);
            self.normal_units.push(unit);
        }
        self.scan_debug(cursor);
    }

    fn scan_romram_srecord_binfile(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_ROMRAM_SRECORD_BINFILE) {
            let mut unit = MemoryMapNormalUnit::new(
                cap_string(&caps, 1),
                cap_hex(&caps, 2),
                cap_hex(&caps, 3),
                cap_hex(&caps, 4),
            );
            unit.rom_address = cap_hex(&caps, 5);
            unit.ram_buffer_address = cap_hex(&caps, 6);
            unit.srecord_line = cap_dec(&caps, 7);
            unit.bin_file_offset = cap_hex(&caps, 8);
            unit.bin_file_name = cap_string(&caps, 9);
            self.normal_units.push(unit);
        }
        self.scan_debug(cursor);
    }

    fn scan_debug(&mut self, cursor: &mut Cursor<'_>) {
        while let Some(caps) = cursor.try_match(&RE_UNIT_DEBUG) {
            self.debug_units.push(MemoryMapDebugUnit {
                name: cap_string(&caps, 1),
                size: cap_hex(&caps, 2),
                file_offset: cap_hex(&caps, 3),
            });
        }
    }

    pub(crate) fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        write!(w, "\r\n\r\nMemory map:\r\n")?;
        *line_number += 3;
        if self.versions.min < Version::V4_2Build142 {
            if self.has_rom_ram {
                write!(
                    w,
                    "                   Starting Size     File     ROM      RAM Buffer\r\n                   address           Offset   Address  Address\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>15}  {:08x} {:08x} {:08x} {:08x} {:08x}\r\n",
                        unit.name,
                        unit.starting_address,
                        unit.size,
                        unit.file_offset,
                        unit.rom_address,
                        unit.ram_buffer_address
                    )?;
                    *line_number += 1;
                }
            } else {
                write!(
                    w,
                    "                   Starting Size     File\r\n                   address           Offset\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>15}  {:08x} {:08x} {:08x}\r\n",
                        unit.name, unit.starting_address, unit.size, unit.file_offset
                    )?;
                    *line_number += 1;
                }
            }
            let wide_size = self.versions.min >= Version::V3_0_4;
            for unit in &self.debug_units {
                if wide_size {
                    write!(
                        w,
                        "  {:>15}           {:08x} {:08x}\r\n",
                        unit.name, unit.size, unit.file_offset
                    )?;
                } else {
                    write!(
                        w,
                        "  {:>15}           {:06x} {:08x}\r\n",
                        unit.name, unit.size, unit.file_offset
                    )?;
                }
                *line_number += 1;
            }
        } else {
            self.print_new_era(w, line_number)?;
        }
        Ok(())
    }

    fn print_new_era<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        match (self.has_rom_ram, self.has_s_record, self.has_bin_file) {
            (false, false, false) => {
                write!(
                    w,
                    "                       Starting Size     File\r\n                       address           Offset\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>20} {:08x} {:08x} {:08x}\r\n",
                        unit.name, unit.starting_address, unit.size, unit.file_offset
                    )?;
                    *line_number += 1;
                }
            }
            (true, false, false) => {
                write!(
                    w,
                    "                       Starting Size     File     ROM      RAM Buffer\r\n                       address           Offset   Address  Address\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>20} {:08x} {:08x} {:08x} {:08x} {:08x}\r\n",
                        unit.name,
                        unit.starting_address,
                        unit.size,
                        unit.file_offset,
                        unit.rom_address,
                        unit.ram_buffer_address
                    )?;
                    *line_number += 1;
                }
            }
            (false, true, false) => {
                write!(
                    w,
                    "                       Starting Size     File       S-Record\r\n                       address           Offset     Line\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>20} {:08x} {:08x} {:08x} {:10}\r\n",
                        unit.name,
                        unit.starting_address,
                        unit.size,
                        unit.file_offset,
                        unit.srecord_line
                    )?;
                    *line_number += 1;
                }
            }
            (false, false, true) => {
                write!(
                    w,
                    "                       Starting Size     File     Bin File Bin File\r\n                       address           Offset   Offset   Name\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>20} {:08x} {:08x} {:08x} {:08x} {}\r\n",
                        unit.name,
                        unit.starting_address,
                        unit.size,
                        unit.file_offset,
                        unit.bin_file_offset,
                        unit.bin_file_name
                    )?;
                    *line_number += 1;
                }
            }
            (true, true, false) => {
                write!(
                    w,
                    "                       Starting Size     File     ROM      RAM Buffer  S-Record\r\n                       address           Offset   Address  Address     Line\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>20} {:08x} {:08x} {:08x} {:08x} {:08x} {:10}\r\n",
                        unit.name,
                        unit.starting_address,
                        unit.size,
                        unit.file_offset,
                        unit.rom_address,
                        unit.ram_buffer_address,
                        unit.srecord_line
                    )?;
                    *line_number += 1;
                }
            }
            (true, false, true) => {
                write!(
                    w,
                    "                       Starting Size     File     ROM      RAM Buffer Bin File Bin File\r\n                       address           Offset   Address  Address    Offset   Name\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>20} {:08x} {:08x} {:08x} {:08x} {:08x}   {:08x} {}\r\n",
                        unit.name,
                        unit.starting_address,
                        unit.size,
                        unit.file_offset,
                        unit.rom_address,
                        unit.ram_buffer_address,
                        unit.bin_file_offset,
                        unit.bin_file_name
                    )?;
                    *line_number += 1;
                }
            }
            (false, true, true) => {
                write!(
                    w,
                    "                       Starting Size     File        S-Record Bin File Bin File\r\n                       address           Offset      Line     Offset   Name\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>20} {:08x} {:08x} {:08x}  {:10} {:08x} {}\r\n",
                        unit.name,
                        unit.starting_address,
                        unit.size,
                        unit.file_offset,
                        unit.srecord_line,
                        unit.bin_file_offset,
                        unit.bin_file_name
                    )?;
                    *line_number += 1;
                }
            }
            (true, true, true) => {
                write!(
                    w,
                    "                       Starting Size     File     ROM      RAM Buffer    S-Record Bin File Bin File\r\n                       address           Offset   Address  Address       Line     Offset   Name\r\n"
                )?;
                *line_number += 2;
                for unit in &self.normal_units {
                    write!(
                        w,
                        "  {:>20} {:08x} {:08x} {:08x} {:08x} {:08x}    {:10} {:08x} {}\r\n",
                        unit.name,
                        unit.starting_address,
                        unit.size,
                        unit.file_offset,
                        unit.rom_address,
                        unit.ram_buffer_address,
                        unit.srecord_line,
                        unit.bin_file_offset,
                        unit.bin_file_name
                    )?;
                    *line_number += 1;
                }
            }
        }
        for unit in &self.debug_units {
            write!(
                w,
                "  {:>20}          {:08x} {:08x}\r\n",
                unit.name, unit.size, unit.file_offset
            )?;
            *line_number += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn romram_dialect_populates_all_six_columns() {
        let mut cursor = Cursor::new(
            b"                       Starting Size     File     ROM      RAM Buffer\r\n\
              \x20                      address           Offset   Address  Address\r\n\
              \x20            .init 80003100 00000200 00000100 80003100 00000000\r\n\
              \x20          .debug_info          00004000 00010000\r\n",
        );
        let map = MemoryMap::scan_with_prologue(&mut cursor).unwrap();
        assert!(cursor.rest().is_empty());
        assert!(map.has_rom_ram && !map.has_s_record && !map.has_bin_file);
        let unit = &map.normal_units[0];
        assert_eq!(unit.name, ".init");
        assert_eq!(unit.starting_address, 0x8000_3100);
        assert_eq!(unit.rom_address, 0x8000_3100);
        assert_eq!(unit.ram_buffer_address, 0);
        assert_eq!(map.debug_units.len(), 1);
        assert_eq!(map.versions.min, Version::V4_2Build142);
    }

    #[test]
    fn old_era_debug_width_lifts_min_version() {
        let mut cursor = Cursor::new(
            b"                   Starting Size     File\r\n\
              \x20                  address           Offset\r\n\
              \x20           .text  80003100 00000200 00000100\r\n\
              \x20          .debug           00004000 00010000\r\n",
        );
        let map = MemoryMap::scan_with_prologue(&mut cursor).unwrap();
        assert!(cursor.rest().is_empty());
        assert_eq!(map.versions.min, Version::V3_0_4);
        assert_eq!(map.versions.max, Version::V4_2Build60320);
    }

    #[test]
    fn old_era_six_digit_debug_stays_old() {
        let mut cursor = Cursor::new(
            b"                   Starting Size     File\r\n\
              \x20                  address           Offset\r\n\
              \x20          .debug           004000 00010000\r\n",
        );
        let map = MemoryMap::scan_with_prologue(&mut cursor).unwrap();
        assert_eq!(map.versions.min, Version::Unknown);
    }

    #[test]
    fn unknown_prologue_is_fatal() {
        let mut cursor = Cursor::new(b"  Starting        Virtual\r\n");
        let err = MemoryMap::scan_with_prologue(&mut cursor).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::MemoryMapBadPrologue);
        assert_eq!(err.line_number, 1);
    }

    #[test]
    fn srecord_binfile_round_trips() {
        let input: &[u8] =
            b"                       Starting Size     File        S-Record Bin File Bin File\r\n\
              \x20                      address           Offset      Line     Offset   Name\r\n\
              \x20                .text 80003100 00000200 00000100           3 00000000 main.bin\r\n\
              \x20          .debug_info          00004000 00010000\r\n";
        let mut cursor = Cursor::new(input);
        let map = MemoryMap::scan_with_prologue(&mut cursor).unwrap();
        assert!(cursor.rest().is_empty());
        assert_eq!(map.normal_units[0].srecord_line, 3);
        assert_eq!(map.normal_units[0].bin_file_name, "main.bin");
        let mut out = Vec::new();
        let mut line_number = 1;
        map.print(&mut out, &mut line_number).unwrap();
        let mut expected = b"\r\n\r\nMemory map:\r\n".to_vec();
        expected.extend_from_slice(input);
        assert_eq!(out, expected);
    }
}
