//! The top-level map model and the three scan entry points.
//!
//! A linker map is a concatenation of portions, each with its own header
//! and grammar. The standard entry expects the full arrangement starting
//! at `Link map of ...`; two alternate entries handle maps that shipped
//! post-processed on retail discs (Twilight Princess and Super Mario
//! Galaxy). Whatever scanned in is re-emitted byte-identically by
//! [`Map::print`].

use std::io::{self, Write};

use log::debug;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::closure::SymbolClosure;
use crate::cursor::{Cursor, cap_string, pattern};
use crate::error::{ScanError, ScanErrorKind};
use crate::generated_symbols::LinkerGeneratedSymbols;
use crate::islands::{BranchIslands, MixedModeIslands};
use crate::linker_opts::LinkerOpts;
use crate::memory_map::MemoryMap;
use crate::pattern_matching::EppcPatternMatching;
use crate::section_layout::{SectionKind, SectionLayout};
use crate::size_opts::{SizeDecreasingOptimizations, SizeIncreasingOptimizations};
use crate::version::{Version, VersionRange};
use crate::warn::WarningConfig;

// "Link map of %s\r\n"
static RE_ENTRY_POINT: Lazy<Regex> = Lazy::new(|| pattern(r"\ALink map of ([^\r\n]*)\r?\n"));
// "\r\nMixed Mode Islands\r\n"
static RE_MIXED_MODE_ISLANDS_HEADER: Lazy<Regex> =
    Lazy::new(|| pattern("\\A\r?\nMixed Mode Islands\r?\n"));
// "\r\nBranch Islands\r\n"
static RE_BRANCH_ISLANDS_HEADER: Lazy<Regex> =
    Lazy::new(|| pattern("\\A\r?\nBranch Islands\r?\n"));
// "\r\nLinktime size-decreasing optimizations\r\n"
static RE_SIZE_DECREASING_HEADER: Lazy<Regex> =
    Lazy::new(|| pattern("\\A\r?\nLinktime size-decreasing optimizations\r?\n"));
// "\r\nLinktime size-increasing optimizations\r\n"
static RE_SIZE_INCREASING_HEADER: Lazy<Regex> =
    Lazy::new(|| pattern("\\A\r?\nLinktime size-increasing optimizations\r?\n"));
// "\r\n\r\n%s section layout\r\n"
static RE_SECTION_LAYOUT_HEADER: Lazy<Regex> =
    Lazy::new(|| pattern("\\A\r?\n\r?\n([^\r\n]*) section layout\r?\n"));
// The same header with one or zero preceding newlines, as left behind by
// Nintendo EAD's map-stripping scripts.
static RE_SECTION_LAYOUT_HEADER_TRIMMED: Lazy<Regex> =
    Lazy::new(|| pattern("\\A\r?\n([^\r\n]*) section layout\r?\n"));
static RE_SECTION_LAYOUT_HEADER_BARE: Lazy<Regex> =
    Lazy::new(|| pattern("\\A([^\r\n]*) section layout\r?\n"));
// "\r\n\r\nMemory map:\r\n"
static RE_MEMORY_MAP_HEADER: Lazy<Regex> = Lazy::new(|| pattern("\\A\r?\n\r?\nMemory map:\r?\n"));
// "\r\n\r\nLinker generated symbols:\r\n"
static RE_LINKER_GENERATED_SYMBOLS_HEADER: Lazy<Regex> =
    Lazy::new(|| pattern("\\A\r?\n\r?\nLinker generated symbols:\r?\n"));

// Diagnostic prints known to exist in MWLDEPPC but never attested in a
// complete map. Recognizing them beats calling them garbage.
static UNIMPLEMENTED_PRINTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        pattern(
            r"\A>>> EXCLUDED SYMBOL ([^\r\n]*) \(([^\r\n]*),([^\r\n]*)\) found in ([^\r\n]*) ([^\r\n]*)\r\n",
        ),
        pattern(r"\A>>> ([^\r\n]*) wasn't passed a section\r\n"),
        pattern(r"\A>>> DYNAMIC SYMBOL: ([^\r\n]*) referenced\r\n"),
        pattern(r"\A>>> MODULE SYMBOL NAME TOO LARGE: ([^\r\n]*)\r\n"),
        pattern(r"\A>>> NONMODULE SYMBOL NAME TOO LARGE: ([^\r\n]*)\r\n"),
        pattern(
            r"\A<<< Failure in ComputeSizeETI: section->Header->sh_size was ([0-9a-f]+), rel_size should be ([0-9a-f]+)\r\n",
        ),
        pattern(
            r"\A<<< Failure in ComputeSizeETI: st_size was ([0-9a-f]+), st_size should be ([0-9a-f]+)\r\n",
        ),
        pattern(
            r"\A<<< Failure in PreCalculateETI: section->Header->sh_size was ([0-9a-f]+), rel_size should be ([0-9a-f]+)\r\n",
        ),
        pattern(
            r"\A<<< Failure in PreCalculateETI: st_size was ([0-9a-f]+), st_size should be ([0-9a-f]+)\r\n",
        ),
        pattern(
            r"\A<<< Failure in ([^\r\n]*): GetFilePos is ([0-9a-f]+), sect->calc_offset is ([0-9a-f]+)\r\n",
        ),
        pattern(
            r"\A<<< Failure in ([^\r\n]*): GetFilePos is ([0-9a-f]+), sect->bin_offset is ([0-9a-f]+)\r\n",
        ),
    ]
});

/// A fully scanned linker map. Portions keep the canonical order the
/// linker writes them in; section layouts keep their order of appearance.
#[derive(Debug, Default)]
pub struct Map {
    /// From the `Link map of X` header; empty when the input had none.
    pub entry_point_name: String,
    pub normal_symbol_closure: Option<SymbolClosure>,
    pub eppc_pattern_matching: Option<EppcPatternMatching>,
    /// A second closure over the `.dwarf`/`.debug` sections, emitted under
    /// `-listdwarf`.
    pub dwarf_symbol_closure: Option<SymbolClosure>,
    /// `>>> SYMBOL NOT FOUND:` prints with the line each appeared on.
    /// Their placement varies by era; the recorded line numbers let the
    /// printer replay any arrangement.
    pub unresolved_symbols: Vec<(usize, String)>,
    pub linker_opts: Option<LinkerOpts>,
    pub mixed_mode_islands: Option<MixedModeIslands>,
    pub branch_islands: Option<BranchIslands>,
    pub size_decreasing_opts: Option<SizeDecreasingOptimizations>,
    pub size_increasing_opts: Option<SizeIncreasingOptimizations>,
    pub section_layouts: Vec<SectionLayout>,
    pub memory_map: Option<MemoryMap>,
    pub linker_generated_symbols: Option<LinkerGeneratedSymbols>,
}

impl Map {
    /// Scans a standard linker map. On success returns the map and the
    /// one-origin line counter after the last consumed line.
    pub fn scan(input: &[u8], config: &WarningConfig) -> Result<(Map, usize), ScanError> {
        if input.is_empty() {
            return Err(ScanError::new(ScanErrorKind::Fail, 1));
        }
        let mut cursor = Cursor::new(input);
        let mut map = Map::default();

        // Maps from Animal Crossing and both Doubutsu no Mori rereleases
        // were stripped down to their section layouts, losing either one
        // or both of the header's preceding newlines in the process. The
        // same treatment shows up in Ocarina of Time & Master Quest and
        // The Wind Waker (framework.map).
        if let Some(caps) = cursor.try_match(&RE_SECTION_LAYOUT_HEADER_TRIMMED) {
            let name = cap_string(&caps, 1);
            debug!("trimmed section layout at start: {name}");
            map.section_layouts
                .push(SectionLayout::scan_with_prologue(&mut cursor, &name, config)?);
        } else if let Some(caps) = cursor.try_match(&RE_SECTION_LAYOUT_HEADER_BARE) {
            let name = cap_string(&caps, 1);
            debug!("bare section layout at start: {name}");
            map.section_layouts
                .push(SectionLayout::scan_with_prologue(&mut cursor, &name, config)?);
        } else if let Some(caps) = cursor.try_match(&RE_ENTRY_POINT) {
            map.entry_point_name = cap_string(&caps, 1);
            debug!("entry point: {}", map.entry_point_name);

            let portion = SymbolClosure::scan(&mut cursor, &mut map.unresolved_symbols, config)?;
            if !portion.is_empty() {
                map.normal_symbol_closure = Some(portion);
            }
            let portion = EppcPatternMatching::scan(&mut cursor, config)?;
            if !portion.is_empty() {
                map.eppc_pattern_matching = Some(portion);
            }
            // With '-listdwarf' and DWARF debugging information enabled, a
            // second symbol closure covering the .dwarf and .debug sections
            // appears. Without an EPPC_PatternMatching in the middle it
            // blends into the first closure in the eyes of this scan.
            let mut portion = SymbolClosure::scan(&mut cursor, &mut map.unresolved_symbols, config)?;
            if !portion.is_empty() {
                portion.versions.narrow(Version::V3_0_4, Version::Latest);
                map.dwarf_symbol_closure = Some(portion);
            }
            // Unresolved-symbol post-prints land here; the closure scan
            // above already collected them.
            let portion = LinkerOpts::scan(&mut cursor);
            if !portion.is_empty() {
                map.linker_opts = Some(portion);
            }
            if cursor.try_match(&RE_MIXED_MODE_ISLANDS_HEADER).is_some() {
                map.mixed_mode_islands = Some(MixedModeIslands::scan(&mut cursor));
            }
            if cursor.try_match(&RE_BRANCH_ISLANDS_HEADER).is_some() {
                map.branch_islands = Some(BranchIslands::scan(&mut cursor));
            }
            if cursor.try_match(&RE_SIZE_DECREASING_HEADER).is_some() {
                map.size_decreasing_opts = Some(SizeDecreasingOptimizations::default());
            }
            if cursor.try_match(&RE_SIZE_INCREASING_HEADER).is_some() {
                map.size_increasing_opts = Some(SizeIncreasingOptimizations::default());
            }
        } else {
            // Without this header the input is not a Metrowerks linker map.
            return Err(ScanError::new(
                ScanErrorKind::EntryPointNameMissing,
                cursor.line_number(),
            ));
        }

        while let Some(caps) = cursor.try_match(&RE_SECTION_LAYOUT_HEADER) {
            let name = cap_string(&caps, 1);
            map.section_layouts
                .push(SectionLayout::scan_with_prologue(&mut cursor, &name, config)?);
        }
        if cursor.try_match(&RE_MEMORY_MAP_HEADER).is_some() {
            map.memory_map = Some(MemoryMap::scan_with_prologue(&mut cursor)?);
        }
        if cursor.try_match(&RE_LINKER_GENERATED_SYMBOLS_HEADER).is_some() {
            map.linker_generated_symbols = Some(LinkerGeneratedSymbols::scan(&mut cursor));
        }
        scan_for_garbage(&cursor)?;
        Ok((map, cursor.line_number()))
    }

    /// Scans a Twilight Princess map: one or more prologue-free
    /// three-column section layouts with LF line endings and nothing else.
    /// Nintendo EAD post-processed CW for GCN 2.7 maps into this shape,
    /// probably to put off updating the JUTException library.
    pub fn scan_tloztp(input: &[u8], config: &WarningConfig) -> Result<(Map, usize), ScanError> {
        if input.is_empty() {
            return Err(ScanError::new(ScanErrorKind::Fail, 1));
        }
        let mut cursor = Cursor::new(input);
        let mut map = Map {
            entry_point_name: "__start".to_owned(),
            ..Map::default()
        };

        while let Some(caps) = cursor.try_match(&RE_SECTION_LAYOUT_HEADER_BARE) {
            let name = cap_string(&caps, 1);
            let mut layout = SectionLayout::new(SectionKind::from_section_name(&name), &name);
            layout.versions.narrow(Version::V3_0_4, Version::V3_0_4);
            layout.scan_tloztp(&mut cursor, config)?;
            map.section_layouts.push(layout);
        }
        scan_for_garbage(&cursor)?;
        Ok((map, cursor.line_number()))
    }

    /// Scans a Super Mario Galaxy map: one single-newline section layout
    /// header with every symbol mashed into an imaginary `.text`, followed
    /// by a tiny headerless memory map in the simple new dialect.
    pub fn scan_smgalaxy(input: &[u8], config: &WarningConfig) -> Result<(Map, usize), ScanError> {
        if input.is_empty() {
            return Err(ScanError::new(ScanErrorKind::Fail, 1));
        }
        let mut cursor = Cursor::new(input);
        let mut map = Map::default();

        let line_number = cursor.line_number();
        if let Some(caps) = cursor.try_match(&RE_SECTION_LAYOUT_HEADER_TRIMMED) {
            let name = cap_string(&caps, 1);
            let mut layout = SectionLayout::new(SectionKind::Code, &name);
            layout.versions.narrow(Version::V3_0_4, Version::Latest);
            layout.scan_4column(&mut cursor, config)?;
            map.section_layouts.push(layout);
        } else {
            return Err(ScanError::new(
                ScanErrorKind::SmGalaxyYouHadOneJob,
                line_number,
            ));
        }
        // It looks like a mistake, but a tiny bit of headerless CW for Wii
        // 1.0 (at minimum) memory map can follow.
        let mut portion = MemoryMap::new(false, false, false);
        portion.scan_simple(&mut cursor);
        if !portion.is_empty() {
            map.memory_map = Some(portion);
        }
        scan_for_garbage(&cursor)?;
        Ok((map, cursor.line_number()))
    }

    /// Re-emits the map byte-for-byte, CRLF endings throughout. Returns
    /// the line counter after the last emitted line, for parity with the
    /// counter [`Map::scan`] returns.
    pub fn print<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        write!(w, "Link map of {}\r\n", self.entry_point_name)?;
        let mut line_number = 2usize;
        let mut next_unresolved = 0usize;
        if let Some(portion) = &self.normal_symbol_closure {
            portion.print(
                w,
                &self.unresolved_symbols,
                &mut next_unresolved,
                &mut line_number,
            )?;
        }
        if let Some(portion) = &self.eppc_pattern_matching {
            portion.print(w, &mut line_number)?;
        }
        if let Some(portion) = &self.dwarf_symbol_closure {
            portion.print(
                w,
                &self.unresolved_symbols,
                &mut next_unresolved,
                &mut line_number,
            )?;
        }
        // Post-print unresolved symbols, which also covers maps with no
        // symbol closures at all.
        print_unresolved(
            w,
            &self.unresolved_symbols,
            &mut next_unresolved,
            &mut line_number,
        )?;
        if let Some(portion) = &self.linker_opts {
            portion.print(w, &mut line_number)?;
        }
        if let Some(portion) = &self.mixed_mode_islands {
            portion.print(w, &mut line_number)?;
        }
        if let Some(portion) = &self.branch_islands {
            portion.print(w, &mut line_number)?;
        }
        if let Some(portion) = &self.size_decreasing_opts {
            portion.print(w, &mut line_number)?;
        }
        if let Some(portion) = &self.size_increasing_opts {
            portion.print(w, &mut line_number)?;
        }
        for layout in &self.section_layouts {
            layout.print(w, &mut line_number)?;
        }
        if let Some(portion) = &self.memory_map {
            portion.print(w, &mut line_number)?;
        }
        if let Some(portion) = &self.linker_generated_symbols {
            portion.print(w, &mut line_number)?;
        }
        Ok(line_number)
    }

    /// The oldest linker consistent with every formatting clue seen.
    pub fn min_version(&self) -> Version {
        self.portion_ranges()
            .map(|range| range.min)
            .max()
            .unwrap_or(Version::Unknown)
    }

    /// The newest linker consistent with every formatting clue seen.
    pub fn max_version(&self) -> Version {
        self.portion_ranges()
            .map(|range| range.max)
            .min()
            .unwrap_or(Version::Latest)
    }

    fn portion_ranges(&self) -> impl Iterator<Item = &VersionRange> {
        [
            self.normal_symbol_closure.as_ref().map(|p| &p.versions),
            self.eppc_pattern_matching.as_ref().map(|p| &p.versions),
            self.dwarf_symbol_closure.as_ref().map(|p| &p.versions),
            self.linker_opts.as_ref().map(|p| &p.versions),
            self.mixed_mode_islands.as_ref().map(|p| &p.versions),
            self.branch_islands.as_ref().map(|p| &p.versions),
            self.size_decreasing_opts.as_ref().map(|p| &p.versions),
            self.size_increasing_opts.as_ref().map(|p| &p.versions),
            self.memory_map.as_ref().map(|p| &p.versions),
            self.linker_generated_symbols.as_ref().map(|p| &p.versions),
        ]
        .into_iter()
        .flatten()
        .chain(self.section_layouts.iter().map(|layout| &layout.versions))
    }
}

/// Emits every recorded unresolved symbol whose line number has come due.
pub(crate) fn print_unresolved<W: Write>(
    w: &mut W,
    unresolved_symbols: &[(usize, String)],
    next_unresolved: &mut usize,
    line_number: &mut usize,
) -> io::Result<()> {
    while let Some((line, name)) = unresolved_symbols.get(*next_unresolved) {
        if *line != *line_number {
            break;
        }
        write!(w, ">>> SYMBOL NOT FOUND: {name}\r\n")?;
        *next_unresolved += 1;
        *line_number += 1;
    }
    Ok(())
}

fn scan_for_garbage(cursor: &Cursor<'_>) -> Result<(), ScanError> {
    let rest = cursor.rest();
    if rest.is_empty() {
        return Ok(());
    }
    if UNIMPLEMENTED_PRINTS.iter().any(|re| re.is_match(rest)) {
        return Err(ScanError::new(
            ScanErrorKind::Unimplemented,
            cursor.line_number(),
        ));
    }
    // Gamecube ISO Tool appends NUL padding up to the next multiple of 32
    // bytes to every file it extracts; enough afflicted maps exist to
    // warrant tolerating an all-NUL tail.
    if rest.iter().any(|&b| b != b'\0') {
        return Err(ScanError::new(
            ScanErrorKind::GarbageFound,
            cursor.line_number(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_fails() {
        let err = Map::scan(b"", &WarningConfig::silent()).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::Fail);
    }

    #[test]
    fn missing_link_map_header_is_fatal() {
        let err = Map::scan(b"hello world\r\n", &WarningConfig::silent()).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::EntryPointNameMissing);
        assert_eq!(err.line_number, 1);
    }

    #[test]
    fn bare_header_alone_scans() {
        let (map, line_number) =
            Map::scan(b"Link map of __start\r\n", &WarningConfig::silent()).unwrap();
        assert_eq!(map.entry_point_name, "__start");
        assert!(map.normal_symbol_closure.is_none());
        assert_eq!(line_number, 2);
    }

    #[test]
    fn nul_padding_is_tolerated_garbage_is_not() {
        let mut padded = b"Link map of __start\r\n".to_vec();
        padded.extend_from_slice(&[0u8; 11]);
        assert!(Map::scan(&padded, &WarningConfig::silent()).is_ok());

        padded.push(b'x');
        let err = Map::scan(&padded, &WarningConfig::silent()).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::GarbageFound);
    }

    #[test]
    fn known_diagnostic_prints_are_unimplemented_not_garbage() {
        let mut input = b"Link map of __start\r\n".to_vec();
        input.extend_from_slice(b">>> DYNAMIC SYMBOL: OSReport referenced\r\n");
        let err = Map::scan(&input, &WarningConfig::silent()).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::Unimplemented);
        assert_eq!(err.line_number, 2);
    }

    #[test]
    fn smgalaxy_without_layout_had_one_job() {
        let err = Map::scan_smgalaxy(b"Memory map:\r\n", &WarningConfig::silent()).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::SmGalaxyYouHadOneJob);
    }
}
