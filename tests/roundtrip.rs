//! End-to-end scan/print round trips over hand-written linker maps.

use mwmap::error::ScanErrorKind;
use mwmap::section_layout::{SectionKind, UnitKind, UnitTrait};
use mwmap::version::Version;
use mwmap::{Map, WarningConfig};

fn init_logging() {
    let _ = stderrlog::new().verbosity(2).init();
}

/// Scans `input`, asserts print reproduces it byte-for-byte with matching
/// line counters, and hands back the map for further poking.
fn roundtrip(input: &[u8]) -> Map {
    init_logging();
    let (map, lines_scanned) = Map::scan(input, &WarningConfig::default()).unwrap();
    let mut out = Vec::new();
    let lines_printed = map.print(&mut out).unwrap();
    assert_eq!(out, input, "print(scan(x)) must reproduce x");
    assert_eq!(lines_printed, lines_scanned, "line counters must agree");
    map
}

const MINIMAL_3COLUMN: &str = concat!(
    "Link map of __start\r\n",
    "\r\n\r\n.text section layout\r\n",
    "  Starting        Virtual\r\n",
    "  address  Size   address\r\n",
    "  -----------------------\r\n",
    "  00000000 000010 80003100  4 foo \tobj.o lib.a\r\n",
);

#[test]
fn minimal_closure_plus_3column_layout() {
    let map = roundtrip(MINIMAL_3COLUMN.as_bytes());
    assert_eq!(map.entry_point_name, "__start");
    assert_eq!(map.section_layouts.len(), 1);
    let layout = &map.section_layouts[0];
    assert_eq!(layout.name, ".text");
    assert_eq!(layout.kind, SectionKind::Code);
    let unit = &layout.units[0];
    assert_eq!(unit.kind, UnitKind::Normal);
    assert_eq!(unit.starting_address, 0);
    assert_eq!(unit.size, 0x10);
    assert_eq!(unit.virtual_address, 0x8000_3100);
    assert_eq!(unit.alignment, 4);
    assert_eq!(unit.name, "foo");
    assert_eq!(unit.module_name, "obj.o");
    assert_eq!(unit.source_name, "lib.a");
    assert_eq!(map.min_version(), Version::Unknown);
    assert_eq!(map.max_version(), Version::V2_4_7Build107);
}

#[test]
fn unreferenced_duplicates_lift_min_version() {
    let input = concat!(
        "Link map of __start\r\n",
        "  1] foo (func,global) found in obj.o lib.a\r\n",
        "  1] >>> UNREFERENCED DUPLICATE foo\r\n",
        "  1] >>> (func,global) found in other.o lib.a\r\n",
    );
    let map = roundtrip(input.as_bytes());
    assert!(map.min_version() >= Version::V2_3_3Build137);
}

#[test]
fn entry_symbol_resolves_to_its_parent() {
    let input = concat!(
        "Link map of __start\r\n",
        "\r\n\r\n.text section layout\r\n",
        "  Starting        Virtual  File\r\n",
        "  address  Size   address  offset\r\n",
        "  ---------------------------------\r\n",
        "  00000000 000010 80003100 00000100  4 bar \to.o l.a\r\n",
        "  00000010 000004 80003110 00000110    bar_entry (entry of bar) \to.o l.a\r\n",
    );
    let map = roundtrip(input.as_bytes());
    let layout = &map.section_layouts[0];
    let entry = &layout.units[1];
    assert_eq!(entry.kind, UnitKind::Entry);
    assert_eq!(entry.name, "bar_entry");
    assert_eq!(entry.entry_parent, Some(0));
    assert_eq!(layout.units[0].name, "bar");
    assert_eq!(layout.units[0].entry_children, vec![1]);
    assert!(map.min_version() >= Version::V3_0_4);
}

#[test]
fn memory_map_dialect_discrimination() {
    let input = concat!(
        "Link map of __start\r\n",
        "\r\n\r\nMemory map:\r\n",
        "                       Starting Size     File     ROM      RAM Buffer\r\n",
        "                       address           Offset   Address  Address\r\n",
        "                 .init 80003100 00000200 00000100 80003100 00000000\r\n",
        "           .debug_info          00004000 00010000\r\n",
    );
    let map = roundtrip(input.as_bytes());
    let memory_map = map.memory_map.as_ref().unwrap();
    assert!(memory_map.has_rom_ram);
    assert!(!memory_map.has_s_record);
    assert!(!memory_map.has_bin_file);
    let unit = &memory_map.normal_units[0];
    assert_eq!(unit.name, ".init");
    assert_eq!(unit.starting_address, 0x8000_3100);
    assert_eq!(unit.size, 0x200);
    assert_eq!(unit.file_offset, 0x100);
    assert_eq!(unit.rom_address, 0x8000_3100);
    assert_eq!(unit.ram_buffer_address, 0);
    assert_eq!(memory_map.debug_units[0].name, ".debug_info");
}

#[test]
fn nul_padding_scans_single_garbage_byte_does_not() {
    init_logging();
    for pad in 1..32usize {
        let mut padded = MINIMAL_3COLUMN.as_bytes().to_vec();
        padded.extend(std::iter::repeat_n(0u8, pad));
        let (map, _) = Map::scan(&padded, &WarningConfig::default()).unwrap();
        // The padding is not part of the map; print gives back the map
        // without it.
        let mut out = Vec::new();
        map.print(&mut out).unwrap();
        assert_eq!(out, MINIMAL_3COLUMN.as_bytes());
    }
    let mut garbage = MINIMAL_3COLUMN.as_bytes().to_vec();
    garbage.push(b'x');
    let err = Map::scan(&garbage, &WarningConfig::default()).unwrap_err();
    assert_eq!(err.kind, ScanErrorKind::GarbageFound);
}

/// One map exercising every portion at once. The byte-for-byte round trip
/// plus line-counter parity is the strongest property the crate offers.
const KITCHEN_SINK: &str = concat!(
    "Link map of __start\r\n",
    "  1] __start (func,global) found in os.o kernel.a\r\n",
    "   2] main (func,global) found in main.o \r\n",
    "  1] foo (func,global) found in obj.o lib.a\r\n",
    "  1] >>> UNREFERENCED DUPLICATE foo\r\n",
    "  1] >>> (func,global) found in other.o lib.a\r\n",
    ">>> SYMBOL NOT FOUND: OSPanic\r\n",
    "--> duplicated code: symbol __save_gpr is duplicated by __restore_gpr, size = 48 \r\n",
    "\r\n",
    "--> the function __save_gpr will be replaced by a branch to __restore_gpr\r\n",
    "\r\n\r\n",
    "\r\n\r\n\r\nCode folded in file: dup.o \r\n",
    "--> __save_gpr is duplicated by __restore_gpr, size = 48 \r\n",
    "\r\n",
    "  main.o/ main()/ gHeap - address not in near addressing range \r\n",
    "\r\nMixed Mode Islands\r\n",
    "\r\nBranch Islands\r\n",
    "  branch island _bi_0 created for far_func\r\n",
    "\r\nLinktime size-decreasing optimizations\r\n",
    "\r\nLinktime size-increasing optimizations\r\n",
    "\r\n\r\n.text section layout\r\n",
    "  Starting        Virtual  File\r\n",
    "  address  Size   address  offset\r\n",
    "  ---------------------------------\r\n",
    "  00000000 000100 80003100 00000100  4 .text \tmain.o \r\n",
    "  00000000 000010 80003100 00000100  4 bar \to.o l.a\r\n",
    "  00000010 000004 80003110 00000110    bar_entry (entry of bar) \to.o l.a\r\n",
    "  00000014 000002 80003114 00000114  1 *fill*\r\n",
    "\r\n\r\n.bss section layout\r\n",
    "  Starting        Virtual  File\r\n",
    "  address  Size   address  offset\r\n",
    "  ---------------------------------\r\n",
    "  UNUSED   000018 ........ ........    unused_buf b.o \r\n",
    "\r\n\r\nMemory map:\r\n",
    "                       Starting Size     File\r\n",
    "                       address           Offset\r\n",
    "                 .text 80003100 00000200 00000100\r\n",
    "           .debug_info          00004000 00010000\r\n",
    "\r\n\r\nLinker generated symbols:\r\n",
    "              _stack_addr 80400000\r\n",
);

#[test]
fn kitchen_sink_round_trips() {
    let map = roundtrip(KITCHEN_SINK.as_bytes());
    assert!(map.normal_symbol_closure.is_some());
    assert!(map.eppc_pattern_matching.is_some());
    assert!(map.linker_opts.is_some());
    assert!(map.mixed_mode_islands.is_some());
    assert!(map.branch_islands.is_some());
    assert!(map.size_decreasing_opts.is_some());
    assert!(map.size_increasing_opts.is_some());
    assert_eq!(map.section_layouts.len(), 2);
    assert!(map.memory_map.is_some());
    assert!(map.linker_generated_symbols.is_some());
    assert_eq!(map.unresolved_symbols.len(), 1);
    // The portion floors intersect to the Wii-era linker.
    assert_eq!(map.min_version(), Version::V4_2Build142);
    assert_eq!(map.max_version(), Version::Latest);
}

#[test]
fn unresolved_symbols_replay_in_place() {
    // Pre-print (before any closure node), mid-print, and a post-print
    // block after the closure.
    let input = concat!(
        "Link map of __start\r\n",
        ">>> SYMBOL NOT FOUND: OSReport\r\n",
        "  1] __start (func,global) found in os.o kernel.a\r\n",
        ">>> SYMBOL NOT FOUND: OSPanic\r\n",
        "   2] main (func,global) found in main.o \r\n",
        ">>> SYMBOL NOT FOUND: exit\r\n",
        ">>> SYMBOL NOT FOUND: abort\r\n",
    );
    let map = roundtrip(input.as_bytes());
    assert_eq!(map.unresolved_symbols.len(), 4);
    assert_eq!(map.unresolved_symbols[0], (2, "OSReport".to_owned()));
    assert_eq!(map.unresolved_symbols[3], (7, "abort".to_owned()));
}

#[test]
fn lf_inputs_scan_but_print_crlf() {
    init_logging();
    let input = concat!(
        "Link map of __start\n",
        "\n\n.text section layout\n",
        "  Starting        Virtual\n",
        "  address  Size   address\n",
        "  -----------------------\n",
        "  00000000 000010 80003100  4 foo \tobj.o lib.a\n",
    );
    let (map, lines_scanned) = Map::scan(input.as_bytes(), &WarningConfig::default()).unwrap();
    assert_eq!(map.section_layouts[0].units.len(), 1);
    let mut out = Vec::new();
    let lines_printed = map.print(&mut out).unwrap();
    assert_eq!(lines_printed, lines_scanned);
    assert_eq!(out, MINIMAL_3COLUMN.as_bytes());
}

#[test]
fn dwarf_closure_narrows_its_own_range() {
    let input = concat!(
        "Link map of __start\r\n",
        "  1] main (func,global) found in main.o \r\n",
        "--> duplicated code: symbol a is duplicated by b, size = 8 \r\n",
        "\r\n",
        "\r\n\r\n\r\nCode folded in file: x.o \r\n",
        "--> a is duplicated by b, size = 8 \r\n",
        "\r\n",
        "  1] .debug (section,local) found in main.o \r\n",
    );
    let map = roundtrip(input.as_bytes());
    let dwarf = map.dwarf_symbol_closure.as_ref().unwrap();
    assert_eq!(dwarf.versions.min, Version::V3_0_4);
    assert_eq!(map.min_version(), Version::V4_2Build142);
}

#[test]
fn bss_traits_in_a_full_map() {
    let input = concat!(
        "Link map of __start\r\n",
        "\r\n\r\n.bss section layout\r\n",
        "  Starting        Virtual  File\r\n",
        "  address  Size   address  offset\r\n",
        "  ---------------------------------\r\n",
        "  00000000 000010 80400000 00000000  4 .bss \ta.o \r\n",
        "  00000010 000004 80400010 00000000  4 local_buf \ta.o \r\n",
        "  00000014 000008 80400014 00000000  4 shared_buf \tb.o \r\n",
    );
    let map = roundtrip(input.as_bytes());
    let layout = &map.section_layouts[0];
    assert_eq!(layout.units[0].unit_trait, UnitTrait::Section);
    assert_eq!(layout.units[1].unit_trait, UnitTrait::LCommon);
    assert_eq!(layout.units[2].unit_trait, UnitTrait::Common);
}
