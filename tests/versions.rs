//! Version-range inference across whole maps: every clue narrows, nothing
//! widens, and `min <= max` holds throughout.

use mwmap::version::Version;
use mwmap::{Map, WarningConfig};

fn scan(input: &str) -> Map {
    let (map, _) = Map::scan(input.as_bytes(), &WarningConfig::default()).unwrap();
    assert!(map.min_version() <= map.max_version());
    map
}

#[test]
fn bare_map_is_fully_open() {
    let map = scan("Link map of __start\r\n");
    assert_eq!(map.min_version(), Version::Unknown);
    assert_eq!(map.max_version(), Version::Latest);
}

#[test]
fn linker_opts_floor_the_wii_era() {
    let map = scan(concat!(
        "Link map of __start\r\n",
        "  main.o/ main()/ gHeap - address not in near addressing range \r\n",
    ));
    assert!(map.linker_opts.is_some());
    assert_eq!(map.min_version(), Version::V4_2Build142);
}

#[test]
fn old_era_memory_map_caps_the_max() {
    let map = scan(concat!(
        "Link map of __start\r\n",
        "\r\n\r\nMemory map:\r\n",
        "                   Starting Size     File\r\n",
        "                   address           Offset\r\n",
        "            .text  80003100 00000200 00000100\r\n",
        "           .debug           004000 00010000\r\n",
    ));
    assert_eq!(map.max_version(), Version::V4_2Build60320);
    assert_eq!(map.min_version(), Version::Unknown);
}

#[test]
fn wide_debug_size_narrows_within_the_old_era() {
    let map = scan(concat!(
        "Link map of __start\r\n",
        "\r\n\r\nMemory map:\r\n",
        "                   Starting Size     File\r\n",
        "                   address           Offset\r\n",
        "            .text  80003100 00000200 00000100\r\n",
        "           .debug           00004000 00010000\r\n",
    ));
    assert_eq!(map.min_version(), Version::V3_0_4);
    assert_eq!(map.max_version(), Version::V4_2Build60320);
}

#[test]
fn three_column_layout_caps_and_islands_floor_cannot_cross() {
    // A 3-column layout alone caps at CW for GCN 2.6.
    let map = scan(concat!(
        "Link map of __start\r\n",
        "\r\n\r\n.text section layout\r\n",
        "  Starting        Virtual\r\n",
        "  address  Size   address\r\n",
        "  -----------------------\r\n",
        "  00000000 000010 80003100  4 foo \tobj.o lib.a\r\n",
    ));
    assert_eq!(map.max_version(), Version::V2_4_7Build107);
    assert!(map.min_version() <= map.max_version());
}

#[test]
fn clues_accumulate_toward_the_tightest_bracket() {
    // Unref-dups say >= 1.1, the 4-column layout says >= 2.7, islands say
    // >= 3.0a3; the tightest floor wins.
    let map = scan(concat!(
        "Link map of __start\r\n",
        "  1] foo (func,global) found in obj.o lib.a\r\n",
        "  1] >>> UNREFERENCED DUPLICATE foo\r\n",
        "  1] >>> (func,global) found in other.o lib.a\r\n",
        "\r\nBranch Islands\r\n",
        "\r\n\r\n.text section layout\r\n",
        "  Starting        Virtual  File\r\n",
        "  address  Size   address  offset\r\n",
        "  ---------------------------------\r\n",
        "  00000000 000010 80003100 00000100  4 foo \tobj.o lib.a\r\n",
    ));
    assert_eq!(map.min_version(), Version::V4_1Build51213);
    assert_eq!(map.max_version(), Version::Latest);
}
