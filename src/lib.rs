//! A scanner, model, and byte-exact printer for the textual linker maps
//! produced by the Metrowerks linker (MWLD/MWLDEPPC) for PowerPC
//! GameCube/Wii targets.
//!
//! Metrowerks linker maps should be considered binary files containing
//! text with CRLF line endings; to account for outside factors this crate
//! also supports LF, including mixed endings within one file. A map is a
//! concatenation of heterogeneous portions whose layouts drifted across
//! roughly fifteen compiler releases, so scanning is as much dialect
//! discrimination as parsing: every accepted quirk narrows the range of
//! linker versions that could have produced the input.
//!
//! The three entry points are [`Map::scan`] for standard maps,
//! [`Map::scan_tloztp`] for the stripped Twilight Princess shape, and
//! [`Map::scan_smgalaxy`] for the Super Mario Galaxy shape. For every
//! well-formed input, [`Map::print`] re-emits the scanned bytes exactly
//! (NUL-padded tails excepted).
//!
//! ```
//! use mwmap::{Map, WarningConfig};
//!
//! let input = b"Link map of __start\r\n  1] __start (func,global) found in os.o kernel.a\r\n";
//! let (map, lines_scanned) = Map::scan(input, &WarningConfig::default()).unwrap();
//! assert_eq!(map.entry_point_name, "__start");
//!
//! let mut out = Vec::new();
//! let lines_printed = map.print(&mut out).unwrap();
//! assert_eq!(out, input);
//! assert_eq!(lines_printed, lines_scanned);
//! ```

/// The symbol closure portions.
pub mod closure;
mod cursor;
/// Scan errors.
pub mod error;
/// The linker-generated-symbols portion.
pub mod generated_symbols;
/// Branch islands and mixed-mode islands.
pub mod islands;
/// The LinkerOpts portion.
pub mod linker_opts;
/// The top-level map model and scan entry points.
pub mod map;
/// The memory-map portion and its ten dialects.
pub mod memory_map;
/// The EPPC_PatternMatching portion.
pub mod pattern_matching;
/// Section layout portions.
pub mod section_layout;
/// The link-time size-optimization marker portions.
pub mod size_opts;
/// Symbol type and binding tables.
pub mod symbol;
/// Known linker releases and version-range arithmetic.
pub mod version;
/// Diagnostic warning channels.
pub mod warn;

pub use crate::error::{ScanError, ScanErrorKind};
pub use crate::map::Map;
pub use crate::symbol::{SymbolBind, SymbolType};
pub use crate::version::{Version, VersionRange};
pub use crate::warn::WarningConfig;

/// The name a symbol's compilation unit goes by in diagnostics: the source
/// name when one was printed, else the module name.
pub(crate) fn compilation_unit_name<'a>(module_name: &'a str, source_name: &'a str) -> &'a str {
    if source_name.is_empty() {
        module_name
    } else {
        source_name
    }
}
