//! Scan errors.
//!
//! The first malformed line aborts the scan; the error carries the line
//! number at which the cursor stopped so callers can point at the input.

use thiserror::Error;

/// Everything that can go fatally wrong while scanning a linker map.
///
/// Warnings (ODR violations, linker-flag detections, and so on) are not
/// errors; they go through the [`log`] facade and never interrupt a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ScanErrorKind {
    /// The input buffer was empty.
    #[error("empty input buffer")]
    Fail,
    /// A diagnostic print known to exist in the wild but never attested in
    /// a full map, so there is no grammar to scan it with.
    #[error("recognized but unimplemented linker diagnostic print")]
    Unimplemented,
    /// Trailing bytes that are neither a known portion nor NUL padding.
    #[error("garbage found after the last portion")]
    GarbageFound,
    /// The `Link map of ...` header is missing; the input is not a
    /// Metrowerks linker map.
    #[error("entry point name missing")]
    EntryPointNameMissing,
    /// Super Mario Galaxy maps consist of exactly one section layout; this
    /// input does not even have that.
    #[error("no section layout header at start of input")]
    SmGalaxyYouHadOneJob,

    #[error("symbol closure hierarchy level skipped forward by more than one")]
    SymbolClosureHierarchySkip,
    #[error("symbol closure hierarchy level is not a positive integer")]
    SymbolClosureInvalidHierarchy,
    #[error("symbol closure symbol type is not in the known table")]
    SymbolClosureInvalidSymbolType,
    #[error("symbol closure symbol binding is not in the known table")]
    SymbolClosureInvalidSymbolBind,
    #[error("unreferenced duplicate at a different hierarchy level than its symbol")]
    SymbolClosureUnrefDupsHierarchyMismatch,
    #[error("unreferenced duplicate header names a different symbol")]
    SymbolClosureUnrefDupsNameMismatch,
    #[error("unreferenced duplicate header with no duplicates")]
    SymbolClosureUnrefDupsEmpty,

    #[error("code merging epilogue names a different first symbol")]
    EppcPatternMatchingMergingFirstNameMismatch,
    #[error("code merging epilogue names a different second symbol")]
    EppcPatternMatchingMergingSecondNameMismatch,
    #[error("code merging epilogue reports a different size")]
    EppcPatternMatchingMergingSizeMismatch,
    #[error("interchanged function without a duplicated-code epilogue")]
    EppcPatternMatchingMergingInterchangeMissingEpilogue,
    #[error("code folding new branch function names a different symbol")]
    EppcPatternMatchingFoldingNewBranchFunctionNameMismatch,

    #[error("section layout prologue is neither the 3-column nor the 4-column form")]
    SectionLayoutBadPrologue,
    #[error("entry symbol has no parent in the preceding units")]
    SectionLayoutOrphanedEntry,
    #[error("special symbol is not *fill* or **fill**")]
    SectionLayoutSpecialNotFill,

    #[error("memory map prologue matches none of the known dialects")]
    MemoryMapBadPrologue,
}

/// A fatal scan failure, located by the one-origin line number the scanner
/// had reached when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("line {line_number}: {kind}")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub line_number: usize,
}

impl ScanError {
    pub(crate) fn new(kind: ScanErrorKind, line_number: usize) -> Self {
        ScanError { kind, line_number }
    }
}
