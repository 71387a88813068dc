//! Diagnostic warning channels.
//!
//! Scanning a legal linker map can still surface facts worth flagging:
//! repeated compilation units, one-definition-rule violations, and column
//! patterns that betray linker flags like `-sym on` or `-common on`. None
//! of these affect the parsed model, so they are emitted through the
//! [`log`] facade rather than returned. Each category can be switched off
//! independently; the config is threaded by reference into the scan entry
//! points instead of living in process-wide state.

use log::warn;

/// Per-category toggles for scan-time diagnostics. Everything defaults on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningConfig {
    /// A closure symbol re-declared within one compilation unit.
    pub closure_odr_violation: bool,
    /// Multiple STT_SECTION symbols in one closure compilation unit.
    pub closure_sym_on_detected: bool,
    /// A merged function seen again in the merging report.
    pub merging_odr_violation: bool,
    /// The folding report visits the same object file twice.
    pub folding_repeat_object: bool,
    /// A folded function seen again within one object's report.
    pub folding_odr_violation: bool,
    /// Two compilation units with the same name in one section layout.
    pub layout_repeat_compilation_unit: bool,
    /// A layout symbol re-declared within one compilation unit.
    pub layout_odr_violation: bool,
    /// Multiple STT_SECTION symbols in one layout compilation unit.
    pub layout_sym_on_detected: bool,
    /// A BSS compilation unit that opens without its section symbol.
    pub layout_common_on_detected: bool,
    /// `.lcomm` symbols found after `.comm` symbols.
    pub layout_lcomm_after_comm: bool,
}

impl Default for WarningConfig {
    fn default() -> Self {
        WarningConfig {
            closure_odr_violation: true,
            closure_sym_on_detected: true,
            merging_odr_violation: true,
            folding_repeat_object: true,
            folding_odr_violation: true,
            layout_repeat_compilation_unit: true,
            layout_odr_violation: true,
            layout_sym_on_detected: true,
            layout_common_on_detected: true,
            layout_lcomm_after_comm: true,
        }
    }
}

impl WarningConfig {
    /// A config with every category muted.
    pub fn silent() -> Self {
        WarningConfig {
            closure_odr_violation: false,
            closure_sym_on_detected: false,
            merging_odr_violation: false,
            folding_repeat_object: false,
            folding_odr_violation: false,
            layout_repeat_compilation_unit: false,
            layout_odr_violation: false,
            layout_sym_on_detected: false,
            layout_common_on_detected: false,
            layout_lcomm_after_comm: false,
        }
    }

    // For legal linker maps, this should only ever happen in repeat-name
    // compilation units.
    pub(crate) fn closure_odr_violation(&self, line_number: usize, symbol: &str, unit: &str) {
        if self.closure_odr_violation {
            warn!("line {line_number}: \"{symbol}\" seen again in \"{unit}\"");
        }
    }

    // Code merging has no information about where a symbol came from, so
    // this can be a false positive.
    pub(crate) fn merging_odr_violation(&self, line_number: usize, symbol: &str) {
        if self.merging_odr_violation {
            warn!("line {line_number}: \"{symbol}\" seen again");
        }
    }

    pub(crate) fn folding_repeat_object(&self, line_number: usize, object: &str) {
        if self.folding_repeat_object {
            warn!("line {line_number}: detected repeat-name object \"{object}\"");
        }
    }

    pub(crate) fn folding_odr_violation(&self, line_number: usize, symbol: &str, object: &str) {
        if self.folding_odr_violation {
            warn!("line {line_number}: \"{symbol}\" seen again in \"{object}\"");
        }
    }

    pub(crate) fn layout_repeat_compilation_unit(
        &self,
        line_number: usize,
        unit: &str,
        section: &str,
    ) {
        if self.layout_repeat_compilation_unit {
            warn!("line {line_number}: detected repeat-name compilation unit \"{unit}\" ({section})");
        }
    }

    pub(crate) fn layout_odr_violation(
        &self,
        line_number: usize,
        symbol: &str,
        unit: &str,
        section: &str,
    ) {
        if self.layout_odr_violation {
            warn!("line {line_number}: \"{symbol}\" seen again in \"{unit}\" ({section})");
        }
    }

    // Multiple STT_SECTION symbols in an uninterrupted compilation unit.
    // Could be a false positive, which in turn would be a false negative
    // for a repeat-compilation-unit warning.
    pub(crate) fn layout_sym_on_detected(&self, line_number: usize, unit: &str, section: &str) {
        if self.layout_sym_on_detected {
            warn!("line {line_number}: detected '-sym on' flag in \"{unit}\" ({section})");
        }
    }

    pub(crate) fn layout_common_on_detected(&self, line_number: usize, unit: &str, section: &str) {
        if self.layout_common_on_detected {
            warn!("line {line_number}: detected '-common on' flag in \"{unit}\" ({section})");
        }
    }

    pub(crate) fn layout_lcomm_after_comm(&self, line_number: usize) {
        if self.layout_lcomm_after_comm {
            warn!("line {line_number}: .lcomm symbols found after .comm symbols");
        }
    }
}
