//! Section layout portions: the per-section symbol tables.
//!
//! Layouts come in a 3-column shape (through CW for GCN 2.6) and a
//! 4-column shape that added the file-offset column and `*fill*` symbols
//! (CW for GCN 2.7 on). The Legend of Zelda: Twilight Princess ships maps
//! post-processed into a prologue-free three-column hybrid, which gets its
//! own scanner.
//!
//! Units live in a vector owned by the layout; the doubly-linked
//! relationship between entry symbols and their host function is a pair of
//! indices into it.

use std::collections::HashMap;
use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::cursor::{Cursor, cap_bytes, cap_dec, cap_hex, cap_string, pattern};
use crate::error::{ScanError, ScanErrorKind};
use crate::version::{Version, VersionRange};
use crate::warn::WarningConfig;

static RE_3COL_PROLOGUE_1: Lazy<Regex> = Lazy::new(|| pattern("\\A  Starting        Virtual\r?\n"));
static RE_3COL_PROLOGUE_2: Lazy<Regex> = Lazy::new(|| pattern("\\A  address  Size   address\r?\n"));
static RE_3COL_PROLOGUE_3: Lazy<Regex> = Lazy::new(|| pattern("\\A  -----------------------\r?\n"));
static RE_4COL_PROLOGUE_1: Lazy<Regex> =
    Lazy::new(|| pattern("\\A  Starting        Virtual  File\r?\n"));
static RE_4COL_PROLOGUE_2: Lazy<Regex> =
    Lazy::new(|| pattern("\\A  address  Size   address  offset\r?\n"));
static RE_4COL_PROLOGUE_3: Lazy<Regex> =
    Lazy::new(|| pattern("\\A  ---------------------------------\r?\n"));

// "  %08x %06x %08x %2i %s \t%s %s\r\n"
static RE_3COL_UNIT_NORMAL: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A  ([0-9a-f]{8}) ([0-9a-f]{6}) ([0-9a-f]{8})  ?([0-9]+) ([^\r\n]*) \t([^\r\n]*) ([^\r\n]*)\r?\n",
    )
});
// "  UNUSED   %06x ........ %s %s %s\r\n"
static RE_3COL_UNIT_UNUSED: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A  UNUSED   ([0-9a-f]{6}) \.{8} ([^\r\n]*) ([^\r\n]*) ([^\r\n]*)\r?\n")
});
// "  %08lx %06lx %08lx %s (entry of %s) \t%s %s\r\n"
static RE_3COL_UNIT_ENTRY: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A  ([0-9a-f]{8}) ([0-9a-f]{6}) ([0-9a-f]{8}) ([^\r\n]*) \(entry of ([^\r\n]*)\) \t([^\r\n]*) ([^\r\n]*)\r?\n",
    )
});
// "  %08x %06x %08x %08x %2i %s \t%s %s\r\n"
static RE_4COL_UNIT_NORMAL: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A  ([0-9a-f]{8}) ([0-9a-f]{6}) ([0-9a-f]{8}) ([0-9a-f]{8})  ?([0-9]+) ([^\r\n]*) \t([^\r\n]*) ([^\r\n]*)\r?\n",
    )
});
// "  UNUSED   %06x ........ ........    %s %s %s\r\n"
static RE_4COL_UNIT_UNUSED: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A  UNUSED   ([0-9a-f]{6}) \.{8} \.{8}    ([^\r\n]*) ([^\r\n]*) ([^\r\n]*)\r?\n")
});
// "  %08lx %06lx %08lx %08lx    %s (entry of %s) \t%s %s\r\n"
static RE_4COL_UNIT_ENTRY: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A  ([0-9a-f]{8}) ([0-9a-f]{6}) ([0-9a-f]{8}) ([0-9a-f]{8})    ([^\r\n]*) \(entry of ([^\r\n]*)\) \t([^\r\n]*) ([^\r\n]*)\r?\n",
    )
});
// "  %08x %06x %08x %08x %2i %s\r\n"
static RE_4COL_UNIT_SPECIAL: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A  ([0-9a-f]{8}) ([0-9a-f]{6}) ([0-9a-f]{8}) ([0-9a-f]{8})  ?([0-9]+) ([^\r\n]*)\r?\n",
    )
});
static RE_TLOZTP_UNIT_ENTRY: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A  ([0-9a-f]{8}) ([0-9a-f]{6}) ([0-9a-f]{8})    ([^\r\n]*) \(entry of ([^\r\n]*)\) \t([^\r\n]*) ([^\r\n]*)\r?\n",
    )
});
static RE_TLOZTP_UNIT_SPECIAL: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A  ([0-9a-f]{8}) ([0-9a-f]{6}) ([0-9a-f]{8})  ?([0-9]+) ([^\r\n]*)\r?\n")
});

/// What a section holds, derived from its name. Far from a comprehensive
/// listing of section names MWLD can emit (`.PPC.EMB.*`, `.gnu.*`,
/// `.symtab`, and friends may also appear); anything unlisted is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Code,
    /// Compressed code (`.compress.*`).
    ZCode,
    /// Variable-length-encoded code (`*_vle`).
    VleCode,
    Data,
    Bss,
    Ctors,
    Dtors,
    ExTab,
    ExTabIndex,
    Debug,
    /// Mixed code and data; never derived from a name.
    Mixed,
    Unknown,
}

impl SectionKind {
    pub fn from_section_name(name: &str) -> SectionKind {
        match name {
            ".init" | ".text" | ".fini" => SectionKind::Code,
            ".init_vle" | ".text_vle" => SectionKind::VleCode,
            ".compress.init" | ".compress.text" | ".compress.fini" => SectionKind::ZCode,
            ".data" | ".rodata" | ".sdata" | ".sdata2" => SectionKind::Data,
            ".bss" | ".sbss" | ".sbss2" => SectionKind::Bss,
            ".ctors" => SectionKind::Ctors,
            ".dtors" => SectionKind::Dtors,
            "extab" => SectionKind::ExTab,
            "extabindex" => SectionKind::ExTabIndex,
            ".debug" | ".debug_sfnames" | ".debug_scrinfo" | ".debug_abbrev" | ".debug_info"
            | ".debug_arranges" | ".debug_frame" | ".debug_line" | ".debug_loc"
            | ".debug_macinfo" | ".debug_pubnames" => SectionKind::Debug,
            _ => SectionKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Normal,
    Unused,
    Entry,
    Special,
}

/// Scan-time classification of a unit's role, deduced from the section
/// kind and adjacency heuristics without parsing any payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitTrait {
    None,
    /// Lives in a code section.
    Function,
    /// Lives in a data section.
    Object,
    /// Assumed to be of notype (entry symbols).
    NoType,
    /// Named after the section it is native to. Multiple can appear per
    /// compilation unit under '-sym on'; the size covers every symbol,
    /// used and unused, the section symbol encompasses.
    Section,
    /// BSS local common symbols.
    LCommon,
    /// BSS common symbols; '-common on' moves these into a common section.
    Common,
    ExTab,
    ExTabIndex,
    /// `*fill*`
    Fill1,
    /// `**fill**`
    Fill2,
}

impl UnitTrait {
    /// The printed name of a special symbol; empty for anything that is
    /// not one.
    pub fn special_name(&self) -> &'static str {
        match self {
            UnitTrait::Fill1 => "*fill*",
            UnitTrait::Fill2 => "**fill**",
            _ => "",
        }
    }
}

/// Index of a unit in [`SectionLayout::units`].
pub type UnitIndex = usize;

#[derive(Debug)]
pub struct SectionUnit {
    pub kind: UnitKind,
    pub starting_address: u32,
    pub size: u32,
    pub virtual_address: u32,
    pub file_offset: u32,
    pub alignment: u32,
    /// Empty for special symbols, whose printed name comes from the trait.
    pub name: String,
    /// For entry symbols, the earlier unit this one is a label inside of.
    pub entry_parent: Option<UnitIndex>,
    /// Entry symbols hosted by this unit, in order of appearance.
    pub entry_children: Vec<UnitIndex>,
    /// Static library or object name.
    pub module_name: String,
    /// When linking a static library, either the STT_FILE symbol name of
    /// the member or (as early as CW for GCN 2.7) the member name itself.
    pub source_name: String,
    pub unit_trait: UnitTrait,
}

#[derive(Debug)]
pub struct SectionLayout {
    pub name: String,
    pub kind: SectionKind,
    pub units: Vec<SectionUnit>,
    pub versions: VersionRange,
    /// Compilation-unit name, to symbol name, to the units declaring it.
    pub lookup: HashMap<String, HashMap<String, Vec<UnitIndex>>>,
}

/// Rolling state for the adjacency heuristics: which compilation unit the
/// scan is inside of, whether a BSS or extabindex section is on its second
/// lap, and whether the current unit already repeated its section symbol.
struct ScanContext<'a> {
    config: &'a WarningConfig,
    is_second_lap: bool,
    is_multi_stt_section: bool,
    curr_module_name: String,
    curr_source_name: String,
}

impl<'a> ScanContext<'a> {
    fn new(config: &'a WarningConfig) -> Self {
        ScanContext {
            config,
            is_second_lap: false,
            is_multi_stt_section: false,
            curr_module_name: String::new(),
            curr_source_name: String::new(),
        }
    }

    fn compilation_unit_name(&self) -> &str {
        crate::compilation_unit_name(&self.curr_module_name, &self.curr_source_name)
    }
}

impl SectionLayout {
    pub(crate) fn new(kind: SectionKind, name: &str) -> SectionLayout {
        SectionLayout {
            name: name.to_owned(),
            kind,
            units: Vec::new(),
            versions: VersionRange::OPEN,
            lookup: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Dispatches on the three-line prologue following a section layout
    /// header, then scans the units in the shape the prologue announced.
    pub(crate) fn scan_with_prologue(
        cursor: &mut Cursor<'_>,
        name: &str,
        config: &WarningConfig,
    ) -> Result<SectionLayout, ScanError> {
        let mut layout = SectionLayout::new(SectionKind::from_section_name(name), name);
        if cursor.try_match(&RE_3COL_PROLOGUE_1).is_some() {
            if cursor.try_match(&RE_3COL_PROLOGUE_2).is_none()
                || cursor.try_match(&RE_3COL_PROLOGUE_3).is_none()
            {
                return Err(ScanError::new(
                    ScanErrorKind::SectionLayoutBadPrologue,
                    cursor.line_number(),
                ));
            }
            layout
                .versions
                .narrow(Version::Unknown, Version::V2_4_7Build107);
            layout.scan_3column(cursor, config)?;
        } else if cursor.try_match(&RE_4COL_PROLOGUE_1).is_some() {
            if cursor.try_match(&RE_4COL_PROLOGUE_2).is_none()
                || cursor.try_match(&RE_4COL_PROLOGUE_3).is_none()
            {
                return Err(ScanError::new(
                    ScanErrorKind::SectionLayoutBadPrologue,
                    cursor.line_number(),
                ));
            }
            layout.versions.narrow(Version::V3_0_4, Version::Latest);
            layout.scan_4column(cursor, config)?;
        } else {
            return Err(ScanError::new(
                ScanErrorKind::SectionLayoutBadPrologue,
                cursor.line_number(),
            ));
        }
        Ok(layout)
    }

    pub(crate) fn scan_3column(
        &mut self,
        cursor: &mut Cursor<'_>,
        config: &WarningConfig,
    ) -> Result<(), ScanError> {
        let mut ctx = ScanContext::new(config);
        loop {
            let line_number = cursor.line_number();
            if let Some(caps) = cursor.try_match(&RE_3COL_UNIT_NORMAL) {
                self.push_normal_unit(
                    &mut ctx,
                    line_number,
                    cap_hex(&caps, 1),
                    cap_hex(&caps, 2),
                    cap_hex(&caps, 3),
                    0,
                    cap_dec(&caps, 4),
                    cap_string(&caps, 5),
                    cap_string(&caps, 6),
                    cap_string(&caps, 7),
                );
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_3COL_UNIT_UNUSED) {
                self.push_unused_unit(
                    &mut ctx,
                    line_number,
                    cap_hex(&caps, 1),
                    cap_string(&caps, 2),
                    cap_string(&caps, 3),
                    cap_string(&caps, 4),
                );
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_3COL_UNIT_ENTRY) {
                self.push_entry_unit(
                    &mut ctx,
                    line_number,
                    cap_hex(&caps, 1),
                    cap_hex(&caps, 2),
                    cap_hex(&caps, 3),
                    0,
                    &caps,
                    4,
                )?;
                continue;
            }
            break;
        }
        Ok(())
    }

    pub(crate) fn scan_4column(
        &mut self,
        cursor: &mut Cursor<'_>,
        config: &WarningConfig,
    ) -> Result<(), ScanError> {
        let mut ctx = ScanContext::new(config);
        loop {
            let line_number = cursor.line_number();
            if let Some(caps) = cursor.try_match(&RE_4COL_UNIT_NORMAL) {
                self.push_normal_unit(
                    &mut ctx,
                    line_number,
                    cap_hex(&caps, 1),
                    cap_hex(&caps, 2),
                    cap_hex(&caps, 3),
                    cap_hex(&caps, 4),
                    cap_dec(&caps, 5),
                    cap_string(&caps, 6),
                    cap_string(&caps, 7),
                    cap_string(&caps, 8),
                );
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_4COL_UNIT_UNUSED) {
                self.push_unused_unit(
                    &mut ctx,
                    line_number,
                    cap_hex(&caps, 1),
                    cap_string(&caps, 2),
                    cap_string(&caps, 3),
                    cap_string(&caps, 4),
                );
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_4COL_UNIT_ENTRY) {
                self.push_entry_unit(
                    &mut ctx,
                    line_number,
                    cap_hex(&caps, 1),
                    cap_hex(&caps, 2),
                    cap_hex(&caps, 3),
                    cap_hex(&caps, 4),
                    &caps,
                    5,
                )?;
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_4COL_UNIT_SPECIAL) {
                self.push_special_unit(
                    line_number,
                    cap_hex(&caps, 1),
                    cap_hex(&caps, 2),
                    cap_hex(&caps, 3),
                    cap_hex(&caps, 4),
                    cap_dec(&caps, 5),
                    cap_bytes(&caps, 6),
                )?;
                continue;
            }
            break;
        }
        Ok(())
    }

    /// Twilight Princess layouts: three-column units with no prologue,
    /// stored with a zero file offset.
    pub(crate) fn scan_tloztp(
        &mut self,
        cursor: &mut Cursor<'_>,
        config: &WarningConfig,
    ) -> Result<(), ScanError> {
        let mut ctx = ScanContext::new(config);
        loop {
            let line_number = cursor.line_number();
            if let Some(caps) = cursor.try_match(&RE_3COL_UNIT_NORMAL) {
                self.push_normal_unit(
                    &mut ctx,
                    line_number,
                    cap_hex(&caps, 1),
                    cap_hex(&caps, 2),
                    cap_hex(&caps, 3),
                    0,
                    cap_dec(&caps, 4),
                    cap_string(&caps, 5),
                    cap_string(&caps, 6),
                    cap_string(&caps, 7),
                );
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_TLOZTP_UNIT_ENTRY) {
                self.push_entry_unit(
                    &mut ctx,
                    line_number,
                    cap_hex(&caps, 1),
                    cap_hex(&caps, 2),
                    cap_hex(&caps, 3),
                    0,
                    &caps,
                    4,
                )?;
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_TLOZTP_UNIT_SPECIAL) {
                self.push_special_unit(
                    line_number,
                    cap_hex(&caps, 1),
                    cap_hex(&caps, 2),
                    cap_hex(&caps, 3),
                    0,
                    cap_dec(&caps, 4),
                    cap_bytes(&caps, 5),
                )?;
                continue;
            }
            break;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push_normal_unit(
        &mut self,
        ctx: &mut ScanContext<'_>,
        line_number: usize,
        starting_address: u32,
        size: u32,
        virtual_address: u32,
        file_offset: u32,
        alignment: u32,
        name: String,
        module_name: String,
        source_name: String,
    ) {
        let unit_trait =
            self.deduce_usual_trait(ctx, line_number, &name, &module_name, &source_name);
        let index = self.units.len();
        self.units.push(SectionUnit {
            kind: UnitKind::Normal,
            starting_address,
            size,
            virtual_address,
            file_offset,
            alignment,
            name,
            entry_parent: None,
            entry_children: Vec::new(),
            module_name,
            source_name,
            unit_trait,
        });
        self.record_unit(ctx, index);
    }

    fn push_unused_unit(
        &mut self,
        ctx: &mut ScanContext<'_>,
        line_number: usize,
        size: u32,
        name: String,
        module_name: String,
        source_name: String,
    ) {
        let unit_trait =
            self.deduce_usual_trait(ctx, line_number, &name, &module_name, &source_name);
        let index = self.units.len();
        self.units.push(SectionUnit {
            kind: UnitKind::Unused,
            starting_address: 0,
            size,
            virtual_address: 0,
            file_offset: 0,
            alignment: 0,
            name,
            entry_parent: None,
            entry_children: Vec::new(),
            module_name,
            source_name,
            unit_trait,
        });
        self.record_unit(ctx, index);
    }

    /// Entry symbols resolve their parent by scanning units backwards
    /// within the current compilation unit; `first_capture` is the index
    /// of the name capture (name, parent, module, source follow in order).
    #[allow(clippy::too_many_arguments)]
    fn push_entry_unit(
        &mut self,
        ctx: &mut ScanContext<'_>,
        line_number: usize,
        starting_address: u32,
        size: u32,
        virtual_address: u32,
        file_offset: u32,
        caps: &regex::bytes::Captures<'_>,
        first_capture: usize,
    ) -> Result<(), ScanError> {
        let name = cap_string(caps, first_capture);
        let entry_parent_name = cap_bytes(caps, first_capture + 1);
        let module_name = cap_string(caps, first_capture + 2);
        let source_name = cap_string(caps, first_capture + 3);
        let Some(parent) =
            self.find_entry_parent(entry_parent_name, &module_name, &source_name)
        else {
            return Err(ScanError::new(
                ScanErrorKind::SectionLayoutOrphanedEntry,
                line_number,
            ));
        };
        let unit_trait =
            self.deduce_entry_trait(ctx, line_number, &name, &module_name, &source_name);
        let index = self.units.len();
        self.units.push(SectionUnit {
            kind: UnitKind::Entry,
            starting_address,
            size,
            virtual_address,
            file_offset,
            alignment: 0,
            name,
            entry_parent: Some(parent),
            entry_children: Vec::new(),
            module_name,
            source_name,
            unit_trait,
        });
        self.units[parent].entry_children.push(index);
        self.record_unit(ctx, index);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push_special_unit(
        &mut self,
        line_number: usize,
        starting_address: u32,
        size: u32,
        virtual_address: u32,
        file_offset: u32,
        alignment: u32,
        special_name: &[u8],
    ) -> Result<(), ScanError> {
        let unit_trait = match special_name {
            b"*fill*" => UnitTrait::Fill1,
            b"**fill**" => UnitTrait::Fill2,
            _ => {
                return Err(ScanError::new(
                    ScanErrorKind::SectionLayoutSpecialNotFill,
                    line_number,
                ));
            }
        };
        // Special symbols belong to no compilation unit and no lookup.
        self.units.push(SectionUnit {
            kind: UnitKind::Special,
            starting_address,
            size,
            virtual_address,
            file_offset,
            alignment,
            name: String::new(),
            entry_parent: None,
            entry_children: Vec::new(),
            module_name: String::new(),
            source_name: String::new(),
            unit_trait,
        });
        Ok(())
    }

    fn find_entry_parent(
        &self,
        entry_parent_name: &[u8],
        module_name: &str,
        source_name: &str,
    ) -> Option<UnitIndex> {
        for (index, unit) in self.units.iter().enumerate().rev() {
            // An entry symbol's host lives in the same compilation unit,
            // so the reverse scan gives up as soon as it leaves it.
            if unit.source_name != source_name || unit.module_name != module_name {
                return None;
            }
            if unit.name.as_bytes() == entry_parent_name {
                return Some(index);
            }
        }
        None
    }

    fn record_unit(&mut self, ctx: &ScanContext<'_>, index: UnitIndex) {
        let unit_name = ctx.compilation_unit_name().to_owned();
        let symbol_name = self.units[index].name.clone();
        self.lookup
            .entry(unit_name)
            .or_default()
            .entry(symbol_name)
            .or_default()
            .push(index);
    }

    fn deduce_usual_trait(
        &mut self,
        ctx: &mut ScanContext<'_>,
        line_number: usize,
        name: &str,
        module_name: &str,
        source_name: &str,
    ) -> UnitTrait {
        let is_stt_section = name == self.name;

        if module_name != ctx.curr_module_name || source_name != ctx.curr_source_name {
            ctx.curr_module_name = module_name.to_owned();
            ctx.curr_source_name = source_name.to_owned();
            ctx.is_multi_stt_section = false;
            let unit_name = crate::compilation_unit_name(module_name, source_name);
            let is_repeat = self.lookup.contains_key(unit_name);
            self.lookup.entry(unit_name.to_owned()).or_default();

            if is_stt_section {
                if is_repeat {
                    // At some point a BSS section's second lap for .comm
                    // symbols gained STT_SECTION symbols, making them
                    // indistinguishable from a repeat-name compilation
                    // unit without further heuristics. False positives
                    // ahoy.
                    ctx.config
                        .layout_repeat_compilation_unit(line_number, unit_name, &self.name);
                }
                if ctx.is_second_lap {
                    if self.kind == SectionKind::Bss {
                        ctx.config.layout_lcomm_after_comm(line_number);
                    }
                    ctx.is_second_lap = false;
                }
                return UnitTrait::Section;
            }
            if self.kind == SectionKind::Bss {
                ctx.config
                    .layout_common_on_detected(line_number, unit_name, &self.name);
                // No clean way to detect repeat-name compilation units
                // during the second lap for .comm symbols.
                ctx.is_second_lap = true;
                return UnitTrait::Common;
            }
            if self.kind == SectionKind::ExTab {
                if is_repeat {
                    ctx.config
                        .layout_repeat_compilation_unit(line_number, unit_name, &self.name);
                }
                return UnitTrait::ExTab;
            }
            if self.kind == SectionKind::ExTabIndex {
                if name == "_eti_init_info" && unit_name == "Linker Generated Symbol File" {
                    // Everything after _eti_init_info is the section's
                    // second lap of UNUSED symbols.
                    ctx.is_second_lap = true;
                } else if is_repeat && !ctx.is_second_lap {
                    ctx.config
                        .layout_repeat_compilation_unit(line_number, unit_name, &self.name);
                }
                return UnitTrait::ExTabIndex;
            }
            return UnitTrait::None;
        }

        if is_stt_section {
            let unit_name = crate::compilation_unit_name(module_name, source_name);
            if self.kind == SectionKind::Ctors || self.kind == SectionKind::Dtors {
                ctx.config
                    .layout_repeat_compilation_unit(line_number, unit_name, &self.name);
            } else if !ctx.is_multi_stt_section {
                // Either this compilation unit was compiled with '-sym on',
                // or two repeat-name compilation units are adjacent.
                ctx.config
                    .layout_sym_on_detected(line_number, unit_name, &self.name);
                ctx.is_multi_stt_section = true;
            }
            return UnitTrait::Section;
        }

        if self
            .lookup
            .get(ctx.compilation_unit_name())
            .is_some_and(|symbols| symbols.contains_key(name))
        {
            // A strong hint at two or more repeat-name compilation units.
            // Identical names across different section layouts do not trip
            // this.
            let unit_name = crate::compilation_unit_name(module_name, source_name);
            ctx.config
                .layout_odr_violation(line_number, name, unit_name, &self.name);
        }

        match self.kind {
            SectionKind::Code => UnitTrait::Function,
            SectionKind::Data => UnitTrait::Object,
            SectionKind::Bss => {
                if ctx.is_second_lap {
                    UnitTrait::Common
                } else {
                    UnitTrait::LCommon
                }
            }
            SectionKind::ExTab => UnitTrait::ExTab,
            SectionKind::ExTabIndex => UnitTrait::ExTabIndex,
            _ => UnitTrait::None,
        }
    }

    // Entry symbols are never the STT_SECTION symbol, and never open a new
    // compilation unit (that would inherently orphan them).
    fn deduce_entry_trait(
        &self,
        ctx: &ScanContext<'_>,
        line_number: usize,
        name: &str,
        module_name: &str,
        source_name: &str,
    ) -> UnitTrait {
        if self
            .lookup
            .get(ctx.compilation_unit_name())
            .is_some_and(|symbols| symbols.contains_key(name))
        {
            let unit_name = crate::compilation_unit_name(module_name, source_name);
            ctx.config
                .layout_odr_violation(line_number, name, unit_name, &self.name);
        }
        UnitTrait::NoType
    }

    pub(crate) fn print<W: Write>(&self, w: &mut W, line_number: &mut usize) -> io::Result<()> {
        write!(w, "\r\n\r\n{} section layout\r\n", self.name)?;
        if self.versions.min < Version::V3_0_4 {
            write!(
                w,
                "  Starting        Virtual\r\n  address  Size   address\r\n  -----------------------\r\n"
            )?;
            *line_number += 6;
            for unit in &self.units {
                unit.print_3column(w, self, line_number)?;
            }
        } else {
            write!(
                w,
                "  Starting        Virtual  File\r\n  address  Size   address  offset\r\n  ---------------------------------\r\n"
            )?;
            *line_number += 6;
            for unit in &self.units {
                unit.print_4column(w, self, line_number)?;
            }
        }
        Ok(())
    }
}

impl SectionUnit {
    fn entry_parent_name<'a>(&self, layout: &'a SectionLayout) -> &'a str {
        self.entry_parent
            .map(|parent| layout.units[parent].name.as_str())
            .unwrap_or_default()
    }

    fn print_3column<W: Write>(
        &self,
        w: &mut W,
        layout: &SectionLayout,
        line_number: &mut usize,
    ) -> io::Result<()> {
        match self.kind {
            UnitKind::Normal => write!(
                w,
                "  {:08x} {:06x} {:08x} {:2} {} \t{} {}\r\n",
                self.starting_address,
                self.size,
                self.virtual_address,
                self.alignment,
                self.name,
                self.module_name,
                self.source_name
            )?,
            UnitKind::Unused => write!(
                w,
                "  UNUSED   {:06x} ........ {} {} {}\r\n",
                self.size, self.name, self.module_name, self.source_name
            )?,
            UnitKind::Entry => write!(
                w,
                "  {:08x} {:06x} {:08x} {} (entry of {}) \t{} {}\r\n",
                self.starting_address,
                self.size,
                self.virtual_address,
                self.name,
                self.entry_parent_name(layout),
                self.module_name,
                self.source_name
            )?,
            // Special symbols only exist in the 4-column era.
            UnitKind::Special => {
                debug_assert!(false, "special unit in a 3-column layout");
                return Ok(());
            }
        }
        *line_number += 1;
        Ok(())
    }

    fn print_4column<W: Write>(
        &self,
        w: &mut W,
        layout: &SectionLayout,
        line_number: &mut usize,
    ) -> io::Result<()> {
        match self.kind {
            UnitKind::Normal => write!(
                w,
                "  {:08x} {:06x} {:08x} {:08x} {:2} {} \t{} {}\r\n",
                self.starting_address,
                self.size,
                self.virtual_address,
                self.file_offset,
                self.alignment,
                self.name,
                self.module_name,
                self.source_name
            )?,
            UnitKind::Unused => write!(
                w,
                "  UNUSED   {:06x} ........ ........    {} {} {}\r\n",
                self.size, self.name, self.module_name, self.source_name
            )?,
            UnitKind::Entry => write!(
                w,
                "  {:08x} {:06x} {:08x} {:08x}    {} (entry of {}) \t{} {}\r\n",
                self.starting_address,
                self.size,
                self.virtual_address,
                self.file_offset,
                self.name,
                self.entry_parent_name(layout),
                self.module_name,
                self.source_name
            )?,
            UnitKind::Special => write!(
                w,
                "  {:08x} {:06x} {:08x} {:08x} {:2} {}\r\n",
                self.starting_address,
                self.size,
                self.virtual_address,
                self.file_offset,
                self.alignment,
                self.unit_trait.special_name()
            )?,
        }
        *line_number += 1;
        Ok(())
    }
}
