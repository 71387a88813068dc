//! Symbol type and binding tables.
//!
//! The linker prints the ELF `st_type`/`st_bind` of every closure symbol in
//! lowercase, plus two proprietary Metrowerks bindings (`multidef` and
//! `overload`) that never made it into the ELF specification. A string
//! outside these tables means the input is not a linker map (or a new
//! linker appeared), so scanning treats it as fatal.

use core::fmt;

/// `st_type` of a closure symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    /// STT_NOTYPE
    NoType,
    /// STT_OBJECT
    Object,
    /// STT_FUNC
    Func,
    /// STT_SECTION
    Section,
    /// STT_FILE
    File,
    /// What the linker prints for anything it cannot classify.
    Unknown,
}

impl SymbolType {
    /// Looks up a captured type string; `None` if it is not in the table.
    pub fn from_bytes(bytes: &[u8]) -> Option<SymbolType> {
        match bytes {
            b"notype" => Some(SymbolType::NoType),
            b"object" => Some(SymbolType::Object),
            b"func" => Some(SymbolType::Func),
            b"section" => Some(SymbolType::Section),
            b"file" => Some(SymbolType::File),
            b"unknown" => Some(SymbolType::Unknown),
            _ => None,
        }
    }

    /// The exact string the linker prints for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::NoType => "notype",
            SymbolType::Object => "object",
            SymbolType::Func => "func",
            SymbolType::Section => "section",
            SymbolType::File => "file",
            SymbolType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `st_bind` of a closure symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolBind {
    /// STB_LOCAL
    Local,
    /// STB_GLOBAL
    Global,
    /// STB_WEAK
    Weak,
    /// Proprietary Metrowerks binding.
    MultiDef,
    /// Proprietary Metrowerks binding.
    Overload,
    /// What the linker prints for anything it cannot classify.
    Unknown,
}

impl SymbolBind {
    /// Looks up a captured binding string; `None` if it is not in the table.
    pub fn from_bytes(bytes: &[u8]) -> Option<SymbolBind> {
        match bytes {
            b"local" => Some(SymbolBind::Local),
            b"global" => Some(SymbolBind::Global),
            b"weak" => Some(SymbolBind::Weak),
            b"multidef" => Some(SymbolBind::MultiDef),
            b"overload" => Some(SymbolBind::Overload),
            b"unknown" => Some(SymbolBind::Unknown),
            _ => None,
        }
    }

    /// The exact string the linker prints for this binding.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolBind::Local => "local",
            SymbolBind::Global => "global",
            SymbolBind::Weak => "weak",
            SymbolBind::MultiDef => "multidef",
            SymbolBind::Overload => "overload",
            SymbolBind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SymbolBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_round_trip() {
        for name in ["notype", "object", "func", "section", "file", "unknown"] {
            let ty = SymbolType::from_bytes(name.as_bytes()).unwrap();
            assert_eq!(ty.as_str(), name);
        }
        for name in ["local", "global", "weak", "multidef", "overload", "unknown"] {
            let bind = SymbolBind::from_bytes(name.as_bytes()).unwrap();
            assert_eq!(bind.as_str(), name);
        }
    }

    #[test]
    fn unknown_strings_are_rejected() {
        assert!(SymbolType::from_bytes(b"FUNC").is_none());
        assert!(SymbolBind::from_bytes(b"gnu_unique").is_none());
    }
}
