//! The symbol closure: the transitive reference graph rooted at the entry
//! point, printed by the linker as a depth-numbered tree.
//!
//! Nodes live in an arena owned by the closure; parent and children are
//! indices into it, which keeps the tree movable and free of lifetime
//! entanglement. Index 0 is an anonymous root sentinel.

use std::collections::HashMap;
use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::cursor::{Cursor, cap_bytes, cap_dec, cap_string, pattern};
use crate::error::{ScanError, ScanErrorKind};
use crate::symbol::{SymbolBind, SymbolType};
use crate::version::{Version, VersionRange};
use crate::warn::WarningConfig;

// "%i] " and "%s (%s,%s) found in %s %s\r\n"
static RE_NODE_NORMAL: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\A   *([0-9]+)\] ([^\r\n]*) \(([^\r\n]*),([^\r\n]*)\) found in ([^\r\n]*) ([^\r\n]*)\r?\n",
    )
});
// "%i] " and ">>> UNREFERENCED DUPLICATE %s\r\n"
static RE_UNREF_DUP_HEADER: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A   *([0-9]+)\] >>> UNREFERENCED DUPLICATE ([^\r\n]*)\r?\n"));
// "%i] " and ">>> (%s,%s) found in %s %s\r\n"
static RE_UNREF_DUP: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\A   *([0-9]+)\] >>> \(([^\r\n]*),([^\r\n]*)\) found in ([^\r\n]*) ([^\r\n]*)\r?\n")
});
// "%i] " and "%s found as linker generated symbol\r\n"
static RE_NODE_LINKER_GENERATED: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A   *([0-9]+)\] ([^\r\n]*) found as linker generated symbol\r?\n"));
// ">>> SYMBOL NOT FOUND: %s\r\n"
static RE_UNRESOLVED_SYMBOL: Lazy<Regex> =
    Lazy::new(|| pattern(r"\A>>> SYMBOL NOT FOUND: ([^\r\n]*)\r?\n"));

/// Index of a node in [`SymbolClosure::nodes`].
pub type NodeIndex = usize;

/// One closure tree. A map can hold two: the normal closure and, with
/// `-listdwarf`, a second one over the debug sections.
#[derive(Debug)]
pub struct SymbolClosure {
    /// Node arena; index 0 is the root sentinel.
    pub nodes: Vec<Node>,
    pub versions: VersionRange,
    /// Compilation-unit name, to symbol name, to the nodes declaring it.
    /// Backs one-definition-rule detection.
    pub lookup: HashMap<String, HashMap<String, Vec<NodeIndex>>>,
}

#[derive(Debug)]
pub struct Node {
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    /// The root sentinel, and the level-2 placeholder inserted by the
    /// `_dtors$99` quirk. Prints nothing of its own.
    Anonymous,
    Real(RealNode),
    LinkerGenerated { name: String },
}

/// A symbol the linker resolved while walking the reference graph.
#[derive(Debug)]
pub struct RealNode {
    pub name: String,
    pub symbol_type: SymbolType,
    pub bind: SymbolBind,
    /// Static library or object name.
    pub module_name: String,
    /// When linking a static library, either the STT_FILE symbol name of
    /// the member or (as early as CW for GCN 2.7) the member name itself.
    pub source_name: String,
    pub unref_dups: Vec<UnreferencedDuplicate>,
}

/// An alternate definition the linker saw but did not select.
#[derive(Debug)]
pub struct UnreferencedDuplicate {
    pub symbol_type: SymbolType,
    pub bind: SymbolBind,
    pub module_name: String,
    pub source_name: String,
}

impl SymbolClosure {
    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    /// Consumes closure nodes until a line matches none of the node shapes.
    /// Unresolved-symbol prints can appear anywhere in and around a closure;
    /// they are recorded with their line number so the printer can replay
    /// them in place.
    pub(crate) fn scan(
        cursor: &mut Cursor<'_>,
        unresolved_symbols: &mut Vec<(usize, String)>,
        config: &WarningConfig,
    ) -> Result<SymbolClosure, ScanError> {
        let mut closure = SymbolClosure {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Anonymous,
            }],
            versions: VersionRange::OPEN,
            lookup: HashMap::new(),
        };
        let mut curr_node: NodeIndex = 0;
        let mut curr_level: u32 = 0;

        loop {
            let line_number = cursor.line_number();
            if let Some(caps) = cursor.try_match(&RE_NODE_NORMAL) {
                let next_level = cap_dec(&caps, 1);
                if next_level == 0 {
                    return Err(ScanError::new(
                        ScanErrorKind::SymbolClosureInvalidHierarchy,
                        line_number,
                    ));
                }
                if curr_level + 1 < next_level {
                    return Err(ScanError::new(
                        ScanErrorKind::SymbolClosureHierarchySkip,
                        line_number,
                    ));
                }
                let Some(symbol_type) = SymbolType::from_bytes(cap_bytes(&caps, 3)) else {
                    return Err(ScanError::new(
                        ScanErrorKind::SymbolClosureInvalidSymbolType,
                        line_number,
                    ));
                };
                let Some(bind) = SymbolBind::from_bytes(cap_bytes(&caps, 4)) else {
                    return Err(ScanError::new(
                        ScanErrorKind::SymbolClosureInvalidSymbolBind,
                        line_number,
                    ));
                };
                let name = cap_string(&caps, 2);
                let module_name = cap_string(&caps, 5);
                let source_name = cap_string(&caps, 6);

                for _ in next_level..=curr_level {
                    curr_node = closure.nodes[curr_node].parent.unwrap_or(0);
                }
                curr_level = next_level;

                let mut unref_dups = Vec::new();
                let header_line = cursor.line_number();
                if let Some(header) = cursor.try_match(&RE_UNREF_DUP_HEADER) {
                    if cap_dec(&header, 1) != curr_level {
                        return Err(ScanError::new(
                            ScanErrorKind::SymbolClosureUnrefDupsHierarchyMismatch,
                            header_line,
                        ));
                    }
                    if cap_bytes(&header, 2) != name.as_bytes() {
                        return Err(ScanError::new(
                            ScanErrorKind::SymbolClosureUnrefDupsNameMismatch,
                            header_line,
                        ));
                    }
                    loop {
                        let dup_line = cursor.line_number();
                        let Some(dup) = cursor.try_match(&RE_UNREF_DUP) else {
                            break;
                        };
                        if cap_dec(&dup, 1) != curr_level {
                            return Err(ScanError::new(
                                ScanErrorKind::SymbolClosureUnrefDupsHierarchyMismatch,
                                dup_line,
                            ));
                        }
                        let Some(dup_type) = SymbolType::from_bytes(cap_bytes(&dup, 2)) else {
                            return Err(ScanError::new(
                                ScanErrorKind::SymbolClosureInvalidSymbolType,
                                dup_line,
                            ));
                        };
                        let Some(dup_bind) = SymbolBind::from_bytes(cap_bytes(&dup, 3)) else {
                            return Err(ScanError::new(
                                ScanErrorKind::SymbolClosureInvalidSymbolBind,
                                dup_line,
                            ));
                        };
                        unref_dups.push(UnreferencedDuplicate {
                            symbol_type: dup_type,
                            bind: dup_bind,
                            module_name: cap_string(&dup, 4),
                            source_name: cap_string(&dup, 5),
                        });
                    }
                    if unref_dups.is_empty() {
                        return Err(ScanError::new(
                            ScanErrorKind::SymbolClosureUnrefDupsEmpty,
                            cursor.line_number(),
                        ));
                    }
                    // UNREFERENCED DUPLICATE info first appeared in CW for GCN 1.1.
                    closure.versions.narrow(Version::V2_3_3Build137, Version::Latest);
                }

                let node_index = closure.nodes.len();
                closure.nodes.push(Node {
                    parent: Some(curr_node),
                    children: Vec::new(),
                    kind: NodeKind::Real(RealNode {
                        name: name.clone(),
                        symbol_type,
                        bind,
                        module_name: module_name.clone(),
                        source_name: source_name.clone(),
                        unref_dups,
                    }),
                });
                closure.nodes[curr_node].children.push(node_index);
                curr_node = node_index;

                let unit_name = crate::compilation_unit_name(&module_name, &source_name);
                let unit_lookup = closure.lookup.entry(unit_name.to_owned()).or_default();
                if unit_lookup.contains_key(&name) {
                    config.closure_odr_violation(line_number, &name, unit_name);
                }
                unit_lookup.entry(name.clone()).or_default().push(node_index);

                // Though I do not understand it, the following is a normal
                // occurrence for _dtors$99:
                // "  1] _dtors$99 (object,global) found in Linker Generated Symbol File "
                // "    3] .text (section,local) found in xyz.cpp lib.a"
                if name == "_dtors$99" && module_name == "Linker Generated Symbol File" {
                    let placeholder = closure.nodes.len();
                    closure.nodes.push(Node {
                        parent: Some(curr_node),
                        children: Vec::new(),
                        kind: NodeKind::Anonymous,
                    });
                    closure.nodes[curr_node].children.push(placeholder);
                    curr_node = placeholder;
                    curr_level += 1;
                    closure.versions.narrow(Version::V3_0_4, Version::Latest);
                }
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_NODE_LINKER_GENERATED) {
                let next_level = cap_dec(&caps, 1);
                if next_level == 0 {
                    return Err(ScanError::new(
                        ScanErrorKind::SymbolClosureInvalidHierarchy,
                        line_number,
                    ));
                }
                if curr_level + 1 < next_level {
                    return Err(ScanError::new(
                        ScanErrorKind::SymbolClosureHierarchySkip,
                        line_number,
                    ));
                }
                for _ in next_level..=curr_level {
                    curr_node = closure.nodes[curr_node].parent.unwrap_or(0);
                }
                curr_level = next_level;

                let node_index = closure.nodes.len();
                closure.nodes.push(Node {
                    parent: Some(curr_node),
                    children: Vec::new(),
                    kind: NodeKind::LinkerGenerated {
                        name: cap_string(&caps, 2),
                    },
                });
                closure.nodes[curr_node].children.push(node_index);
                curr_node = node_index;
                continue;
            }
            if let Some(caps) = cursor.try_match(&RE_UNRESOLVED_SYMBOL) {
                unresolved_symbols.push((line_number, cap_string(&caps, 1)));
                continue;
            }
            break;
        }
        Ok(closure)
    }

    pub(crate) fn print<W: Write>(
        &self,
        w: &mut W,
        unresolved_symbols: &[(usize, String)],
        next_unresolved: &mut usize,
        line_number: &mut usize,
    ) -> io::Result<()> {
        self.print_node(w, 0, 0, unresolved_symbols, next_unresolved, line_number)
    }

    fn print_node<W: Write>(
        &self,
        w: &mut W,
        index: NodeIndex,
        level: usize,
        unresolved_symbols: &[(usize, String)],
        next_unresolved: &mut usize,
        line_number: &mut usize,
    ) -> io::Result<()> {
        match &self.nodes[index].kind {
            NodeKind::Anonymous => {}
            NodeKind::Real(real) => {
                print_prefix(w, level)?;
                // "%s (%s,%s) found in %s %s\r\n"
                write!(
                    w,
                    "{} ({},{}) found in {} {}\r\n",
                    real.name, real.symbol_type, real.bind, real.module_name, real.source_name
                )?;
                *line_number += 1;
                if !real.unref_dups.is_empty() {
                    print_prefix(w, level)?;
                    write!(w, ">>> UNREFERENCED DUPLICATE {}\r\n", real.name)?;
                    *line_number += 1;
                    for dup in &real.unref_dups {
                        print_prefix(w, level)?;
                        write!(
                            w,
                            ">>> ({},{}) found in {} {}\r\n",
                            dup.symbol_type, dup.bind, dup.module_name, dup.source_name
                        )?;
                        *line_number += 1;
                    }
                }
            }
            NodeKind::LinkerGenerated { name } => {
                print_prefix(w, level)?;
                write!(w, "{name} found as linker generated symbol\r\n")?;
                *line_number += 1;
            }
        }
        // Handles pre-print and mid-print unresolved symbols; post-print
        // falls out of the last node's recursion.
        crate::map::print_unresolved(w, unresolved_symbols, next_unresolved, line_number)?;
        for &child in &self.nodes[index].children {
            self.print_node(
                w,
                child,
                level + 1,
                unresolved_symbols,
                next_unresolved,
                line_number,
            )?;
        }
        Ok(())
    }
}

fn print_prefix<W: Write>(w: &mut W, level: usize) -> io::Result<()> {
    for _ in 0..=level {
        w.write_all(b" ")?;
    }
    write!(w, "{level}] ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_bytes(input: &[u8]) -> (SymbolClosure, Vec<(usize, String)>) {
        let mut cursor = Cursor::new(input);
        let mut unresolved = Vec::new();
        let closure =
            SymbolClosure::scan(&mut cursor, &mut unresolved, &WarningConfig::silent()).unwrap();
        assert!(cursor.rest().is_empty());
        (closure, unresolved)
    }

    #[test]
    fn nested_levels_walk_back_up() {
        let (closure, _) = scan_bytes(
            b"  1] __start (func,global) found in os.o kernel.a\r\n\
              \x20  2] main (func,global) found in main.o \r\n\
              \x20  2] exit (func,global) found in exit.o \r\n",
        );
        let root_children = &closure.nodes[0].children;
        assert_eq!(root_children.len(), 1);
        let start = root_children[0];
        assert_eq!(closure.nodes[start].children.len(), 2);
        for &child in &closure.nodes[start].children {
            assert_eq!(closure.nodes[child].parent, Some(start));
        }
    }

    #[test]
    fn hierarchy_skip_is_fatal() {
        let mut cursor = Cursor::new(
            b"  1] __start (func,global) found in os.o kernel.a\r\n\
              \x20   3] main (func,global) found in main.o \r\n",
        );
        let mut unresolved = Vec::new();
        let err = SymbolClosure::scan(&mut cursor, &mut unresolved, &WarningConfig::silent())
            .unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::SymbolClosureHierarchySkip);
        assert_eq!(err.line_number, 2);
    }

    #[test]
    fn unknown_type_is_fatal() {
        let mut cursor = Cursor::new(b"  1] __start (gnu_ifunc,global) found in os.o \r\n");
        let mut unresolved = Vec::new();
        let err = SymbolClosure::scan(&mut cursor, &mut unresolved, &WarningConfig::silent())
            .unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::SymbolClosureInvalidSymbolType);
    }

    #[test]
    fn unref_dups_lift_min_version() {
        let (closure, _) = scan_bytes(
            b"  1] foo (func,global) found in obj.o lib.a\r\n\
              \x20 1] >>> UNREFERENCED DUPLICATE foo\r\n\
              \x20 1] >>> (func,global) found in other.o lib.a\r\n",
        );
        assert_eq!(closure.versions.min, Version::V2_3_3Build137);
        let NodeKind::Real(real) = &closure.nodes[1].kind else {
            panic!("expected a real node");
        };
        assert_eq!(real.unref_dups.len(), 1);
    }

    #[test]
    fn unref_dup_header_with_no_entries_is_fatal() {
        let mut cursor = Cursor::new(
            b"  1] foo (func,global) found in obj.o lib.a\r\n\
              \x20 1] >>> UNREFERENCED DUPLICATE foo\r\n",
        );
        let mut unresolved = Vec::new();
        let err = SymbolClosure::scan(&mut cursor, &mut unresolved, &WarningConfig::silent())
            .unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::SymbolClosureUnrefDupsEmpty);
    }

    #[test]
    fn dtors_quirk_inserts_placeholder_level() {
        let (closure, _) = scan_bytes(
            b"  1] _dtors$99 (object,global) found in Linker Generated Symbol File \r\n\
              \x20   3] .text (section,local) found in xyz.o lib.a\r\n",
        );
        assert_eq!(closure.versions.min, Version::V3_0_4);
        let dtors = closure.nodes[0].children[0];
        let placeholder = closure.nodes[dtors].children[0];
        assert!(matches!(closure.nodes[placeholder].kind, NodeKind::Anonymous));
        let text = closure.nodes[placeholder].children[0];
        assert!(matches!(closure.nodes[text].kind, NodeKind::Real(_)));
    }

    #[test]
    fn unresolved_symbols_record_line_numbers() {
        let (_, unresolved) = scan_bytes(
            b">>> SYMBOL NOT FOUND: OSReport\r\n\
              \x20 1] __start (func,global) found in os.o \r\n\
              >>> SYMBOL NOT FOUND: OSPanic\r\n",
        );
        assert_eq!(
            unresolved,
            vec![(1, "OSReport".to_owned()), (3, "OSPanic".to_owned())]
        );
    }
}
