//! In-memory [`WorkspaceAdapter`] used for tests and as a runnable
//! reference backend. The real analysis host (§1's external collaborator)
//! isn't available to this crate, so `StubWorkspace` plays the role the
//! teacher crate's own `Database` played: a concrete, fully working object
//! the rest of the engine can be exercised against end to end.
//!
//! Grounded on the teacher's own test pattern of building a throwaway
//! `Database` per `#[test]` (`tests.rs`/`test.rs`): here, `StubWorkspace`
//! is built fresh per test and seeded via [`StubWorkspace::with_fixture`].

use std::cell::RefCell;
use std::collections::BTreeMap;

use super::*;
use crate::error::{EngineError, EngineResult};

#[derive(Default)]
struct StubState {
    functions: BTreeMap<Ea, FunctionInfo>,
    segments: BTreeMap<Ea, SegmentInfo>,
    names: BTreeMap<Ea, String>,
    entries: Vec<EntryInfo>,
    imports: Vec<ImportInfo>,
    strings: Vec<StringInfo>,
    xrefs: Vec<XrefInfo>,
    bookmarks: BTreeMap<i64, BookmarkInfo>,
    next_bookmark_slot: i64,
    comments: BTreeMap<(Ea, CommentFlavor), String>,
    breakpoints: BTreeMap<i64, BreakpointInfo>,
    next_bptid: i64,
    types: BTreeMap<i64, TypeInfo>,
    type_members: BTreeMap<i64, Vec<TypeMemberInfo>>,
    enum_values: BTreeMap<i64, Vec<EnumValueInfo>>,
    func_args: BTreeMap<i64, Vec<FuncArgInfo>>,
    next_type_ordinal: i64,
    bytes: BTreeMap<Ea, u8>,
    instructions: BTreeMap<Ea, InstructionInfo>,
    blocks: BTreeMap<Ea, Vec<BlockInfo>>,
    call_sites: BTreeMap<Ea, Vec<CallSite>>,
    loops: BTreeMap<Ea, Vec<LoopInfo>>,
    lvars: BTreeMap<Ea, Vec<LocalVarInfo>>,
    pseudo_lines: BTreeMap<Ea, Vec<PseudocodeLine>>,
    ctree: BTreeMap<Ea, Vec<CtreeNode>>,
    call_args: BTreeMap<Ea, Vec<CtreeCallArg>>,
    pseudo_comments: BTreeMap<(Ea, Ea), (String, CommentPlacement)>,
    fixups: Vec<FixupInfo>,
    fchunks: BTreeMap<Ea, Vec<FchunkInfo>>,
    problems: Vec<ProblemInfo>,
    hidden_ranges: Vec<HiddenRangeInfo>,
    signatures: Vec<SignatureInfo>,
    stack_vars: BTreeMap<Ea, Vec<StackVarInfo>>,
    next_undo: u64,
    undo_log: Vec<String>,
    saved: bool,
}

/// In-memory workspace. Single-threaded, `RefCell`-backed interior
/// mutability, matching §5's "single workspace thread" model: there is
/// never a concurrent borrow because there is never a concurrent caller.
#[derive(Default)]
pub struct StubWorkspace {
    state: RefCell<StubState>,
}

impl StubWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test-only window into the undo trail: every label passed to
    /// `open_undo` so far, in order. Used to assert batch coalescing opens
    /// one handle per batch instead of one per mutation.
    pub fn undo_log(&self) -> Vec<String> {
        self.state.borrow().undo_log.clone()
    }

    /// A small, deterministic binary image: one code segment, three
    /// functions, an import, a handful of xrefs and strings. Enough to
    /// exercise S1-S6 and the quantified invariants in §8 without depending
    /// on a real binary.
    pub fn with_fixture() -> Self {
        let ws = Self::new();
        {
            let mut s = ws.state.borrow_mut();
            s.segments.insert(
                0x1000,
                SegmentInfo {
                    start_ea: 0x1000,
                    end_ea: 0x2000,
                    name: ".text".into(),
                    class: "CODE".into(),
                    perm: 0b101, // R + X
                },
            );
            s.segments.insert(
                0x2000,
                SegmentInfo {
                    start_ea: 0x2000,
                    end_ea: 0x2100,
                    name: ".data".into(),
                    class: "DATA".into(),
                    perm: 0b110, // R + W
                },
            );

            let main = FunctionInfo {
                ea: 0x1000,
                name: "main".into(),
                size: 0x20,
                end_ea: 0x1020,
                flags: 0,
                return_type: Some("int".into()),
                arg_count: Some(0),
                calling_conv: Some("cdecl".into()),
            };
            let helper = FunctionInfo {
                ea: 0x1020,
                name: "helper".into(),
                size: 0x10,
                end_ea: 0x1030,
                flags: 0,
                return_type: Some("void".into()),
                arg_count: Some(1),
                calling_conv: Some("cdecl".into()),
            };
            for f in [main, helper] {
                s.names.insert(f.ea, f.name.clone());
                s.functions.insert(f.ea, f);
            }

            s.imports.push(ImportInfo {
                ea: 0x1030,
                name: "malloc".into(),
                module: "libc".into(),
                ordinal: 0,
            });
            s.names.insert(0x1030, "malloc".into());

            s.xrefs.push(XrefInfo {
                from_ea: 0x1000,
                to_ea: 0x1020,
                kind: 1,
                is_code: true,
            });
            s.xrefs.push(XrefInfo {
                from_ea: 0x1020,
                to_ea: 0x1030,
                kind: 1,
                is_code: true,
            });
            s.xrefs.push(XrefInfo {
                from_ea: 0x1005,
                to_ea: 0x2000,
                kind: 2,
                is_code: false,
            });

            s.call_sites.insert(
                0x1000,
                vec![CallSite {
                    func_ea: 0x1000,
                    call_ea: 0x1010,
                    callee_ea: Some(0x1020),
                    callee_name: Some("helper".into()),
                }],
            );
            s.blocks.insert(
                0x1000,
                vec![BlockInfo {
                    func_ea: 0x1000,
                    start_ea: 0x1000,
                    end_ea: 0x1020,
                }],
            );

            s.instructions.insert(
                0x1000,
                InstructionInfo {
                    ea: 0x1000,
                    func_ea: Some(0x1000),
                    itype: 1,
                    mnemonic: "push".into(),
                    size: 1,
                    operands: vec!["rbp".into()],
                    disasm: "push rbp".into(),
                },
            );
            s.instructions.insert(
                0x1010,
                InstructionInfo {
                    ea: 0x1010,
                    func_ea: Some(0x1000),
                    itype: 2,
                    mnemonic: "call".into(),
                    size: 5,
                    operands: vec!["helper".into()],
                    disasm: "call helper".into(),
                },
            );

            for (i, b) in [0xCCu8, 0xCC, 0xCC].into_iter().enumerate() {
                s.bytes.insert(0x1050 + i as u64, b);
            }

            s.strings.push(StringInfo {
                ea: 0x2000,
                length: 5,
                type_name: "ascii".into(),
                width: 1,
                layout: "c".into(),
                encoding: "utf-8".into(),
                content: "hello".into(),
            });

            let struct_ord = 1;
            s.next_type_ordinal = 2;
            s.types.insert(
                struct_ord,
                TypeInfo {
                    ordinal: struct_ord,
                    name: "point_t".into(),
                    size: 8,
                    kind: TypeKind::Struct,
                },
            );
            s.type_members.insert(
                struct_ord,
                vec![
                    TypeMemberInfo {
                        type_ordinal: struct_ord,
                        member_name: "x".into(),
                        offset: 0,
                        size: 4,
                        member_type: "int".into(),
                        flags: 0,
                    },
                    TypeMemberInfo {
                        type_ordinal: struct_ord,
                        member_name: "y".into(),
                        offset: 4,
                        size: 4,
                        member_type: "int".into(),
                        flags: 0,
                    },
                ],
            );
        }
        ws
    }

    fn check_unique_name(&self, s: &StubState, name: &str, except_ea: Option<Ea>) -> EngineResult<()> {
        if s.names
            .iter()
            .any(|(ea, n)| n == name && Some(*ea) != except_ea)
        {
            return Err(EngineError::WorkspaceError(format!(
                "name '{name}' already in use"
            )));
        }
        Ok(())
    }
}

impl WorkspaceAdapter for StubWorkspace {
    fn func_qty(&self) -> usize {
        self.state.borrow().functions.len()
    }

    fn func_at_index(&self, i: usize) -> Option<FunctionInfo> {
        self.state.borrow().functions.values().nth(i).cloned()
    }

    fn segment_qty(&self) -> usize {
        self.state.borrow().segments.len()
    }

    fn segment_at_index(&self, i: usize) -> Option<SegmentInfo> {
        self.state.borrow().segments.values().nth(i).cloned()
    }

    fn for_each_function(&self, f: &mut dyn FnMut(&FunctionInfo) -> bool) {
        for fi in self.state.borrow().functions.values() {
            if !f(fi) {
                break;
            }
        }
    }

    fn for_each_segment(&self, f: &mut dyn FnMut(&SegmentInfo) -> bool) {
        for si in self.state.borrow().segments.values() {
            if !f(si) {
                break;
            }
        }
    }

    fn for_each_name(&self, f: &mut dyn FnMut(Ea, &str) -> bool) {
        for (ea, name) in self.state.borrow().names.iter() {
            if !f(*ea, name) {
                break;
            }
        }
    }

    fn for_each_entry(&self, f: &mut dyn FnMut(&EntryInfo) -> bool) {
        for e in self.state.borrow().entries.iter() {
            if !f(e) {
                break;
            }
        }
    }

    fn for_each_import(&self, f: &mut dyn FnMut(&ImportInfo) -> bool) {
        for i in self.state.borrow().imports.iter() {
            if !f(i) {
                break;
            }
        }
    }

    fn for_each_string(&self, f: &mut dyn FnMut(&StringInfo) -> bool) {
        for s in self.state.borrow().strings.iter() {
            if !f(s) {
                break;
            }
        }
    }

    fn for_each_xref(&self, f: &mut dyn FnMut(&XrefInfo) -> bool) {
        for x in self.state.borrow().xrefs.iter() {
            if !f(x) {
                break;
            }
        }
    }

    fn for_each_xref_to(&self, to_ea: Ea, f: &mut dyn FnMut(&XrefInfo) -> bool) {
        for x in self.state.borrow().xrefs.iter().filter(|x| x.to_ea == to_ea) {
            if !f(x) {
                break;
            }
        }
    }

    fn for_each_xref_from(&self, from_ea: Ea, f: &mut dyn FnMut(&XrefInfo) -> bool) {
        for x in self
            .state
            .borrow()
            .xrefs
            .iter()
            .filter(|x| x.from_ea == from_ea)
        {
            if !f(x) {
                break;
            }
        }
    }

    fn for_each_bookmark(&self, f: &mut dyn FnMut(&BookmarkInfo) -> bool) {
        for b in self.state.borrow().bookmarks.values() {
            if !f(b) {
                break;
            }
        }
    }

    fn for_each_comment(&self, f: &mut dyn FnMut(Ea, CommentFlavor, &str) -> bool) {
        for ((ea, flavor), text) in self.state.borrow().comments.iter() {
            if !f(*ea, *flavor, text) {
                break;
            }
        }
    }

    fn for_each_breakpoint(&self, f: &mut dyn FnMut(&BreakpointInfo) -> bool) {
        for b in self.state.borrow().breakpoints.values() {
            if !f(b) {
                break;
            }
        }
    }

    fn for_each_type(&self, f: &mut dyn FnMut(&TypeInfo) -> bool) {
        for t in self.state.borrow().types.values() {
            if !f(t) {
                break;
            }
        }
    }

    fn for_each_type_member(&self, type_ordinal: i64, f: &mut dyn FnMut(&TypeMemberInfo) -> bool) {
        if let Some(members) = self.state.borrow().type_members.get(&type_ordinal) {
            for m in members {
                if !f(m) {
                    break;
                }
            }
        }
    }

    fn for_each_enum_value(&self, type_ordinal: i64, f: &mut dyn FnMut(&EnumValueInfo) -> bool) {
        if let Some(values) = self.state.borrow().enum_values.get(&type_ordinal) {
            for v in values {
                if !f(v) {
                    break;
                }
            }
        }
    }

    fn for_each_func_arg(&self, type_ordinal: i64, f: &mut dyn FnMut(&FuncArgInfo) -> bool) {
        if let Some(args) = self.state.borrow().func_args.get(&type_ordinal) {
            for a in args {
                if !f(a) {
                    break;
                }
            }
        }
    }

    fn for_each_fixup(&self, f: &mut dyn FnMut(&FixupInfo) -> bool) {
        for x in self.state.borrow().fixups.iter() {
            if !f(x) {
                break;
            }
        }
    }

    fn for_each_fchunk(&self, func_ea: Ea, f: &mut dyn FnMut(&FchunkInfo) -> bool) {
        if let Some(chunks) = self.state.borrow().fchunks.get(&func_ea) {
            for c in chunks {
                if !f(c) {
                    break;
                }
            }
        }
    }

    fn for_each_problem(&self, f: &mut dyn FnMut(&ProblemInfo) -> bool) {
        for p in self.state.borrow().problems.iter() {
            if !f(p) {
                break;
            }
        }
    }

    fn for_each_hidden_range(&self, f: &mut dyn FnMut(&HiddenRangeInfo) -> bool) {
        for h in self.state.borrow().hidden_ranges.iter() {
            if !f(h) {
                break;
            }
        }
    }

    fn for_each_signature(&self, f: &mut dyn FnMut(&SignatureInfo) -> bool) {
        for s in self.state.borrow().signatures.iter() {
            if !f(s) {
                break;
            }
        }
    }

    fn for_each_stack_var(&self, func_ea: Ea, f: &mut dyn FnMut(&StackVarInfo) -> bool) {
        if let Some(vars) = self.state.borrow().stack_vars.get(&func_ea) {
            for v in vars {
                if !f(v) {
                    break;
                }
            }
        }
    }

    fn func_containing(&self, ea: Ea) -> Option<FunctionInfo> {
        self.state
            .borrow()
            .functions
            .values()
            .find(|f| ea >= f.ea && ea < f.end_ea)
            .cloned()
    }

    fn segment_containing(&self, ea: Ea) -> Option<SegmentInfo> {
        self.state
            .borrow()
            .segments
            .values()
            .find(|s| ea >= s.start_ea && ea < s.end_ea)
            .cloned()
    }

    fn name_at(&self, ea: Ea) -> Option<String> {
        self.state.borrow().names.get(&ea).cloned()
    }

    fn comment_at(&self, ea: Ea, flavor: CommentFlavor) -> Option<String> {
        self.state.borrow().comments.get(&(ea, flavor)).cloned()
    }

    fn item_type(&self, ea: Ea) -> Option<String> {
        if self.state.borrow().instructions.contains_key(&ea) {
            Some("code".into())
        } else if self.state.borrow().bytes.contains_key(&ea) {
            Some("data".into())
        } else {
            None
        }
    }

    fn item_size(&self, ea: Ea) -> Option<u64> {
        self.state
            .borrow()
            .instructions
            .get(&ea)
            .map(|i| i.size as u64)
    }

    fn is_code(&self, ea: Ea) -> bool {
        self.state.borrow().instructions.contains_key(&ea)
    }

    fn is_data(&self, ea: Ea) -> bool {
        !self.is_code(ea) && self.state.borrow().bytes.contains_key(&ea)
    }

    fn decode_instruction(&self, ea: Ea) -> Option<InstructionInfo> {
        self.state.borrow().instructions.get(&ea).cloned()
    }

    fn disassemble_line(&self, ea: Ea) -> Option<String> {
        self.state.borrow().instructions.get(&ea).map(|i| i.disasm.clone())
    }

    fn bytes(&self, ea: Ea, n: usize) -> Option<Vec<u8>> {
        let s = self.state.borrow();
        let mut out = Vec::with_capacity(n);
        for i in 0..n as u64 {
            out.push(*s.bytes.get(&(ea + i))?);
        }
        Some(out)
    }

    fn next_head(&self, ea: Ea) -> Option<Ea> {
        self.state
            .borrow()
            .instructions
            .keys()
            .find(|&&k| k > ea)
            .copied()
    }

    fn prev_head(&self, ea: Ea) -> Option<Ea> {
        self.state
            .borrow()
            .instructions
            .keys()
            .rev()
            .find(|&&k| k < ea)
            .copied()
    }

    fn search_bytes(&self, pattern: &[PatternByte], start: Option<Ea>, end: Option<Ea>) -> Vec<Ea> {
        let s = self.state.borrow();
        if pattern.is_empty() || s.bytes.is_empty() {
            return Vec::new();
        }
        let lo = start.unwrap_or(*s.bytes.keys().next().unwrap());
        let hi = end.unwrap_or(*s.bytes.keys().last().unwrap() + 1);
        let mut out = Vec::new();
        let mut ea = lo;
        while ea + pattern.len() as u64 <= hi {
            let mut ok = true;
            for (i, pb) in pattern.iter().enumerate() {
                let b = match s.bytes.get(&(ea + i as u64)) {
                    Some(b) => *b,
                    None => {
                        ok = false;
                        break;
                    }
                };
                let matched = match pb {
                    PatternByte::Exact(x) => b == *x,
                    PatternByte::Any => true,
                    PatternByte::OneOf(xs) => xs.contains(&b),
                };
                if !matched {
                    ok = false;
                    break;
                }
            }
            if ok {
                out.push(ea);
            }
            ea += 1;
        }
        out
    }

    fn basic_blocks(&self, func_ea: Ea) -> Vec<BlockInfo> {
        self.state.borrow().blocks.get(&func_ea).cloned().unwrap_or_default()
    }

    fn call_sites(&self, func_ea: Ea) -> Vec<CallSite> {
        self.state
            .borrow()
            .call_sites
            .get(&func_ea)
            .cloned()
            .unwrap_or_default()
    }

    fn loops(&self, func_ea: Ea) -> Vec<LoopInfo> {
        self.state.borrow().loops.get(&func_ea).cloned().unwrap_or_default()
    }

    fn decompile(&self, ea: Ea, force: bool) -> EngineResult<DecompileResult> {
        let func_ea = self
            .func_containing(ea)
            .ok_or(EngineError::NotFound)?
            .ea;
        let mut s = self.state.borrow_mut();
        if force || !s.pseudo_lines.contains_key(&func_ea) {
            let lines = vec![
                PseudocodeLine {
                    func_ea,
                    line_num: 0,
                    line: "int func(void)".into(),
                    ea: Some(func_ea),
                    comment: None,
                    comment_placement: None,
                },
                PseudocodeLine {
                    func_ea,
                    line_num: 1,
                    line: "{".into(),
                    ea: None,
                    comment: None,
                    comment_placement: None,
                },
                PseudocodeLine {
                    func_ea,
                    line_num: 2,
                    line: "  return 0;".into(),
                    ea: Some(func_ea + 4),
                    comment: None,
                    comment_placement: None,
                },
                PseudocodeLine {
                    func_ea,
                    line_num: 3,
                    line: "}".into(),
                    ea: None,
                    comment: None,
                    comment_placement: None,
                },
            ];
            let ctree = vec![
                CtreeNode {
                    func_ea,
                    item_id: 0,
                    is_expr: false,
                    op_name: "cit_block".into(),
                    ea: Some(func_ea),
                    parent_id: None,
                    depth: 0,
                    x_id: Some(1),
                    y_id: None,
                    z_id: None,
                    var_idx: None,
                    var_name: None,
                    obj_ea: None,
                    obj_name: None,
                    num_value: None,
                    str_value: None,
                },
                CtreeNode {
                    func_ea,
                    item_id: 1,
                    is_expr: false,
                    op_name: "cit_return".into(),
                    ea: Some(func_ea + 4),
                    parent_id: Some(0),
                    depth: 1,
                    x_id: None,
                    y_id: None,
                    z_id: None,
                    var_idx: None,
                    var_name: None,
                    obj_ea: None,
                    obj_name: None,
                    num_value: Some(0),
                    str_value: None,
                },
            ];
            s.pseudo_lines.insert(func_ea, lines);
            s.ctree.insert(func_ea, ctree);
            s.lvars.entry(func_ea).or_default();
            s.call_args.entry(func_ea).or_default();
        }
        Ok(DecompileResult {
            lines: s.pseudo_lines[&func_ea].clone(),
            ctree: s.ctree[&func_ea].clone(),
            call_args: s.call_args.get(&func_ea).cloned().unwrap_or_default(),
            lvars: s.lvars.get(&func_ea).cloned().unwrap_or_default(),
        })
    }

    fn set_lvar_name(&self, func_ea: Ea, idx: i64, name: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        let vars = s.lvars.entry(func_ea).or_default();
        if let Some(v) = vars.iter_mut().find(|v| v.idx == idx) {
            v.name = name.to_string();
            Ok(())
        } else {
            Err(EngineError::NotFound)
        }
    }

    fn set_lvar_type(&self, func_ea: Ea, idx: i64, type_name: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        let vars = s.lvars.entry(func_ea).or_default();
        if let Some(v) = vars.iter_mut().find(|v| v.idx == idx) {
            v.type_name = type_name.to_string();
            Ok(())
        } else {
            Err(EngineError::NotFound)
        }
    }

    fn set_pseudo_comment(
        &self,
        func_ea: Ea,
        ea: Ea,
        text: &str,
        placement: CommentPlacement,
    ) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.pseudo_comments
            .insert((func_ea, ea), (text.to_string(), placement));
        if let Some(lines) = s.pseudo_lines.get_mut(&func_ea) {
            if let Some(line) = lines.iter_mut().find(|l| l.ea == Some(ea)) {
                line.comment = Some(text.to_string());
                line.comment_placement = Some(placement);
            }
        }
        Ok(())
    }

    fn clear_pseudo_comment(&self, func_ea: Ea, ea: Ea) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.pseudo_comments.remove(&(func_ea, ea));
        if let Some(lines) = s.pseudo_lines.get_mut(&func_ea) {
            if let Some(line) = lines.iter_mut().find(|l| l.ea == Some(ea)) {
                line.comment = None;
                line.comment_placement = None;
            }
        }
        Ok(())
    }

    fn force_rebuild(&self, func_ea: Ea) {
        self.state.borrow_mut().pseudo_lines.remove(&func_ea);
    }

    fn set_name(&self, ea: Ea, name: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        self.check_unique_name(&s, name, Some(ea))?;
        s.names.insert(ea, name.to_string());
        Ok(())
    }

    fn delete_name(&self, ea: Ea) -> EngineResult<()> {
        self.state.borrow_mut().names.remove(&ea);
        Ok(())
    }

    fn set_comment(&self, ea: Ea, flavor: CommentFlavor, text: &str) -> EngineResult<()> {
        self.state.borrow_mut().comments.insert((ea, flavor), text.to_string());
        Ok(())
    }

    fn delete_comment(&self, ea: Ea, flavor: CommentFlavor) -> EngineResult<()> {
        self.state.borrow_mut().comments.remove(&(ea, flavor));
        Ok(())
    }

    fn create_function(&self, ea: Ea, end_ea: Option<Ea>, name: Option<&str>) -> EngineResult<Ea> {
        let mut s = self.state.borrow_mut();
        if s.functions.contains_key(&ea) {
            return Err(EngineError::WorkspaceError(format!(
                "function already exists at {ea:#x}"
            )));
        }
        let end = end_ea.unwrap_or(ea + 0x10);
        if end <= ea {
            return Err(EngineError::InvalidArgument("end_ea must be > ea".into()));
        }
        let name = name.map(str::to_string).unwrap_or_else(|| format!("sub_{ea:x}"));
        self.check_unique_name(&s, &name, None)?;
        s.names.insert(ea, name.clone());
        s.functions.insert(
            ea,
            FunctionInfo {
                ea,
                name,
                size: end - ea,
                end_ea: end,
                flags: 0,
                return_type: None,
                arg_count: None,
                calling_conv: None,
            },
        );
        Ok(ea)
    }

    fn delete_function(&self, ea: Ea) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.functions.remove(&ea).ok_or(EngineError::NotFound)?;
        Ok(())
    }

    fn rename_function(&self, ea: Ea, name: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        self.check_unique_name(&s, name, Some(ea))?;
        s.functions
            .get_mut(&ea)
            .ok_or(EngineError::NotFound)?
            .name = name.to_string();
        s.names.insert(ea, name.to_string());
        Ok(())
    }

    fn set_function_flags(&self, ea: Ea, flags: u32) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.functions.get_mut(&ea).ok_or(EngineError::NotFound)?.flags = flags;
        Ok(())
    }

    fn delete_instruction(&self, ea: Ea) -> EngineResult<()> {
        self.state.borrow_mut().instructions.remove(&ea);
        Ok(())
    }

    fn set_segment_name(&self, start_ea: Ea, name: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.segments.get_mut(&start_ea).ok_or(EngineError::NotFound)?.name = name.to_string();
        Ok(())
    }

    fn set_segment_class(&self, start_ea: Ea, class: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.segments.get_mut(&start_ea).ok_or(EngineError::NotFound)?.class = class.to_string();
        Ok(())
    }

    fn set_segment_perm(&self, start_ea: Ea, perm: u8) -> EngineResult<()> {
        if perm > 7 {
            return Err(EngineError::InvalidArgument(format!(
                "perm {perm} out of range 0..7"
            )));
        }
        let mut s = self.state.borrow_mut();
        s.segments.get_mut(&start_ea).ok_or(EngineError::NotFound)?.perm = perm;
        Ok(())
    }

    fn delete_segment(&self, start_ea: Ea) -> EngineResult<()> {
        self.state.borrow_mut().segments.remove(&start_ea).ok_or(EngineError::NotFound)?;
        Ok(())
    }

    fn create_bookmark(&self, slot: Option<i64>, ea: Ea, description: &str) -> EngineResult<i64> {
        let mut s = self.state.borrow_mut();
        let slot = match slot {
            Some(slot) => {
                if s.bookmarks.contains_key(&slot) {
                    return Err(EngineError::WorkspaceError(format!(
                        "bookmark slot {slot} already in use"
                    )));
                }
                slot
            }
            None => {
                let slot = s.next_bookmark_slot;
                s.next_bookmark_slot += 1;
                slot
            }
        };
        s.bookmarks.insert(
            slot,
            BookmarkInfo {
                slot,
                ea,
                description: description.to_string(),
            },
        );
        Ok(slot)
    }

    fn set_bookmark_description(&self, slot: i64, description: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.bookmarks
            .get_mut(&slot)
            .ok_or(EngineError::NotFound)?
            .description = description.to_string();
        Ok(())
    }

    fn delete_bookmark(&self, slot: i64) -> EngineResult<()> {
        self.state.borrow_mut().bookmarks.remove(&slot).ok_or(EngineError::NotFound)?;
        Ok(())
    }

    fn create_breakpoint(&self, mut bp: BreakpointInfo) -> EngineResult<i64> {
        let mut s = self.state.borrow_mut();
        s.next_bptid += 1;
        bp.bptid = s.next_bptid;
        let id = bp.bptid;
        s.breakpoints.insert(id, bp);
        Ok(id)
    }

    fn update_breakpoint(&self, bptid: i64, mut bp: BreakpointInfo) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        if !s.breakpoints.contains_key(&bptid) {
            return Err(EngineError::NotFound);
        }
        bp.bptid = bptid;
        s.breakpoints.insert(bptid, bp);
        Ok(())
    }

    fn delete_breakpoint(&self, bptid: i64) -> EngineResult<()> {
        self.state.borrow_mut().breakpoints.remove(&bptid).ok_or(EngineError::NotFound)?;
        Ok(())
    }

    fn create_type(&self, name: &str, kind: TypeKind, size: u64) -> EngineResult<i64> {
        let mut s = self.state.borrow_mut();
        let ordinal = s.next_type_ordinal;
        s.next_type_ordinal += 1;
        s.types.insert(
            ordinal,
            TypeInfo {
                ordinal,
                name: name.to_string(),
                size,
                kind,
            },
        );
        Ok(ordinal)
    }

    fn update_type(&self, ordinal: i64, name: &str, size: u64) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        let t = s.types.get_mut(&ordinal).ok_or(EngineError::NotFound)?;
        t.name = name.to_string();
        t.size = size;
        Ok(())
    }

    fn delete_type(&self, ordinal: i64) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        s.types.remove(&ordinal).ok_or(EngineError::NotFound)?;
        s.type_members.remove(&ordinal);
        s.enum_values.remove(&ordinal);
        s.func_args.remove(&ordinal);
        Ok(())
    }

    fn create_type_member(&self, member: TypeMemberInfo) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        if !s.types.contains_key(&member.type_ordinal) {
            return Err(EngineError::NotFound);
        }
        s.type_members.entry(member.type_ordinal).or_default().push(member);
        Ok(())
    }

    fn update_type_member(
        &self,
        type_ordinal: i64,
        member_name: &str,
        member: TypeMemberInfo,
    ) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        let members = s.type_members.get_mut(&type_ordinal).ok_or(EngineError::NotFound)?;
        let m = members
            .iter_mut()
            .find(|m| m.member_name == member_name)
            .ok_or(EngineError::NotFound)?;
        *m = member;
        Ok(())
    }

    fn delete_type_member(&self, type_ordinal: i64, member_name: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        let members = s.type_members.get_mut(&type_ordinal).ok_or(EngineError::NotFound)?;
        let before = members.len();
        members.retain(|m| m.member_name != member_name);
        if members.len() == before {
            return Err(EngineError::NotFound);
        }
        Ok(())
    }

    fn create_enum_value(&self, value: EnumValueInfo) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        if !s.types.contains_key(&value.type_ordinal) {
            return Err(EngineError::NotFound);
        }
        s.enum_values.entry(value.type_ordinal).or_default().push(value);
        Ok(())
    }

    fn update_enum_value(
        &self,
        type_ordinal: i64,
        value_name: &str,
        value: EnumValueInfo,
    ) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        let values = s.enum_values.get_mut(&type_ordinal).ok_or(EngineError::NotFound)?;
        let v = values
            .iter_mut()
            .find(|v| v.value_name == value_name)
            .ok_or(EngineError::NotFound)?;
        *v = value;
        Ok(())
    }

    fn delete_enum_value(&self, type_ordinal: i64, value_name: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        let values = s.enum_values.get_mut(&type_ordinal).ok_or(EngineError::NotFound)?;
        let before = values.len();
        values.retain(|v| v.value_name != value_name);
        if values.len() == before {
            return Err(EngineError::NotFound);
        }
        Ok(())
    }

    fn rename_stack_var(&self, func_ea: Ea, name: &str, new_name: &str) -> EngineResult<()> {
        let mut s = self.state.borrow_mut();
        let vars = s.stack_vars.get_mut(&func_ea).ok_or(EngineError::NotFound)?;
        let v = vars.iter_mut().find(|v| v.name == name).ok_or(EngineError::NotFound)?;
        v.name = new_name.to_string();
        Ok(())
    }

    fn string_count(&self) -> usize {
        self.state.borrow().strings.len()
    }

    fn rebuild_strings(&self, min_length: u32, _type_mask: u32) -> EngineResult<usize> {
        let mut s = self.state.borrow_mut();
        s.strings.retain(|st| st.length >= min_length as u64);
        Ok(s.strings.len())
    }

    fn open_undo(&self, label: &str) -> UndoHandle {
        let mut s = self.state.borrow_mut();
        s.next_undo += 1;
        let handle = UndoHandle(s.next_undo);
        s.undo_log.push(label.to_string());
        handle
    }

    fn close_undo(&self, _handle: UndoHandle) {
        // Stub keeps only a flat label log; a faithful adapter would
        // reconcile the handle with the host's undo stack here.
    }

    fn save_database(&self) -> bool {
        self.state.borrow_mut().saved = true;
        true
    }
}
