//! Capability interface to the analysis workspace (component A).
//!
//! Everything downstream — the virtual-table framework, the entity tables,
//! the SQL function layer — is written against the [`WorkspaceAdapter`]
//! trait, never against a concrete workspace. A faithful implementation
//! binds to the real analysis host; [`stub::StubWorkspace`] is the
//! in-memory implementation this crate ships and tests against, since the
//! real host is an external collaborator (§1) this crate doesn't have
//! access to.
//!
//! Every operation is synchronous and single-threaded: the workspace and the
//! SQL engine are driven from exactly one OS thread (§5), so no method here
//! takes `&mut self` through a lock — interior mutability is the
//! implementation's problem, not the trait's.

pub mod stub;

use std::fmt;

use crate::error::EngineResult;

/// Unsigned 64-bit workspace address.
pub type Ea = u64;

/// Reversible-operation marker acquired around a mutation (§4.A, §5).
/// Opaque to callers; only the adapter that issued it knows how to close it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommentFlavor {
    Regular,
    Repeatable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BreakpointType {
    Sw,
    HwWrite,
    HwRead,
    HwRw,
    HwExec,
}

impl BreakpointType {
    pub fn name(self) -> &'static str {
        match self {
            BreakpointType::Sw => "software",
            BreakpointType::HwWrite => "hardware_write",
            BreakpointType::HwRead => "hardware_read",
            BreakpointType::HwRw => "hardware_rw",
            BreakpointType::HwExec => "hardware_exec",
        }
    }

    pub fn from_code(code: i64) -> EngineResult<Self> {
        Ok(match code {
            0 => BreakpointType::Sw,
            1 => BreakpointType::HwWrite,
            2 => BreakpointType::HwRead,
            3 => BreakpointType::HwRw,
            4 => BreakpointType::HwExec,
            other => {
                return Err(crate::error::EngineError::InvalidArgument(format!(
                    "unknown breakpoint type {other}"
                )))
            }
        })
    }

    pub fn code(self) -> i64 {
        match self {
            BreakpointType::Sw => 0,
            BreakpointType::HwWrite => 1,
            BreakpointType::HwRead => 2,
            BreakpointType::HwRw => 3,
            BreakpointType::HwExec => 4,
        }
    }
}

/// Placement of a decompiler comment relative to its pseudocode anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommentPlacement {
    Semi,
    Block1,
    Block2,
    Curly1,
    Curly2,
    Colon,
    Case,
    Else,
    Do,
}

impl CommentPlacement {
    pub fn name(self) -> &'static str {
        match self {
            CommentPlacement::Semi => "semi",
            CommentPlacement::Block1 => "block1",
            CommentPlacement::Block2 => "block2",
            CommentPlacement::Curly1 => "curly1",
            CommentPlacement::Curly2 => "curly2",
            CommentPlacement::Colon => "colon",
            CommentPlacement::Case => "case",
            CommentPlacement::Else => "else",
            CommentPlacement::Do => "do",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Self> {
        Ok(match s {
            "semi" => CommentPlacement::Semi,
            "block1" => CommentPlacement::Block1,
            "block2" => CommentPlacement::Block2,
            "curly1" => CommentPlacement::Curly1,
            "curly2" => CommentPlacement::Curly2,
            "colon" => CommentPlacement::Colon,
            "case" => CommentPlacement::Case,
            "else" => CommentPlacement::Else,
            "do" => CommentPlacement::Do,
            other => {
                return Err(crate::error::EngineError::InvalidArgument(format!(
                    "unknown comment placement '{other}'"
                )))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    Struct,
    Union,
    Enum,
    Typedef,
    Func,
}

impl TypeKind {
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Struct => "struct",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::Typedef => "typedef",
            TypeKind::Func => "func",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub ea: Ea,
    pub name: String,
    pub size: u64,
    pub end_ea: Ea,
    pub flags: u32,
    pub return_type: Option<String>,
    pub arg_count: Option<i64>,
    pub calling_conv: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SegmentInfo {
    pub start_ea: Ea,
    pub end_ea: Ea,
    pub name: String,
    pub class: String,
    /// bit 4 = R, bit 2 = W, bit 1 = X
    pub perm: u8,
}

#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub ordinal: i64,
    pub ea: Ea,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ImportInfo {
    pub ea: Ea,
    pub name: String,
    pub module: String,
    pub ordinal: i64,
}

#[derive(Debug, Clone)]
pub struct StringInfo {
    pub ea: Ea,
    pub length: u64,
    pub type_name: String,
    pub width: u8,
    pub layout: String,
    pub encoding: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy)]
pub struct XrefInfo {
    pub from_ea: Ea,
    pub to_ea: Ea,
    pub kind: u8,
    pub is_code: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    pub func_ea: Ea,
    pub start_ea: Ea,
    pub end_ea: Ea,
}

#[derive(Debug, Clone)]
pub struct BookmarkInfo {
    pub slot: i64,
    pub ea: Ea,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct BreakpointInfo {
    pub bptid: i64,
    pub ea: Ea,
    pub enabled: bool,
    pub kind: BreakpointType,
    pub size: u32,
    pub flags: u32,
    pub pass_count: u32,
    pub condition: Option<String>,
    pub loc_type: Option<String>,
    pub module: Option<String>,
    pub symbol: Option<String>,
    pub offset: Option<i64>,
    pub source_file: Option<String>,
    pub source_line: Option<i64>,
    pub group: String,
}

impl BreakpointInfo {
    pub fn new_default(ea: Ea) -> Self {
        BreakpointInfo {
            bptid: 0,
            ea,
            enabled: true,
            kind: BreakpointType::Sw,
            size: 0,
            flags: 0,
            pass_count: 0,
            condition: None,
            loc_type: None,
            module: None,
            symbol: None,
            offset: None,
            source_file: None,
            source_line: None,
            group: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstructionInfo {
    pub ea: Ea,
    pub func_ea: Option<Ea>,
    pub itype: i64,
    pub mnemonic: String,
    pub size: u32,
    pub operands: Vec<String>,
    pub disasm: String,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub ordinal: i64,
    pub name: String,
    pub size: u64,
    pub kind: TypeKind,
}

#[derive(Debug, Clone)]
pub struct TypeMemberInfo {
    pub type_ordinal: i64,
    pub member_name: String,
    pub offset: u64,
    pub size: u64,
    pub member_type: String,
    pub flags: u32,
}

#[derive(Debug, Clone)]
pub struct EnumValueInfo {
    pub type_ordinal: i64,
    pub value_name: String,
    pub value: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FuncArgInfo {
    pub type_ordinal: i64,
    /// -1 = return value, 0.. = positional argument.
    pub arg_index: i64,
    pub arg_name: Option<String>,
    pub arg_type: String,
    pub calling_conv: Option<String>,
    pub surface_flags: u32,
    pub resolved_flags: u32,
    pub base_type: Option<String>,
    pub resolved_base_type: Option<String>,
    pub ptr_depth: i64,
    pub resolved_ptr_depth: i64,
}

#[derive(Debug, Clone)]
pub struct PseudocodeLine {
    pub func_ea: Ea,
    pub line_num: i64,
    pub line: String,
    pub ea: Option<Ea>,
    pub comment: Option<String>,
    pub comment_placement: Option<CommentPlacement>,
}

#[derive(Debug, Clone)]
pub struct CtreeNode {
    pub func_ea: Ea,
    pub item_id: i64,
    pub is_expr: bool,
    pub op_name: String,
    pub ea: Option<Ea>,
    pub parent_id: Option<i64>,
    pub depth: i64,
    pub x_id: Option<i64>,
    pub y_id: Option<i64>,
    pub z_id: Option<i64>,
    pub var_idx: Option<i64>,
    pub var_name: Option<String>,
    pub obj_ea: Option<Ea>,
    pub obj_name: Option<String>,
    pub num_value: Option<i64>,
    pub str_value: Option<String>,
}

/// A ctree call-expression's argument, exposed separately so SQL can join
/// on `(func_ea, call_item_id)` without re-walking the whole tree.
#[derive(Debug, Clone)]
pub struct CtreeCallArg {
    pub func_ea: Ea,
    pub call_item_id: i64,
    pub arg_index: i64,
    pub arg_item_id: i64,
}

#[derive(Debug, Clone)]
pub struct LocalVarInfo {
    pub func_ea: Ea,
    pub idx: i64,
    pub name: String,
    pub type_name: String,
    pub size: u64,
    pub is_arg: bool,
    pub is_stk_var: bool,
    pub stkoff: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct DecompileResult {
    pub lines: Vec<PseudocodeLine>,
    pub ctree: Vec<CtreeNode>,
    pub call_args: Vec<CtreeCallArg>,
    pub lvars: Vec<LocalVarInfo>,
}

#[derive(Debug, Clone)]
pub struct FixupInfo {
    pub ea: Ea,
    pub target_ea: Ea,
    pub kind: String,
    pub displacement: i64,
}

#[derive(Debug, Clone)]
pub struct FchunkInfo {
    pub func_ea: Ea,
    pub chunk_start: Ea,
    pub chunk_end: Ea,
    pub is_main: bool,
}

#[derive(Debug, Clone)]
pub struct ProblemInfo {
    pub ea: Ea,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct HiddenRangeInfo {
    pub start_ea: Ea,
    pub end_ea: Ea,
    pub description: String,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct SignatureInfo {
    pub ea: Ea,
    pub name: String,
    pub length: u64,
}

#[derive(Debug, Clone)]
pub struct StackVarInfo {
    pub func_ea: Ea,
    pub name: String,
    pub offset: i64,
    pub size: u64,
    pub is_arg: bool,
}

/// One element of a parsed `search_bytes` pattern: a literal byte, a
/// whole-byte wildcard (`?`/`??`), or an alternative set (`( a b c )`). No
/// nibble wildcards, no regex (§4.A).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternByte {
    Exact(u8),
    Any,
    OneOf(Vec<u8>),
}

/// A disassembled call site, used by `disasm_calls`/`disasm_loops` (§4.C).
#[derive(Debug, Clone)]
pub struct CallSite {
    pub func_ea: Ea,
    pub call_ea: Ea,
    pub callee_ea: Option<Ea>,
    pub callee_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoopInfo {
    pub func_ea: Ea,
    pub header_ea: Ea,
    pub back_edge_ea: Ea,
}

impl fmt::Display for UndoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "undo#{}", self.0)
    }
}

/// The capability set the rest of the engine consumes (§4.A). A `for_each_*`
/// callback returns `true` to keep iterating, `false` to stop early —
/// TVFs and LIMIT-aware scans rely on that to avoid materializing the whole
/// workspace.
pub trait WorkspaceAdapter {
    // -- enumerate by index (O(1) random access where the host provides it) --
    fn func_qty(&self) -> usize;
    fn func_at_index(&self, i: usize) -> Option<FunctionInfo>;
    fn segment_qty(&self) -> usize;
    fn segment_at_index(&self, i: usize) -> Option<SegmentInfo>;

    // -- enumerate by traversal --
    fn for_each_function(&self, f: &mut dyn FnMut(&FunctionInfo) -> bool);
    fn for_each_segment(&self, f: &mut dyn FnMut(&SegmentInfo) -> bool);
    fn for_each_name(&self, f: &mut dyn FnMut(Ea, &str) -> bool);
    fn for_each_entry(&self, f: &mut dyn FnMut(&EntryInfo) -> bool);
    fn for_each_import(&self, f: &mut dyn FnMut(&ImportInfo) -> bool);
    fn for_each_string(&self, f: &mut dyn FnMut(&StringInfo) -> bool);
    fn for_each_xref(&self, f: &mut dyn FnMut(&XrefInfo) -> bool);
    fn for_each_xref_to(&self, to_ea: Ea, f: &mut dyn FnMut(&XrefInfo) -> bool);
    fn for_each_xref_from(&self, from_ea: Ea, f: &mut dyn FnMut(&XrefInfo) -> bool);
    fn for_each_bookmark(&self, f: &mut dyn FnMut(&BookmarkInfo) -> bool);
    fn for_each_comment(&self, f: &mut dyn FnMut(Ea, CommentFlavor, &str) -> bool);
    fn for_each_breakpoint(&self, f: &mut dyn FnMut(&BreakpointInfo) -> bool);
    fn for_each_type(&self, f: &mut dyn FnMut(&TypeInfo) -> bool);
    fn for_each_type_member(&self, type_ordinal: i64, f: &mut dyn FnMut(&TypeMemberInfo) -> bool);
    fn for_each_enum_value(&self, type_ordinal: i64, f: &mut dyn FnMut(&EnumValueInfo) -> bool);
    fn for_each_func_arg(&self, type_ordinal: i64, f: &mut dyn FnMut(&FuncArgInfo) -> bool);
    fn for_each_fixup(&self, f: &mut dyn FnMut(&FixupInfo) -> bool);
    fn for_each_fchunk(&self, func_ea: Ea, f: &mut dyn FnMut(&FchunkInfo) -> bool);
    fn for_each_problem(&self, f: &mut dyn FnMut(&ProblemInfo) -> bool);
    fn for_each_hidden_range(&self, f: &mut dyn FnMut(&HiddenRangeInfo) -> bool);
    fn for_each_signature(&self, f: &mut dyn FnMut(&SignatureInfo) -> bool);
    fn for_each_stack_var(&self, func_ea: Ea, f: &mut dyn FnMut(&StackVarInfo) -> bool);

    // -- address -> object --
    fn func_containing(&self, ea: Ea) -> Option<FunctionInfo>;
    fn segment_containing(&self, ea: Ea) -> Option<SegmentInfo>;
    fn name_at(&self, ea: Ea) -> Option<String>;
    fn comment_at(&self, ea: Ea, flavor: CommentFlavor) -> Option<String>;
    fn item_type(&self, ea: Ea) -> Option<String>;
    fn item_size(&self, ea: Ea) -> Option<u64>;
    fn is_code(&self, ea: Ea) -> bool;
    fn is_data(&self, ea: Ea) -> bool;

    // -- decode --
    fn decode_instruction(&self, ea: Ea) -> Option<InstructionInfo>;
    fn disassemble_line(&self, ea: Ea) -> Option<String>;
    fn bytes(&self, ea: Ea, n: usize) -> Option<Vec<u8>>;
    fn next_head(&self, ea: Ea) -> Option<Ea>;
    fn prev_head(&self, ea: Ea) -> Option<Ea>;

    // -- search --
    fn search_bytes(
        &self,
        pattern: &[PatternByte],
        start: Option<Ea>,
        end: Option<Ea>,
    ) -> Vec<Ea>;

    // -- basic blocks / disasm-level analysis --
    fn basic_blocks(&self, func_ea: Ea) -> Vec<BlockInfo>;
    fn call_sites(&self, func_ea: Ea) -> Vec<CallSite>;
    fn loops(&self, func_ea: Ea) -> Vec<LoopInfo>;

    // -- decompile --
    fn decompile(&self, ea: Ea, force: bool) -> EngineResult<DecompileResult>;
    fn set_lvar_name(&self, func_ea: Ea, idx: i64, name: &str) -> EngineResult<()>;
    fn set_lvar_type(&self, func_ea: Ea, idx: i64, type_name: &str) -> EngineResult<()>;
    fn set_pseudo_comment(
        &self,
        func_ea: Ea,
        ea: Ea,
        text: &str,
        placement: CommentPlacement,
    ) -> EngineResult<()>;
    fn clear_pseudo_comment(&self, func_ea: Ea, ea: Ea) -> EngineResult<()>;
    fn force_rebuild(&self, func_ea: Ea);

    // -- mutate: names / comments --
    fn set_name(&self, ea: Ea, name: &str) -> EngineResult<()>;
    fn delete_name(&self, ea: Ea) -> EngineResult<()>;
    fn set_comment(&self, ea: Ea, flavor: CommentFlavor, text: &str) -> EngineResult<()>;
    fn delete_comment(&self, ea: Ea, flavor: CommentFlavor) -> EngineResult<()>;

    // -- mutate: functions --
    fn create_function(&self, ea: Ea, end_ea: Option<Ea>, name: Option<&str>) -> EngineResult<Ea>;
    fn delete_function(&self, ea: Ea) -> EngineResult<()>;
    fn rename_function(&self, ea: Ea, name: &str) -> EngineResult<()>;
    fn set_function_flags(&self, ea: Ea, flags: u32) -> EngineResult<()>;
    fn delete_instruction(&self, ea: Ea) -> EngineResult<()>;

    // -- mutate: segments --
    fn set_segment_name(&self, start_ea: Ea, name: &str) -> EngineResult<()>;
    fn set_segment_class(&self, start_ea: Ea, class: &str) -> EngineResult<()>;
    fn set_segment_perm(&self, start_ea: Ea, perm: u8) -> EngineResult<()>;
    fn delete_segment(&self, start_ea: Ea) -> EngineResult<()>;

    // -- mutate: bookmarks --
    fn create_bookmark(&self, slot: Option<i64>, ea: Ea, description: &str) -> EngineResult<i64>;
    fn set_bookmark_description(&self, slot: i64, description: &str) -> EngineResult<()>;
    fn delete_bookmark(&self, slot: i64) -> EngineResult<()>;

    // -- mutate: breakpoints --
    fn create_breakpoint(&self, bp: BreakpointInfo) -> EngineResult<i64>;
    fn update_breakpoint(&self, bptid: i64, bp: BreakpointInfo) -> EngineResult<()>;
    fn delete_breakpoint(&self, bptid: i64) -> EngineResult<()>;

    // -- mutate: types --
    fn create_type(&self, name: &str, kind: TypeKind, size: u64) -> EngineResult<i64>;
    fn update_type(&self, ordinal: i64, name: &str, size: u64) -> EngineResult<()>;
    fn delete_type(&self, ordinal: i64) -> EngineResult<()>;
    fn create_type_member(&self, member: TypeMemberInfo) -> EngineResult<()>;
    fn update_type_member(&self, type_ordinal: i64, member_name: &str, member: TypeMemberInfo) -> EngineResult<()>;
    fn delete_type_member(&self, type_ordinal: i64, member_name: &str) -> EngineResult<()>;
    fn create_enum_value(&self, value: EnumValueInfo) -> EngineResult<()>;
    fn update_enum_value(&self, type_ordinal: i64, value_name: &str, value: EnumValueInfo) -> EngineResult<()>;
    fn delete_enum_value(&self, type_ordinal: i64, value_name: &str) -> EngineResult<()>;

    // -- mutate: stack variables --
    fn rename_stack_var(&self, func_ea: Ea, name: &str, new_name: &str) -> EngineResult<()>;

    // -- strings --
    fn string_count(&self) -> usize;
    fn rebuild_strings(&self, min_length: u32, type_mask: u32) -> EngineResult<usize>;

    // -- undo --
    fn open_undo(&self, label: &str) -> UndoHandle;
    fn close_undo(&self, handle: UndoHandle);

    // -- persistence --
    fn save_database(&self) -> bool;
}
