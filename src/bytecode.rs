//! Descriptor of Lama-style bytecode: opcode groups and the decoded
//! instruction shape the dispatcher matches on.

use crate::frame::Namespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Leq,
    Gt,
    Geq,
    Eq,
    Neq,
    And, // &&, true iff both operands are non-zero
    Or,  // !!, true iff either operand is non-zero
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(variant: u8) -> Result<Self, u8> {
        match variant {
            1 => Ok(Op::Add),
            2 => Ok(Op::Sub),
            3 => Ok(Op::Mul),
            4 => Ok(Op::Div),
            5 => Ok(Op::Mod),
            6 => Ok(Op::Lt),
            7 => Ok(Op::Leq),
            8 => Ok(Op::Gt),
            9 => Ok(Op::Geq),
            10 => Ok(Op::Eq),
            11 => Ok(Op::Neq),
            12 => Ok(Op::And),
            13 => Ok(Op::Or),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareJumpKind {
    IsZero,
    IsNonZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Read,
    Write,
    Length,
    String,
    Array,
    Elem,
}

impl TryFrom<u8> for Builtin {
    type Error = u8;

    fn try_from(variant: u8) -> Result<Self, u8> {
        match variant {
            0 => Ok(Builtin::Read),
            1 => Ok(Builtin::Write),
            2 => Ok(Builtin::Length),
            3 => Ok(Builtin::String),
            4 => Ok(Builtin::Array),
            5 => Ok(Builtin::Elem),
            other => Err(other),
        }
    }
}

/// The seven `PATT` variants. `StringEq` additionally pops a second
/// operand to compare against (see `Value::strings_equal`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PattKind {
    StringEq,
    IsString,
    IsArray,
    IsSexp,
    IsNotInt,
    IsInt,
    IsClosure,
}

impl TryFrom<u8> for PattKind {
    type Error = u8;

    fn try_from(variant: u8) -> Result<Self, u8> {
        match variant {
            0 => Ok(PattKind::StringEq),
            1 => Ok(PattKind::IsString),
            2 => Ok(PattKind::IsArray),
            3 => Ok(PattKind::IsSexp),
            4 => Ok(PattKind::IsNotInt),
            5 => Ok(PattKind::IsInt),
            6 => Ok(PattKind::IsClosure),
            other => Err(other),
        }
    }
}

/// One designator inside a `CLOSURE` instruction: which namespace slot in
/// the *caller's* frame to snapshot into the new closure's capture list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedVar {
    pub namespace: Namespace,
    pub index: u32,
}

/// A fully-decoded instruction, independent of its byte-level encoding.
#[derive(Debug, Clone)]
pub enum Instruction {
    Binop(Op),
    Const(i32),
    String(u32),
    Sexp {
        tag_offset: u32,
        arity: u32,
    },
    Sti,
    Sta,
    Jmp(u32),
    End,
    Ret,
    Drop,
    Dup,
    Swap,
    Elem,
    Load {
        namespace: Namespace,
        index: u32,
    },
    Loadref {
        namespace: Namespace,
        index: u32,
    },
    Store {
        namespace: Namespace,
        index: u32,
    },
    Cjmp {
        kind: CompareJumpKind,
        target: u32,
    },
    Begin {
        args: u32,
        locals: u32,
    },
    Cbegin {
        args: u32,
        locals: u32,
    },
    Closure {
        code_ip: u32,
        captures: Vec<CapturedVar>,
    },
    Callc {
        args: u32,
    },
    Call {
        code_ip: u32,
        args: u32,
    },
    Tag {
        name_offset: u32,
        arity: u32,
    },
    Array {
        size: u32,
    },
    /// The `array` built-in: reads its own INT32 element count and builds
    /// an Array from that many popped values (distinct from the `Array`
    /// length-check instruction above, which shares no decode path with it).
    ArrayBuiltin {
        size: u32,
    },
    Fail {
        line: i32,
        col: i32,
    },
    Line(i32),
    Patt(PattKind),
    CallBuiltin(Builtin),
    Stop,
}
