//! 三地址码
//!
//! 每条指令是一个固定形状的记录加一组调试注释。渲染出的文本是规范形式，
//! `parse` 模块可以把它原样解析回来。

mod inst;
pub mod operand;
mod parse;

use std::fmt;

pub use inst::{
    BinaryInst, BinaryTacOp, BranchInst, CallInst, CallTarget, CompareOp, LoadEntryInst, LoadInst, LoadKind,
    ParamInst, ParamMode, ReturnInst, StoreEntryInst, UnaryInst, UnaryTacOp,
};
pub use operand::{OperandClass, OperandKind, TacToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Branch,
    Call,
    CallIndirect,
    Return,
    Param,
    RefParam,
    ErrParam,
    LoadVar,
    LoadConst,
    LoadAddress,
    LoadEntry,
    StoreEntry,
    Neg,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Branch => "branch",
            Opcode::Call => "call",
            Opcode::CallIndirect => "indirect call",
            Opcode::Return => "return",
            Opcode::Param => "param",
            Opcode::RefParam => "reference param",
            Opcode::ErrParam => "error param",
            Opcode::LoadVar => "load",
            Opcode::LoadConst => "load constant",
            Opcode::LoadAddress => "load address",
            Opcode::LoadEntry => "load entry",
            Opcode::StoreEntry => "store entry",
            Opcode::Neg => "negate",
            Opcode::Not => "not",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::And => "and",
            Opcode::Or => "or",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TacKind {
    Branch(BranchInst),
    Call(CallInst),
    Return(ReturnInst),
    Param(ParamInst),
    Load(LoadInst),
    LoadEntry(LoadEntryInst),
    StoreEntry(StoreEntryInst),
    Unary(UnaryInst),
    Binary(BinaryInst),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TacInst {
    kind: TacKind,
    comments: Vec<String>,
}

impl TacInst {
    pub fn new(kind: TacKind) -> Self {
        Self {
            kind,
            comments: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.add_comment(comment);
        self
    }

    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn kind(&self) -> &TacKind {
        &self.kind
    }

    pub fn opcode(&self) -> Opcode {
        match &self.kind {
            TacKind::Branch(_) => Opcode::Branch,
            TacKind::Call(call) => call.opcode(),
            TacKind::Return(_) => Opcode::Return,
            TacKind::Param(param) => param.mode().opcode(),
            TacKind::Load(load) => load.kind().opcode(),
            TacKind::LoadEntry(_) => Opcode::LoadEntry,
            TacKind::StoreEntry(_) => Opcode::StoreEntry,
            TacKind::Unary(unary) => unary.op().opcode(),
            TacKind::Binary(binary) => binary.op().opcode(),
        }
    }

    pub fn as_branch(&self) -> Option<&BranchInst> {
        match &self.kind {
            TacKind::Branch(branch) => Some(branch),
            _ => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind, TacKind::Branch(_))
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, TacKind::Return(_))
    }
}

macro_rules! impl_from_shape {
    ($($shape:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$shape> for TacInst {
                fn from(inst: $shape) -> Self {
                    TacInst::new(TacKind::$variant(inst))
                }
            }
        )*
    };
}

impl_from_shape! {
    BranchInst => Branch,
    CallInst => Call,
    ReturnInst => Return,
    ParamInst => Param,
    LoadInst => Load,
    LoadEntryInst => LoadEntry,
    StoreEntryInst => StoreEntry,
    UnaryInst => Unary,
    BinaryInst => Binary,
}

impl fmt::Display for TacKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TacKind::Branch(b) => write!(
                f,
                "if {} {} {} goto {} else {};",
                b.left(),
                b.op().symbol(),
                b.right(),
                b.on_true(),
                b.on_false()
            ),
            TacKind::Call(call) => {
                if let Some(dest) = call.dest() {
                    write!(f, "{} = ", dest)?;
                }
                match call.target() {
                    CallTarget::Direct(label) => write!(f, "call {};", label),
                    CallTarget::Indirect(var) => write!(f, "call *{};", var),
                }
            }
            TacKind::Return(ret) => match ret.value() {
                Some(value) => write!(f, "return {};", value),
                None => write!(f, "return;"),
            },
            TacKind::Param(param) => match param.mode() {
                ParamMode::Standard => write!(f, "param {};", param.value()),
                ParamMode::Reference => write!(f, "param &{};", param.value()),
                ParamMode::Error => write!(f, "errparam {};", param.value()),
            },
            TacKind::Load(load) => match load.kind() {
                LoadKind::Address => write!(f, "{} = &{};", load.dest(), load.src()),
                LoadKind::Var | LoadKind::Const => write!(f, "{} = {};", load.dest(), load.src()),
            },
            TacKind::LoadEntry(load) => write!(f, "{} = {}[{}];", load.dest(), load.base(), load.index()),
            TacKind::StoreEntry(store) => write!(f, "{}[{}] = {};", store.base(), store.index(), store.src()),
            TacKind::Unary(unary) => {
                if unary.has_int_operand() {
                    write!(f, "{} = {}({});", unary.dest(), unary.op().symbol(), unary.operand())
                } else {
                    write!(f, "{} = {}{};", unary.dest(), unary.op().symbol(), unary.operand())
                }
            }
            TacKind::Binary(binary) => write!(
                f,
                "{} = {} {} {};",
                binary.dest(),
                binary.left(),
                binary.op().symbol(),
                binary.right()
            ),
        }
    }
}

/// 指令后跟注释：第一条与指令同行，其余各占一行
impl fmt::Display for TacInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for (i, comment) in self.comments.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  // {}", comment)?;
        }
        Ok(())
    }
}
