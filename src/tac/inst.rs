//! 各种形状的 TAC 指令
//!
//! 字段私有，构造函数和每个 setter 都会重新检查操作数形状，不合法立即返回
//! `IrError::IllegalOperand`，对象保持原样。

use crate::cfg::BlockId;
use crate::error::{IrError, IrResult};
use super::Opcode;
use super::operand::{OperandClass, OperandKind, classify};

fn require(opcode: Opcode, slot: &'static str, expected: OperandClass, operand: String) -> IrResult<String> {
    if expected.check(&operand) {
        Ok(operand)
    } else {
        Err(IrError::IllegalOperand {
            opcode,
            slot,
            expected,
            operand,
        })
    }
}

/// 条件跳转的比较运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// `==` / `!=` 可以比较任意值，大小比较只接受变量或整数
    pub fn operand_class(&self) -> OperandClass {
        match self {
            CompareOp::Eq | CompareOp::Ne => OperandClass::Value,
            _ => OperandClass::VariableOrInt,
        }
    }
}

/// `if L OP R goto Bt else Bf;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInst {
    op: CompareOp,
    left: String,
    right: String,
    on_true: BlockId,
    on_false: BlockId,
}

impl BranchInst {
    pub fn new(
        op: CompareOp,
        left: impl Into<String>,
        right: impl Into<String>,
        on_true: BlockId,
        on_false: BlockId,
    ) -> IrResult<Self> {
        let class = op.operand_class();
        Ok(Self {
            op,
            left: require(Opcode::Branch, "left operand", class, left.into())?,
            right: require(Opcode::Branch, "right operand", class, right.into())?,
            on_true,
            on_false,
        })
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &str {
        &self.right
    }

    pub fn on_true(&self) -> BlockId {
        self.on_true
    }

    pub fn on_false(&self) -> BlockId {
        self.on_false
    }

    /// 换比较运算时两个操作数也要满足新运算的要求
    pub fn set_op(&mut self, op: CompareOp) -> IrResult<()> {
        let class = op.operand_class();
        require(Opcode::Branch, "left operand", class, self.left.clone())?;
        require(Opcode::Branch, "right operand", class, self.right.clone())?;
        self.op = op;
        Ok(())
    }

    pub fn set_left(&mut self, left: impl Into<String>) -> IrResult<()> {
        self.left = require(Opcode::Branch, "left operand", self.op.operand_class(), left.into())?;
        Ok(())
    }

    pub fn set_right(&mut self, right: impl Into<String>) -> IrResult<()> {
        self.right = require(Opcode::Branch, "right operand", self.op.operand_class(), right.into())?;
        Ok(())
    }

    pub fn set_targets(&mut self, on_true: BlockId, on_false: BlockId) {
        self.on_true = on_true;
        self.on_false = on_false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// 标号
    Direct(String),
    /// 保存函数地址的变量
    Indirect(String),
}

/// `[d = ]call Label;` 或 `[d = ]call *v;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInst {
    target: CallTarget,
    dest: Option<String>,
}

impl CallInst {
    pub fn direct(label: impl Into<String>, dest: Option<String>) -> IrResult<Self> {
        let target = require(Opcode::Call, "target", OperandClass::Label, label.into())?;
        Self::with_target(CallTarget::Direct(target), dest)
    }

    pub fn indirect(target: impl Into<String>, dest: Option<String>) -> IrResult<Self> {
        let target = require(Opcode::CallIndirect, "target", OperandClass::Variable, target.into())?;
        Self::with_target(CallTarget::Indirect(target), dest)
    }

    fn with_target(target: CallTarget, dest: Option<String>) -> IrResult<Self> {
        let mut call = Self { target, dest: None };
        call.set_dest(dest)?;
        Ok(call)
    }

    pub fn opcode(&self) -> Opcode {
        match self.target {
            CallTarget::Direct(_) => Opcode::Call,
            CallTarget::Indirect(_) => Opcode::CallIndirect,
        }
    }

    pub fn target(&self) -> &CallTarget {
        &self.target
    }

    pub fn dest(&self) -> Option<&str> {
        self.dest.as_deref()
    }

    pub fn set_dest(&mut self, dest: Option<String>) -> IrResult<()> {
        self.dest = match dest {
            Some(d) => Some(require(self.opcode(), "destination", OperandClass::Variable, d)?),
            None => None,
        };
        Ok(())
    }

    pub fn set_target(&mut self, target: CallTarget) -> IrResult<()> {
        let target = match target {
            CallTarget::Direct(label) => {
                CallTarget::Direct(require(Opcode::Call, "target", OperandClass::Label, label)?)
            }
            CallTarget::Indirect(var) => {
                CallTarget::Indirect(require(Opcode::CallIndirect, "target", OperandClass::Variable, var)?)
            }
        };
        self.target = target;
        Ok(())
    }
}

/// `return;` / `return v;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnInst {
    value: Option<String>,
}

impl ReturnInst {
    pub fn new(value: Option<String>) -> IrResult<Self> {
        let mut ret = Self { value: None };
        ret.set_value(value)?;
        Ok(ret)
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<String>) -> IrResult<()> {
        self.value = match value {
            Some(v) => Some(require(Opcode::Return, "value", OperandClass::Value, v)?),
            None => None,
        };
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    /// `param v;`
    Standard,
    /// `param &v;`
    Reference,
    /// `errparam v;`
    Error,
}

impl ParamMode {
    pub fn opcode(&self) -> Opcode {
        match self {
            ParamMode::Standard => Opcode::Param,
            ParamMode::Reference => Opcode::RefParam,
            ParamMode::Error => Opcode::ErrParam,
        }
    }

    fn operand_class(&self) -> OperandClass {
        match self {
            ParamMode::Standard => OperandClass::Value,
            ParamMode::Reference => OperandClass::Variable,
            ParamMode::Error => OperandClass::VariableOrIndex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInst {
    mode: ParamMode,
    value: String,
}

impl ParamInst {
    pub fn new(mode: ParamMode, value: impl Into<String>) -> IrResult<Self> {
        let value = require(mode.opcode(), "value", mode.operand_class(), value.into())?;
        Ok(Self { mode, value })
    }

    pub fn mode(&self) -> ParamMode {
        self.mode
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) -> IrResult<()> {
        self.value = require(self.mode.opcode(), "value", self.mode.operand_class(), value.into())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// `d = s;`
    Var,
    /// `d = c;`
    Const,
    /// `d = &Label;`
    Address,
}

impl LoadKind {
    pub fn opcode(&self) -> Opcode {
        match self {
            LoadKind::Var => Opcode::LoadVar,
            LoadKind::Const => Opcode::LoadConst,
            LoadKind::Address => Opcode::LoadAddress,
        }
    }

    fn source_class(&self) -> OperandClass {
        match self {
            LoadKind::Var => OperandClass::Variable,
            LoadKind::Const => OperandClass::Constant,
            LoadKind::Address => OperandClass::Label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadInst {
    kind: LoadKind,
    dest: String,
    src: String,
}

impl LoadInst {
    pub fn new(kind: LoadKind, dest: impl Into<String>, src: impl Into<String>) -> IrResult<Self> {
        let opcode = kind.opcode();
        Ok(Self {
            kind,
            dest: require(opcode, "destination", OperandClass::Variable, dest.into())?,
            src: require(opcode, "source", kind.source_class(), src.into())?,
        })
    }

    pub fn kind(&self) -> LoadKind {
        self.kind
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn set_dest(&mut self, dest: impl Into<String>) -> IrResult<()> {
        self.dest = require(self.kind.opcode(), "destination", OperandClass::Variable, dest.into())?;
        Ok(())
    }

    pub fn set_src(&mut self, src: impl Into<String>) -> IrResult<()> {
        self.src = require(self.kind.opcode(), "source", self.kind.source_class(), src.into())?;
        Ok(())
    }
}

/// `d = b[i];`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEntryInst {
    dest: String,
    base: String,
    index: String,
}

impl LoadEntryInst {
    pub fn new(dest: impl Into<String>, base: impl Into<String>, index: impl Into<String>) -> IrResult<Self> {
        Ok(Self {
            dest: require(Opcode::LoadEntry, "destination", OperandClass::Variable, dest.into())?,
            base: require(Opcode::LoadEntry, "base", OperandClass::Variable, base.into())?,
            index: require(Opcode::LoadEntry, "index", OperandClass::VariableOrIndex, index.into())?,
        })
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn set_dest(&mut self, dest: impl Into<String>) -> IrResult<()> {
        self.dest = require(Opcode::LoadEntry, "destination", OperandClass::Variable, dest.into())?;
        Ok(())
    }

    pub fn set_base(&mut self, base: impl Into<String>) -> IrResult<()> {
        self.base = require(Opcode::LoadEntry, "base", OperandClass::Variable, base.into())?;
        Ok(())
    }

    pub fn set_index(&mut self, index: impl Into<String>) -> IrResult<()> {
        self.index = require(Opcode::LoadEntry, "index", OperandClass::VariableOrIndex, index.into())?;
        Ok(())
    }
}

/// `b[i] = s;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntryInst {
    base: String,
    index: String,
    src: String,
}

impl StoreEntryInst {
    pub fn new(base: impl Into<String>, index: impl Into<String>, src: impl Into<String>) -> IrResult<Self> {
        Ok(Self {
            base: require(Opcode::StoreEntry, "base", OperandClass::Variable, base.into())?,
            index: require(Opcode::StoreEntry, "index", OperandClass::VariableOrIndex, index.into())?,
            src: require(Opcode::StoreEntry, "source", OperandClass::Value, src.into())?,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn set_base(&mut self, base: impl Into<String>) -> IrResult<()> {
        self.base = require(Opcode::StoreEntry, "base", OperandClass::Variable, base.into())?;
        Ok(())
    }

    pub fn set_index(&mut self, index: impl Into<String>) -> IrResult<()> {
        self.index = require(Opcode::StoreEntry, "index", OperandClass::VariableOrIndex, index.into())?;
        Ok(())
    }

    pub fn set_src(&mut self, src: impl Into<String>) -> IrResult<()> {
        self.src = require(Opcode::StoreEntry, "source", OperandClass::Value, src.into())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryTacOp {
    Neg,
    Not,
}

impl UnaryTacOp {
    pub fn opcode(&self) -> Opcode {
        match self {
            UnaryTacOp::Neg => Opcode::Neg,
            UnaryTacOp::Not => Opcode::Not,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryTacOp::Neg => "-",
            UnaryTacOp::Not => "!",
        }
    }

    fn operand_class(&self) -> OperandClass {
        match self {
            UnaryTacOp::Neg => OperandClass::VariableOrInt,
            UnaryTacOp::Not => OperandClass::VariableOrBool,
        }
    }
}

/// `d = -s;` / `d = !s;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryInst {
    op: UnaryTacOp,
    dest: String,
    operand: String,
}

impl UnaryInst {
    pub fn new(op: UnaryTacOp, dest: impl Into<String>, operand: impl Into<String>) -> IrResult<Self> {
        Ok(Self {
            op,
            dest: require(op.opcode(), "destination", OperandClass::Variable, dest.into())?,
            operand: require(op.opcode(), "operand", op.operand_class(), operand.into())?,
        })
    }

    pub fn op(&self) -> UnaryTacOp {
        self.op
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn operand(&self) -> &str {
        &self.operand
    }

    /// 操作数是否为整数常量，渲染时要加括号
    pub fn has_int_operand(&self) -> bool {
        matches!(classify(&self.operand), Some(OperandKind::Int(_)))
    }

    pub fn set_dest(&mut self, dest: impl Into<String>) -> IrResult<()> {
        self.dest = require(self.op.opcode(), "destination", OperandClass::Variable, dest.into())?;
        Ok(())
    }

    pub fn set_operand(&mut self, operand: impl Into<String>) -> IrResult<()> {
        self.operand = require(self.op.opcode(), "operand", self.op.operand_class(), operand.into())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryTacOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
}

impl BinaryTacOp {
    pub fn opcode(&self) -> Opcode {
        match self {
            BinaryTacOp::Add => Opcode::Add,
            BinaryTacOp::Sub => Opcode::Sub,
            BinaryTacOp::Mul => Opcode::Mul,
            BinaryTacOp::Div => Opcode::Div,
            BinaryTacOp::Mod => Opcode::Mod,
            BinaryTacOp::And => Opcode::And,
            BinaryTacOp::Or => Opcode::Or,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryTacOp::Add => "+",
            BinaryTacOp::Sub => "-",
            BinaryTacOp::Mul => "*",
            BinaryTacOp::Div => "/",
            BinaryTacOp::Mod => "%",
            BinaryTacOp::And => "&&",
            BinaryTacOp::Or => "||",
        }
    }

    fn operand_class(&self) -> OperandClass {
        match self {
            BinaryTacOp::And | BinaryTacOp::Or => OperandClass::VariableOrBool,
            _ => OperandClass::VariableOrInt,
        }
    }
}

/// `d = l OP r;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryInst {
    op: BinaryTacOp,
    dest: String,
    left: String,
    right: String,
}

impl BinaryInst {
    pub fn new(
        op: BinaryTacOp,
        dest: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> IrResult<Self> {
        let opcode = op.opcode();
        let class = op.operand_class();
        Ok(Self {
            op,
            dest: require(opcode, "destination", OperandClass::Variable, dest.into())?,
            left: require(opcode, "left operand", class, left.into())?,
            right: require(opcode, "right operand", class, right.into())?,
        })
    }

    pub fn op(&self) -> BinaryTacOp {
        self.op
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &str {
        &self.right
    }

    pub fn set_dest(&mut self, dest: impl Into<String>) -> IrResult<()> {
        self.dest = require(self.op.opcode(), "destination", OperandClass::Variable, dest.into())?;
        Ok(())
    }

    pub fn set_left(&mut self, left: impl Into<String>) -> IrResult<()> {
        self.left = require(self.op.opcode(), "left operand", self.op.operand_class(), left.into())?;
        Ok(())
    }

    pub fn set_right(&mut self, right: impl Into<String>) -> IrResult<()> {
        self.right = require(self.op.opcode(), "right operand", self.op.operand_class(), right.into())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_operands() {
        assert!(BinaryInst::new(BinaryTacOp::Add, "$t0", "a$l", "3").is_ok());
        let err = BinaryInst::new(BinaryTacOp::Add, "$t0", "a$l", "true").unwrap_err();
        assert_eq!(
            err,
            IrError::IllegalOperand {
                opcode: Opcode::Add,
                slot: "right operand",
                expected: OperandClass::VariableOrInt,
                operand: "true".to_string(),
            }
        );
        assert!(BinaryInst::new(BinaryTacOp::Or, "$t0", "false", "b$p").is_ok());
        assert!(BinaryInst::new(BinaryTacOp::And, "$t0", "1", "b$p").is_err());
        assert!(BinaryInst::new(BinaryTacOp::Mul, "5", "1", "2").is_err());
    }

    #[test]
    fn test_setter_failure_keeps_value() {
        let mut inst = LoadEntryInst::new("$t1", "arr$l", "2").unwrap();
        assert!(inst.set_index("-1").is_err());
        assert_eq!(inst.index(), "2");
        inst.set_index("i$l").unwrap();
        assert_eq!(inst.index(), "i$l");
    }

    #[test]
    fn test_branch_operand_classes() {
        let b1 = BlockId::new(1);
        let b2 = BlockId::new(2);
        assert!(BranchInst::new(CompareOp::Eq, "s$l", "null", b1, b2).is_ok());
        assert!(BranchInst::new(CompareOp::Lt, "s$l", "null", b1, b2).is_err());

        let mut branch = BranchInst::new(CompareOp::Ne, "x$l", "\"a\"", b1, b2).unwrap();
        assert!(branch.set_op(CompareOp::Ge).is_err());
        assert_eq!(branch.op(), CompareOp::Ne);
    }

    #[test]
    fn test_call_and_param_shapes() {
        assert!(CallInst::direct("Main.main", None).is_ok());
        assert!(CallInst::direct("f$l", None).is_err());
        let call = CallInst::indirect("$t4", Some("r$l".to_string())).unwrap();
        assert_eq!(call.opcode(), Opcode::CallIndirect);
        assert!(CallInst::indirect("Main.main", None).is_err());

        assert!(ParamInst::new(ParamMode::Standard, "\"hi\"").is_ok());
        assert!(ParamInst::new(ParamMode::Reference, "3").is_err());
        assert!(ParamInst::new(ParamMode::Error, "0").is_ok());
        assert!(ParamInst::new(ParamMode::Error, "-2").is_err());
    }

    #[test]
    fn test_load_kinds() {
        assert!(LoadInst::new(LoadKind::Const, "$t0", "null").is_ok());
        assert!(LoadInst::new(LoadKind::Const, "$t0", "y$l").is_err());
        assert!(LoadInst::new(LoadKind::Address, "$t0", "Main.run").is_ok());
        assert!(LoadInst::new(LoadKind::Var, "$t0", "7").is_err());
        assert!(UnaryInst::new(UnaryTacOp::Not, "$t0", "true").is_ok());
        assert!(UnaryInst::new(UnaryTacOp::Neg, "$t0", "true").is_err());
    }
}
