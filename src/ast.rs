//! Bantam 抽象语法树
//!
//! 由外部语法分析器构造。类型检查器会把推断出的类型写回每个表达式的 `ty` 字段。

use crate::types::{ParameterInfo, Type};

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<String>,
    pub filename: String,
    pub members: Vec<ClassMember>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Method(MethodDecl),
    Field(FieldDecl),
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<ParameterInfo>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub field_type: Type,
    pub initializer: Option<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    VarDecl(VarDecl),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Block(Block),
    Break(usize),
}

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub var_type: Type,
    pub initializer: Option<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Expr>,
    pub condition: Option<Expr>,
    pub update: Option<Expr>,
    pub body: Box<Stmt>,
    pub line: usize,
}

/// 表达式节点：种类 + 行号 + 类型检查后填入的类型
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// `recv.method(args)`，没有接收者时是隐式 `this`
    Dispatch {
        receiver: Option<Box<Expr>>,
        method: String,
        args: Vec<Expr>,
    },
    New {
        class_name: String,
    },
    NewArray {
        element_type: Type,
        size: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        target: Type,
    },
    Cast {
        target: Type,
        expr: Box<Expr>,
    },
    /// `[qualifier.]name = value`，qualifier 为 this、super 或类名
    Assign {
        qualifier: Option<String>,
        name: String,
        value: Box<Expr>,
    },
    ArrayAssign {
        qualifier: Option<String>,
        name: String,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `[object.]name`；`this` 与 `super` 也用它表示
    Var {
        object: Option<Box<Expr>>,
        name: String,
    },
    ArrayElem {
        object: Option<Box<Expr>>,
        name: String,
        index: Box<Expr>,
    },
    IntConst(i32),
    BoolConst(bool),
    StringConst(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    PreIncr,
    PreDecr,
    PostIncr,
    PostDecr,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// 操作数必须统一为的类型；`==`/`!=` 没有，只要求两边互相兼容
    pub fn operand_type(&self) -> Option<Type> {
        match self {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => Some(Type::Int),
            BinaryOp::And | BinaryOp::Or => Some(Type::Boolean),
            BinaryOp::Eq | BinaryOp::Ne => None,
        }
    }

    pub fn result_type(&self) -> Type {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => Type::Int,
            _ => Type::Boolean,
        }
    }
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::PreIncr | UnaryOp::PostIncr => "++",
            UnaryOp::PreDecr | UnaryOp::PostDecr => "--",
        }
    }

    pub fn operand_type(&self) -> Type {
        match self {
            UnaryOp::Not => Type::Boolean,
            _ => Type::Int,
        }
    }

    /// 自增自减要求操作数是变量或数组元素
    pub fn needs_lvalue(&self) -> bool {
        !matches!(self, UnaryOp::Neg | UnaryOp::Not)
    }
}

impl Expr {
    pub fn new(kind: ExprKind, line: usize) -> Self {
        Self { kind, line, ty: None }
    }

    pub fn int(value: i32, line: usize) -> Self {
        Self::new(ExprKind::IntConst(value), line)
    }

    pub fn boolean(value: bool, line: usize) -> Self {
        Self::new(ExprKind::BoolConst(value), line)
    }

    pub fn string(value: impl Into<String>, line: usize) -> Self {
        Self::new(ExprKind::StringConst(value.into()), line)
    }

    pub fn null(line: usize) -> Self {
        Self::new(ExprKind::Null, line)
    }

    pub fn var(name: impl Into<String>, line: usize) -> Self {
        Self::new(
            ExprKind::Var {
                object: None,
                name: name.into(),
            },
            line,
        )
    }

    pub fn this(line: usize) -> Self {
        Self::var("this", line)
    }

    pub fn field(object: Expr, name: impl Into<String>, line: usize) -> Self {
        Self::new(
            ExprKind::Var {
                object: Some(Box::new(object)),
                name: name.into(),
            },
            line,
        )
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr, line: usize) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            line,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr, line: usize) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            line,
        )
    }

    pub fn assign(name: impl Into<String>, value: Expr, line: usize) -> Self {
        Self::new(
            ExprKind::Assign {
                qualifier: None,
                name: name.into(),
                value: Box::new(value),
            },
            line,
        )
    }

    pub fn call(receiver: Option<Expr>, method: impl Into<String>, args: Vec<Expr>, line: usize) -> Self {
        Self::new(
            ExprKind::Dispatch {
                receiver: receiver.map(Box::new),
                method: method.into(),
                args,
            },
            line,
        )
    }

    pub fn new_object(class_name: impl Into<String>, line: usize) -> Self {
        Self::new(
            ExprKind::New {
                class_name: class_name.into(),
            },
            line,
        )
    }

    /// 是否可以作为自增自减的操作数
    pub fn is_lvalue(&self) -> bool {
        match &self.kind {
            ExprKind::Var { name, .. } => name != "this" && name != "super",
            ExprKind::ArrayElem { .. } => true,
            _ => false,
        }
    }
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, parent: Option<&str>, filename: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            filename: filename.into(),
            members: Vec::new(),
            line,
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Method(method) => Some(method),
            ClassMember::Field(_) => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Field(field) => Some(field),
            ClassMember::Method(_) => None,
        })
    }
}

impl Program {
    pub fn find_class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.iter().find(|c| c.name == name)
    }
}
