//! TAC 操作数词法与分类
//!
//! 操作数是纯文本。合法性只看字符串形状，不看类型：
//! - 变量：`this`、`x$l`（局部）、`x$p`（参数）、`x$f_Class`（字段）、临时量 `$t3` / `$o3`
//! - 常量：32 位整数、`true` / `false`、带双引号的字符串、`null`
//! - 标号：标识符，允许用 `.` 分隔（`Main.main`）
//!
//! 同一个词法器也用来切分整行指令文本，见 `parse`。

use std::fmt;

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\f\r\n]+")]
pub enum TacToken {
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[regex(r"-?[0-9]+")]
    Int,
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,
    #[regex(r"\$[to][0-9]+")]
    Temp,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*\$(l|p|f_[A-Za-z_][A-Za-z0-9_]*)")]
    Var,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+")]
    Dotted,

    #[token("=")]
    Assign,
    #[token(";")]
    Semi,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("&")]
    Amp,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    #[regex(r"//[^\n]*")]
    Comment,
}

/// 单个操作数的形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Variable,
    Int(i32),
    Bool,
    Str,
    Null,
    Label,
}

/// 某个操作数位置允许的形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandClass {
    Variable,
    /// 变量或任意常量
    Value,
    Constant,
    VariableOrInt,
    VariableOrBool,
    /// 变量或非负整数，用于下标
    VariableOrIndex,
    Label,
}

/// 给操作数分类；整串必须恰好是一个词法单元
pub fn classify(operand: &str) -> Option<OperandKind> {
    let mut lexer = TacToken::lexer(operand);
    let token = lexer.next()?.ok()?;
    if lexer.span() != (0..operand.len()) {
        return None;
    }

    match token {
        TacToken::This | TacToken::Var | TacToken::Temp => Some(OperandKind::Variable),
        TacToken::Int => operand.parse::<i32>().ok().map(OperandKind::Int),
        TacToken::True | TacToken::False => Some(OperandKind::Bool),
        TacToken::Str => Some(OperandKind::Str),
        TacToken::Null => Some(OperandKind::Null),
        TacToken::Ident | TacToken::Dotted => Some(OperandKind::Label),
        _ => None,
    }
}

pub fn is_variable(operand: &str) -> bool {
    classify(operand) == Some(OperandKind::Variable)
}

impl OperandClass {
    pub fn accepts(&self, kind: OperandKind) -> bool {
        use OperandKind as K;
        match self {
            OperandClass::Variable => kind == K::Variable,
            OperandClass::Value => kind != K::Label,
            OperandClass::Constant => matches!(kind, K::Int(_) | K::Bool | K::Str | K::Null),
            OperandClass::VariableOrInt => matches!(kind, K::Variable | K::Int(_)),
            OperandClass::VariableOrBool => matches!(kind, K::Variable | K::Bool),
            OperandClass::VariableOrIndex => match kind {
                K::Variable => true,
                K::Int(n) => n >= 0,
                _ => false,
            },
            OperandClass::Label => kind == K::Label,
        }
    }

    pub fn check(&self, operand: &str) -> bool {
        classify(operand).is_some_and(|kind| self.accepts(kind))
    }
}

impl fmt::Display for OperandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OperandClass::Variable => "a variable",
            OperandClass::Value => "a variable or constant",
            OperandClass::Constant => "a constant",
            OperandClass::VariableOrInt => "a variable or int constant",
            OperandClass::VariableOrBool => "a variable or boolean constant",
            OperandClass::VariableOrIndex => "a variable or non-negative int constant",
            OperandClass::Label => "a label",
        };
        write!(f, "{}", text)
    }
}
