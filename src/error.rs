use thiserror::Error;
use std::fmt;

use crate::cfg::BlockId;
use crate::tac::{Opcode, OperandClass};

/// 编译器阶段错误
#[derive(Error, Debug, Clone)]
pub enum BantamError {
    #[error("{count} semantic error(s) found:\n{report}")]
    Semantic { count: usize, report: String },

    #[error("too many errors (more than {limit}), aborting")]
    TooManyErrors { limit: usize },

    #[error(transparent)]
    Ir(#[from] IrError),
}

pub type BantamResult<T> = Result<T, BantamError>;

/// TAC / CFG 层的结构错误和用法错误。
///
/// 这类错误说明优化器或代码生成器本身有 bug，不是用户源程序的问题，
/// 所以立即返回，不累积。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("illegal operand '{operand}' for {slot} of {opcode}: expected {expected}")]
    IllegalOperand {
        opcode: Opcode,
        slot: &'static str,
        expected: OperandClass,
        operand: String,
    },

    #[error("block {block} is sealed by a conditional branch, cannot append")]
    BlockSealed { block: BlockId },

    #[error("block {block} already has {limit} incoming edges")]
    TooManyInEdges { block: BlockId, limit: usize },

    #[error("block {block} already has {limit} outgoing edges")]
    TooManyOutEdges { block: BlockId, limit: usize },

    #[error("no edge from {from} to {to}")]
    EdgeNotFound { from: BlockId, to: BlockId },

    #[error("unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("entry block {block} has {count} incoming edges, expected none")]
    EntryHasPredecessors { block: BlockId, count: usize },

    #[error("malformed block {block}: {reason}\n{rendered}")]
    MalformedBlock {
        block: BlockId,
        reason: String,
        rendered: String,
    },

    #[error("malformed instruction '{text}': {reason}")]
    MalformedInstruction { text: String, reason: String },
}

pub type IrResult<T> = Result<T, IrError>;

/// 诊断类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lexical,
    Syntactic,
    Semantic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Lexical => write!(f, "lexical"),
            ErrorKind::Syntactic => write!(f, "syntactic"),
            ErrorKind::Semantic => write!(f, "semantic"),
        }
    }
}

/// 一条诊断记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub filename: Option<String>,
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.filename, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}: ", file, line)?,
            (Some(file), None) => write!(f, "{}: ", file)?,
            (None, Some(line)) => write!(f, "line {}: ", line)?,
            (None, None) => {}
        }
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

pub const DEFAULT_MAX_ERRORS: usize = 100;

/// 错误收集器
///
/// 各阶段把诊断登记到这里，阶段结束时由调用者检查并决定是否中止。
/// 记录数超过上限时 `register` 返回 `TooManyErrors`，用 `?` 直接中止当前遍历。
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    records: Vec<ErrorRecord>,
    max_errors: usize,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_ERRORS)
    }

    pub fn with_limit(max_errors: usize) -> Self {
        Self {
            records: Vec::new(),
            max_errors,
        }
    }

    /// 登记带位置的错误
    pub fn register(
        &mut self,
        kind: ErrorKind,
        filename: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> BantamResult<()> {
        self.push(ErrorRecord {
            kind,
            filename: Some(filename.into()),
            line: Some(line),
            message: message.into(),
        })
    }

    /// 登记没有源位置的错误
    pub fn register_bare(&mut self, kind: ErrorKind, message: impl Into<String>) -> BantamResult<()> {
        self.push(ErrorRecord {
            kind,
            filename: None,
            line: None,
            message: message.into(),
        })
    }

    fn push(&mut self, record: ErrorRecord) -> BantamResult<()> {
        self.records.push(record);
        if self.records.len() > self.max_errors {
            return Err(BantamError::TooManyErrors {
                limit: self.max_errors,
            });
        }
        Ok(())
    }

    pub fn has_errors(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// 按登记顺序返回
    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    /// 排序后的记录：无文件名的排最前；其余按文件首次出现的顺序分组，组内按行号升序
    pub fn sorted(&self) -> Vec<&ErrorRecord> {
        let mut file_order: Vec<&str> = Vec::new();
        for record in &self.records {
            if let Some(file) = record.filename.as_deref() {
                if !file_order.contains(&file) {
                    file_order.push(file);
                }
            }
        }

        let mut sorted: Vec<&ErrorRecord> = self.records.iter().collect();
        // sort_by_key 是稳定排序，同一行的记录保持登记顺序
        sorted.sort_by_key(|r| match r.filename.as_deref() {
            None => (0, 0, 0),
            Some(file) => {
                let group = file_order.iter().position(|f| *f == file).unwrap_or(0);
                (1, group, r.line.unwrap_or(0))
            }
        });
        sorted
    }

    /// 排序后逐行渲染
    pub fn report(&self) -> String {
        self.sorted()
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 阶段边界处清空
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// 有错误时转换成 `BantamError::Semantic`
    pub fn check_phase(&self) -> BantamResult<()> {
        if self.has_errors() {
            return Err(BantamError::Semantic {
                count: self.count(),
                report: self.report(),
            });
        }
        Ok(())
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}
