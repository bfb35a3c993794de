//! 语义分析
//!
//! 类层次、成员表、主类检查和类型检查。

mod analyzer;
pub mod builtins;
pub mod class_analysis;
pub mod hierarchy;
pub mod symbol_table;
pub mod type_check;

pub use analyzer::SemanticAnalyzer;
pub use hierarchy::{ClassDescriptor, ClassHierarchy};
pub use symbol_table::SymbolTable;
pub use type_check::TypeChecker;
