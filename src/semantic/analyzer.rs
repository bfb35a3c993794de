//! 语义分析器核心实现

use tracing::info;

use crate::ast::Program;
use crate::config::CompilerOptions;
use crate::error::{BantamResult, ErrorHandler};
use super::class_analysis::{check_main_class, collect_members};
use super::hierarchy::{ClassHierarchy, build_hierarchy};
use super::type_check::TypeChecker;

/// 语义分析器
///
/// 分两个阶段：先建立类层次，有错误就停下；再收集成员、检查主类和做类型检查，
/// 阶段结束时统一报告。
pub struct SemanticAnalyzer {
    options: CompilerOptions,
    errors: ErrorHandler,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        let errors = ErrorHandler::with_limit(options.max_errors);
        Self { options, errors }
    }

    pub fn analyze(&mut self, program: &mut Program) -> BantamResult<ClassHierarchy> {
        // 第一阶段：类层次
        let mut hierarchy = build_hierarchy(program, &mut self.errors)?;
        self.errors.check_phase()?;

        // 第二阶段：成员、主类、类型
        collect_members(program, &mut hierarchy, &mut self.errors)?;
        if self.options.require_main {
            check_main_class(&hierarchy, &self.options, &mut self.errors)?;
        }
        TypeChecker::new(&hierarchy, &mut self.errors).check_program(program)?;
        self.errors.check_phase()?;

        info!(classes = hierarchy.len(), "semantic analysis passed");
        Ok(hierarchy)
    }

    pub fn errors(&self) -> &ErrorHandler {
        &self.errors
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn into_errors(self) -> ErrorHandler {
        self.errors
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
