pub mod error;
pub mod config;
pub mod types;
pub mod ast;
pub mod semantic;
pub mod tac;
pub mod cfg;

use ast::Program;
use config::CompilerOptions;
use error::{BantamResult, ErrorHandler};
use semantic::{ClassHierarchy, SemanticAnalyzer};

pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// 语义检查：类层次、成员、主类和类型。
    /// 成功时 AST 中每个表达式都带上了类型。失败时返回错误，同时附带诊断列表
    pub fn check(&self, program: &mut Program) -> (BantamResult<ClassHierarchy>, ErrorHandler) {
        let mut analyzer = SemanticAnalyzer::with_options(self.options.clone());
        let result = analyzer.analyze(program);
        (result, analyzer.into_errors())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ClassDecl, ClassMember, MethodDecl};
    use crate::error::BantamError;
    use crate::types::Type;

    fn hello() -> Program {
        let mut main = ClassDecl::new("Main", None, "hello.btm", 1);
        main.members = vec![ClassMember::Method(MethodDecl {
            name: "main".to_string(),
            return_type: Type::Void,
            params: Vec::new(),
            body: Vec::new(),
            line: 2,
        })];
        Program { classes: vec![main] }
    }

    #[test]
    fn test_hello_checks() {
        let mut program = hello();
        let (result, errors) = Compiler::new().check(&mut program);
        let hierarchy = result.unwrap();
        assert!(!errors.has_errors());
        assert_eq!(hierarchy.get("Main").unwrap().parent(), Some("Object"));
        // 内置类被追加到程序里
        assert!(program.find_class("TextIO").is_some());
    }

    #[test]
    fn test_error_report_is_returned() {
        let mut program = Program {
            classes: vec![ClassDecl::new("Other", None, "other.btm", 1)],
        };
        let (result, errors) = Compiler::new().check(&mut program);
        let Err(BantamError::Semantic { count, report }) = result else {
            panic!("expected semantic errors");
        };
        assert_eq!(count, 1);
        assert_eq!(report, errors.report());
    }
}
