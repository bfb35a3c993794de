//! 类型检查
//!
//! 对每个非内置类做一次递归遍历：计算每个表达式的类型并写回 AST，
//! 每发现一处违规就登记一条错误并给出兜底类型继续检查，整遍结束后由调用者决定是否中止。

mod expressions;
mod statements;

use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::ast::{ClassMember, Program};
use crate::error::{BantamResult, ErrorHandler, ErrorKind};
use crate::types::Type;
use super::builtins::BUILTIN_FILENAME;
use super::hierarchy::ClassHierarchy;
use super::symbol_table::SymbolTable;

pub struct TypeChecker<'a> {
    hierarchy: &'a ClassHierarchy,
    errors: &'a mut ErrorHandler,
    locals: SymbolTable<Type>,
    current_class: String,
    current_file: String,
    /// 当前方法的返回类型；检查字段初始化式时为 None
    current_return: Option<Type>,
    loop_depth: usize,
}

/// 局部作用域守卫，析构时退出作用域
pub(super) struct CheckerScope<'c, 'a> {
    checker: &'c mut TypeChecker<'a>,
}

impl<'a> Deref for CheckerScope<'_, 'a> {
    type Target = TypeChecker<'a>;

    fn deref(&self) -> &Self::Target {
        self.checker
    }
}

impl DerefMut for CheckerScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.checker
    }
}

impl Drop for CheckerScope<'_, '_> {
    fn drop(&mut self) {
        self.checker.locals.exit_scope();
    }
}

impl<'a> TypeChecker<'a> {
    pub fn new(hierarchy: &'a ClassHierarchy, errors: &'a mut ErrorHandler) -> Self {
        Self {
            hierarchy,
            errors,
            locals: SymbolTable::new(),
            current_class: String::new(),
            current_file: String::new(),
            current_return: None,
            loop_depth: 0,
        }
    }

    /// 检查整个程序
    pub fn check_program(&mut self, program: &mut Program) -> BantamResult<()> {
        for class in program.classes.iter_mut() {
            if class.filename == BUILTIN_FILENAME {
                continue;
            }
            // 被拒绝的重复声明不在类层次里
            let registered = self
                .hierarchy
                .get(&class.name)
                .is_some_and(|c| c.filename() == class.filename && c.line() == class.line);
            if !registered {
                continue;
            }

            self.current_class = class.name.clone();
            self.current_file = class.filename.clone();

            for member in class.members.iter_mut() {
                match member {
                    ClassMember::Field(field) => {
                        self.locals = SymbolTable::new();
                        self.current_return = None;
                        if let Some(init) = field.initializer.as_mut() {
                            let init_type = self.check_expr(init)?;
                            let expected = field.field_type.clone();
                            if self.hierarchy.is_valid_type(&expected, false) {
                                let context = format!("in initializer of field '{}'", field.name);
                                self.check_compatible(&expected, &init_type, field.line, &context)?;
                            }
                        }
                    }
                    ClassMember::Method(method) => {
                        self.locals = SymbolTable::new();
                        self.current_return = Some(method.return_type.clone());
                        self.loop_depth = 0;

                        let mut scope = self.scope();
                        for param in &method.params {
                            if scope.locals.peek(&param.name).is_some() {
                                scope.error(
                                    method.line,
                                    format!("parameter '{}' already declared in method '{}'", param.name, method.name),
                                )?;
                                continue;
                            }
                            let param_type = if scope.hierarchy.is_valid_type(&param.param_type, false) {
                                param.param_type.clone()
                            } else {
                                Type::Error
                            };
                            scope.locals.add(param.name.clone(), param_type);
                        }
                        // 方法体顶层与参数共用一层作用域
                        for stmt in method.body.iter_mut() {
                            scope.check_stmt(stmt)?;
                        }
                    }
                }
            }
        }

        debug!(errors = self.errors.count(), "type check finished");
        Ok(())
    }

    /// 进入局部作用域
    pub(super) fn scope(&mut self) -> CheckerScope<'_, 'a> {
        self.locals.enter_scope();
        CheckerScope { checker: self }
    }

    pub(super) fn error(&mut self, line: usize, message: impl Into<String>) -> BantamResult<()> {
        self.errors.register(ErrorKind::Semantic, &self.current_file, line, message)
    }

    /// 检查 `actual` 能否用在需要 `expected` 的地方。
    /// 不兼容时登记一条错误；涉及未知类型名时另外再登记 invalid type
    pub(super) fn check_compatible(
        &mut self,
        expected: &Type,
        actual: &Type,
        line: usize,
        context: &str,
    ) -> BantamResult<bool> {
        if self.hierarchy.is_compatible(expected, actual) {
            return Ok(true);
        }
        self.error(
            line,
            format!("incompatible types {}: expected {}, found {}", context, expected, actual),
        )?;
        for ty in [expected, actual] {
            if !self.hierarchy.is_valid_type(ty, true) {
                self.error(line, format!("invalid type '{}'", ty))?;
            }
        }
        Ok(false)
    }

    /// 谓词必须恰好是 boolean
    pub(super) fn expect_boolean(&mut self, found: &Type, line: usize, construct: &str) -> BantamResult<()> {
        if *found != Type::Boolean && !found.is_error() {
            self.error(
                line,
                format!("predicate of {} must be boolean, found {}", construct, found),
            )?;
        }
        Ok(())
    }

    /// 声明的类型必须有效；无效时返回错误哨兵
    pub(super) fn declared_type(&mut self, ty: &Type, line: usize, what: &str) -> BantamResult<Type> {
        if self.hierarchy.is_valid_type(ty, false) {
            return Ok(ty.clone());
        }
        self.error(line, format!("invalid type '{}' {}", ty, what))?;
        Ok(Type::Error)
    }

    fn current_parent(&self) -> Option<&'a str> {
        self.hierarchy.get(&self.current_class).and_then(|c| c.parent())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ast::{ClassDecl, Expr, MethodDecl, Stmt};
    use crate::semantic::class_analysis::collect_members;
    use crate::semantic::hierarchy::build_hierarchy;

    fn main_with(body: Vec<Stmt>, return_type: Type) -> Program {
        let mut main = ClassDecl::new("Main", None, "main.btm", 1);
        main.members = vec![ClassMember::Method(MethodDecl {
            name: "m".to_string(),
            return_type,
            params: Vec::new(),
            body,
            line: 2,
        })];
        Program { classes: vec![main] }
    }

    pub(crate) fn run(program: &mut Program) -> ErrorHandler {
        let mut errors = ErrorHandler::new();
        let mut hierarchy = build_hierarchy(program, &mut errors).unwrap();
        collect_members(program, &mut hierarchy, &mut errors).unwrap();
        TypeChecker::new(&hierarchy, &mut errors).check_program(program).unwrap();
        errors
    }

    /// 在 `Main.m` 里检查一段方法体
    pub(crate) fn check_method(body: Vec<Stmt>, return_type: Type) -> ErrorHandler {
        run(&mut main_with(body, return_type))
    }

    /// 检查单个表达式，并把带类型标注的结果写回
    pub(crate) fn check_expr_in_main(expr: &mut Expr) -> ErrorHandler {
        let mut program = main_with(vec![Stmt::Expr(expr.clone())], Type::Void);
        let errors = run(&mut program);
        if let Some(ClassMember::Method(method)) = program.classes[0].members.first_mut() {
            if let Some(Stmt::Expr(checked)) = method.body.pop() {
                *expr = checked;
            }
        }
        errors
    }

    pub(crate) fn messages(errors: &ErrorHandler) -> Vec<String> {
        errors.records().iter().map(|r| r.message.clone()).collect()
    }

    #[test]
    fn test_super_and_inherited_field() {
        let mut base = ClassDecl::new("Base", None, "main.btm", 1);
        base.members = vec![ClassMember::Field(crate::ast::FieldDecl {
            name: "count".to_string(),
            field_type: Type::Int,
            initializer: Some(Expr::boolean(true, 2)),
            line: 2,
        })];
        let mut derived = ClassDecl::new("Derived", Some("Base"), "main.btm", 4);
        derived.members = vec![ClassMember::Method(MethodDecl {
            name: "bump".to_string(),
            return_type: Type::Int,
            params: Vec::new(),
            body: vec![Stmt::Return(crate::ast::ReturnStmt {
                value: Some(Expr::field(Expr::var("super", 5), "count", 5)),
                line: 5,
            })],
            line: 5,
        })];
        let mut program = Program { classes: vec![base, derived] };
        let errors = run(&mut program);
        assert_eq!(
            messages(&errors),
            vec!["incompatible types in initializer of field 'count': expected int, found boolean"]
        );
    }

    #[test]
    fn test_duplicate_parameters() {
        let mut main = ClassDecl::new("Main", None, "main.btm", 1);
        main.members = vec![ClassMember::Method(MethodDecl {
            name: "f".to_string(),
            return_type: Type::Void,
            params: vec![
                crate::types::ParameterInfo::new("a", Type::Int),
                crate::types::ParameterInfo::new("a", Type::Boolean),
            ],
            body: Vec::new(),
            line: 2,
        })];
        let errors = run(&mut Program { classes: vec![main] });
        assert_eq!(messages(&errors), vec!["parameter 'a' already declared in method 'f'"]);
    }
}
