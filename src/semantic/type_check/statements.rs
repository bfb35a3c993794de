//! 语句检查

use crate::ast::{ReturnStmt, Stmt, VarDecl};
use crate::error::BantamResult;
use crate::types::Type;
use super::TypeChecker;

impl TypeChecker<'_> {
    pub(super) fn check_stmt(&mut self, stmt: &mut Stmt) -> BantamResult<()> {
        match stmt {
            Stmt::Expr(expr) => {
                self.check_expr(expr)?;
            }
            Stmt::VarDecl(decl) => self.check_var_decl(decl)?,
            Stmt::Return(ret) => self.check_return(ret)?,
            Stmt::If(if_stmt) => {
                let cond = self.check_expr(&mut if_stmt.condition)?;
                self.expect_boolean(&cond, if_stmt.line, "if statement")?;
                {
                    let mut scope = self.scope();
                    scope.check_stmt(&mut if_stmt.then_branch)?;
                }
                if let Some(else_branch) = if_stmt.else_branch.as_mut() {
                    let mut scope = self.scope();
                    scope.check_stmt(else_branch)?;
                }
            }
            Stmt::While(while_stmt) => {
                let cond = self.check_expr(&mut while_stmt.condition)?;
                self.expect_boolean(&cond, while_stmt.line, "while statement")?;
                let mut scope = self.scope();
                scope.loop_depth += 1;
                scope.check_stmt(&mut while_stmt.body)?;
                scope.loop_depth -= 1;
            }
            Stmt::For(for_stmt) => {
                if let Some(init) = for_stmt.init.as_mut() {
                    self.check_expr(init)?;
                }
                if let Some(cond) = for_stmt.condition.as_mut() {
                    let ty = self.check_expr(cond)?;
                    self.expect_boolean(&ty, for_stmt.line, "for statement")?;
                }
                if let Some(update) = for_stmt.update.as_mut() {
                    self.check_expr(update)?;
                }
                let mut scope = self.scope();
                scope.loop_depth += 1;
                scope.check_stmt(&mut for_stmt.body)?;
                scope.loop_depth -= 1;
            }
            Stmt::Block(block) => {
                let mut scope = self.scope();
                for stmt in block.statements.iter_mut() {
                    scope.check_stmt(stmt)?;
                }
            }
            Stmt::Break(line) => {
                if self.loop_depth == 0 {
                    self.error(*line, "break statement outside of a loop")?;
                }
            }
        }
        Ok(())
    }

    fn check_var_decl(&mut self, decl: &mut VarDecl) -> BantamResult<()> {
        let what = format!("for variable '{}'", decl.name);
        let declared = self.declared_type(&decl.var_type, decl.line, &what)?;

        // 初始化式在声明之前检查，`int x = x;` 里的 x 指外层
        if let Some(init) = decl.initializer.as_mut() {
            let init_type = self.check_expr(init)?;
            let context = format!("in declaration of '{}'", decl.name);
            self.check_compatible(&declared, &init_type, decl.line, &context)?;
        }

        if self.locals.peek(&decl.name).is_some() {
            return self.error(
                decl.line,
                format!("variable '{}' already declared in this scope", decl.name),
            );
        }
        self.locals.add(decl.name.clone(), declared);
        Ok(())
    }

    fn check_return(&mut self, ret: &mut ReturnStmt) -> BantamResult<()> {
        let Some(expected) = self.current_return.clone() else {
            return self.error(ret.line, "return statement outside of a method");
        };

        match (ret.value.as_mut(), &expected) {
            (None, Type::Void) => Ok(()),
            (None, _) => self.error(
                ret.line,
                format!("missing return value in method returning {}", expected),
            ),
            (Some(value), Type::Void) => {
                self.check_expr(value)?;
                self.error(ret.line, "cannot return a value from a void method")
            }
            (Some(value), _) => {
                let found = self.check_expr(value)?;
                if self.hierarchy.is_valid_type(&expected, true) {
                    self.check_compatible(&expected, &found, ret.line, "in return statement")?;
                }
                Ok(())
            }
        }
    }
}
