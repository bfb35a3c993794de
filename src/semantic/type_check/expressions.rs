//! 表达式检查
//!
//! 每个表达式都会得到一个类型并写回 `Expr::ty`。出错时登记错误，再返回
//! 能让外层继续检查的类型：运算结果类型已知时用它，否则用 `Type::Error`。

use crate::ast::{BinaryOp, Expr, ExprKind};
use crate::error::BantamResult;
use crate::types::{OBJECT, Type};
use super::TypeChecker;

impl TypeChecker<'_> {
    pub(super) fn check_expr(&mut self, expr: &mut Expr) -> BantamResult<Type> {
        let ty = self.infer(&mut expr.kind, expr.line)?;
        expr.ty = Some(ty.clone());
        Ok(ty)
    }

    fn infer(&mut self, kind: &mut ExprKind, line: usize) -> BantamResult<Type> {
        match kind {
            ExprKind::Dispatch { receiver, method, args } => {
                let class_name = match receiver.as_mut() {
                    None => Some(self.current_class.clone()),
                    Some(recv) => {
                        let recv_type = self.check_expr(recv)?;
                        self.dispatch_class(&recv_type, method, line)?
                    }
                };
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    arg_types.push(self.check_expr(arg)?);
                }
                match class_name {
                    Some(class_name) => self.check_call(&class_name, method, &arg_types, line),
                    None => Ok(Type::Error),
                }
            }

            ExprKind::New { class_name } => {
                if self.hierarchy.contains(class_name) {
                    Ok(Type::class(class_name.as_str()))
                } else {
                    self.error(line, format!("invalid type '{}' in new expression", class_name))?;
                    Ok(Type::Error)
                }
            }

            ExprKind::NewArray { element_type, size } => {
                let size_type = self.check_expr(size)?;
                self.expect_int(&size_type, line, "array size")?;
                let elem = self.declared_type(element_type, line, "in new array expression")?;
                if elem.is_error() {
                    return Ok(Type::Error);
                }
                Ok(Type::array_of(elem))
            }

            ExprKind::InstanceOf { expr, target } => {
                let found = self.check_expr(expr)?;
                if found.is_error() {
                    return Ok(Type::Boolean);
                }
                if found.is_primitive() || target.is_primitive() {
                    self.error(
                        line,
                        format!("instanceof cannot be applied to primitive types ({} instanceof {})", found, target),
                    )?;
                } else {
                    self.declared_type(target, line, "in instanceof expression")?;
                }
                Ok(Type::Boolean)
            }

            ExprKind::Cast { target, expr } => {
                let found = self.check_expr(expr)?;
                if found.is_primitive() || target.is_primitive() {
                    self.error(
                        line,
                        format!("cannot cast to or from a primitive type ({} to {})", found, target),
                    )?;
                    return Ok(Type::Error);
                }
                let target = self.declared_type(target, line, "in cast expression")?;
                if target.is_error() {
                    return Ok(Type::Error);
                }
                if !self.hierarchy.is_compatible(&target, &found) && !self.hierarchy.is_compatible(&found, &target) {
                    self.error(line, format!("invalid types for casting: {} and {}", found, target))?;
                }
                Ok(target)
            }

            ExprKind::Assign { qualifier, name, value } => {
                let target = self.resolve_target(qualifier.as_deref(), name, line)?;
                let found = self.check_expr(value)?;
                let context = format!("in assignment to '{}'", name);
                self.check_compatible(&target, &found, line, &context)?;
                Ok(target)
            }

            ExprKind::ArrayAssign { qualifier, name, index, value } => {
                let target = self.resolve_target(qualifier.as_deref(), name, line)?;
                let index_type = self.check_expr(index)?;
                self.expect_int(&index_type, line, "array index")?;
                let found = self.check_expr(value)?;
                let elem = self.element_of(&target, name, line)?;
                let context = format!("in assignment to element of '{}'", name);
                self.check_compatible(&elem, &found, line, &context)?;
                Ok(elem)
            }

            ExprKind::Binary { op, left, right } => {
                let l = self.check_expr(left)?;
                let r = self.check_expr(right)?;
                self.check_binary(*op, &l, &r, line)
            }

            ExprKind::Unary { op, operand } => {
                let found = self.check_expr(operand)?;
                let required = op.operand_type();
                if found != required && !found.is_error() {
                    self.error(
                        line,
                        format!("operator '{}' requires {} operand, found {}", op.symbol(), required, found),
                    )?;
                }
                if op.needs_lvalue() && !operand.is_lvalue() {
                    self.error(
                        line,
                        format!("operand of '{}' must be a variable or an array element", op.symbol()),
                    )?;
                }
                Ok(required)
            }

            ExprKind::Var { object, name } => self.resolve_var(object.as_deref_mut(), name, line),

            ExprKind::ArrayElem { object, name, index } => {
                let base = self.resolve_var(object.as_deref_mut(), name, line)?;
                let index_type = self.check_expr(index)?;
                self.expect_int(&index_type, line, "array index")?;
                self.element_of(&base, name, line)
            }

            ExprKind::IntConst(_) => Ok(Type::Int),
            ExprKind::BoolConst(_) => Ok(Type::Boolean),
            ExprKind::StringConst(_) => Ok(Type::string()),
            ExprKind::Null => Ok(Type::Null),
        }
    }

    /// 方法调用所在的类；接收者类型不能调用方法时返回 None
    fn dispatch_class(&mut self, recv: &Type, method: &str, line: usize) -> BantamResult<Option<String>> {
        match recv {
            Type::Class(name) => Ok(Some(name.clone())),
            Type::Array(_) => Ok(Some(OBJECT.to_string())),
            Type::Error => Ok(None),
            other => {
                self.error(line, format!("cannot call method '{}' on a value of type {}", method, other))?;
                Ok(None)
            }
        }
    }

    fn check_call(&mut self, class_name: &str, method: &str, args: &[Type], line: usize) -> BantamResult<Type> {
        let Some(sig) = self.hierarchy.lookup_method(class_name, method).cloned() else {
            self.error(line, format!("method '{}' not found in class '{}'", method, class_name))?;
            return Ok(Type::Error);
        };

        if sig.params.len() != args.len() {
            self.error(
                line,
                format!(
                    "method '{}' expects {} argument(s), found {}",
                    method,
                    sig.params.len(),
                    args.len()
                ),
            )?;
            return Ok(sig.return_type);
        }

        for (i, (param, arg)) in sig.params.iter().zip(args).enumerate() {
            let context = format!("for argument {} of '{}'", i + 1, method);
            self.check_compatible(&param.param_type, arg, line, &context)?;
        }
        Ok(sig.return_type)
    }

    fn check_binary(&mut self, op: BinaryOp, l: &Type, r: &Type, line: usize) -> BantamResult<Type> {
        let result = op.result_type();
        if l.is_error() || r.is_error() {
            return Ok(result);
        }

        match op.operand_type() {
            Some(required) => {
                if *l != required || *r != required {
                    self.error(
                        line,
                        format!(
                            "operator '{}' requires {} operands, found {} and {}",
                            op.symbol(),
                            required,
                            l,
                            r
                        ),
                    )?;
                }
            }
            None => {
                // 基本类型与引用类型混用总是非法
                let comparable = l.is_primitive() == r.is_primitive()
                    && (self.hierarchy.is_compatible(l, r) || self.hierarchy.is_compatible(r, l));
                if !comparable || *l == Type::Void {
                    self.error(
                        line,
                        format!("incompatible operand types for '{}': {} and {}", op.symbol(), l, r),
                    )?;
                }
            }
        }
        Ok(result)
    }

    /// `[qualifier.]name` 作为赋值目标的类型
    fn resolve_target(&mut self, qualifier: Option<&str>, name: &str, line: usize) -> BantamResult<Type> {
        let class_name = match qualifier {
            None => {
                if let Some(ty) = self.locals.lookup(name) {
                    return Ok(ty.clone());
                }
                if let Some(ty) = self.hierarchy.lookup_field(&self.current_class, name) {
                    return Ok(ty.clone());
                }
                self.error(line, format!("undeclared variable '{}'", name))?;
                return Ok(Type::Error);
            }
            Some("this") => self.current_class.clone(),
            Some("super") => match self.current_parent() {
                Some(parent) => parent.to_string(),
                None => {
                    self.error(line, format!("class '{}' has no superclass", self.current_class))?;
                    return Ok(Type::Error);
                }
            },
            Some(other) => {
                if !self.hierarchy.contains(other) {
                    self.error(line, format!("undeclared class '{}'", other))?;
                    return Ok(Type::Error);
                }
                other.to_string()
            }
        };
        self.field_of(&class_name, name, line)
    }

    /// `[object.]name` 的类型
    fn resolve_var(&mut self, object: Option<&mut Expr>, name: &str, line: usize) -> BantamResult<Type> {
        let Some(object) = object else {
            return match name {
                "this" => Ok(Type::class(self.current_class.as_str())),
                "super" => match self.current_parent() {
                    Some(parent) => Ok(Type::class(parent)),
                    None => {
                        self.error(line, format!("class '{}' has no superclass", self.current_class))?;
                        Ok(Type::Error)
                    }
                },
                _ => {
                    if let Some(ty) = self.locals.lookup(name) {
                        return Ok(ty.clone());
                    }
                    if let Some(ty) = self.hierarchy.lookup_field(&self.current_class, name) {
                        return Ok(ty.clone());
                    }
                    self.error(line, format!("undeclared variable '{}'", name))?;
                    Ok(Type::Error)
                }
            };
        };

        match self.check_expr(object)? {
            Type::Array(_) if name == "length" => Ok(Type::Int),
            Type::Class(class_name) => self.field_of(&class_name, name, line),
            Type::Error => Ok(Type::Error),
            other => {
                self.error(line, format!("cannot access field '{}' on a value of type {}", name, other))?;
                Ok(Type::Error)
            }
        }
    }

    fn field_of(&mut self, class_name: &str, name: &str, line: usize) -> BantamResult<Type> {
        if let Some(ty) = self.hierarchy.lookup_field(class_name, name) {
            return Ok(ty.clone());
        }
        self.error(line, format!("undeclared field '{}' in class '{}'", name, class_name))?;
        Ok(Type::Error)
    }

    fn element_of(&mut self, base: &Type, name: &str, line: usize) -> BantamResult<Type> {
        match base {
            Type::Array(elem) => Ok((**elem).clone()),
            Type::Error => Ok(Type::Error),
            other => {
                self.error(line, format!("'{}' is not an array (found {})", name, other))?;
                Ok(Type::Error)
            }
        }
    }

    fn expect_int(&mut self, found: &Type, line: usize, what: &str) -> BantamResult<()> {
        if *found != Type::Int && !found.is_error() {
            self.error(line, format!("{} must be int, found {}", what, found))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, ClassDecl, ClassMember, Expr, ExprKind, FieldDecl, MethodDecl, Program, Stmt, UnaryOp};
    use crate::semantic::type_check::tests::{check_method, messages, run};
    use crate::types::Type;

    fn stmt(expr: Expr) -> Stmt {
        Stmt::Expr(expr)
    }

    fn assign_to(qualifier: Option<&str>, name: &str, value: Expr) -> Stmt {
        let line = value.line;
        stmt(Expr::new(
            ExprKind::Assign {
                qualifier: qualifier.map(str::to_string),
                name: name.to_string(),
                value: Box::new(value),
            },
            line,
        ))
    }

    fn field(name: &str, field_type: Type, line: usize) -> ClassMember {
        ClassMember::Field(FieldDecl {
            name: name.to_string(),
            field_type,
            initializer: None,
            line,
        })
    }

    #[test]
    fn test_arithmetic_requires_int() {
        let errors = check_method(
            vec![stmt(Expr::binary(BinaryOp::Add, Expr::int(1, 3), Expr::boolean(false, 3), 3))],
            Type::Void,
        );
        assert_eq!(
            messages(&errors),
            vec!["operator '+' requires int operands, found int and boolean"]
        );
    }

    #[test]
    fn test_equality_rejects_primitive_and_reference() {
        let errors = check_method(
            vec![
                stmt(Expr::binary(BinaryOp::Eq, Expr::int(1, 3), Expr::null(3), 3)),
                stmt(Expr::binary(BinaryOp::Eq, Expr::string("a", 4), Expr::null(4), 4)),
                stmt(Expr::binary(BinaryOp::Ne, Expr::new_object("Main", 5), Expr::string("b", 5), 5)),
            ],
            Type::Void,
        );
        assert_eq!(
            messages(&errors),
            vec![
                "incompatible operand types for '==': int and null",
                "incompatible operand types for '!=': Main and String",
            ]
        );
    }

    #[test]
    fn test_increment_needs_variable() {
        let errors = check_method(
            vec![stmt(Expr::unary(UnaryOp::PreIncr, Expr::int(2, 3), 3))],
            Type::Void,
        );
        assert_eq!(
            messages(&errors),
            vec!["operand of '++' must be a variable or an array element"]
        );
    }

    #[test]
    fn test_dispatch_argument_checks() {
        let errors = check_method(
            vec![
                stmt(Expr::call(Some(Expr::string("s", 3)), "substring", vec![Expr::int(0, 3)], 3)),
                stmt(Expr::call(Some(Expr::int(1, 4)), "toString", vec![], 4)),
                stmt(Expr::call(None, "missing", vec![], 5)),
                stmt(Expr::call(Some(Expr::string("s", 6)), "concat", vec![Expr::int(1, 6)], 6)),
            ],
            Type::Void,
        );
        assert_eq!(
            messages(&errors),
            vec![
                "method 'substring' expects 2 argument(s), found 1",
                "cannot call method 'toString' on a value of type int",
                "method 'missing' not found in class 'Main'",
                "incompatible types for argument 1 of 'concat': expected String, found int",
            ]
        );
    }

    #[test]
    fn test_expressions_are_annotated() {
        let mut call = Expr::call(Some(Expr::string("s", 3)), "length", vec![], 3);
        let errors = crate::semantic::type_check::tests::check_expr_in_main(&mut call);
        assert!(!errors.has_errors());
        assert_eq!(call.ty, Some(Type::Int));
        let ExprKind::Dispatch { receiver: Some(recv), .. } = &call.kind else {
            panic!("expected dispatch");
        };
        assert_eq!(recv.ty, Some(Type::string()));
    }

    #[test]
    fn test_cast_and_instanceof() {
        let cast_prim = Expr::new(
            ExprKind::Cast {
                target: Type::Int,
                expr: Box::new(Expr::int(1, 3)),
            },
            3,
        );
        let downcast = Expr::new(
            ExprKind::Cast {
                target: Type::string(),
                expr: Box::new(Expr::new_object("Object", 4)),
            },
            4,
        );
        let instance = Expr::new(
            ExprKind::InstanceOf {
                expr: Box::new(Expr::int(1, 5)),
                target: Type::object(),
            },
            5,
        );
        let errors = check_method(vec![stmt(cast_prim), stmt(downcast), stmt(instance)], Type::Void);
        assert_eq!(
            messages(&errors),
            vec![
                "cannot cast to or from a primitive type (int to int)",
                "instanceof cannot be applied to primitive types (int instanceof Object)",
            ]
        );
    }

    #[test]
    fn test_array_access() {
        let errors = check_method(
            vec![
                Stmt::VarDecl(crate::ast::VarDecl {
                    name: "a".to_string(),
                    var_type: Type::array_of(Type::Int),
                    initializer: Some(Expr::new(
                        ExprKind::NewArray {
                            element_type: Type::Int,
                            size: Box::new(Expr::int(3, 3)),
                        },
                        3,
                    )),
                    line: 3,
                }),
                stmt(Expr::new(
                    ExprKind::ArrayAssign {
                        qualifier: None,
                        name: "a".to_string(),
                        index: Box::new(Expr::boolean(true, 4)),
                        value: Box::new(Expr::int(1, 4)),
                    },
                    4,
                )),
                stmt(Expr::field(Expr::var("a", 5), "length", 5)),
            ],
            Type::Void,
        );
        assert_eq!(messages(&errors), vec!["array index must be int, found boolean"]);
    }

    #[test]
    fn test_cast_between_unrelated_classes() {
        let cast = Expr::new(
            ExprKind::Cast {
                target: Type::class("Main"),
                expr: Box::new(Expr::string("s", 3)),
            },
            3,
        );
        let boxed = Expr::new(
            ExprKind::Cast {
                target: Type::string(),
                expr: Box::new(Expr::int(5, 4)),
            },
            4,
        );
        let errors = check_method(vec![stmt(cast), stmt(boxed)], Type::Void);
        assert_eq!(
            messages(&errors),
            vec![
                "invalid types for casting: String and Main",
                "cannot cast to or from a primitive type (int to String)",
            ]
        );
    }

    #[test]
    fn test_assignment_to_undeclared_names() {
        let errors = check_method(
            vec![
                assign_to(None, "nope", Expr::int(1, 3)),
                assign_to(Some("Widget"), "size", Expr::int(2, 4)),
            ],
            Type::Void,
        );
        assert_eq!(
            messages(&errors),
            vec!["undeclared variable 'nope'", "undeclared class 'Widget'"]
        );
    }

    #[test]
    fn test_qualified_assignment() {
        // class Base { int count; }
        // class Main extends Base { boolean flag; void m() { ... } }
        let mut base = ClassDecl::new("Base", None, "main.btm", 1);
        base.members = vec![field("count", Type::Int, 2)];
        let mut main = ClassDecl::new("Main", Some("Base"), "main.btm", 4);
        main.members = vec![
            field("flag", Type::Boolean, 5),
            ClassMember::Method(MethodDecl {
                name: "m".to_string(),
                return_type: Type::Void,
                params: Vec::new(),
                body: vec![
                    assign_to(Some("this"), "flag", Expr::boolean(true, 7)),
                    assign_to(Some("super"), "count", Expr::int(1, 8)),
                    assign_to(Some("Main"), "flag", Expr::int(3, 9)),
                    assign_to(Some("super"), "flag", Expr::boolean(false, 10)),
                    assign_to(Some("this"), "count", Expr::int(4, 11)),
                ],
                line: 6,
            }),
        ];
        let mut program = Program { classes: vec![base, main] };
        let errors = run(&mut program);
        assert_eq!(
            messages(&errors),
            vec![
                "incompatible types in assignment to 'flag': expected boolean, found int",
                "undeclared field 'flag' in class 'Base'",
            ]
        );

        let Some(ClassMember::Method(method)) = program.classes[1].members.get(1) else {
            panic!("expected method");
        };
        let Stmt::Expr(first) = &method.body[0] else {
            panic!("expected expression statement");
        };
        assert_eq!(first.ty, Some(Type::Boolean));
    }
}
