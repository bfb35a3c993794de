//! 成员收集、重写检查和主类检查

use tracing::debug;

use crate::ast::{ClassDecl, Program};
use crate::config::CompilerOptions;
use crate::error::{BantamResult, ErrorHandler, ErrorKind};
use crate::types::{MethodSig, Type};
use super::hierarchy::{ClassDescriptor, ClassHierarchy};
use super::symbol_table::SymbolTable;

fn find_decl<'p>(program: &'p Program, class: &ClassDescriptor) -> Option<&'p ClassDecl> {
    program
        .classes
        .iter()
        .find(|c| c.name == class.name() && c.filename == class.filename() && c.line == class.line())
}

/// 收集字段和方法
///
/// 从根类开始处理，每个类的符号表先复制父类的表，再进入一层新作用域放自己的成员。
/// 这样 `lookup` 能找到继承的成员，`peek` 只看本类。
pub fn collect_members(
    program: &Program,
    hierarchy: &mut ClassHierarchy,
    errors: &mut ErrorHandler,
) -> BantamResult<()> {
    for name in hierarchy.root_first() {
        let Some(class) = hierarchy.get(&name) else {
            continue;
        };
        let Some(decl) = find_decl(program, class) else {
            continue;
        };

        let (mut fields, mut methods) = match class.parent().and_then(|p| hierarchy.get(p)) {
            Some(parent) => (parent.field_scope().clone(), parent.method_scope().clone()),
            None => (SymbolTable::new(), SymbolTable::new()),
        };
        if class.parent().is_some() {
            fields.enter_scope();
            methods.enter_scope();
        }

        for field in decl.fields() {
            if !hierarchy.is_valid_type(&field.field_type, false) {
                errors.register(
                    ErrorKind::Semantic,
                    &decl.filename,
                    field.line,
                    format!("invalid type '{}' for field '{}'", field.field_type, field.name),
                )?;
            }
            if fields.peek(&field.name).is_some() {
                errors.register(
                    ErrorKind::Semantic,
                    &decl.filename,
                    field.line,
                    format!("field '{}' already declared in class '{}'", field.name, decl.name),
                )?;
                continue;
            }
            fields.add(field.name.clone(), field.field_type.clone());
        }

        for method in decl.methods() {
            if !hierarchy.is_valid_type(&method.return_type, true) {
                errors.register(
                    ErrorKind::Semantic,
                    &decl.filename,
                    method.line,
                    format!("invalid return type '{}' for method '{}'", method.return_type, method.name),
                )?;
            }
            for param in &method.params {
                if !hierarchy.is_valid_type(&param.param_type, false) {
                    errors.register(
                        ErrorKind::Semantic,
                        &decl.filename,
                        method.line,
                        format!("invalid type '{}' for parameter '{}'", param.param_type, param.name),
                    )?;
                }
            }

            let sig = MethodSig {
                name: method.name.clone(),
                class_name: decl.name.clone(),
                params: method.params.clone(),
                return_type: method.return_type.clone(),
                line: method.line,
            };

            if methods.peek(&method.name).is_some() {
                errors.register(
                    ErrorKind::Semantic,
                    &decl.filename,
                    method.line,
                    format!("method '{}' already declared in class '{}'", method.name, decl.name),
                )?;
                continue;
            }
            if let Some(inherited) = methods.lookup(&method.name) {
                if !inherited.same_signature(&sig) {
                    errors.register(
                        ErrorKind::Semantic,
                        &decl.filename,
                        method.line,
                        format!(
                            "overriding method '{}' must keep the signature {} declared in '{}'",
                            method.name, inherited, inherited.class_name
                        ),
                    )?;
                }
            }
            methods.add(method.name.clone(), sig);
        }

        if let Some(class) = hierarchy.get_mut(&name) {
            class.set_scopes(fields, methods);
        }
    }

    debug!(classes = hierarchy.len(), "class members collected");
    Ok(())
}

/// 检查主类
/// 规则：
/// 1. 必须有名为 Main 的用户类
/// 2. Main 必须有 main 方法（可以继承）
/// 3. main 不接受参数并返回 void
pub fn check_main_class(
    hierarchy: &ClassHierarchy,
    options: &CompilerOptions,
    errors: &mut ErrorHandler,
) -> BantamResult<()> {
    let main_class = match hierarchy.get(&options.main_class) {
        Some(class) if !class.is_builtin() => class,
        _ => {
            return errors.register_bare(
                ErrorKind::Semantic,
                format!("missing {} class", options.main_class),
            );
        }
    };

    match main_class.method_scope().lookup(&options.main_method) {
        None => errors.register(
            ErrorKind::Semantic,
            main_class.filename(),
            main_class.line(),
            format!("missing {} method", options.main_class),
        ),
        Some(sig) if !sig.params.is_empty() || sig.return_type != Type::Void => errors.register(
            ErrorKind::Semantic,
            main_class.filename(),
            sig.line,
            format!(
                "{} method in class {} must take no parameters and return void",
                options.main_method, options.main_class
            ),
        ),
        Some(_) => Ok(()),
    }
}
