//! 内置类：Object、String、TextIO、Sys
//!
//! 内置类以普通类声明的形式追加到程序里，方法体为空，类型检查时跳过。

use crate::ast::{ClassDecl, ClassMember, MethodDecl};
use crate::types::{OBJECT, ParameterInfo, STRING, Type};

pub const BUILTIN_FILENAME: &str = "<built-in>";
pub const TEXT_IO: &str = "TextIO";
pub const SYS: &str = "Sys";

/// 内置类名及其是否可被继承
pub const BUILTIN_CLASSES: [(&str, bool); 4] = [(OBJECT, true), (STRING, false), (TEXT_IO, false), (SYS, false)];

pub fn is_builtin_class(name: &str) -> bool {
    BUILTIN_CLASSES.iter().any(|(n, _)| *n == name)
}

pub fn is_extendable_builtin(name: &str) -> bool {
    BUILTIN_CLASSES.iter().any(|(n, ext)| *n == name && *ext)
}

fn method(name: &str, params: &[(&str, Type)], return_type: Type) -> ClassMember {
    ClassMember::Method(MethodDecl {
        name: name.to_string(),
        return_type,
        params: params
            .iter()
            .map(|(n, t)| ParameterInfo::new(*n, t.clone()))
            .collect(),
        body: Vec::new(),
        line: 0,
    })
}

fn builtin_class(name: &str, parent: Option<&str>, members: Vec<ClassMember>) -> ClassDecl {
    let mut class = ClassDecl::new(name, parent, BUILTIN_FILENAME, 0);
    class.members = members;
    class
}

/// 全部内置类声明，Object 在最前
pub fn builtin_classes() -> Vec<ClassDecl> {
    let object = builtin_class(
        OBJECT,
        None,
        vec![
            method("clone", &[], Type::object()),
            method("equals", &[("o", Type::object())], Type::Boolean),
            method("toString", &[], Type::string()),
        ],
    );

    let string = builtin_class(
        STRING,
        Some(OBJECT),
        vec![
            method("length", &[], Type::Int),
            method("equals", &[("str", Type::object())], Type::Boolean),
            method("toString", &[], Type::string()),
            method("substring", &[("beginIndex", Type::Int), ("endIndex", Type::Int)], Type::string()),
            method("concat", &[("str", Type::string())], Type::string()),
        ],
    );

    let text_io = builtin_class(
        TEXT_IO,
        Some(OBJECT),
        vec![
            method("readStdin", &[], Type::Void),
            method("readFile", &[("filename", Type::string())], Type::Void),
            method("writeStdout", &[], Type::Void),
            method("writeStderr", &[], Type::Void),
            method("writeFile", &[("filename", Type::string())], Type::Void),
            method("getString", &[], Type::string()),
            method("getInt", &[], Type::Int),
            method("putString", &[("str", Type::string())], Type::class(TEXT_IO)),
            method("putInt", &[("i", Type::Int)], Type::class(TEXT_IO)),
        ],
    );

    let sys = builtin_class(
        SYS,
        Some(OBJECT),
        vec![
            method("exit", &[("status", Type::Int)], Type::Void),
            method("time", &[], Type::Int),
            method("random", &[], Type::Int),
        ],
    );

    vec![object, string, text_io, sys]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_set() {
        let classes = builtin_classes();
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Object", "String", "TextIO", "Sys"]);
        assert!(classes[0].parent.is_none());
        assert!(classes[1..].iter().all(|c| c.parent.as_deref() == Some("Object")));
    }

    #[test]
    fn test_only_object_is_extendable() {
        assert!(is_extendable_builtin("Object"));
        assert!(!is_extendable_builtin("String"));
        assert!(!is_extendable_builtin("Main"));
        assert!(is_builtin_class("Sys"));
    }
}
