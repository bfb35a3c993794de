use std::fmt;

pub const OBJECT: &str = "Object";
pub const STRING: &str = "String";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int,
    Boolean,
    Null,
    Class(String),
    Array(Box<Type>),
    /// 错误哨兵：与任何类型兼容，避免一个错误引发连锁诊断
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: String,
    pub param_type: Type,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, param_type: Type) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }
}

/// 方法签名，存放在类描述符的方法符号表里
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub name: String,
    pub class_name: String,
    pub params: Vec<ParameterInfo>,
    pub return_type: Type,
    pub line: usize,
}

impl MethodSig {
    pub fn param_types(&self) -> impl Iterator<Item = &Type> {
        self.params.iter().map(|p| &p.param_type)
    }

    /// 参数类型和返回类型都相同
    pub fn same_signature(&self, other: &MethodSig) -> bool {
        self.return_type == other.return_type && self.param_types().eq(other.param_types())
    }
}

impl Type {
    pub fn class(name: impl Into<String>) -> Self {
        Type::Class(name.into())
    }

    pub fn object() -> Self {
        Type::Class(OBJECT.to_string())
    }

    pub fn string() -> Self {
        Type::Class(STRING.to_string())
    }

    pub fn array_of(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    /// int、boolean、void 不属于引用类型层次
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Int | Type::Boolean | Type::Void)
    }

    pub fn is_reference_type(&self) -> bool {
        matches!(self, Type::Class(_) | Type::Array(_) | Type::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int => write!(f, "int"),
            Type::Boolean => write!(f, "boolean"),
            Type::Null => write!(f, "null"),
            Type::Class(name) => write!(f, "{}", name),
            Type::Array(inner) => write!(f, "{}[]", inner),
            Type::Error => write!(f, "<error>"),
        }
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.param_type)?;
        }
        write!(f, "): {}", self.return_type)
    }
}
