//! 类层次构建
//!
//! 两遍：第一遍为每个类声明创建描述符，第二遍解析父类链接。
//! 父类未知、不可继承或会形成环的类都改挂到 Object 下，并登记错误。

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ast::Program;
use crate::error::{BantamResult, ErrorHandler, ErrorKind};
use crate::types::{MethodSig, OBJECT, Type};
use super::builtins::{self, BUILTIN_FILENAME};
use super::symbol_table::SymbolTable;

/// Bantam 保留字，不能作类名
pub const RESERVED_WORDS: [&str; 18] = [
    "class", "extends", "new", "if", "else", "while", "for", "break", "return", "instanceof",
    "this", "super", "null", "true", "false", "void", "int", "boolean",
];

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// 类描述符
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    name: String,
    declared_parent: Option<String>,
    parent: Option<String>,
    filename: String,
    line: usize,
    extendable: bool,
    builtin: bool,
    fields: SymbolTable<Type>,
    methods: SymbolTable<MethodSig>,
    children: Vec<String>,
    descendants: usize,
}

impl ClassDescriptor {
    fn new(name: &str, declared_parent: Option<String>, filename: &str, line: usize) -> Self {
        let builtin = filename == BUILTIN_FILENAME && builtins::is_builtin_class(name);
        let extendable = !builtin || builtins::is_extendable_builtin(name);
        Self {
            name: name.to_string(),
            declared_parent,
            parent: None,
            filename: filename.to_string(),
            line,
            extendable,
            builtin,
            fields: SymbolTable::new(),
            methods: SymbolTable::new(),
            children: Vec::new(),
            descendants: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 已解析的父类，根类为 None
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// 源码里写的父类
    pub fn declared_parent(&self) -> Option<&str> {
        self.declared_parent.as_deref()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn is_extendable(&self) -> bool {
        self.extendable
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// 字段表（含继承的字段）
    pub fn field_scope(&self) -> &SymbolTable<Type> {
        &self.fields
    }

    /// 方法表（含继承的方法）
    pub fn method_scope(&self) -> &SymbolTable<MethodSig> {
        &self.methods
    }

    pub(crate) fn set_scopes(&mut self, fields: SymbolTable<Type>, methods: SymbolTable<MethodSig>) {
        self.fields = fields;
        self.methods = methods;
    }

    pub fn descendant_count(&self) -> usize {
        self.descendants
    }
}

/// 类名到描述符的映射，按声明顺序可遍历
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    classes: HashMap<String, ClassDescriptor>,
    order: Vec<String>,
}

impl ClassHierarchy {
    pub fn get(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut ClassDescriptor> {
        self.classes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.order.iter().filter_map(|name| self.classes.get(name))
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    fn insert(&mut self, descriptor: ClassDescriptor) {
        self.order.push(descriptor.name.clone());
        self.classes.insert(descriptor.name.clone(), descriptor);
    }

    /// 祖先链（不含自身），最多走 len 步
    pub fn ancestors<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let start = self.classes.get(name).and_then(|c| c.parent.as_deref());
        std::iter::successors(start, move |current| {
            self.classes.get(*current).and_then(|c| c.parent.as_deref())
        })
        .take(self.len())
    }

    /// `sub` 是否为 `ancestor` 本身或其后代
    pub fn is_subclass(&self, sub: &str, ancestor: &str) -> bool {
        if !self.contains(sub) {
            return false;
        }
        sub == ancestor || self.ancestors(sub).any(|a| a == ancestor)
    }

    /// 核心兼容性判断：`sub` 类型的值能否用在需要 `ty` 的地方
    pub fn is_compatible(&self, ty: &Type, sub: &Type) -> bool {
        if ty == sub {
            return true;
        }
        match (ty, sub) {
            (Type::Error, _) | (_, Type::Error) => true,
            (Type::Class(_) | Type::Array(_), Type::Null) => true,
            (Type::Class(t), Type::Array(_)) => t == OBJECT,
            (Type::Array(t), Type::Array(s)) => {
                t.is_reference_type() && s.is_reference_type() && self.is_compatible(t, s)
            }
            (Type::Class(t), Type::Class(s)) => self.is_subclass(s, t),
            _ => false,
        }
    }

    /// 类型名是否有效。`void` 只在 `allow_void` 时有效
    pub fn is_valid_type(&self, ty: &Type, allow_void: bool) -> bool {
        match ty {
            Type::Void => allow_void,
            Type::Int | Type::Boolean | Type::Null | Type::Error => true,
            Type::Class(name) => self.contains(name),
            Type::Array(elem) => self.is_valid_type(elem, false),
        }
    }

    /// 从根开始的前序遍历：父类总在子类之前
    pub fn root_first(&self) -> Vec<String> {
        let mut result = Vec::with_capacity(self.len());
        let mut stack = vec![OBJECT.to_string()];
        let mut seen = HashSet::new();
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(class) = self.classes.get(&name) {
                stack.extend(class.children.iter().rev().cloned());
            }
            result.push(name);
        }
        result
    }

    /// 查找方法（含继承）
    pub fn lookup_method(&self, class_name: &str, method: &str) -> Option<&MethodSig> {
        self.get(class_name).and_then(|c| c.methods.lookup(method))
    }

    /// 查找字段（含继承）
    pub fn lookup_field(&self, class_name: &str, field: &str) -> Option<&Type> {
        self.get(class_name).and_then(|c| c.fields.lookup(field))
    }
}

/// 构建类层次
///
/// 副作用：内置类被追加到 `program.classes`。错误只登记不返回，
/// 返回 `Err` 只表示错误数超过上限。
pub fn build_hierarchy(program: &mut Program, errors: &mut ErrorHandler) -> BantamResult<ClassHierarchy> {
    if !program.classes.iter().any(|c| c.filename == BUILTIN_FILENAME) {
        program.classes.extend(builtins::builtin_classes());
    }

    let mut hierarchy = ClassHierarchy::default();

    // 第一遍：内置类先登记，用户类再登记，这样重名的用户类会被拒绝
    let (builtin_decls, user_decls): (Vec<_>, Vec<_>) = program
        .classes
        .iter()
        .partition(|c| c.filename == BUILTIN_FILENAME);

    for class in builtin_decls.into_iter().chain(user_decls) {
        if is_reserved_word(&class.name) {
            errors.register(
                ErrorKind::Semantic,
                &class.filename,
                class.line,
                format!("class name '{}' is a reserved word", class.name),
            )?;
            continue;
        }
        if hierarchy.contains(&class.name) {
            errors.register(
                ErrorKind::Semantic,
                &class.filename,
                class.line,
                format!("class '{}' already declared", class.name),
            )?;
            continue;
        }
        hierarchy.insert(ClassDescriptor::new(
            &class.name,
            class.parent.clone(),
            &class.filename,
            class.line,
        ));
    }

    // 第二遍：链接父类
    let names = hierarchy.order.clone();
    for name in &names {
        if name == OBJECT {
            continue;
        }
        link_parent(&mut hierarchy, name, errors)?;
    }

    compute_descendants(&mut hierarchy);

    let reachable = hierarchy.get(OBJECT).map_or(0, |o| o.descendants);
    if hierarchy.contains(OBJECT) && reachable + 1 != hierarchy.len() {
        errors.register_bare(ErrorKind::Semantic, "inheritance loop detected")?;
    }

    debug!(classes = hierarchy.len(), errors = errors.count(), "class hierarchy built");
    Ok(hierarchy)
}

fn link_parent(hierarchy: &mut ClassHierarchy, name: &str, errors: &mut ErrorHandler) -> BantamResult<()> {
    let Some(class) = hierarchy.get(name) else {
        return Ok(());
    };
    let filename = class.filename.clone();
    let line = class.line;
    let declared = class.declared_parent.clone().unwrap_or_else(|| OBJECT.to_string());

    let parent = match hierarchy.get(&declared).map(|p| p.extendable) {
        None => {
            errors.register(
                ErrorKind::Semantic,
                &filename,
                line,
                format!("class '{}' extends unknown class '{}'", name, declared),
            )?;
            debug!(class = name, parent = %declared, "unknown parent, defaulting to Object");
            OBJECT.to_string()
        }
        Some(false) => {
            errors.register(
                ErrorKind::Semantic,
                &filename,
                line,
                format!("class '{}' cannot extend non-extendable class '{}'", name, declared),
            )?;
            debug!(class = name, parent = %declared, "non-extendable parent, defaulting to Object");
            OBJECT.to_string()
        }
        Some(true) => {
            if let Some(cycle) = cycle_through(hierarchy, &declared, name) {
                return break_cycle(hierarchy, name, &declared, cycle, errors);
            }
            declared
        }
    };

    if let Some(class) = hierarchy.get_mut(name) {
        class.parent = Some(parent);
    }
    Ok(())
}

/// 若把 `child` 挂到 `parent` 下会成环，返回环上 `parent` 到 `child` 之前的类。
/// 自继承返回空环
fn cycle_through(hierarchy: &ClassHierarchy, parent: &str, child: &str) -> Option<Vec<String>> {
    let mut chain = Vec::new();
    let mut current = Some(parent.to_string());
    while let Some(name) = current {
        if name == child {
            return Some(chain);
        }
        if chain.len() > hierarchy.len() {
            break;
        }
        current = hierarchy.get(&name).and_then(|c| c.parent.clone());
        chain.push(name);
    }
    None
}

fn break_cycle(
    hierarchy: &mut ClassHierarchy,
    name: &str,
    declared: &str,
    cycle: Vec<String>,
    errors: &mut ErrorHandler,
) -> BantamResult<()> {
    let mut members = vec![(name.to_string(), declared.to_string())];
    for member in cycle {
        let parent = hierarchy
            .get(&member)
            .and_then(|c| c.declared_parent.clone())
            .unwrap_or_else(|| OBJECT.to_string());
        members.push((member, parent));
    }

    for (member, parent) in members {
        if let Some(class) = hierarchy.get_mut(&member) {
            class.parent = Some(OBJECT.to_string());
            let filename = class.filename.clone();
            let line = class.line;
            errors.register(
                ErrorKind::Semantic,
                filename,
                line,
                format!("inheritance cycle: class '{}' cannot extend '{}'", member, parent),
            )?;
            debug!(class = %member, "inheritance cycle, defaulting to Object");
        }
    }
    Ok(())
}

/// 根据父链接填充子类列表和后代计数
fn compute_descendants(hierarchy: &mut ClassHierarchy) {
    let names = hierarchy.order.clone();
    for name in &names {
        if let Some(class) = hierarchy.classes.get_mut(name) {
            class.children.clear();
            class.descendants = 0;
        }
    }
    for name in &names {
        let parent = hierarchy.classes.get(name).and_then(|c| c.parent.clone());
        if let Some(parent) = parent {
            if let Some(p) = hierarchy.classes.get_mut(&parent) {
                p.children.push(name.clone());
            }
        }
    }

    // 后序：先算子类再算父类
    let mut post_order = hierarchy.root_first();
    post_order.reverse();
    for name in post_order {
        let count = hierarchy.classes.get(&name).map_or(0, |c| {
            c.children
                .iter()
                .map(|child| hierarchy.classes.get(child).map_or(0, |d| d.descendants + 1))
                .sum()
        });
        if let Some(class) = hierarchy.classes.get_mut(&name) {
            class.descendants = count;
        }
    }
}
