//! 作用域符号表
//!
//! 作用域栈，每层是一个名字到值的映射。查找从最内层向外；`peek` 只看最内层，
//! 用来发现同一作用域里的重复声明。

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SymbolTable<V> {
    scopes: Vec<HashMap<String, V>>,
}

impl<V> SymbolTable<V> {
    /// 新建符号表，已进入一层作用域
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// 进入新作用域
    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// 退出当前作用域，最外层不会被弹出
    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// 在当前作用域声明，返回被覆盖的旧值
    pub fn add(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        self.scopes.last_mut().and_then(|scope| scope.insert(name.into(), value))
    }

    /// 从内到外查找
    pub fn lookup(&self, name: &str) -> Option<&V> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// 只查当前作用域
    pub fn peek(&self, name: &str) -> Option<&V> {
        self.scopes.last().and_then(|s| s.get(name))
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl<V> Default for SymbolTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
