//! 编译选项

use crate::error::DEFAULT_MAX_ERRORS;

/// 语义分析选项
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub max_errors: usize,    // 超过即中止
    pub require_main: bool,   // 检查主类和 main 方法
    pub main_class: String,
    pub main_method: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            max_errors: DEFAULT_MAX_ERRORS,
            require_main: true,
            main_class: "Main".to_string(),
            main_method: "main".to_string(),
        }
    }
}

impl CompilerOptions {
    /// 库模式：不要求 Main 类
    pub fn library() -> Self {
        CompilerOptions {
            require_main: false,
            ..Self::default()
        }
    }
}
