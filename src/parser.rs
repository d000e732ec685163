// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 表达式解析能力的抽象。
//!
//! 分发器只依赖这个 trait；进程启动时构造一个实现并在所有请求间共享，
//! 因此实现必须可以被并发调用，且不保存任何请求级状态。

use crate::expr::{ParseFailure, ParsedExpr};

#[cfg_attr(test, mockall::automock)]
pub trait ExprParser: Send + Sync {
    /// 解析原始文本。
    ///
    /// 成功时返回的 `ParsedExpr::raw` 必须与 `text` 完全一致。
    fn parse_expr(&self, text: &str) -> Result<ParsedExpr, ParseFailure>;
}
