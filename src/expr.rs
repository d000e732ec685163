// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 表达式模型
//!
//! 解析器与请求编排层之间传递的数据：
//! - [`ParsedExpr`]：解析成功的表达式，原文与推断出的值类型。
//! - [`ParseError`]：带位置的语法错误，面向用户展示。
//! - [`ParseFailure`]：解析失败的两种情况，语法错误或解析器自身故障。

use std::fmt;

/// 表达式的值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    InstantVector,
    RangeVector,
    Scalar,
    String,
}

impl ValueType {
    /// 页面上展示给用户的类型名
    pub fn label(&self) -> &'static str {
        match self {
            ValueType::InstantVector => "instant-vector",
            ValueType::RangeVector => "range-vector",
            ValueType::Scalar => "scalar",
            ValueType::String => "string",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 解析成功的表达式。`raw` 与提交的文本逐字节相同。
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpr {
    raw: String,
    value_type: ValueType,
}

impl ParsedExpr {
    pub fn new(raw: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            raw: raw.into(),
            value_type,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

/// 带位置信息的语法错误。
///
/// `line` 为 `None` 表示错误无法归属到具体某一行（单行输入），
/// 此时只输出字符位置。
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    line: Option<u32>,
    position: u32,
    message: String,
}

impl ParseError {
    pub fn new(line: Option<u32>, position: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            position,
            message: message.into(),
        }
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            None => write!(f, "parse error at char {}: {}", self.position, self.message),
            Some(line) => write!(
                f,
                "parse error at line {}, char {}: {}",
                line, self.position, self.message
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// 解析器调用失败的结果。
///
/// 只有 `Syntax` 会展示给用户；`Unclassified` 表示解析器本身出了问题，
/// 其内容只写入日志。
#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    Syntax(ParseError),
    Unclassified(String),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::Syntax(e) => write!(f, "{}", e),
            ParseFailure::Unclassified(e) => write!(f, "unclassified parser failure: {}", e),
        }
    }
}

impl From<ParseError> for ParseFailure {
    fn from(e: ParseError) -> Self {
        ParseFailure::Syntax(e)
    }
}
