// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 表达式校验编排
//!
//! 处理 `POST /` 的表单提交：
//! 1. 解析表单，编码非法时直接返回 400；
//! 2. `body` 字段缺失或为空时生成固定的校验失败结果；
//! 3. 否则调用解析器，并把三种结果归类为 [`LintOutcome`]。
//!
//! 本模块只决定"返回什么"，渲染与写回由分发器完成。

use log::{debug, error, warn};
use serde_derive::Serialize;

use crate::{
    exception::Exception,
    expr::{ParseFailure, ValueType},
    form::Form,
    parser::ExprParser,
    request::Request,
};

/// 保存表达式文本的表单字段名
pub const EXPRESSION_FIELD: &str = "body";

/// 空输入时展示的固定诊断。`ErrorPos` 仍然为 0。
pub const EMPTY_INPUT_ERROR: &str = "parse error at char 1: no expression found in input";

/// 一次校验的结果，两个变体互斥
#[derive(Debug, Clone, PartialEq)]
pub enum LintResult {
    Valid {
        raw: String,
        value_type: ValueType,
    },
    Invalid {
        raw: String,
        error_text: String,
        error_pos: u32,
        /// 0 表示不适用
        error_line: u32,
    },
}

impl LintResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, LintResult::Valid { .. })
    }

    pub fn raw(&self) -> &str {
        match self {
            LintResult::Valid { raw, .. } | LintResult::Invalid { raw, .. } => raw,
        }
    }

    /// 渲染器消费的扁平视图
    pub fn view(&self) -> LintView {
        match self {
            LintResult::Valid { raw, value_type } => LintView {
                valid: true,
                raw: raw.clone(),
                value_type: value_type.label().to_string(),
                error_text: String::new(),
                error_pos: 0,
                error_line: 0,
            },
            LintResult::Invalid {
                raw,
                error_text,
                error_pos,
                error_line,
            } => LintView {
                valid: false,
                raw: raw.clone(),
                value_type: String::new(),
                error_text: error_text.clone(),
                error_pos: *error_pos,
                error_line: *error_line,
            },
        }
    }
}

/// 模板与 JSON 输出使用的字段集合。
///
/// `Type` 只在 `Valid` 为真时有值，`Error*` 只在为假时有值。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LintView {
    pub valid: bool,
    pub raw: String,
    #[serde(rename = "Type")]
    pub value_type: String,
    pub error_text: String,
    pub error_pos: u32,
    pub error_line: u32,
}

/// 对一次提交的处理决定
#[derive(Debug, Clone, PartialEq)]
pub enum LintOutcome {
    /// 以 200 渲染校验结果
    Render(LintResult),
    /// 传输层错误，不渲染结果
    Rejected(Exception),
    /// 解析器故障，返回 500，细节只写入日志
    ParserFailure(String),
}

/// 处理一次表单提交
pub fn lint_submission(parser: &dyn ExprParser, request: &Request, id: u128) -> LintOutcome {
    let form = match Form::from_request(request, id) {
        Ok(form) => form,
        Err(e) => {
            warn!("[ID{}]表单解析失败：{}", id, e);
            return LintOutcome::Rejected(e);
        }
    };
    lint_text(parser, form.get(EXPRESSION_FIELD).unwrap_or(""), id)
}

/// 校验表达式文本
pub fn lint_text(parser: &dyn ExprParser, text: &str, id: u128) -> LintOutcome {
    if text.is_empty() {
        debug!("[ID{}]未提交表达式", id);
        return LintOutcome::Render(LintResult::Invalid {
            raw: String::new(),
            error_text: EMPTY_INPUT_ERROR.to_string(),
            error_pos: 0,
            error_line: 0,
        });
    }

    match parser.parse_expr(text) {
        Ok(parsed) => {
            debug!("[ID{}]表达式合法，类型{}", id, parsed.value_type());
            LintOutcome::Render(LintResult::Valid {
                raw: text.to_string(),
                value_type: parsed.value_type(),
            })
        }
        Err(ParseFailure::Syntax(e)) => {
            debug!("[ID{}]表达式不合法：{}", id, e);
            LintOutcome::Render(LintResult::Invalid {
                raw: text.to_string(),
                error_text: e.to_string(),
                error_pos: e.position(),
                error_line: e.line().unwrap_or(0),
            })
        }
        Err(ParseFailure::Unclassified(e)) => {
            error!("[ID{}]ExprParser: parse_expr: {}", id, e);
            LintOutcome::ParserFailure(e)
        }
    }
}
