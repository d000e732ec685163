// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # PromQL 解析器
//!
//! 基于 `rusty-promql-parser`（nom 实现）的 [`ExprParser`]。
//!
//! 语法层面的失败和类型检查失败都会转换为 [`ParseError`]：
//! - 位置是出错行内从 1 开始的字符列号；
//! - 只有当去除首尾空白后的输入跨越多行时才报告行号。
//!
//! nom 返回 `Incomplete` 说明解析器本身的用法出了问题，归为 `Unclassified`。

use log::debug;
use regex::Regex;
use rusty_promql_parser::{
    parser::function::{get_function, ValueType as FunctionType},
    Expr,
};

use crate::{
    expr::{ParseError, ParseFailure, ParsedExpr, ValueType},
    parser::ExprParser,
};

const NO_EXPRESSION: &str = "no expression found in input";

/// PromQL 表达式解析器，无状态，可在线程间共享。
#[derive(Debug, Default, Clone, Copy)]
pub struct PromqlParser;

impl PromqlParser {
    pub fn new() -> Self {
        Self
    }
}

impl ExprParser for PromqlParser {
    fn parse_expr(&self, text: &str) -> Result<ParsedExpr, ParseFailure> {
        let start = text.len() - text.trim_start().len();
        if text.trim().is_empty() {
            return Err(error_at(text, 0, NO_EXPRESSION));
        }

        let ast = match rusty_promql_parser::expr(text) {
            Ok((rest, ast)) => {
                let rest = rest.trim_start();
                if !rest.is_empty() {
                    let offset = text.len() - rest.len();
                    return Err(unexpected_at(text, offset));
                }
                ast
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                debug!("nom错误：{:?} 剩余{}字节", e.code, e.input.len());
                let offset = text.len().saturating_sub(e.input.len());
                return Err(unexpected_at(text, offset));
            }
            Err(nom::Err::Incomplete(needed)) => {
                return Err(ParseFailure::Unclassified(format!(
                    "promql parser reported incomplete input ({:?})",
                    needed
                )));
            }
        };

        let checker = TypeChecker { text, start };
        let value_type = checker.check(&ast)?;
        Ok(ParsedExpr::new(text, value_type))
    }
}

/// 将字节偏移换算为（行号，列号）并生成语法错误
fn error_at(text: &str, offset: usize, message: impl Into<String>) -> ParseFailure {
    let before = text.get(..offset).unwrap_or("");
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().unwrap_or("").chars().count() + 1;
    let line = if text.trim().contains('\n') {
        Some(line as u32)
    } else {
        None
    };
    ParseFailure::Syntax(ParseError::new(line, column as u32, message))
}

fn unexpected_at(text: &str, offset: usize) -> ParseFailure {
    let message = match text.get(offset..).and_then(|rest| rest.chars().next()) {
        Some(c) => format!("unexpected character: '{}'", c.escape_default()),
        None => "unexpected end of input".to_string(),
    };
    error_at(text, offset, message)
}

/// 与用户文档一致的类型名（"instant vector" 而不是 "vector"）
fn documented(t: ValueType) -> &'static str {
    match t {
        ValueType::InstantVector => "instant vector",
        ValueType::RangeVector => "range vector",
        ValueType::Scalar => "scalar",
        ValueType::String => "string",
    }
}

fn from_function_type(t: FunctionType) -> ValueType {
    match t {
        FunctionType::Scalar => ValueType::Scalar,
        FunctionType::Vector => ValueType::InstantVector,
        FunctionType::Matrix => ValueType::RangeVector,
        FunctionType::String => ValueType::String,
    }
}

/// 在语法树上推断值类型，同时做 PromQL 的静态类型检查。
///
/// 语法树不带位置信息：函数相关的错误定位到函数名第一次出现的位置，
/// 其余错误定位到表达式的第一个非空白字符。
struct TypeChecker<'a> {
    text: &'a str,
    start: usize,
}

impl TypeChecker<'_> {
    fn check(&self, expr: &Expr) -> Result<ValueType, ParseFailure> {
        match expr {
            Expr::Number(_) => Ok(ValueType::Scalar),
            Expr::String(_) => Ok(ValueType::String),
            Expr::VectorSelector(_) => Ok(ValueType::InstantVector),
            Expr::MatrixSelector(_) => Ok(ValueType::RangeVector),
            Expr::Paren(inner) => self.check(inner),
            Expr::Subquery(sq) => {
                let t = self.check(&sq.expr)?;
                if t != ValueType::InstantVector {
                    return Err(self.fail(format!(
                        "subquery is only allowed on instant vector, got {} instead",
                        documented(t)
                    )));
                }
                Ok(ValueType::RangeVector)
            }
            Expr::Unary(u) => {
                let t = self.check(&u.expr)?;
                if !matches!(t, ValueType::Scalar | ValueType::InstantVector) {
                    return Err(self.fail(format!(
                        "unary expression only allowed on expressions of type scalar or instant vector, got \"{}\"",
                        documented(t)
                    )));
                }
                Ok(t)
            }
            Expr::Binary(b) => {
                let lhs = self.check(&b.lhs)?;
                let rhs = self.check(&b.rhs)?;
                for t in [lhs, rhs] {
                    if !matches!(t, ValueType::Scalar | ValueType::InstantVector) {
                        return Err(self.fail(
                            "binary expression must contain only scalar and instant vector types",
                        ));
                    }
                }
                let both_scalar = lhs == ValueType::Scalar && rhs == ValueType::Scalar;
                if b.op.is_set_operator()
                    && (lhs == ValueType::Scalar || rhs == ValueType::Scalar)
                {
                    return Err(self.fail(format!(
                        "set operator \"{}\" not allowed in binary scalar expression",
                        b.op
                    )));
                }
                let returns_bool = b.modifier.as_ref().is_some_and(|m| m.return_bool);
                if b.op.is_comparison() && both_scalar && !returns_bool {
                    return Err(self.fail("comparisons between scalars must use BOOL modifier"));
                }
                if both_scalar {
                    Ok(ValueType::Scalar)
                } else {
                    Ok(ValueType::InstantVector)
                }
            }
            Expr::Aggregation(agg) => {
                if let Some(param) = &agg.param {
                    let expected = if agg.op == "count_values" {
                        ValueType::String
                    } else {
                        ValueType::Scalar
                    };
                    let t = self.check(param)?;
                    if t != expected {
                        return Err(self.fail(format!(
                            "expected type {} in aggregation parameter, got {}",
                            documented(expected),
                            documented(t)
                        )));
                    }
                }
                let t = self.check(&agg.expr)?;
                if t != ValueType::InstantVector {
                    return Err(self.fail(format!(
                        "expected type instant vector in aggregation expression, got {}",
                        documented(t)
                    )));
                }
                Ok(ValueType::InstantVector)
            }
            Expr::Call(call) => {
                let name = call.name.as_str();
                let function = match get_function(name) {
                    Some(f) => f,
                    None => {
                        return Err(self.fail_at_call(
                            name,
                            format!("unknown function with name \"{}\"", name),
                        ))
                    }
                };

                let got = call.args.len();
                if got < function.min_args() {
                    return Err(self.fail_at_call(
                        name,
                        format!(
                            "expected at least {} argument(s) in call to \"{}\", got {}",
                            function.min_args(),
                            name,
                            got
                        ),
                    ));
                }
                if let Some(max) = function.max_args() {
                    if got > max {
                        return Err(self.fail_at_call(
                            name,
                            format!(
                                "expected at most {} argument(s) in call to \"{}\", got {}",
                                max, name, got
                            ),
                        ));
                    }
                }

                for (i, arg) in call.args.iter().enumerate() {
                    let t = self.check(arg)?;
                    let declared = match function.arg_types.get(i).or(function.arg_types.last()) {
                        Some(d) => from_function_type(*d),
                        None => continue,
                    };
                    if t != declared {
                        return Err(self.fail_at_call(
                            name,
                            format!(
                                "expected type {} in call to function \"{}\", got {}",
                                documented(declared),
                                name,
                                documented(t)
                            ),
                        ));
                    }
                }

                Ok(from_function_type(function.return_type))
            }
        }
    }

    fn fail(&self, message: impl Into<String>) -> ParseFailure {
        error_at(self.text, self.start, message)
    }

    fn fail_at_call(&self, name: &str, message: String) -> ParseFailure {
        let pattern = format!(r"\b{}\s*\(", regex::escape(name));
        let offset = Regex::new(&pattern)
            .ok()
            .and_then(|re| re.find(self.text))
            .map(|m| m.start())
            .unwrap_or(self.start);
        error_at(self.text, offset, message)
    }
}
