// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 表单解析模块
//!
//! 将 `application/x-www-form-urlencoded` 请求体解码为键值对。
//! 解码由 `url::form_urlencoded` 完成；在此之前会严格检查百分号转义，
//! 非法转义（如 `%zz`、截断的 `%4`）以及解码后不是 UTF-8 的字段
//! 都被视为传输层错误，而不是静默替换。

use crate::{exception::Exception, param::FORM_URLENCODED, request::Request};
use log::warn;
use percent_encoding::percent_decode;
use url::form_urlencoded;

/// 请求体中提交的表单字段。只包含请求体，不包含查询字符串。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    fields: Vec<(String, String)>,
}

impl Form {
    /// 从 POST 请求中解析表单。
    ///
    /// - 查询字符串同样要求转义合法，但其字段不并入结果。
    /// - 未声明 `Content-Type` 或媒体类型不是表单编码时，结果为空表单。
    pub fn from_request(request: &Request, id: u128) -> Result<Self, Exception> {
        if let Some(query) = request.query() {
            if !is_valid_escape(query.as_bytes()) {
                warn!("[ID{}]查询字符串包含非法转义", id);
                return Err(Exception::MalformedForm);
            }
        }

        let media_type = match request.content_type() {
            Some(ct) => parse_media_type(ct)?,
            None => return Ok(Self::default()),
        };
        if media_type != FORM_URLENCODED {
            return Ok(Self::default());
        }

        Self::parse(request.body(), id)
    }

    /// 解析表单编码的字节串
    pub fn parse(body: &[u8], id: u128) -> Result<Self, Exception> {
        if !is_valid_escape(body) {
            warn!("[ID{}]表单请求体包含非法转义", id);
            return Err(Exception::MalformedForm);
        }
        if !is_utf8_after_decode(body) {
            warn!("[ID{}]表单字段解码后不是合法的UTF-8", id);
            return Err(Exception::MalformedForm);
        }
        let fields = form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Self { fields })
    }

    /// 返回同名字段的第一个值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 每个 `%` 之后必须紧跟两位十六进制数字
fn is_valid_escape(bytes: &[u8]) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([a, b]) if a.is_ascii_hexdigit() && b.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

/// `form_urlencoded` 会把非法 UTF-8 替换为 U+FFFD，这里先逐个键值检查
fn is_utf8_after_decode(body: &[u8]) -> bool {
    body.split(|&b| b == b'&')
        .flat_map(|pair| pair.splitn(2, |&b| b == b'='))
        .all(|part| percent_decode(part).decode_utf8().is_ok())
}

/// 取出 `Content-Type` 的媒体类型部分（小写），参数被忽略。
fn parse_media_type(value: &str) -> Result<String, Exception> {
    let essence = value.split(';').next().unwrap_or("").trim();
    let (kind, subtype) = essence
        .split_once('/')
        .ok_or(Exception::MalformedMediaType)?;
    let is_token = |s: &str| {
        !s.is_empty()
            && s.bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$&-^_.+".contains(&b))
    };
    if !is_token(kind) || !is_token(subtype) {
        return Err(Exception::MalformedMediaType);
    }
    Ok(essence.to_ascii_lowercase())
}
