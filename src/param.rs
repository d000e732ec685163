// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了 `promlint` 使用的 HTTP 协议常量和数据结构，包括：
//! - 服务会用到的状态码及其原因短语（Reason Phrase）。
//! - 静态资源可能涉及的 MIME 类型映射表。
//! - HTTP 方法、版本及编码格式的强类型枚举。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "promlint";

/// HTTP 协议规定的换行符
pub const CRLF: &str = "\r\n";

/// 代理写入原始协议的请求头
pub const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// 原始协议为 https 时附加的 HSTS 头部取值
pub const HSTS_VALUE: &str = "max-age=31536000; preload";

/// 表单编码的媒体类型
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(204, "No Content");

        map.insert(301, "Moved Permanently");
        map.insert(304, "Not Modified");

        map.insert(400, "Bad Request");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(408, "Request Timeout");
        map.insert(413, "Content Too Large");

        map.insert(500, "Internal Server Error");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型的映射表。
    ///
    /// 只收录静态资源白名单与页面可能用到的类型。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("css", "text/css;charset=utf-8");
        map.insert("htm", "text/html;charset=utf-8");
        map.insert("html", "text/html;charset=utf-8");
        map.insert("ico", "image/x-icon");
        map.insert("js", "text/javascript;charset=utf-8");
        map.insert("json", "application/json");
        map.insert("png", "image/png");
        map.insert("svg", "image/svg+xml");
        map.insert("txt", "text/plain;charset=utf-8");
        map
    };
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpVersion {
    V1_0,
    V1_1,
}

/// HTTP 请求方法。
///
/// 非标准的方法名不会导致解析失败，而是保存在 `Extension` 中，
/// 由路由层统一返回 405 或 404。
#[derive(Debug, Clone, PartialEq)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Connect,
    Trace,
    Extension(String),
}

impl HttpRequestMethod {
    /// 由请求行中的方法名构造。方法名区分大小写（RFC 9110 §9.1）。
    pub fn from_token(token: &str) -> Self {
        match token {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "POST" => HttpRequestMethod::Post,
            "PUT" => HttpRequestMethod::Put,
            "DELETE" => HttpRequestMethod::Delete,
            "PATCH" => HttpRequestMethod::Patch,
            "OPTIONS" => HttpRequestMethod::Options,
            "CONNECT" => HttpRequestMethod::Connect,
            "TRACE" => HttpRequestMethod::Trace,
            other => HttpRequestMethod::Extension(other.to_string()),
        }
    }
}

/// 支持的内容编码（压缩）格式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpEncoding {
    Gzip,
    Deflate,
    Br,
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "HTTP/1.0"),
            HttpVersion::V1_1 => write!(f, "HTTP/1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
            HttpRequestMethod::Post => write!(f, "POST"),
            HttpRequestMethod::Put => write!(f, "PUT"),
            HttpRequestMethod::Delete => write!(f, "DELETE"),
            HttpRequestMethod::Patch => write!(f, "PATCH"),
            HttpRequestMethod::Options => write!(f, "OPTIONS"),
            HttpRequestMethod::Connect => write!(f, "CONNECT"),
            HttpRequestMethod::Trace => write!(f, "TRACE"),
            HttpRequestMethod::Extension(m) => write!(f, "{}", m),
        }
    }
}

impl fmt::Display for HttpEncoding {
    /// 将枚举格式化为 `Content-Encoding` 头所使用的标识符
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpEncoding::Gzip => write!(f, "gzip"),
            HttpEncoding::Deflate => write!(f, "deflate"),
            HttpEncoding::Br => write!(f, "br"),
        }
    }
}
