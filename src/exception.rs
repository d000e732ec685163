// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了 PromQL 校验服务在启动与请求处理过程中可能出现的各类异常。
//!
//! ## 分类
//! - **传输层异常**：请求报文无法解析、请求体过大、表单编码非法等，统一映射为 4xx 响应。
//! - **启动异常**：配置文件、模板文件或端口绑定失败，由入口函数记录后退出进程。
//!
//! 解析器的语法错误不属于此处，它们是面向用户的校验反馈，见 [`crate::expr::ParseFailure`]。

use std::fmt;

/// 服务器处理请求或启动过程中发生的异常类型。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// 请求头部无法按 UTF-8 解码。
    RequestIsNotUtf8,
    /// 请求行不符合 `METHOD TARGET VERSION` 的格式。
    MalformedRequestLine,
    /// 客户端使用了不支持的 HTTP 协议版本（仅支持 1.0 与 1.1）。
    UnsupportedHttpVersion,
    /// 某一行头部缺少 `:` 分隔符，或 `Content-Length` 不是数字。
    MalformedHeader,
    /// 请求体超过了配置中的 `max_body_size`。对应 `413 Content Too Large`。
    BodyTooLarge,
    /// 表单或查询字符串中存在非法的百分号转义。
    MalformedForm,
    /// `Content-Type` 头部本身无法解析。
    MalformedMediaType,
    /// 在读超时时间内未能收到完整请求。
    ReadTimeout,
    /// 客户端在发送完整请求之前关闭了连接。
    ConnectionClosed,
    /// 配置文件存在但无法读取或解析。
    InvalidConfig(String),
    /// 页面模板无法载入或编译。
    TemplateLoadFailed(String),
    /// 监听端口绑定失败。
    BindFailed(String),
    /// 无法构建异步运行时。
    RuntimeFailed(String),
}

use Exception::*;

impl Exception {
    /// 该异常在请求处理阶段对应的 HTTP 状态码。
    pub fn status_code(&self) -> u16 {
        match self {
            BodyTooLarge => 413,
            ReadTimeout => 408,
            InvalidConfig(_) | TemplateLoadFailed(_) | BindFailed(_) | RuntimeFailed(_) => 500,
            _ => 400,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            MalformedHeader => write!(f, "Malformed request header"),
            BodyTooLarge => write!(f, "Request body too large (413)"),
            MalformedForm => write!(f, "Malformed form encoding"),
            MalformedMediaType => write!(f, "Malformed Content-Type"),
            ReadTimeout => write!(f, "Timed out reading the request"),
            ConnectionClosed => write!(f, "Connection closed before the request was complete"),
            InvalidConfig(e) => write!(f, "Invalid configuration: {}", e),
            TemplateLoadFailed(e) => write!(f, "Couldn't load page template: {}", e),
            BindFailed(e) => write!(f, "Couldn't bind listener: {}", e),
            RuntimeFailed(e) => write!(f, "Couldn't start async runtime: {}", e),
        }
    }
}

impl std::error::Error for Exception {}
