// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责将 TCP 流中读取的原始字节解析为强类型的 `Request` 结构体：
//! 1. 请求行（方法、请求目标、版本）的解析，请求目标拆分为路径与查询字符串。
//! 2. 头部字段的提取（字段名大小写不敏感）。
//! 3. 根据 `Content-Length` 截取请求体。
//!
//! 服务端在读取阶段使用 [`expected_length`] 判断报文是否已经完整。

use crate::{exception::Exception, param::*};
use bytes::Bytes;
use log::error;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// 一个完整的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpRequestMethod,
    /// 请求行中的原始目标（路径 + 查询字符串）
    target: String,
    path: String,
    query: Option<String>,
    /// 绝对形式请求目标（`http://host/path`）中的主机部分
    authority: Option<String>,
    version: HttpVersion,
    /// 字段名统一转为小写，按出现顺序保存
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Request {
    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的完整报文。
    /// * `id` - 请求 ID，用于在日志中追踪。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let head_len = match find_header_end(buffer) {
            Some(n) => n,
            None => {
                error!("[ID{}]HTTP请求缺少头部结束标记", id);
                return Err(Exception::MalformedHeader);
            }
        };
        let head = match std::str::from_utf8(&buffer[..head_len]) {
            Ok(s) => s,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut lines = head.split(CRLF);

        // 请求行 (e.g., "POST /?x=1 HTTP/1.1")
        let request_line = lines.next().unwrap_or_default();
        let parts: Vec<&str> = request_line.split(' ').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequestLine);
        }

        let method = HttpRequestMethod::from_token(parts[0]);
        let version = match parts[2] {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            other => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, other);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };
        let target = parts[1].to_string();
        let (authority, origin) = split_absolute_form(&target);
        let (path, query) = match origin.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (origin.to_string(), None),
        };
        let path = if path.is_empty() { "/".to_string() } else { path };
        let authority = authority.map(str::to_string);

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = match line.split_once(':') {
                Some(pair) => pair,
                None => {
                    error!("[ID{}]无法解析的头部行：{}", id, line);
                    return Err(Exception::MalformedHeader);
                }
            };
            if name.is_empty() || name.ends_with(char::is_whitespace) {
                error!("[ID{}]非法的头部字段名：{:?}", id, name);
                return Err(Exception::MalformedHeader);
            }
            headers.push((name.to_ascii_lowercase(), value.trim().to_string()));
        }

        let mut request = Self {
            method,
            target,
            path,
            query,
            authority,
            version,
            headers,
            body: Bytes::new(),
        };

        if let Some(te) = request.header("transfer-encoding") {
            if !te.eq_ignore_ascii_case("identity") {
                error!("[ID{}]不支持的Transfer-Encoding：{}", id, te);
                return Err(Exception::MalformedHeader);
            }
        }

        let content_length = request.content_length()?.unwrap_or(0);
        let body_start = head_len + HEADER_END.len();
        let available = buffer.len().saturating_sub(body_start);
        if available < content_length {
            error!(
                "[ID{}]请求体不完整：声明{}字节，实际{}字节",
                id, content_length, available
            );
            return Err(Exception::ConnectionClosed);
        }
        request.body = Bytes::copy_from_slice(&buffer[body_start..body_start + content_length]);

        Ok(request)
    }
}

/// 判断缓冲区内的报文是否完整。
///
/// 头部尚未读完时返回 `Ok(None)`；否则返回整个报文（头部 + 请求体）应有的字节数。
/// 长度超出 `usize` 时返回 `BodyTooLarge`。
pub fn expected_length(buffer: &[u8]) -> Result<Option<usize>, Exception> {
    let (head, body) = match (head_length(buffer), body_length(buffer)?) {
        (Some(head), Some(body)) => (head, body),
        _ => return Ok(None),
    };
    head.checked_add(body)
        .map(Some)
        .ok_or(Exception::BodyTooLarge)
}

/// 头部声明的请求体长度，未声明时为 0；头部尚未读完时返回 `Ok(None)`。
pub fn body_length(buffer: &[u8]) -> Result<Option<usize>, Exception> {
    let head_len = match find_header_end(buffer) {
        Some(n) => n,
        None => return Ok(None),
    };
    let head = String::from_utf8_lossy(&buffer[..head_len]);
    let values = head.split(CRLF).skip(1).filter_map(|line| {
        line.split_once(':')
            .filter(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value)
    });
    Ok(Some(declared_content_length(values)?.unwrap_or(0)))
}

/// 头部（含结束标记 `\r\n\r\n`）的字节数，头部未读完时为 `None`
pub fn head_length(buffer: &[u8]) -> Option<usize> {
    find_header_end(buffer).map(|n| n + HEADER_END.len())
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(HEADER_END.len()).position(|w| w == HEADER_END)
}

/// 多个 `Content-Length` 头部必须取值一致
fn declared_content_length<'a>(
    values: impl Iterator<Item = &'a str>,
) -> Result<Option<usize>, Exception> {
    let mut declared = None;
    for value in values {
        let length = parse_content_length(value)?;
        match declared {
            Some(previous) if previous != length => return Err(Exception::MalformedHeader),
            _ => declared = Some(length),
        }
    }
    Ok(declared)
}

/// 只接受十进制数字；数字合法但超出 `usize` 视为请求体过大
fn parse_content_length(value: &str) -> Result<usize, Exception> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Exception::MalformedHeader);
    }
    value.parse::<usize>().map_err(|_| Exception::BodyTooLarge)
}

/// 拆出绝对形式目标中的主机部分，返回（主机，路径与查询字符串）
fn split_absolute_form(target: &str) -> (Option<&str>, &str) {
    let rest = match target
        .strip_prefix("http://")
        .or_else(|| target.strip_prefix("https://"))
    {
        Some(rest) => rest,
        None => return (None, target),
    };
    match rest.find(|c: char| c == '/' || c == '?') {
        Some(i) => (Some(&rest[..i]), &rest[i..]),
        None => (Some(rest), "/"),
    }
}

impl Request {
    pub fn method(&self) -> &HttpRequestMethod {
        &self.method
    }

    /// 请求目标（含查询字符串），重定向时原样保留
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// 按名称（大小写不敏感）获取第一个同名头部的值
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 绝对形式目标中的主机优先于 `Host` 头部
    pub fn host(&self) -> Option<&str> {
        self.authority.as_deref().or_else(|| self.header("host"))
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn if_modified_since(&self) -> Option<&str> {
        self.header("if-modified-since")
    }

    pub fn content_length(&self) -> Result<Option<usize>, Exception> {
        declared_content_length(
            self.headers
                .iter()
                .filter(|(k, _)| k == "content-length")
                .map(|(_, v)| v.as_str()),
        )
    }

    /// 代理声明的原始协议（`X-Forwarded-Proto`）
    pub fn forwarded_proto(&self) -> Option<&str> {
        self.header(FORWARDED_PROTO)
    }

    /// 客户端支持的压缩算法列表（按解析顺序排列）。
    ///
    /// `q=0` 表示明确拒绝，该算法不会出现在结果中；其余权重不影响顺序。
    pub fn accept_encoding(&self) -> Vec<HttpEncoding> {
        let mut encodings = Vec::new();
        if let Some(value) = self.header("accept-encoding") {
            for token in value.split(',') {
                let mut params = token.split(';');
                let name = params.next().unwrap_or("").trim();
                if params.any(is_zero_weight) {
                    continue;
                }
                let encoding = match name.to_ascii_lowercase().as_str() {
                    "gzip" => HttpEncoding::Gzip,
                    "deflate" => HttpEncoding::Deflate,
                    "br" => HttpEncoding::Br,
                    _ => continue,
                };
                if !encodings.contains(&encoding) {
                    encodings.push(encoding);
                }
            }
        }
        encodings
    }
}

fn is_zero_weight(param: &str) -> bool {
    match param.split_once('=') {
        Some((key, value)) if key.trim().eq_ignore_ascii_case("q") => {
            value.trim().parse::<f32>().map_or(false, |q| q == 0.0)
        }
        _ => false,
    }
}
