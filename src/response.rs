// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应构建模块
//!
//! `Response` 在分发器中逐步构建：先确定状态码与正文，再按需压缩、
//! 附加头部，最后由 [`Response::as_bytes`] 序列化为报文。

use crate::{
    param::*,
    util::{format_http_date, HtmlBuilder},
};

use brotli::enc::{self, backward_references::BrotliEncoderParams};
use bytes::Bytes;
use chrono::prelude::*;
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use log::{debug, error};

use std::io::{self, Write};

const HTML_TYPE: &str = "text/html;charset=utf-8";

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    date: DateTime<Utc>,
    content_encoding: Option<HttpEncoding>,
    server_name: String,
    location: Option<String>,
    allow: Option<Vec<HttpRequestMethod>>,
    last_modified: Option<DateTime<Utc>>,
    extra_headers: Vec<(String, String)>,
    content: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            date: Utc::now(),
            content_encoding: None,
            server_name: SERVER_NAME.to_string(),
            location: None,
            allow: None,
            last_modified: None,
            extra_headers: Vec::new(),
            content: Bytes::new(),
        }
    }

    /// 带默认错误页的状态码响应
    pub fn from_status_code(code: u16, id: u128) -> Self {
        let note = match code {
            400 => Some("The request could not be understood."),
            404 => Some("The page you requested could not be found."),
            405 => Some("This method is not supported for the requested path."),
            413 => Some("The submitted expression is too large."),
            500 => Some("The server encountered an internal error."),
            _ => None,
        };
        debug!("[ID{}]生成{}错误页", id, code);
        let page = HtmlBuilder::from_status_code(code, note).build();
        let mut response = Self::new();
        response.set_code(code);
        response.set_content(Bytes::from(page), HTML_TYPE);
        response
    }

    /// 405，并在 `Allow` 中列出该路径支持的方法
    pub fn method_not_allowed(allow: &[HttpRequestMethod], id: u128) -> Self {
        let mut response = Self::from_status_code(405, id);
        response.allow = Some(allow.to_vec());
        response
    }

    /// 301 永久重定向
    pub fn redirect(location: &str, id: u128) -> Self {
        debug!("[ID{}]重定向到{}", id, location);
        let page = HtmlBuilder::from_redirect(location).build();
        let mut response = Self::new();
        response.set_code(301);
        response.location = Some(location.to_string());
        response.set_content(Bytes::from(page), HTML_TYPE);
        response
    }

    pub fn not_modified(last_modified: DateTime<Utc>) -> Self {
        let mut response = Self::new();
        response.set_code(304);
        response.last_modified = Some(last_modified);
        response
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&reason) => reason.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown Status".to_string()
            }
        };
        self
    }

    pub fn set_content(&mut self, content: Bytes, content_type: &str) -> &mut Self {
        self.content = content;
        self.content_type = Some(content_type.to_string());
        self.content_encoding = None;
        self
    }

    pub fn set_last_modified(&mut self, modified: DateTime<Utc>) -> &mut Self {
        self.last_modified = Some(modified);
        self
    }

    /// 附加额外头部（如 HSTS）。同名头部会被替换。
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.extra_headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.extra_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    /// 根据客户端支持的编码压缩正文。
    ///
    /// 正文为空、类型本身已压缩或压缩失败时保持原样。
    pub fn compress_for(&mut self, accept_encoding: &[HttpEncoding], id: u128) -> &mut Self {
        if self.content.is_empty() || self.content_encoding.is_some() {
            return self;
        }
        let mime = self.content_type.as_deref().unwrap_or("");
        if should_skip_compression(mime) {
            debug!("[ID{}]类型{}跳过压缩", id, mime);
            return self;
        }
        let encoding = match decide_encoding(accept_encoding) {
            Some(e) => e,
            None => return self,
        };
        match compress(self.content.to_vec(), Some(encoding)) {
            Ok(compressed) => {
                debug!(
                    "[ID{}]使用{}压缩：{} bytes -> {} bytes",
                    id,
                    encoding,
                    self.content.len(),
                    compressed.len()
                );
                self.content = Bytes::from(compressed);
                self.content_encoding = Some(encoding);
            }
            Err(e) => {
                error!("[ID{}]压缩失败: {}，返回未压缩内容", id, e);
            }
        }
        self
    }

    /// 按输出顺序列出所有头部
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(t) = &self.content_type {
            headers.push(("Content-Type".to_string(), t.clone()));
        }
        if let Some(e) = self.content_encoding {
            headers.push(("Content-Encoding".to_string(), e.to_string()));
        }
        headers.push(("Content-Length".to_string(), self.content.len().to_string()));
        headers.push(("Date".to_string(), format_http_date(&self.date)));
        headers.push(("Server".to_string(), self.server_name.clone()));
        headers.push(("Connection".to_string(), "close".to_string()));
        if let Some(l) = &self.location {
            headers.push(("Location".to_string(), l.clone()));
        }
        if let Some(a) = &self.allow {
            let allow = a
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            headers.push(("Allow".to_string(), allow));
        }
        if let Some(m) = &self.last_modified {
            headers.push(("Last-Modified".to_string(), format_http_date(m)));
        }
        headers.extend(self.extra_headers.iter().cloned());
        headers
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}{}",
            self.version, self.status_code, self.information, CRLF
        );
        for (name, value) in self.headers() {
            head.push_str(&name);
            head.push_str(": ");
            head.push_str(&value);
            head.push_str(CRLF);
        }
        head.push_str(CRLF);
        [head.as_bytes(), &self.content].concat()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn content_encoding(&self) -> Option<HttpEncoding> {
        self.content_encoding
    }
}

fn compress(data: Vec<u8>, mode: Option<HttpEncoding>) -> io::Result<Vec<u8>> {
    match mode {
        Some(HttpEncoding::Gzip) => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Deflate) => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Br) => {
            let params = BrotliEncoderParams::default();
            let mut output = Vec::new();
            enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
            Ok(output)
        }
        None => Ok(data),
    }
}

fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = [
        "image/png",
        "image/x-icon",
        "application/gzip",
        "font/woff",
    ];

    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type))
}

/// br 优先，其次 gzip、deflate
fn decide_encoding(accept_encoding: &[HttpEncoding]) -> Option<HttpEncoding> {
    [HttpEncoding::Br, HttpEncoding::Gzip, HttpEncoding::Deflate]
        .into_iter()
        .find(|e| accept_encoding.contains(e))
}
