// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use chrono::{DateTime, Utc};

use crate::param::STATUS_CODES;

/// 简单的 HTML 页面构建器，用于错误页与重定向页
pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let reason = STATUS_CODES.get(&code).copied().unwrap_or("Unknown Status");
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        let body = format!(
            r"
            <h1>{} {}</h1>
            <p>{}</p>
            ",
            code,
            reason,
            note.unwrap_or(reason)
        );
        Self {
            title: format!("{} {}", code, reason),
            css,
            body,
        }
    }

    /// 301 页面，正文给出目标链接
    pub fn from_redirect(location: &str) -> Self {
        let mut page = Self::from_status_code(301, None);
        page.body = format!(
            r#"<a href="{}">Moved Permanently</a>."#,
            escape_html(location)
        );
        page
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>{}</title>
        <style>{}</style>
    </head>
    <body>
    {}
    </body>
</html>"##,
            self.title, self.css, self.body
        )
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// IMF-fixdate 格式（RFC 9110 §5.6.7），用于 `Date` 与 `Last-Modified`
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
