// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求分发
//!
//! 按路径与方法把请求分到以下几类之一：
//!
//! | 方法 | 路径 | 处理 |
//! |---|---|---|
//! | GET | `/` | 渲染空表单（无数据） |
//! | POST | `/` | 校验表单字段 `body` |
//! | GET | 静态资源白名单 | 返回文件 |
//! | 其他 | 以上路径 | 405 |
//! | 任意 | 其他路径 | 404 |
//!
//! 在任何路由之前先检查 `X-Forwarded-Proto`：为 `http` 时直接 301 到
//! https 地址；为 `https` 时在本次响应上附加 HSTS 头部。

use std::path::PathBuf;
use std::sync::Mutex;

use bytes::Bytes;
use log::{debug, error, warn};

use crate::{
    assets::{asset_for, serve_asset},
    cache::AssetCache,
    config::Config,
    lint::{lint_submission, LintOutcome, LintResult},
    param::{HttpRequestMethod, HSTS_VALUE},
    parser::ExprParser,
    render::Renderer,
    request::Request,
    response::Response,
};

pub struct Dispatcher {
    parser: Box<dyn ExprParser>,
    renderer: Box<dyn Renderer>,
    static_root: PathBuf,
    cache: Mutex<AssetCache>,
}

impl Dispatcher {
    pub fn new(parser: Box<dyn ExprParser>, renderer: Box<dyn Renderer>, config: &Config) -> Self {
        Self {
            parser,
            renderer,
            static_root: config.static_root().to_path_buf(),
            cache: Mutex::new(AssetCache::from_capacity(config.cache_size())),
        }
    }

    pub fn dispatch(&self, request: &Request, id: u128) -> Response {
        let secure = match request.forwarded_proto() {
            Some("http") => return self.redirect_to_https(request, id),
            Some("https") => true,
            _ => false,
        };

        let mut response = self.route(request, id);
        response.compress_for(&request.accept_encoding(), id);
        if secure {
            response.set_header("Strict-Transport-Security", HSTS_VALUE);
        }
        response
    }

    fn redirect_to_https(&self, request: &Request, id: u128) -> Response {
        match request.host() {
            Some(host) if !host.is_empty() => {
                let location = match request.query() {
                    Some(query) => format!("https://{}{}?{}", host, request.path(), query),
                    None => format!("https://{}{}", host, request.path()),
                };
                Response::redirect(&location, id)
            }
            _ => {
                warn!("[ID{}]缺少Host头部，无法构造https地址", id);
                Response::from_status_code(400, id)
            }
        }
    }

    fn route(&self, request: &Request, id: u128) -> Response {
        let path = request.path();
        let method = request.method();

        if let Some(file) = asset_for(path) {
            debug!("[ID{}]静态资源：{}", id, path);
            return match method {
                HttpRequestMethod::Get => {
                    serve_asset(&self.static_root, file, request, &self.cache, id)
                }
                _ => Response::method_not_allowed(&[HttpRequestMethod::Get], id),
            };
        }

        if path == "/" {
            return match method {
                HttpRequestMethod::Get => self.render_page(None, id),
                HttpRequestMethod::Post => self.lint(request, id),
                _ => Response::method_not_allowed(
                    &[HttpRequestMethod::Get, HttpRequestMethod::Post],
                    id,
                ),
            };
        }

        debug!("[ID{}]未知路径：{}", id, path);
        Response::from_status_code(404, id)
    }

    fn lint(&self, request: &Request, id: u128) -> Response {
        match lint_submission(self.parser.as_ref(), request, id) {
            LintOutcome::Render(result) => {
                debug!(
                    "[ID{}]校验结果：valid={}，{}字节",
                    id,
                    result.is_valid(),
                    result.raw().len()
                );
                self.render_page(Some(&result), id)
            }
            LintOutcome::Rejected(e) => Response::from_status_code(e.status_code(), id),
            LintOutcome::ParserFailure(_) => Response::from_status_code(500, id),
        }
    }

    /// 以 200 渲染页面。渲染失败只记录日志，已写出的内容照常返回。
    fn render_page(&self, payload: Option<&LintResult>, id: u128) -> Response {
        let mut out = Vec::new();
        if let Err(e) = self.renderer.render(&mut out, payload) {
            error!("[ID{}]Renderer: render: {}", id, e);
        }
        let mut response = Response::new();
        response.set_content(Bytes::from(out), self.renderer.content_type());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ParseError, ParseFailure, ParsedExpr, ValueType};
    use crate::parser::MockExprParser;
    use crate::render::RenderError;
    use std::fs;
    use std::io::Write;
    use std::sync::Arc;

    /// 记录每次渲染收到的数据
    #[derive(Clone, Default)]
    struct RecordingRenderer {
        calls: Arc<Mutex<Vec<Option<LintResult>>>>,
    }

    impl RecordingRenderer {
        fn calls(&self) -> Vec<Option<LintResult>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Renderer for RecordingRenderer {
        fn render(
            &self,
            out: &mut dyn Write,
            payload: Option<&LintResult>,
        ) -> Result<(), RenderError> {
            self.calls.lock().unwrap().push(payload.cloned());
            out.write_all(b"rendered")
                .map_err(|e| RenderError::Io(e.to_string()))
        }

        fn content_type(&self) -> &'static str {
            "text/plain;charset=utf-8"
        }
    }

    /// 写出一部分后失败
    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&self, out: &mut dyn Write, _: Option<&LintResult>) -> Result<(), RenderError> {
            out.write_all(b"<html>")
                .map_err(|e| RenderError::Io(e.to_string()))?;
            Err(RenderError::Template("missing helper".to_string()))
        }

        fn content_type(&self) -> &'static str {
            "text/html;charset=utf-8"
        }
    }

    fn idle_parser() -> MockExprParser {
        let mut parser = MockExprParser::new();
        parser.expect_parse_expr().never();
        parser
    }

    fn dispatcher_with(parser: MockExprParser) -> (Dispatcher, RecordingRenderer) {
        let renderer = RecordingRenderer::default();
        let dispatcher = Dispatcher::new(
            Box::new(parser),
            Box::new(renderer.clone()),
            &Config::new(),
        );
        (dispatcher, renderer)
    }

    fn request(method: &str, target: &str, headers: &str, body: &str) -> Request {
        let raw = format!(
            "{} {} HTTP/1.1\r\nHost: lint.example.com\r\n{}Content-Length: {}\r\n\r\n{}",
            method,
            target,
            headers,
            body.len(),
            body
        );
        Request::try_from(raw.as_bytes(), 0).unwrap()
    }

    fn form_post(body: &str) -> Request {
        request(
            "POST",
            "/",
            "Content-Type: application/x-www-form-urlencoded\r\n",
            body,
        )
    }

    #[test]
    fn test_get_form_page_renders_null() {
        let (dispatcher, renderer) = dispatcher_with(idle_parser());
        let response = dispatcher.dispatch(&request("GET", "/", "", ""), 0);
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.content().as_ref(), b"rendered");
        assert_eq!(renderer.calls(), vec![None]);
    }

    #[test]
    fn test_post_valid_expression() {
        let mut parser = MockExprParser::new();
        parser
            .expect_parse_expr()
            .returning(|t| Ok(ParsedExpr::new(t, ValueType::Scalar)));
        let (dispatcher, renderer) = dispatcher_with(parser);

        let response = dispatcher.dispatch(&form_post("body=1.23"), 0);
        assert_eq!(response.status_code(), 200);
        assert_eq!(
            renderer.calls(),
            vec![Some(LintResult::Valid {
                raw: "1.23".to_string(),
                value_type: ValueType::Scalar,
            })]
        );
    }

    #[test]
    fn test_post_syntax_error() {
        let mut parser = MockExprParser::new();
        parser
            .expect_parse_expr()
            .returning(|_| Err(ParseError::new(None, 10, "some-error").into()));
        let (dispatcher, renderer) = dispatcher_with(parser);

        let response = dispatcher.dispatch(&form_post("body=sum%281.23%29"), 0);
        assert_eq!(response.status_code(), 200);
        assert_eq!(
            renderer.calls(),
            vec![Some(LintResult::Invalid {
                raw: "sum(1.23)".to_string(),
                error_text: "parse error at char 10: some-error".to_string(),
                error_pos: 10,
                error_line: 0,
            })]
        );
    }

    #[test]
    fn test_post_unclassified_failure_is_500() {
        let mut parser = MockExprParser::new();
        parser
            .expect_parse_expr()
            .returning(|_| Err(ParseFailure::Unclassified("boom".to_string())));
        let (dispatcher, renderer) = dispatcher_with(parser);

        let response = dispatcher.dispatch(&form_post("body=up"), 0);
        assert_eq!(response.status_code(), 500);
        assert!(renderer.calls().is_empty());
        assert!(!String::from_utf8_lossy(response.content()).contains("boom"));
    }

    #[test]
    fn test_post_malformed_form_is_400() {
        let (dispatcher, renderer) = dispatcher_with(idle_parser());
        let response = dispatcher.dispatch(&form_post("body=%4"), 0);
        assert_eq!(response.status_code(), 400);
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn test_post_empty_body_renders_fixed_error() {
        let (dispatcher, renderer) = dispatcher_with(idle_parser());
        let response = dispatcher.dispatch(&form_post(""), 0);
        assert_eq!(response.status_code(), 200);
        match renderer.calls().as_slice() {
            [Some(LintResult::Invalid {
                raw,
                error_text,
                error_pos: 0,
                error_line: 0,
            })] => {
                assert_eq!(raw, "");
                assert_eq!(error_text, "parse error at char 1: no expression found in input");
            }
            other => panic!("unexpected render calls {:?}", other),
        }
    }

    #[test]
    fn test_method_not_allowed() {
        let (dispatcher, renderer) = dispatcher_with(idle_parser());
        for method in ["PUT", "DELETE", "HEAD", "BREW"] {
            let response = dispatcher.dispatch(&request(method, "/", "", ""), 0);
            assert_eq!(response.status_code(), 405, "{} /", method);
            assert_eq!(response.header("Allow").as_deref(), Some("GET, POST"));
        }
        let response = dispatcher.dispatch(&request("POST", "/favicon.ico", "", ""), 0);
        assert_eq!(response.status_code(), 405);
        assert_eq!(response.header("Allow").as_deref(), Some("GET"));
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn test_unknown_path_is_404() {
        let (dispatcher, _) = dispatcher_with(idle_parser());
        for target in ["/index.html", "/assets/", "/assets/../Cargo.toml", "//"] {
            let response = dispatcher.dispatch(&request("GET", target, "", ""), 0);
            assert_eq!(response.status_code(), 404, "{}", target);
        }
    }

    #[test]
    fn test_forwarded_http_redirects_before_routing() {
        let (dispatcher, renderer) = dispatcher_with(idle_parser());
        let response = dispatcher.dispatch(
            &request("POST", "/nowhere?a=1&b=2", "X-Forwarded-Proto: http\r\n", ""),
            0,
        );
        assert_eq!(response.status_code(), 301);
        assert_eq!(
            response.header("Location").as_deref(),
            Some("https://lint.example.com/nowhere?a=1&b=2")
        );
        assert!(response.header("Strict-Transport-Security").is_none());
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn test_absolute_form_redirect_uses_target_authority() {
        let (dispatcher, _) = dispatcher_with(idle_parser());
        let response = dispatcher.dispatch(
            &request("GET", "http://h/x?y=1", "X-Forwarded-Proto: http\r\n", ""),
            0,
        );
        assert_eq!(response.status_code(), 301);
        assert_eq!(response.header("Location").as_deref(), Some("https://h/x?y=1"));

        let response =
            dispatcher.dispatch(&request("GET", "http://h", "X-Forwarded-Proto: http\r\n", ""), 0);
        assert_eq!(response.header("Location").as_deref(), Some("https://h/"));
    }

    #[test]
    fn test_forwarded_https_adds_hsts() {
        let (dispatcher, _) = dispatcher_with(idle_parser());
        for target in ["/", "/missing"] {
            let response =
                dispatcher.dispatch(&request("GET", target, "X-Forwarded-Proto: https\r\n", ""), 0);
            assert_eq!(
                response.header("Strict-Transport-Security").as_deref(),
                Some("max-age=31536000; preload")
            );
        }
        let plain = dispatcher.dispatch(&request("GET", "/", "", ""), 0);
        assert!(plain.header("Strict-Transport-Security").is_none());
    }

    #[test]
    fn test_render_failure_keeps_status() {
        let dispatcher = Dispatcher::new(
            Box::new(idle_parser()),
            Box::new(FailingRenderer),
            &Config::new(),
        );
        let response = dispatcher.dispatch(&request("GET", "/", "", ""), 0);
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.content().as_ref(), b"<html>");
    }

    #[test]
    fn test_static_asset() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("assets")).unwrap();
        fs::write(root.path().join("assets/codemirror.js"), "var CodeMirror;").unwrap();

        let dispatcher = Dispatcher::new(
            Box::new(idle_parser()),
            Box::new(RecordingRenderer::default()),
            &Config::new().with_static_root(root.path()),
        );
        let response = dispatcher.dispatch(&request("GET", "/assets/codemirror.js", "", ""), 0);
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.content().as_ref(), b"var CodeMirror;");

        let missing = dispatcher.dispatch(&request("GET", "/favicon.ico", "", ""), 0);
        assert_eq!(missing.status_code(), 404);
    }
}
