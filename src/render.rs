// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 页面渲染模块
//!
//! 渲染器把 [`LintResult`]（或表单页的"无数据"）写入输出。
//! 两种实现：
//! - [`TemplateRenderer`]：handlebars 模板，输出 HTML 页面
//! - [`JsonRenderer`]：输出 JSON，供脚本调用
//!
//! 表单页的数据是 `null`，而不是字段全空的 `Invalid` 结果。

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use handlebars::Handlebars;
use log::{debug, info};

use crate::{
    config::{Config, RendererKind},
    exception::Exception,
    lint::{LintResult, LintView},
};

const TEMPLATE_NAME: &str = "index";

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    Template(String),
    Io(String),
    Encode(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Template(e) => write!(f, "template error: {}", e),
            RenderError::Io(e) => write!(f, "write error: {}", e),
            RenderError::Encode(e) => write!(f, "encode error: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

/// 渲染能力。实例在启动时构建一次，之后被所有连接共享。
pub trait Renderer: Send + Sync {
    fn render(&self, out: &mut dyn Write, payload: Option<&LintResult>) -> Result<(), RenderError>;

    fn content_type(&self) -> &'static str;
}

fn view_of(payload: Option<&LintResult>) -> Option<LintView> {
    payload.map(LintResult::view)
}

/// handlebars 模板渲染器
pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn from_file(path: &Path) -> Result<Self, Exception> {
        let source = fs::read_to_string(path)
            .map_err(|e| Exception::TemplateLoadFailed(format!("{}: {}", path.display(), e)))?;
        let renderer = Self::from_source(&source)
            .map_err(|e| Exception::TemplateLoadFailed(format!("{}: {}", path.display(), e)))?;
        info!("已载入模板{}", path.display());
        Ok(renderer)
    }

    pub fn from_source(source: &str) -> Result<Self, Exception> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| Exception::TemplateLoadFailed(e.to_string()))?;
        Ok(Self { registry })
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, out: &mut dyn Write, payload: Option<&LintResult>) -> Result<(), RenderError> {
        let page = self
            .registry
            .render(TEMPLATE_NAME, &view_of(payload))
            .map_err(|e| RenderError::Template(e.to_string()))?;
        debug!("模板渲染完成，{} bytes", page.len());
        out.write_all(page.as_bytes())
            .map_err(|e| RenderError::Io(e.to_string()))
    }

    fn content_type(&self) -> &'static str {
        "text/html;charset=utf-8"
    }
}

/// JSON 渲染器
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, out: &mut dyn Write, payload: Option<&LintResult>) -> Result<(), RenderError> {
        serde_json::to_writer(out, &view_of(payload)).map_err(|e| {
            if e.is_io() {
                RenderError::Io(e.to_string())
            } else {
                RenderError::Encode(e.to_string())
            }
        })
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// 按配置构建渲染器
pub fn renderer_from_config(config: &Config) -> Result<Box<dyn Renderer>, Exception> {
    match config.renderer() {
        RendererKind::Html => Ok(Box::new(TemplateRenderer::from_file(config.template())?)),
        RendererKind::Json => Ok(Box::new(JsonRenderer)),
    }
}
