// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod assets;
pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod exception;
pub mod expr;
pub mod form;
pub mod lint;
pub mod param;
pub mod parser;
pub mod promql;
pub mod render;
pub mod request;
pub mod response;
pub mod server;
pub mod util;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use exception::Exception;
pub use expr::{ParseError, ParseFailure, ParsedExpr, ValueType};
pub use lint::{LintOutcome, LintResult};
pub use parser::ExprParser;
pub use promql::PromqlParser;
pub use render::{JsonRenderer, RenderError, Renderer, TemplateRenderer};
pub use request::Request;
pub use response::Response;
