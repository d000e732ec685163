// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::exception::Exception;
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 页面渲染方式
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// handlebars 模板渲染 HTML 页面
    Html,
    /// 直接输出 JSON，供脚本调用
    Json,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    local: bool,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_static_root")]
    static_root: PathBuf,
    #[serde(default = "default_template")]
    template: PathBuf,
    #[serde(default = "default_renderer")]
    renderer: RendererKind,
    #[serde(default = "default_cache_size")]
    cache_size: usize,
    #[serde(default = "default_max_body_size")]
    max_body_size: usize,
    #[serde(default = "default_timeout_secs")]
    read_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    write_timeout_secs: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    shutdown_grace_secs: u64,
}

fn default_port() -> u16 {
    8080
}

fn default_static_root() -> PathBuf {
    PathBuf::from("static")
}

fn default_template() -> PathBuf {
    PathBuf::from("static/index.hbs")
}

fn default_renderer() -> RendererKind {
    RendererKind::Html
}

fn default_cache_size() -> usize {
    16
}

fn default_max_body_size() -> usize {
    10 << 20 // 10MB
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_shutdown_grace_secs() -> u64 {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: default_port(),
            local: false,
            worker_threads: 0,
            static_root: default_static_root(),
            template: default_template(),
            renderer: default_renderer(),
            cache_size: default_cache_size(),
            max_body_size: default_max_body_size(),
            read_timeout_secs: default_timeout_secs(),
            write_timeout_secs: default_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }

    /// 从 TOML 文件载入配置。
    ///
    /// 文件不存在时使用默认配置；存在但无法解析时返回错误。
    pub fn from_toml(filename: impl AsRef<Path>) -> Result<Self, Exception> {
        let filename = filename.as_ref();
        let raw_config = match fs::read_to_string(filename) {
            Ok(s) => toml::from_str::<Config>(&s)
                .map_err(|e| Exception::InvalidConfig(format!("{}: {}", filename.display(), e)))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("配置文件{}不存在，使用默认配置", filename.display());
                Config::new()
            }
            Err(e) => {
                return Err(Exception::InvalidConfig(format!(
                    "{}: {}",
                    filename.display(),
                    e
                )))
            }
        };
        Ok(raw_config.normalized(std::env::var("PORT").ok().as_deref()))
    }

    /// 补全自动值并应用环境变量 `PORT`
    fn normalized(mut self, port_env: Option<&str>) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.cache_size == 0 {
            warn!("cache_size被设置为0，该值将被改为{}。", default_cache_size());
            self.cache_size = default_cache_size();
        }
        if let Some(port) = port_env {
            match port.parse::<u16>() {
                Ok(p) => {
                    info!("使用环境变量PORT指定的端口{}", p);
                    self.port = p;
                }
                Err(_) => warn!("环境变量PORT={}不是合法端口，忽略", port),
            }
        }
        self
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    pub fn template(&self) -> &Path {
        &self.template
    }

    pub fn renderer(&self) -> RendererKind {
        self.renderer
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
impl Config {
    pub fn with_static_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_root = root.into();
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.port(), 8080);
        assert!(!config.local());
        assert_eq!(config.renderer(), RendererKind::Html);
        assert_eq!(config.max_body_size(), 10 * 1024 * 1024);
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let config: Config = toml::from_str("port = 9090\nrenderer = \"json\"\n").unwrap();
        assert_eq!(config.port(), 9090);
        assert_eq!(config.renderer(), RendererKind::Json);
        assert_eq!(config.static_root(), Path::new("static"));
        assert_eq!(config.cache_size(), 16);
    }

    #[test]
    fn test_normalized() {
        let mut config = Config::new();
        config.cache_size = 0;
        let config = config.normalized(Some("3000"));
        assert_eq!(config.port(), 3000);
        assert_eq!(config.cache_size(), 16);
        assert!(config.worker_threads() > 0);
    }

    #[test]
    fn test_bad_port_env_is_ignored() {
        let config = Config::new().normalized(Some("eighty"));
        assert_eq!(config.port(), 8080);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_toml(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.template(), Path::new("static/index.hbs"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        match Config::from_toml(file.path()) {
            Err(Exception::InvalidConfig(msg)) => assert!(msg.contains("port")),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_renderer_is_an_error() {
        assert!(toml::from_str::<Config>("renderer = \"xml\"").is_err());
    }
}
