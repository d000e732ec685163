// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 集成测试公共设施：在临时目录中准备静态文件与配置，
//! 在随机端口上启动真实服务端。

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use promlint::{
    config::Config, render::renderer_from_config, server::serve, Dispatcher, PromqlParser,
};
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};

pub const TEMPLATE: &str = "{{#if this}}{{#if Valid}}VALID {{Type}} [{{Raw}}]{{else}}INVALID line={{ErrorLine}} pos={{ErrorPos}} [{{ErrorText}}]{{/if}}{{else}}FORM{{/if}}";

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    _root: TempDir,
}

impl TestServer {
    /// `renderer` 为 `html` 或 `json`
    pub async fn start(renderer: &str, extra_config: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("assets")).unwrap();
        fs::write(root.path().join("favicon.ico"), [0u8, 0, 1, 0]).unwrap();
        fs::write(
            root.path().join("assets/codemirror.css"),
            ".CodeMirror { font-family: monospace; }\n".repeat(64),
        )
        .unwrap();
        fs::write(root.path().join("assets/codemirror.js"), "var CodeMirror = {};").unwrap();
        fs::write(root.path().join("index.hbs"), TEMPLATE).unwrap();

        let config_path = root.path().join("promlint.toml");
        fs::write(
            &config_path,
            format!(
                "local = true\nport = 0\nworker_threads = 2\nstatic_root = {:?}\ntemplate = {:?}\nrenderer = {:?}\n{}",
                root.path().display().to_string(),
                root.path().join("index.hbs").display().to_string(),
                renderer,
                extra_config
            ),
        )
        .unwrap();

        let config = Config::from_toml(&config_path).unwrap();
        let renderer = renderer_from_config(&config).unwrap();
        let dispatcher = Arc::new(Dispatcher::new(
            Box::new(PromqlParser::new()),
            renderer,
            &config,
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, dispatcher, Arc::new(config), async {
            let _ = rx.await;
        }));

        Self {
            addr,
            shutdown: Some(tx),
            handle,
            _root: root,
        }
    }

    /// 发送原始报文并读到连接关闭
    pub async fn send(&self, request: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut response = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
            .await
            .expect("server did not close the connection")
            .unwrap();
        response
    }

    pub async fn get(&self, target: &str, headers: &str) -> Response {
        let raw = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\n{}\r\n",
            target, headers
        );
        Response::parse(&self.send(raw.as_bytes()).await)
    }

    pub async fn post_form(&self, body: &str) -> Response {
        let raw = format!(
            "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        Response::parse(&self.send(raw.as_bytes()).await)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not shut down")
            .unwrap();
    }
}

pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = String::from_utf8_lossy(&raw[..split]).into_owned();
        let mut lines = head.split("\r\n");
        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|line| line.split_once(": "))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            status,
            headers,
            body: raw[split + 4..].to_vec(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}
