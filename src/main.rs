// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # promlint 服务入口
//!
//! 启动流程：
//! 1. 初始化 log4rs 日志，配置文件缺失时退回控制台输出
//! 2. 载入 TOML 配置（路径可由第一个命令行参数指定）
//! 3. 构造解析器与渲染器，二者在所有连接间共享
//! 4. 按配置的线程数构建 tokio 运行时，绑定端口并进入主循环
//! 5. 收到 Ctrl-C 或 SIGTERM 后优雅停机

use std::{
    env,
    net::{Ipv4Addr, SocketAddrV4},
    process,
    sync::Arc,
};

use log::{error, info, warn, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};
use tokio::{net::TcpListener, runtime::Builder, signal};

use promlint::{
    config::Config, render::renderer_from_config, server::serve, Dispatcher, Exception,
    PromqlParser,
};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const DEFAULT_CONFIG: &str = "config/promlint.toml";

fn main() {
    init_logging();

    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    if let Err(e) = run(&config_path) {
        error!("{}", e);
        process::exit(1);
    }
    info!("服务端已停止");
}

fn init_logging() {
    let err = match log4rs::init_file(LOG_CONFIG, Default::default()) {
        Ok(()) => return,
        Err(e) => e,
    };

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} - {m}{n}",
        )))
        .build();
    let fallback = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    match fallback.map(log4rs::init_config) {
        Ok(Ok(_)) => warn!("无法载入{}（{}），使用默认控制台日志", LOG_CONFIG, err),
        Ok(Err(e)) => eprintln!("日志初始化失败：{}", e),
        Err(e) => eprintln!("日志配置无效：{}", e),
    }
}

fn run(config_path: &str) -> Result<(), Exception> {
    let config = Config::from_toml(config_path)?;
    info!("配置文件已载入：{}", config_path);

    let renderer = renderer_from_config(&config)?;
    let dispatcher = Arc::new(Dispatcher::new(
        Box::new(PromqlParser::new()),
        renderer,
        &config,
    ));

    let runtime = Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
        .map_err(|e| Exception::RuntimeFailed(e.to_string()))?;
    info!("工作线程数：{}", config.worker_threads());

    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    let socket = SocketAddrV4::new(address, config.port());
    let config = Arc::new(config);

    runtime.block_on(async move {
        let listener = TcpListener::bind(socket)
            .await
            .map_err(|e| Exception::BindFailed(format!("{}: {}", socket, e)))?;
        info!("服务端在{}上监听Socket连接", socket);
        serve(listener, dispatcher, config, shutdown_signal()).await;
        Ok::<(), Exception>(())
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("无法监听Ctrl-C：{}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("无法监听SIGTERM：{}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
