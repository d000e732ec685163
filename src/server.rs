// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理与主循环
//!
//! 每个 TCP 连接只处理一个请求（响应带 `Connection: close`）。
//! 连接在独立的 tokio 任务中处理，主循环收到停机信号后停止接收新连接，
//! 并在宽限期内等待已有连接完成。

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    task::JoinSet,
    time::timeout,
};

use crate::{
    config::Config,
    dispatcher::Dispatcher,
    exception::Exception,
    request::{body_length, expected_length, Request},
    response::Response,
};

const READ_CHUNK: usize = 4096;

/// 请求头部的上限
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// 运行主循环，直到 `shutdown` 完成
pub async fn serve<F>(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    config: Arc<Config>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let mut connections = JoinSet::new();
    let mut id: u128 = 0;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("收到停机信号，停止接收新连接");
                break;
            }
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("接受TCP连接失败：{}", e);
                        continue;
                    }
                };
                debug!("[ID{}]TCP连接已建立：{}", id, addr);
                let dispatcher = Arc::clone(&dispatcher);
                let config = Arc::clone(&config);
                connections.spawn(async move {
                    handle_connection(stream, id, &dispatcher, &config).await;
                });
                id += 1;
            }
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    error!("连接任务异常退出：{}", e);
                }
            }
        }
    }

    drain(&mut connections, config.shutdown_grace()).await;
}

async fn drain(connections: &mut JoinSet<()>, grace: Duration) {
    if connections.is_empty() {
        return;
    }
    info!("等待{}个连接处理完毕", connections.len());
    let waited = timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if waited.is_err() {
        warn!("{}个连接在宽限期内未完成，强制关闭", connections.len());
        connections.abort_all();
    }
}

/// 处理单个连接：读取请求、分发、写回响应
pub async fn handle_connection<S>(mut stream: S, id: u128, dispatcher: &Dispatcher, config: &Config)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let start_time = Instant::now();

    let read = timeout(
        config.read_timeout(),
        read_message(&mut stream, config.max_body_size(), id),
    )
    .await
    .unwrap_or(Err(Exception::ReadTimeout));

    let response = match read.and_then(|buffer| match buffer {
        Some(b) => Request::try_from(&b, id).map(Some),
        None => Ok(None),
    }) {
        Ok(Some(request)) => {
            let response = dispatcher.dispatch(&request, id);
            info!(
                "[ID{}] {}, {}, {}, {}, {}, {}",
                id,
                request.version(),
                request.method(),
                request.path(),
                response.status_code(),
                response.information(),
                request.user_agent(),
            );
            response
        }
        Ok(None) => {
            debug!("[ID{}]客户端未发送数据即关闭连接", id);
            return;
        }
        Err(e) => {
            warn!("[ID{}]无法读取请求：{}", id, e);
            let response = Response::from_status_code(e.status_code(), id);
            info!(
                "[ID{}] -, -, -, {}, {}, -",
                id,
                response.status_code(),
                response.information()
            );
            response
        }
    };

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    let bytes = response.as_bytes();
    let written = timeout(config.write_timeout(), async {
        stream.write_all(&bytes).await?;
        stream.flush().await?;
        stream.shutdown().await
    })
    .await;
    match written {
        Ok(Ok(())) => debug!("[ID{}]响应已发送，{} bytes", id, bytes.len()),
        Ok(Err(e)) => warn!("[ID{}]发送响应失败：{}", id, e),
        Err(_) => warn!("[ID{}]发送响应超时", id),
    }
}

/// 读取一个完整报文。对端未发送任何数据就关闭时返回 `Ok(None)`。
async fn read_message<S>(
    stream: &mut S,
    max_body_size: usize,
    id: u128,
) -> Result<Option<Vec<u8>>, Exception>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match body_length(&buffer)? {
            Some(body) => {
                if body > max_body_size {
                    warn!("[ID{}]请求体{}字节，超过上限{}字节", id, body, max_body_size);
                    return Err(Exception::BodyTooLarge);
                }
                let total = expected_length(&buffer)?.ok_or(Exception::MalformedHeader)?;
                if buffer.len() >= total {
                    buffer.truncate(total);
                    return Ok(Some(buffer));
                }
            }
            None if buffer.len() > MAX_HEAD_SIZE => {
                warn!("[ID{}]请求头部超过{}字节", id, MAX_HEAD_SIZE);
                return Err(Exception::MalformedHeader);
            }
            None => {}
        }

        let n = match stream.read(&mut chunk).await {
            Ok(n) => n,
            Err(e) => {
                warn!("[ID{}]读取TCPStream时遇到错误：{}", id, e);
                return Err(Exception::ConnectionClosed);
            }
        };
        if n == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return Err(Exception::ConnectionClosed);
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}
