// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 静态资源
//!
//! 只服务固定白名单中的文件，路径不会被拼接到任意用户输入上。

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{error, warn};

use crate::{
    cache::AssetCache,
    param::MIME_TYPES,
    request::Request,
    response::Response,
    util::parse_http_date,
};

/// 请求路径到 `static_root` 下相对路径的映射
const ASSET_ROUTES: [(&str, &str); 3] = [
    ("/favicon.ico", "favicon.ico"),
    ("/assets/codemirror.css", "assets/codemirror.css"),
    ("/assets/codemirror.js", "assets/codemirror.js"),
];

/// 请求路径是否属于静态资源白名单
pub fn asset_for(path: &str) -> Option<&'static str> {
    ASSET_ROUTES
        .iter()
        .find(|(route, _)| *route == path)
        .map(|(_, file)| *file)
}

fn mime_of(file: &str) -> &'static str {
    Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|e| MIME_TYPES.get(e).copied())
        .unwrap_or("application/octet-stream")
}

/// 读取白名单中的文件并构建响应。
///
/// `If-Modified-Since` 不早于文件修改时间（秒级）时返回 304。
pub fn serve_asset(
    root: &Path,
    file: &str,
    request: &Request,
    cache: &Mutex<AssetCache>,
    id: u128,
) -> Response {
    let full_path = root.join(file);
    let loaded = {
        let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.load(&full_path)
    };
    let asset = match loaded {
        Ok(asset) => asset,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("[ID{}]静态文件{}不存在，返回404", id, full_path.display());
            return Response::from_status_code(404, id);
        }
        Err(e) => {
            error!("[ID{}]读取静态文件{}失败：{}", id, full_path.display(), e);
            return Response::from_status_code(500, id);
        }
    };

    let modified: DateTime<Utc> = asset.modified_time.into();
    if let Some(since) = request.if_modified_since().and_then(parse_http_date) {
        if since.timestamp() >= modified.timestamp() {
            return Response::not_modified(modified);
        }
    }

    let mut response = Response::new();
    response
        .set_content(asset.content, mime_of(file))
        .set_last_modified(modified);
    response
}
