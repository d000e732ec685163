// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::SystemTime;

use bytes::Bytes;
use log::debug;
use lru::LruCache;

/// 缓存中的一个静态文件
#[derive(Debug, Clone)]
pub struct CachedAsset {
    pub content: Bytes,
    pub modified_time: SystemTime,
}

/// 静态资源的 LRU 缓存，以文件修改时间判断缓存是否失效
pub struct AssetCache {
    cache: LruCache<String, CachedAsset>,
}

impl AssetCache {
    // 容量为 0 时退化为 1
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// 读取文件，命中且修改时间一致时直接返回缓存内容
    pub fn load(&mut self, path: &Path) -> io::Result<CachedAsset> {
        let key = path.to_string_lossy().into_owned();
        let modified_time = fs::metadata(path)?.modified()?;

        if let Some(entry) = self.cache.get(&key) {
            if entry.modified_time == modified_time {
                debug!("缓存命中：{}", key);
                return Ok(entry.clone());
            }
        }

        debug!("缓存未命中或文件已修改：{}", key);
        let asset = CachedAsset {
            content: Bytes::from(fs::read(path)?),
            modified_time,
        };
        self.cache.put(key, asset.clone());
        Ok(asset)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.len()
    }
}
