//! 缓存目录
//!
//! 服务端唯一允许写入的位置，也是拉取/下载的唯一来源。
//! 目录按需创建，进程退出时清空。

use log::{debug, error, info};

use crate::error::{BridgeError, Result};
use crate::transfer::sanitize::sanitize_filename;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 写入中的临时文件前缀，`resolve` 永远不会返回这类文件
const PARTIAL_PREFIX: &str = ".imbridge-partial-";

#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 将字节写入缓存目录
    ///
    /// 先写到同目录下的临时文件，再原子重命名到目标名称。
    /// 同名文件直接覆盖，最后完成的写入生效。
    pub fn materialize(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = sanitize_filename(name)?;
        if name.starts_with(PARTIAL_PREFIX) {
            return Err(BridgeError::InvalidName(name));
        }
        fs::create_dir_all(&self.root)?;

        let target = self.root.join(&name);
        let mut tmp = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| BridgeError::Io(e.error))?;

        debug!("Materialized {} ({} bytes)", target.display(), bytes.len());
        Ok(target)
    }

    /// 解析缓存中的文件
    ///
    /// 无论调用方是否已清洗，这里都会重新清洗一次。
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let name = sanitize_filename(name)?;
        if name.starts_with(PARTIAL_PREFIX) {
            return Err(BridgeError::NotFound(name));
        }
        let path = self.root.join(&name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(BridgeError::NotFound(name))
        }
    }

    /// 清空缓存目录
    ///
    /// 单个条目删除失败只记录日志，不影响其余条目。返回成功删除的条目数。
    pub fn purge(&self) -> usize {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                error!("Failed to read cache dir {}: {}", self.root.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let result = match entry.file_type() {
                Ok(ft) if ft.is_dir() => fs::remove_dir_all(&path),
                _ => fs::remove_file(&path),
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => error!("Failed to delete {}: {}", path.display(), e),
            }
        }

        info!("Purged {} entries from {}", removed, self.root.display());
        removed
    }
}
