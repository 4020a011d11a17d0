//! 拉取工作流
//!
//! 桌面端按当前传输记录从缓存目录取回内容:
//! - [`pull_files`] 把记录里的文件复制到用户选择的目录
//! - [`pull_draw`] 把手绘图片读成 RGBA，交给签名画布显示
//!
//! 文件操作都在阻塞线程池里执行，不占用调用方的事件循环。

use log::{info, warn};

use crate::error::BridgeError;
use crate::transfer::{CacheDir, TransferKind, TransferRecord, TransferStateCache};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// 拉取错误
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("No pending transfer")]
    Empty,

    #[error("Pending transfer is {actual:?}, expected {expected:?}")]
    WrongKind {
        expected: TransferKind,
        actual: TransferKind,
    },

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// 把当前记录中的文件复制到 `dest_dir`
///
/// 已不在缓存中的文件会被跳过并记录警告。返回复制后的路径。
pub async fn pull_files(
    cache: &CacheDir,
    transfers: &TransferStateCache,
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, FetchError> {
    let record = transfers.peek().ok_or(FetchError::Empty)?;
    let cache = cache.clone();
    let dest_dir = dest_dir.to_path_buf();

    let copied = tokio::task::spawn_blocking(move || copy_record(&cache, &record, &dest_dir))
        .await??;
    Ok(copied)
}

fn copy_record(
    cache: &CacheDir,
    record: &TransferRecord,
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, BridgeError> {
    std::fs::create_dir_all(dest_dir)?;

    let mut copied = Vec::with_capacity(record.names.len());
    for name in &record.names {
        let source = match cache.resolve(name) {
            Ok(path) => path,
            Err(BridgeError::NotFound(_)) => {
                warn!("{} is no longer in the cache, skipped", name);
                continue;
            }
            Err(e) => return Err(e),
        };
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let target = dest_dir.join(file_name);
        std::fs::copy(&source, &target)?;
        info!("Pulled {} -> {}", name, target.display());
        copied.push(target);
    }
    Ok(copied)
}

/// 读取当前 `draw` 记录对应的图片
pub async fn pull_draw(
    cache: &CacheDir,
    transfers: &TransferStateCache,
) -> Result<RgbaImage, FetchError> {
    let record = transfers.peek().ok_or(FetchError::Empty)?;
    if record.kind != TransferKind::Draw {
        return Err(FetchError::WrongKind {
            expected: TransferKind::Draw,
            actual: record.kind,
        });
    }
    let name = record.names.first().ok_or(FetchError::Empty)?;
    let path = cache.resolve(name)?;

    let image = tokio::task::spawn_blocking(move || image::open(&path)).await??;
    Ok(image.to_rgba8())
}
