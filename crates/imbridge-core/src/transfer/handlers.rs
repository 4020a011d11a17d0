//! HTTP 处理器
//!
//! 所有内部错误都转换为 [`BridgeError`] 响应，不会越过处理器边界。

use log::{debug, error, info, warn};

use crate::error::{BridgeError, Result};
use crate::transfer::cache_dir::CacheDir;
use crate::transfer::provider::{CanvasSize, CanvasSizeProvider, FileListProvider};
use crate::transfer::sanitize::sanitize_filename;
use crate::transfer::state::TransferStateCache;
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::fs::File;

/// 上传表单中携带文件的字段名
pub const UPLOAD_FIELD: &str = "photos";

/// 处理器共享的上下文
pub struct BridgeContext {
    pub cache: CacheDir,
    pub transfers: Arc<TransferStateCache>,
    pub file_list: Option<Arc<dyn FileListProvider>>,
    pub canvas_size: Option<Arc<dyn CanvasSizeProvider>>,
}

pub type SharedContext = Arc<BridgeContext>;

#[derive(Deserialize)]
pub struct DownloadQuery {
    pub filename: Option<String>,
}

/// 分享列表中的文件信息（不含完整路径）
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SharedFileInfo {
    pub name: String,
    pub ext: String,
    pub size: u64,
    pub mtime: f64,
    #[serde(skip)]
    pub path: PathBuf,
}

impl SharedFileInfo {
    /// `name + ext` 即客户端看到的文件名
    pub fn file_name(&self) -> String {
        format!("{}{}", self.name, self.ext)
    }
}

/// GET /get_latest_metadata
pub async fn latest_metadata(State(ctx): State<SharedContext>) -> Json<serde_json::Value> {
    match ctx.transfers.peek() {
        Some(record) => Json(serde_json::to_value(record).unwrap_or_default()),
        None => Json(serde_json::json!({})),
    }
}

/// GET /canvas/size
pub async fn canvas_size(State(ctx): State<SharedContext>) -> Json<CanvasSize> {
    let size = ctx
        .canvas_size
        .as_ref()
        .map(|p| p.get_canvas_size())
        .unwrap_or_default();
    Json(size)
}

/// POST /api/file_share/upload
///
/// 逐个保存 `photos` 字段的文件。某个文件失败时立即返回错误，
/// 之前已经写入的文件保留在缓存目录中，不回滚，也不发布新记录。
pub async fn upload(
    State(ctx): State<SharedContext>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let mut saved = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BridgeError::MalformedRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let raw_name = field
            .file_name()
            .map(ToString::to_string)
            .ok_or_else(|| BridgeError::MalformedRequest("file part without a name".into()))?;
        let name = sanitize_filename(&raw_name).inspect_err(|_| {
            warn!("[UPLOAD] Rejected file name {:?}", raw_name);
        })?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| BridgeError::MalformedRequest(e.to_string()))?;

        let cache = ctx.cache.clone();
        let target = name.clone();
        let path = tokio::task::spawn_blocking(move || cache.materialize(&target, &bytes))
            .await
            .map_err(|e| BridgeError::Io(std::io::Error::other(e)))?
            .inspect_err(|e| error!("[UPLOAD] Failed to save {}: {}", name, e))?;

        info!("[UPLOAD] File saved: {}", path.display());
        saved.push(name);
    }

    info!(
        "[UPLOAD] {} file(s) saved to {}",
        saved.len(),
        ctx.cache.root().display()
    );
    ctx.transfers.publish_saved(saved.clone());

    Ok(Json(serde_json::json!({
        "success": true,
        "files": saved,
    })))
}

/// GET /api/file_share/files
pub async fn list_shared(State(ctx): State<SharedContext>) -> Json<Vec<SharedFileInfo>> {
    Json(shared_files(&ctx).await)
}

/// GET /api/file_share/download?filename=
///
/// 只在当前分享列表中查找，不直接访问缓存目录。
pub async fn download(
    State(ctx): State<SharedContext>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let requested = query
        .filename
        .ok_or_else(|| BridgeError::MalformedRequest("missing filename".into()))?;
    let filename = sanitize_filename(&requested)?;

    let entry = shared_files(&ctx)
        .await
        .into_iter()
        .find(|info| info.file_name() == filename)
        .ok_or_else(|| BridgeError::NotFound(filename.clone()))?;

    let file = File::open(&entry.path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BridgeError::NotFound(filename.clone())
        } else {
            BridgeError::Io(e)
        }
    })?;

    info!("Download request for {}", entry.path.display());

    let mime = mime_guess::from_path(&entry.path).first_or_octet_stream();
    let disposition = content_disposition(&filename);
    let stream = tokio_util::io::ReaderStream::new(file);
    let headers = [
        (header::CONTENT_TYPE, mime.to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// 附件头：ASCII 回退名 + RFC 5987 的 UTF-8 名称
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if fallback == filename {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(filename)
        )
    }
}

/// 收集分享列表中仍然存在的普通文件
async fn shared_files(ctx: &BridgeContext) -> Vec<SharedFileInfo> {
    let Some(provider) = ctx.file_list.as_ref() else {
        debug!("No file list provider registered");
        return Vec::new();
    };

    let mut result = Vec::new();
    for path in provider.get_file_list() {
        if let Some(info) = describe_file(&path).await {
            result.push(info);
        }
    }
    result
}

async fn describe_file(path: &Path) -> Option<SharedFileInfo> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !meta.is_file() {
        return None;
    }

    let name = path.file_stem()?.to_string_lossy().to_string();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    Some(SharedFileInfo {
        name,
        ext,
        size: meta.len(),
        mtime,
        path: path.to_path_buf(),
    })
}
