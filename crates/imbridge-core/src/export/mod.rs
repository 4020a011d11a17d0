//! 导出流水线
//!
//! 把画布快照裁剪到内容边界，再写成位图或通过外部描摹工具转成矢量图。
//!
//! # 结果
//!
//! 调用方需要区分 [`ExportError::NoContent`]、[`ExportError::ToolUnavailable`]
//! 和 [`ExportError::ToolFailed`]，分别给出不同的提示。

pub mod bitmap;
pub mod crop;
pub mod tools;
pub mod vector;

pub use bitmap::export_bitmap;
pub use crop::crop_to_content;
pub use tools::{PathToolRegistry, ToolRegistry};
pub use vector::{VectorExporter, VectorFormat};

use std::path::Path;

/// 导出错误
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Nothing to export: the drawing is empty")]
    NoContent,

    #[error("Tool '{tool}' is not installed or not in PATH")]
    ToolUnavailable { tool: String },

    #[error("Tool '{tool}' failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// 目标文件的小写扩展名（不含点）
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// 按扩展名判断是否需要走矢量描摹
pub fn is_vector_path(path: &Path) -> bool {
    VectorFormat::from_extension(&extension_of(path)).is_some()
}
