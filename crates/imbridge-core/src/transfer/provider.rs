//! 桌面端协作接口
//!
//! 服务端只依赖这两个窄接口，在启动前注册一次。未注册时退化为空列表和默认画布尺寸。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CANVAS_WIDTH: u32 = 560;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 300;

/// 签名画布尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

/// 桌面端当前选中的分享文件
pub trait FileListProvider: Send + Sync {
    fn get_file_list(&self) -> Vec<PathBuf>;
}

/// 桌面端签名画布尺寸
pub trait CanvasSizeProvider: Send + Sync {
    fn get_canvas_size(&self) -> CanvasSize;
}

impl FileListProvider for Vec<PathBuf> {
    fn get_file_list(&self) -> Vec<PathBuf> {
        self.clone()
    }
}

impl CanvasSizeProvider for CanvasSize {
    fn get_canvas_size(&self) -> CanvasSize {
        *self
    }
}
