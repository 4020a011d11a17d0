//! 矢量导出
//!
//! 流程:
//! 1. 合成到白底并转为灰度，写入临时 BMP
//! 2. 调用描摹工具（默认 potrace）生成 svg/eps/pdf/ps
//! 3. 临时文件由 [`tempfile::NamedTempFile`] 持有，任何退出路径都会删除

use log::{debug, info};

use crate::export::bitmap::flatten_on_white;
use crate::export::tools::ToolRegistry;
use crate::export::{ExportError, extension_of};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;

pub const DEFAULT_TRACER: &str = "potrace";
pub const DEFAULT_TRACER_TIMEOUT: Duration = Duration::from_secs(10);

/// 矢量格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    Svg,
    Eps,
    Pdf,
    Ps,
}

impl VectorFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "svg" => Some(VectorFormat::Svg),
            "eps" => Some(VectorFormat::Eps),
            "pdf" => Some(VectorFormat::Pdf),
            "ps" => Some(VectorFormat::Ps),
            _ => None,
        }
    }

    /// potrace `-b` 参数
    pub fn backend(&self) -> &'static str {
        match self {
            VectorFormat::Svg => "svg",
            VectorFormat::Eps => "eps",
            VectorFormat::Pdf => "pdf",
            VectorFormat::Ps => "ps",
        }
    }
}

/// 矢量导出器
pub struct VectorExporter {
    tool: String,
    registry: Arc<dyn ToolRegistry>,
    timeout: Duration,
    temp_dir: Option<PathBuf>,
}

impl VectorExporter {
    pub fn new(registry: Arc<dyn ToolRegistry>) -> Self {
        Self {
            tool: DEFAULT_TRACER.to_string(),
            registry,
            timeout: DEFAULT_TRACER_TIMEOUT,
            temp_dir: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 临时 BMP 的存放目录（默认系统临时目录）
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// 把图像描摹为 `path` 扩展名对应的矢量格式
    pub async fn export(&self, image: &RgbaImage, path: &Path) -> Result<(), ExportError> {
        let ext = extension_of(path);
        let format =
            VectorFormat::from_extension(&ext).ok_or(ExportError::UnsupportedFormat(ext))?;

        if !self.registry.available(&self.tool) {
            return Err(self.unavailable());
        }

        let bitmap = self.write_temp_bitmap(image)?;
        debug!("Tracing {} -> {}", bitmap.path().display(), path.display());

        let child = Command::new(&self.tool)
            .arg(bitmap.path())
            .arg("-o")
            .arg(path)
            .arg("-b")
            .arg(format.backend())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => self.unavailable(),
                _ => ExportError::Io(e),
            })?;

        // 超时后 future 被丢弃，kill_on_drop 负责结束子进程
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExportError::ToolFailed {
                tool: self.tool.clone(),
                reason: format!("timed out after {:?}", self.timeout),
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExportError::ToolFailed {
                tool: self.tool.clone(),
                reason: format!("{} {}", output.status, stderr.trim()),
            });
        }

        info!("Drawing {} saved to {}", format.backend().to_uppercase(), path.display());
        Ok(())
    }

    fn unavailable(&self) -> ExportError {
        ExportError::ToolUnavailable {
            tool: self.tool.clone(),
        }
    }

    fn write_temp_bitmap(&self, image: &RgbaImage) -> Result<NamedTempFile, ExportError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("imbridge-trace-").suffix(".bmp");
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let gray = DynamicImage::ImageRgb8(flatten_on_white(image)).to_luma8();
        gray.save_with_format(file.path(), ImageFormat::Bmp)?;
        Ok(file)
    }
}
