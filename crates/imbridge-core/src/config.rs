//! 应用配置和持久化
//!
//! 提供监听地址、缓存目录、TLS 证书、画布尺寸和描摹工具等设置的存储和读取。

use log::debug;

use crate::export::vector::{DEFAULT_TRACER, DEFAULT_TRACER_TIMEOUT};
use crate::qr::DEFAULT_QR_SIZE;
use crate::transfer::{CanvasSize, ServerOptions};
use crate::transfer::provider::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

const APP_DIR: &str = "imbridge";

/// 应用设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 缓存目录（退出时清空）
    pub cache_dir: PathBuf,
    /// 手机端页面所在目录
    pub static_dir: PathBuf,
    /// 签名与拉取的默认输出目录
    pub output_dir: PathBuf,
    /// TLS 证书 (PEM)
    pub tls_cert: PathBuf,
    /// TLS 私钥 (PEM, PKCS#8)
    pub tls_key: PathBuf,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// 矢量描摹工具
    pub tracer: String,
    pub tracer_timeout_secs: u64,
    /// 单次上传请求体上限
    pub max_upload_bytes: usize,
    /// 二维码图片的默认输出目录
    pub qr_dir: PathBuf,
    /// 二维码边长（像素）
    pub qr_size: u32,
    /// 嵌入二维码中心的徽标
    pub qr_logo: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let config_dir = config_dir();
        let output_dir = dirs::document_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("cache"),
            static_dir: PathBuf::from("static"),
            output_dir: output_dir.clone(),
            tls_cert: config_dir.join("cert.pem"),
            tls_key: config_dir.join("key.pem"),
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            tracer: DEFAULT_TRACER.to_string(),
            tracer_timeout_secs: DEFAULT_TRACER_TIMEOUT.as_secs(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            qr_dir: output_dir.join("qr"),
            qr_size: DEFAULT_QR_SIZE,
            qr_logo: None,
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl AppSettings {
    /// 获取配置文件路径
    pub fn config_path() -> PathBuf {
        config_dir().join("settings.toml")
    }

    /// 加载设置（如果文件不存在则使用默认值）
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => {
                        debug!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize {
            width: self.canvas_width,
            height: self.canvas_height,
        }
    }

    pub fn tracer_timeout(&self) -> Duration {
        Duration::from_secs(self.tracer_timeout_secs)
    }

    /// 转换为桥接服务的启动参数
    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            host: self.host.clone(),
            port: self.port,
            static_dir: self.static_dir.clone(),
            tls_cert: self.tls_cert.clone(),
            tls_key: self.tls_key.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}
