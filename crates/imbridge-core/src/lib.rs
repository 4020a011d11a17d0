//! ImBridge Core Library
//!
//! 桌面端与手机浏览器之间的局域网桥接：手机无需安装任何软件，
//! 通过网页上传一段文字、一张手绘图或若干文件，桌面端拉取后使用。
//!
//! # 模块
//!
//! - **transfer**: 文件名清洗、缓存目录、单槽传输状态、HTTP/HTTPS 桥接服务
//! - **signature**: 签名采集画布（指针状态机 + 平滑笔迹栅格化）
//! - **export**: 裁剪到内容边界，导出位图或调用描摹工具导出矢量图
//! - **workflow**: 桌面端拉取已上传的内容
//! - **net**: 本机地址枚举、绑定探测、ping 诊断
//!
//! # 使用示例
//!
//! ## 启动桥接服务
//!
//! ```ignore
//! use imbridge_core::{AppSettings, BridgeServer, CacheDir, TransferStateCache};
//!
//! let settings = AppSettings::load();
//! let cache = CacheDir::new(&settings.cache_dir);
//! let transfers = Arc::new(TransferStateCache::new());
//!
//! let mut server = BridgeServer::new(settings.server_options(), cache.clone(), transfers.clone());
//! server.start().await?;
//! println!("{:?}", server.base_url("192.168.1.20"));
//!
//! // 手机上传完成后
//! let copied = imbridge_core::pull_files(&cache, &transfers, &settings.output_dir).await?;
//! server.stop().await;
//! ```
//!
//! ## 导出签名
//!
//! ```ignore
//! use imbridge_core::{PointerEvent, SignatureCanvas, export_bitmap};
//!
//! let mut canvas = SignatureCanvas::new(560, 300);
//! canvas.handle(PointerEvent::Down { x: 10.0, y: 10.0 });
//! canvas.handle(PointerEvent::Move { x: 40.0, y: 20.0 });
//! canvas.handle(PointerEvent::Move { x: 80.0, y: 15.0 });
//! canvas.handle(PointerEvent::Up);
//!
//! let image = canvas.snapshot(true)?;
//! export_bitmap(&image, Path::new("sig.png"), true)?;
//! canvas.mark_saved();
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod ipc;
pub mod logging;
pub mod net;
pub mod qr;
pub mod signature;
pub mod transfer;
pub mod workflow;

pub use config::AppSettings;
pub use error::{BridgeError, Result};

// Transfer re-exports
pub use transfer::{
    BridgeServer, CacheDir, CanvasSize, CanvasSizeProvider, FileListProvider, Scheme,
    ServerOptions, SharedFileInfo, TransferKind, TransferRecord, TransferStateCache,
    sanitize_filename,
};

// Signature re-exports
pub use signature::{CaptureState, CloseDecision, Pen, PointerEvent, SignatureCanvas};

// Export re-exports
pub use export::{
    ExportError, PathToolRegistry, ToolRegistry, VectorExporter, VectorFormat, crop_to_content,
    export_bitmap, is_vector_path,
};

// QR re-exports
pub use qr::{QrError, qr_image, qr_terminal, write_qr_png};

// Network re-exports
pub use net::{enumerate_local_addresses, ping_host, probe_bind};

// Workflow re-exports
pub use workflow::{FetchError, pull_draw, pull_files};
