//! 传输模块
//!
//! 包含:
//! - 文件名清洗与缓存目录
//! - 单槽传输状态缓存
//! - HTTP/HTTPS 桥接服务器（手机端）

pub mod bridge_server;
pub mod cache_dir;
pub mod handlers;
pub mod provider;
pub mod sanitize;
pub mod state;
pub mod tls;

pub use bridge_server::{BridgeServer, Scheme, ServerOptions};
pub use cache_dir::CacheDir;
pub use handlers::{SharedFileInfo, UPLOAD_FIELD};
pub use provider::{CanvasSize, CanvasSizeProvider, FileListProvider};
pub use sanitize::sanitize_filename;
pub use state::{TransferKind, TransferRecord, TransferStateCache};
