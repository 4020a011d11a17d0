//! 桥接服务器
//!
//! 面向手机浏览器的 HTTP/HTTPS 服务，运行在后台任务中。
//!
//! # 路由
//!
//! - `GET /` 静态客户端页面
//! - `GET /get_latest_metadata` 最近一次上传的记录
//! - `POST /api/file_share/upload` 上传文件（multipart 字段 `photos`）
//! - `GET /canvas/size` 桌面端签名画布尺寸
//! - `GET /api/file_share/files` 桌面端分享列表
//! - `GET /api/file_share/download?filename=` 下载分享文件

use log::{debug, error, info, warn};

use crate::error::{BridgeError, Result};
use crate::transfer::cache_dir::CacheDir;
use crate::transfer::handlers::{self, BridgeContext};
use crate::transfer::provider::{CanvasSizeProvider, FileListProvider};
use crate::transfer::state::TransferStateCache;
use crate::transfer::tls;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// 优雅关闭的最长等待时间，超时后强制终止接收任务
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// 协议
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
        }
    }
}

/// 服务器选项
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    /// 手机端静态页面目录
    pub static_dir: PathBuf,
    pub tls_cert: PathBuf,
    pub tls_key: PathBuf,
    pub max_upload_bytes: usize,
}

struct RunningServer {
    local_addr: SocketAddr,
    scheme: Scheme,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// 桥接服务器
pub struct BridgeServer {
    options: ServerOptions,
    cache: CacheDir,
    transfers: Arc<TransferStateCache>,
    file_list: Option<Arc<dyn FileListProvider>>,
    canvas_size: Option<Arc<dyn CanvasSizeProvider>>,
    running: Option<RunningServer>,
}

impl BridgeServer {
    pub fn new(options: ServerOptions, cache: CacheDir, transfers: Arc<TransferStateCache>) -> Self {
        Self {
            options,
            cache,
            transfers,
            file_list: None,
            canvas_size: None,
            running: None,
        }
    }

    /// 注册分享列表提供者
    pub fn with_file_list_provider(mut self, provider: Arc<dyn FileListProvider>) -> Self {
        self.file_list = Some(provider);
        self
    }

    /// 注册画布尺寸提供者
    pub fn with_canvas_size_provider(mut self, provider: Arc<dyn CanvasSizeProvider>) -> Self {
        self.canvas_size = Some(provider);
        self
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// 修改监听地址，下次 `start` 生效
    pub fn set_endpoint(&mut self, host: impl Into<String>, port: u16) {
        self.options.host = host.into();
        self.options.port = port;
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// 实际监听地址（端口 0 时为系统分配的端口）
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    pub fn scheme(&self) -> Option<Scheme> {
        self.running.as_ref().map(|r| r.scheme)
    }

    /// 给定对外地址的访问 URL
    pub fn base_url(&self, host: &str) -> Option<String> {
        self.running
            .as_ref()
            .map(|r| format!("{}://{}:{}/", r.scheme, host, r.local_addr.port()))
    }

    fn router(&self) -> Router {
        let context = Arc::new(BridgeContext {
            cache: self.cache.clone(),
            transfers: self.transfers.clone(),
            file_list: self.file_list.clone(),
            canvas_size: self.canvas_size.clone(),
        });

        Router::new()
            .route("/get_latest_metadata", get(handlers::latest_metadata))
            .route("/api/file_share/upload", post(handlers::upload))
            .route("/canvas/size", get(handlers::canvas_size))
            .route("/api/file_share/files", get(handlers::list_shared))
            .route("/api/file_share/download", get(handlers::download))
            .fallback_service(ServeDir::new(&self.options.static_dir))
            .layer(DefaultBodyLimit::max(self.options.max_upload_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(context)
    }

    /// 启动服务器
    ///
    /// 已在运行时直接返回当前地址。
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            info!("Bridge server already running on {}", running.local_addr);
            return Ok(running.local_addr);
        }

        let addr = format!("{}:{}", self.options.host, self.options.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| BridgeError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let app = self.router();
        let acceptor = tls::load_acceptor(&self.options.tls_cert, &self.options.tls_key);
        let scheme = if acceptor.is_some() {
            Scheme::Https
        } else {
            Scheme::Http
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = match acceptor {
            Some(acceptor) => tokio::spawn(tls::serve_tls(listener, acceptor, app, shutdown_rx)),
            None => tokio::spawn(async move {
                let shutdown = async {
                    let _ = shutdown_rx.await;
                };
                if let Err(e) = axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await
                {
                    error!("Bridge server error: {}", e);
                }
            }),
        };

        info!("Bridge server listening on {}://{}", scheme, local_addr);
        self.running = Some(RunningServer {
            local_addr,
            scheme,
            shutdown_tx,
            handle,
        });
        Ok(local_addr)
    }

    /// 停止服务器
    ///
    /// 返回时监听套接字已经释放，已建立的连接也已关闭。未运行时什么也不做。
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            debug!("Bridge server not running");
            return;
        };

        let _ = running.shutdown_tx.send(());
        let mut handle = running.handle;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
            warn!("Bridge server did not drain in time, aborting");
            handle.abort();
            let _ = handle.await;
        }

        info!("Bridge server on {} stopped", running.local_addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(tmp: &std::path::Path) -> ServerOptions {
        ServerOptions {
            host: "127.0.0.1".into(),
            port: 0,
            static_dir: tmp.join("static"),
            tls_cert: tmp.join("cert.pem"),
            tls_key: tmp.join("key.pem"),
            max_upload_bytes: 1024 * 1024,
        }
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut server = BridgeServer::new(
            options(tmp.path()),
            CacheDir::new(tmp.path().join("cache")),
            Arc::new(TransferStateCache::new()),
        );

        let first = server.start().await.unwrap();
        let second = server.start().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(server.scheme(), Some(Scheme::Http));
        assert_eq!(
            server.base_url("192.168.1.5"),
            Some(format!("http://192.168.1.5:{}/", first.port()))
        );

        server.stop().await;
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_stop_releases_port() {
        let tmp = tempfile::tempdir().unwrap();
        let mut server = BridgeServer::new(
            options(tmp.path()),
            CacheDir::new(tmp.path().join("cache")),
            Arc::new(TransferStateCache::new()),
        );

        let addr = server.start().await.unwrap();
        server.stop().await;

        // 同一端口立即可以重新绑定
        server.set_endpoint("127.0.0.1", addr.port());
        let again = server.start().await.unwrap();
        assert_eq!(again.port(), addr.port());
        server.stop().await;
    }

    #[tokio::test]
    async fn test_stop_when_not_running_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let mut server = BridgeServer::new(
            options(tmp.path()),
            CacheDir::new(tmp.path().join("cache")),
            Arc::new(TransferStateCache::new()),
        );
        server.stop().await;
        server.stop().await;
        assert!(!server.is_running());
        assert!(server.base_url("127.0.0.1").is_none());
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = blocker.local_addr().unwrap().port();

        let mut opts = options(tmp.path());
        opts.port = port;
        let mut server = BridgeServer::new(
            opts,
            CacheDir::new(tmp.path().join("cache")),
            Arc::new(TransferStateCache::new()),
        );

        assert!(matches!(
            server.start().await,
            Err(BridgeError::Bind { .. })
        ));
        assert!(!server.is_running());
    }
}
