//! ImBridge Daemon
//!
//! 桌面端守护进程，负责：
//! - 运行面向手机浏览器的桥接服务
//! - 持有缓存目录和传输记录，响应拉取请求
//! - 通过 Unix Socket 与 CLI 通信
//! - 退出时清空缓存

mod ipc;
mod log_sink;
mod service;

use anyhow::Result;
use clap::Parser;
use imbridge_core::AppSettings;
use imbridge_core::logging::LogBuffer;
use log_sink::LogSinkLayer;
use service::BridgeService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "imbridge-daemon", version, about = "ImBridge 桌面端守护进程")]
struct Args {
    /// 监听地址
    #[arg(long)]
    host: Option<String>,
    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,
    /// 缓存目录
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// 手机端静态页面目录
    #[arg(long)]
    static_dir: Option<PathBuf>,
    /// 启动时不自动开启桥接服务
    #[arg(long)]
    no_serve: bool,
}

impl Args {
    fn apply(self, settings: &mut AppSettings) {
        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(dir) = self.cache_dir {
            settings.cache_dir = dir;
        }
        if let Some(dir) = self.static_dir {
            settings.static_dir = dir;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let logs = Arc::new(LogBuffer::default());

    // 桥接 log crate（imbridge-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    // 初始化日志
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,imbridge_core=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(LogSinkLayer::new(logs.clone()))
        .try_init();

    tracing::info!("ImBridge Daemon starting...");

    let serve = !args.no_serve;
    let mut settings = AppSettings::load();
    args.apply(&mut settings);

    let service = Arc::new(BridgeService::new(settings, logs));

    if serve {
        // 端口被占用只报告错误，守护进程仍可通过 IPC 重新启动服务
        if let Err(e) = service.start(None, None).await {
            tracing::error!("启动桥接服务失败: {}", e);
        }
    }

    // 启动 IPC 服务器
    let ipc_handle = tokio::spawn(ipc::run_ipc_server(service.clone()));

    tokio::select! {
        res = ipc_handle => {
            tracing::error!("IPC server exited: {:?}", res);
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("收到退出信号");
        }
    }

    service.shutdown().await;
    ipc::remove_socket();
    tracing::info!("ImBridge Daemon stopped");

    Ok(())
}
