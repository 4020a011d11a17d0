//! IPC Server - Unix Domain Socket 通信

use crate::service::BridgeService;
use anyhow::Result;
use imbridge_core::ipc::{IpcRequest, IpcResponse, read_line, socket_path, write_message};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};

pub async fn run_ipc_server(service: Arc<BridgeService>) -> Result<()> {
    let path = socket_path();

    // 删除旧的 socket 文件
    let _ = std::fs::remove_file(&path);

    let listener = UnixListener::bind(&path)?;
    tracing::info!("IPC 服务器已启动: {:?}", path);

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let service = service.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, service).await {
                        tracing::warn!("IPC client error: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::warn!("接受连接失败: {}", e);
            }
        }
    }
}

/// 退出时删除 socket 文件
pub fn remove_socket() {
    let _ = std::fs::remove_file(socket_path());
}

async fn handle_client(stream: UnixStream, service: Arc<BridgeService>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    while let Some(line) = read_line(&mut reader).await? {
        let response = match serde_json::from_str::<IpcRequest>(&line) {
            Ok(request) => {
                tracing::debug!("收到请求: {:?}", request);
                dispatch(&service, request).await
            }
            Err(e) => IpcResponse::Error {
                message: format!("Invalid request: {}", e),
            },
        };
        write_message(&mut writer, &response).await?;
    }

    Ok(())
}

async fn dispatch(service: &BridgeService, request: IpcRequest) -> IpcResponse {
    match request {
        IpcRequest::Status => IpcResponse::Status {
            running: service.is_running().await,
            urls: service.urls().await,
        },
        IpcRequest::Start { host, port } => match service.start(host, port).await {
            Ok(urls) => IpcResponse::Status {
                running: true,
                urls,
            },
            Err(e) => {
                // 绑定失败只报告，守护进程继续运行
                tracing::error!("启动桥接服务失败: {}", e);
                IpcResponse::Error {
                    message: e.to_string(),
                }
            }
        },
        IpcRequest::Stop => {
            service.stop().await;
            IpcResponse::Ok {
                message: "桥接服务已停止".to_string(),
            }
        }
        IpcRequest::Metadata => IpcResponse::Metadata {
            record: service.metadata(),
        },
        IpcRequest::Pull { dest } => {
            let dest = dest.unwrap_or_else(|| service.settings().output_dir.clone());
            match service.pull(&dest).await {
                Ok(paths) => IpcResponse::Files { paths },
                Err(e) => {
                    tracing::warn!("拉取失败: {}", e);
                    IpcResponse::Error {
                        message: e.to_string(),
                    }
                }
            }
        }
        IpcRequest::Purge => {
            let removed = service.purge().await;
            IpcResponse::Ok {
                message: format!("已清理 {} 项缓存", removed),
            }
        }
        IpcRequest::Share { files } => {
            let count = service.share(files);
            IpcResponse::Ok {
                message: format!("分享列表: {} 个文件", count),
            }
        }
        IpcRequest::Logs { level, limit } => IpcResponse::Logs {
            entries: service.logs(level, limit),
        },
    }
}
