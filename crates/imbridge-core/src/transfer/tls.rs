//! HTTPS 支持
//!
//! 证书和私钥（PEM）同时存在且可读时启用 HTTPS，否则退回 HTTP 并给出警告。

use log::{debug, info, warn};

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tokio_native_tls::TlsAcceptor;

/// 尝试加载 TLS 证书
///
/// 任何一步失败都只记录警告并返回 `None`。
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Option<TlsAcceptor> {
    let (cert, key) = match (fs::read(cert_path), fs::read(key_path)) {
        (Ok(cert), Ok(key)) => (cert, key),
        _ => {
            warn!(
                "TLS certificate not found ({} / {}), using HTTP mode",
                cert_path.display(),
                key_path.display()
            );
            return None;
        }
    };

    let identity = match native_tls::Identity::from_pkcs8(&cert, &key) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Unusable TLS certificate: {}, using HTTP mode", e);
            return None;
        }
    };

    match native_tls::TlsAcceptor::new(identity) {
        Ok(acceptor) => {
            info!("Using TLS certificate {}", cert_path.display());
            Some(TlsAcceptor::from(acceptor))
        }
        Err(e) => {
            warn!("Failed to build TLS acceptor: {}, using HTTP mode", e);
            None
        }
    }
}

/// HTTPS 接收循环
///
/// 收到关闭信号后停止接收并通知每个连接优雅关闭，
/// 所有连接结束后才返回，之后不会再有请求到达处理函数。
pub async fn serve_tls(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    app: Router,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (closing_tx, closing_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            Some(_) = connections.join_next(), if !connections.is_empty() => continue,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            },
        };

        connections.spawn(serve_connection(
            stream,
            peer,
            acceptor.clone(),
            TowerToHyperService::new(app.clone()),
            closing_rx.clone(),
        ));
    }

    drop(listener);
    let _ = closing_tx.send(true);
    debug!("TLS accept loop stopped, draining {} connection(s)", connections.len());
    while connections.join_next().await.is_some() {}
    debug!("TLS connections drained");
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    service: TowerToHyperService<Router>,
    mut closing: watch::Receiver<bool>,
) {
    let tls_stream = tokio::select! {
        _ = closing.changed() => return,
        accepted = acceptor.accept(stream) => match accepted {
            Ok(s) => s,
            Err(e) => {
                debug!("TLS handshake with {} failed: {}", peer, e);
                return;
            }
        },
    };

    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection_with_upgrades(TokioIo::new(tls_stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        res = conn.as_mut() => res,
        _ = closing.changed() => {
            // 正在处理的请求完成后关闭，空闲的 keep-alive 连接立即关闭
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };
    if let Err(e) = result {
        debug!("Connection with {} closed: {}", peer, e);
    }
}
