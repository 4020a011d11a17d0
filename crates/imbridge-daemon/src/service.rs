//! Core Service - 桥接服务、缓存与分享列表管理

use imbridge_core::logging::{LogBuffer, LogEntry, LogLevel};
use imbridge_core::{
    AppSettings, BridgeServer, CacheDir, FileListProvider, TransferRecord, TransferStateCache,
    enumerate_local_addresses, pull_files,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

/// 桌面端选中的分享文件
#[derive(Debug, Default)]
pub struct ShareSet {
    files: Mutex<Vec<PathBuf>>,
}

impl ShareSet {
    pub fn replace(&self, files: Vec<PathBuf>) {
        *self.files.lock().unwrap_or_else(PoisonError::into_inner) = files;
    }
}

impl FileListProvider for ShareSet {
    fn get_file_list(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct BridgeService {
    settings: AppSettings,
    cache: CacheDir,
    transfers: Arc<TransferStateCache>,
    share: Arc<ShareSet>,
    server: AsyncMutex<BridgeServer>,
    logs: Arc<LogBuffer>,
}

impl BridgeService {
    pub fn new(settings: AppSettings, logs: Arc<LogBuffer>) -> Self {
        let cache = CacheDir::new(&settings.cache_dir);
        let transfers = Arc::new(TransferStateCache::new());
        let share = Arc::new(ShareSet::default());
        let server = BridgeServer::new(settings.server_options(), cache.clone(), transfers.clone())
            .with_file_list_provider(share.clone())
            .with_canvas_size_provider(Arc::new(settings.canvas_size()));

        Self {
            settings,
            cache,
            transfers,
            share,
            server: AsyncMutex::new(server),
            logs,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.server.lock().await.is_running()
    }

    /// 启动桥接服务，可覆盖监听地址；返回可访问的 URL
    pub async fn start(
        &self,
        host: Option<String>,
        port: Option<u16>,
    ) -> imbridge_core::Result<Vec<String>> {
        let mut server = self.server.lock().await;
        if !server.is_running() && (host.is_some() || port.is_some()) {
            let host = host.unwrap_or_else(|| server.options().host.clone());
            let port = port.unwrap_or(server.options().port);
            server.set_endpoint(host, port);
        }
        server.start().await?;

        let urls = advertised_urls(&server);
        for url in &urls {
            tracing::info!("📱 在手机浏览器中打开: {}", url);
        }
        Ok(urls)
    }

    pub async fn stop(&self) {
        self.server.lock().await.stop().await;
    }

    pub async fn urls(&self) -> Vec<String> {
        advertised_urls(&*self.server.lock().await)
    }

    pub fn metadata(&self) -> Option<TransferRecord> {
        self.transfers.peek()
    }

    pub async fn pull(&self, dest: &Path) -> Result<Vec<PathBuf>, imbridge_core::FetchError> {
        pull_files(&self.cache, &self.transfers, dest).await
    }

    /// 清空缓存目录和传输记录
    pub async fn purge(&self) -> usize {
        if let Some(record) = self.transfers.take() {
            tracing::info!("丢弃上传记录: {:?} {:?}", record.kind, record.names);
        }
        let cache = self.cache.clone();
        match tokio::task::spawn_blocking(move || cache.purge()).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!("Purge task failed: {}", e);
                0
            }
        }
    }

    pub fn share(&self, files: Vec<PathBuf>) -> usize {
        let count = files.len();
        self.share.replace(files);
        tracing::info!("分享列表已更新: {} 个文件", count);
        count
    }

    pub fn logs(&self, level: LogLevel, limit: usize) -> Vec<LogEntry> {
        self.logs.snapshot(level, limit)
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// 退出前停止服务并清空缓存
    pub async fn shutdown(&self) {
        self.stop().await;
        let removed = self.purge().await;
        tracing::info!("缓存已清理 ({} 项)", removed);
    }
}

/// 监听在通配地址时为每个本机地址生成 URL，否则只用配置的地址
fn advertised_urls(server: &BridgeServer) -> Vec<String> {
    let host = &server.options().host;
    let hosts = if host == "0.0.0.0" || host.is_empty() {
        enumerate_local_addresses()
    } else {
        vec![host.clone()]
    };
    hosts.iter().filter_map(|h| server.base_url(h)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tmp: &Path) -> AppSettings {
        AppSettings {
            host: "127.0.0.1".into(),
            port: 0,
            cache_dir: tmp.join("cache"),
            static_dir: tmp.join("static"),
            tls_cert: tmp.join("cert.pem"),
            tls_key: tmp.join("key.pem"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_reports_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let service = BridgeService::new(settings(tmp.path()), Arc::new(LogBuffer::default()));

        assert!(service.urls().await.is_empty());
        let urls = service.start(None, None).await.unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("http://127.0.0.1:"));
        assert!(service.is_running().await);

        service.stop().await;
        assert!(!service.is_running().await);
    }

    #[tokio::test]
    async fn test_shutdown_purges_cache_and_record() {
        let tmp = tempfile::tempdir().unwrap();
        let service = BridgeService::new(settings(tmp.path()), Arc::new(LogBuffer::default()));
        service.cache.materialize("notes.txt", b"hi").unwrap();
        service.transfers.publish_saved(vec!["notes.txt".into()]);
        service.start(None, None).await.unwrap();

        service.shutdown().await;
        assert!(service.metadata().is_none());
        assert!(!tmp.path().join("cache").join("notes.txt").exists());
        assert!(!service.is_running().await);
    }

    #[test]
    fn test_share_set_is_provider() {
        let tmp = tempfile::tempdir().unwrap();
        let service = BridgeService::new(settings(tmp.path()), Arc::new(LogBuffer::default()));
        service.share(vec![PathBuf::from("/tmp/a.pdf")]);
        assert_eq!(service.share.get_file_list(), vec![PathBuf::from("/tmp/a.pdf")]);
    }
}
