//! IPC 协议 - 守护进程与 CLI 之间的 Unix Domain Socket 消息
//!
//! 每条消息是一行 JSON，请求和响应一一对应。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::logging::{LogEntry, LogLevel};
use crate::transfer::TransferRecord;

pub fn socket_path() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("imbridge.sock")
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum IpcRequest {
    #[serde(rename = "status")]
    Status,
    /// 启动桥接服务，可覆盖监听地址
    #[serde(rename = "start")]
    Start {
        host: Option<String>,
        port: Option<u16>,
    },
    #[serde(rename = "stop")]
    Stop,
    /// 当前传输记录
    #[serde(rename = "metadata")]
    Metadata,
    /// 把当前记录的文件复制到 `dest`，缺省时使用配置的输出目录
    #[serde(rename = "pull")]
    Pull { dest: Option<PathBuf> },
    /// 清空缓存目录和传输记录
    #[serde(rename = "purge")]
    Purge,
    /// 设置手机端可下载的文件列表
    #[serde(rename = "share")]
    Share { files: Vec<PathBuf> },
    #[serde(rename = "logs")]
    Logs { level: LogLevel, limit: usize },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum IpcResponse {
    #[serde(rename = "ok")]
    Ok { message: String },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "status")]
    Status {
        running: bool,
        /// 每个本机地址对应的访问 URL
        urls: Vec<String>,
    },
    #[serde(rename = "metadata")]
    Metadata { record: Option<TransferRecord> },
    #[serde(rename = "files")]
    Files { paths: Vec<PathBuf> },
    #[serde(rename = "logs")]
    Logs { entries: Vec<LogEntry> },
}

/// 写一条消息（一行 JSON）
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// 读一行原始消息，连接关闭时返回 `None`
pub async fn read_line<R>(reader: &mut R) -> anyhow::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferKind;
    use tokio::io::BufReader;

    #[test]
    fn test_request_wire_format() {
        let json = serde_json::to_string(&IpcRequest::Start {
            host: None,
            port: Some(8443),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"start","host":null,"port":8443}"#);

        let parsed: IpcRequest = serde_json::from_str(r#"{"type":"purge"}"#).unwrap();
        assert_eq!(parsed, IpcRequest::Purge);
    }

    #[test]
    fn test_metadata_response_embeds_record() {
        let resp = IpcResponse::Metadata {
            record: Some(TransferRecord {
                kind: TransferKind::Text,
                names: vec!["notes.txt".into()],
            }),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""record":{"kind":"text","names":["notes.txt"]}"#));
    }

    #[tokio::test]
    async fn test_line_framing() {
        let (client, server) = tokio::io::duplex(1024);
        let (read_half, _) = tokio::io::split(server);
        let (_, mut write_half) = tokio::io::split(client);

        write_message(&mut write_half, &IpcRequest::Status).await.unwrap();
        write_message(&mut write_half, &IpcRequest::Stop).await.unwrap();
        drop(write_half);

        let mut reader = BufReader::new(read_half);
        let first = read_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<IpcRequest>(&first).unwrap(),
            IpcRequest::Status
        );
        let second = read_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<IpcRequest>(&second).unwrap(),
            IpcRequest::Stop
        );
    }
}
