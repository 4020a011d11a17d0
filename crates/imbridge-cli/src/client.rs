//! IPC Client - 与守护进程通信

use anyhow::{Result, bail};
use imbridge_core::ipc::{IpcRequest, IpcResponse, read_line, socket_path, write_message};
use tokio::io::BufReader;
use tokio::net::UnixStream;

pub async fn send_request(request: IpcRequest) -> Result<IpcResponse> {
    let path = socket_path();

    let stream = match UnixStream::connect(&path).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ 无法连接到守护进程: {}", e);
            eprintln!("   请确保 imbridge-daemon 正在运行");
            eprintln!("   运行: cargo xtask dev");
            return Err(e.into());
        }
    };

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    write_message(&mut writer, &request).await?;

    let Some(line) = read_line(&mut reader).await? else {
        bail!("守护进程关闭了连接");
    };
    let response: IpcResponse = serde_json::from_str(&line)?;

    match &response {
        IpcResponse::Ok { message } => println!("✅ {}", message),
        IpcResponse::Error { message } => eprintln!("❌ {}", message),
        _ => {}
    }

    Ok(response)
}
