//! 网络工具
//!
//! 枚举本机 IPv4 地址用于展示可访问的 URL，以及绑定探测和 ping 诊断。

use log::{debug, warn};

use crate::error::{BridgeError, Result};
use std::net::{IpAddr, Ipv4Addr, TcpListener, UdpSocket};
use std::process::Stdio;
use tokio::process::Command;

pub const LOOPBACK: &str = "127.0.0.1";

/// 枚举本机 IPv4 地址
///
/// 默认路由对应的地址排在最前，之后是各网卡地址（去掉回环和链路本地），
/// 最后总是追加 `127.0.0.1`。任何步骤失败都只记录日志。
pub fn enumerate_local_addresses() -> Vec<String> {
    let mut addrs: Vec<Ipv4Addr> = Vec::new();

    if let Some(preferred) = default_route_address() {
        addrs.push(preferred);
    }

    match local_ip_address::list_afinet_netifas() {
        Ok(interfaces) => {
            for (name, ip) in interfaces {
                if let IpAddr::V4(v4) = ip {
                    if is_advertisable(v4) && !addrs.contains(&v4) {
                        debug!("Interface {} has {}", name, v4);
                        addrs.push(v4);
                    }
                }
            }
        }
        Err(e) => warn!("Failed to enumerate network interfaces: {}", e),
    }

    let mut out: Vec<String> = addrs.iter().map(ToString::to_string).collect();
    out.push(LOOPBACK.to_string());
    out
}

/// 通过 UDP "连接" 探测默认路由使用的源地址，不会真正发包
fn default_route_address() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(v4) if is_advertisable(v4) => Some(v4),
        _ => None,
    }
}

fn is_advertisable(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback() || ip.is_link_local() || ip.is_unspecified())
}

/// 尝试绑定再立即释放，仅用于诊断
pub fn probe_bind(host: &str, port: u16) -> Result<()> {
    let listener = TcpListener::bind((host, port)).map_err(|source| BridgeError::Bind {
        addr: format!("{}:{}", host, port),
        source,
    })?;
    drop(listener);
    Ok(())
}

/// 调用系统 `ping`，输出中出现 `ttl=` 即视为可达
pub async fn ping_host(ip: &str, count: u32) -> (bool, String) {
    let count_flag = if cfg!(windows) { "-n" } else { "-c" };
    let output = Command::new("ping")
        .arg(count_flag)
        .arg(count.max(1).to_string())
        .arg(ip)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    match output {
        Ok(output) => {
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).into_owned()
            } else {
                String::from_utf8_lossy(&output.stdout).into_owned()
            };
            (reports_ttl(&text), text)
        }
        Err(e) => (false, e.to_string()),
    }
}

fn reports_ttl(output: &str) -> bool {
    output.to_ascii_lowercase().contains("ttl=")
}
