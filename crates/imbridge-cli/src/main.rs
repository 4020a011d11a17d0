//! ImBridge CLI
//!
//! 命令行客户端，通过 Unix Socket 与守护进程通信；
//! 地址枚举、绑定探测和图片导出在本地执行。

mod client;
mod local;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::send_request;
use imbridge_core::AppSettings;
use imbridge_core::ipc::{IpcRequest, IpcResponse};
use imbridge_core::logging::LogLevel;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imbridge", version, about = "ImBridge - 手机与桌面之间的局域网桥接")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 查看桥接服务状态和访问地址
    Status,
    /// 启动桥接服务
    Start {
        /// 监听地址
        #[arg(long)]
        host: Option<String>,
        /// 监听端口
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// 停止桥接服务
    Stop,
    /// 查看最近一次上传的记录
    Metadata,
    /// 把最近一次上传的文件复制到本地
    Pull {
        /// 保存目录 (默认: 设置中的 output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 清空缓存目录和上传记录
    Purge,
    /// 设置手机端可下载的文件
    Share {
        /// 文件路径（不指定则清空分享列表）
        files: Vec<PathBuf>,
    },
    /// 查看守护进程的最近日志
    Logs {
        /// 最低级别 (error, warn, info, debug, trace)
        #[arg(short, long, default_value = "info")]
        level: LogLevel,
        /// 最多显示条数
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// 列出本机 IPv4 地址
    Ips,
    /// 测试能否绑定指定地址
    Probe {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(short, long, default_value = "5000")]
        port: u16,
    },
    /// ping 一个地址
    Ping {
        ip: String,
        #[arg(short, long, default_value = "1")]
        count: u32,
    },
    /// 显示桥接服务地址的二维码，可另存为 PNG
    Qr {
        /// 编码的 URL（默认: 守护进程报告的第一个地址）
        #[arg(long)]
        url: Option<String>,
        /// 图片边长（默认: 设置中的 qr_size）
        #[arg(short, long)]
        size: Option<u32>,
        /// 输出 PNG 文件
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// 保存到设置中的二维码目录
        #[arg(long)]
        save: bool,
    },
    /// 裁剪并导出签名图片 (png/jpg/bmp/tiff 或 svg/eps/pdf/ps)
    Export {
        /// 输入图片
        input: PathBuf,
        /// 输出文件，格式由扩展名决定
        output: PathBuf,
        /// 保留完整画布，不裁剪到内容边界
        #[arg(long)]
        no_crop: bool,
        /// 合成到白底，不保留透明通道
        #[arg(long)]
        no_alpha: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 桥接 log crate（imbridge-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Commands::Status => {
            let resp = send_request(IpcRequest::Status).await?;
            if let IpcResponse::Status { running, urls } = resp {
                print_status(running, &urls);
            }
        }
        Commands::Start { host, port } => {
            println!("🚀 启动桥接服务...");
            let resp = send_request(IpcRequest::Start { host, port }).await?;
            if let IpcResponse::Status { running, urls } = resp {
                print_status(running, &urls);
            }
        }
        Commands::Stop => {
            println!("⏹️  停止桥接服务");
            send_request(IpcRequest::Stop).await?;
        }
        Commands::Metadata => {
            let resp = send_request(IpcRequest::Metadata).await?;
            if let IpcResponse::Metadata { record } = resp {
                match record {
                    Some(record) => {
                        println!("📦 类型: {:?}", record.kind);
                        for name in &record.names {
                            println!("   {}", name);
                        }
                    }
                    None => println!("   暂无上传"),
                }
            }
        }
        Commands::Pull { output } => {
            let resp = send_request(IpcRequest::Pull { dest: output }).await?;
            if let IpcResponse::Files { paths } = resp {
                if paths.is_empty() {
                    println!("   没有可复制的文件");
                }
                for path in paths {
                    println!("📥 {}", path.display());
                }
            }
        }
        Commands::Purge => {
            send_request(IpcRequest::Purge).await?;
        }
        Commands::Share { files } => {
            let files = files
                .into_iter()
                .map(|f| std::path::absolute(&f).unwrap_or(f))
                .collect();
            send_request(IpcRequest::Share { files }).await?;
        }
        Commands::Logs { level, limit } => {
            let resp = send_request(IpcRequest::Logs { level, limit }).await?;
            if let IpcResponse::Logs { entries } = resp {
                for entry in entries {
                    println!("{}", entry);
                }
            }
        }
        Commands::Ips => {
            local::list_addresses(AppSettings::load().port);
        }
        Commands::Probe { host, port } => {
            local::probe(&host, port);
        }
        Commands::Ping { ip, count } => {
            local::ping(&ip, count).await;
        }
        Commands::Qr {
            url,
            size,
            output,
            save,
        } => {
            let settings = AppSettings::load();
            let url = match url {
                Some(url) => url,
                None => match send_request(IpcRequest::Status).await? {
                    IpcResponse::Status { running: true, urls } if !urls.is_empty() => {
                        urls[0].clone()
                    }
                    _ => anyhow::bail!("桥接服务未运行，请先执行 imbridge start 或用 --url 指定地址"),
                },
            };
            let output = output.or_else(|| save.then(|| settings.qr_dir.join(qr_file_name(&url))));
            local::qr(&settings, &url, size, output.as_deref())?;
        }
        Commands::Export {
            input,
            output,
            no_crop,
            no_alpha,
        } => {
            let settings = AppSettings::load();
            local::export(&settings, &input, &output, !no_crop, !no_alpha).await?;
        }
    }

    Ok(())
}

fn print_status(running: bool, urls: &[String]) {
    if running {
        println!("状态: 运行中");
        for url in urls {
            println!("   📱 {}", url);
        }
        if let Some(url) = urls.first() {
            local::print_qr(url);
        }
    } else {
        println!("状态: 已停止");
    }
}

/// `https://192.168.1.5:5000/` -> `imbridge_192.168.1.5_5000.png`
fn qr_file_name(url: &str) -> String {
    let host = url
        .split("://")
        .last()
        .unwrap_or(url)
        .trim_end_matches('/')
        .replace([':', '/'], "_");
    format!("imbridge_{}.png", host)
}
