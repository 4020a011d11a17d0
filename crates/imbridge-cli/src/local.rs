//! 本地命令 - 不经过守护进程

use anyhow::Result;
use imbridge_core::{
    AppSettings, ExportError, PathToolRegistry, VectorExporter, crop_to_content, export_bitmap,
    is_vector_path,
};
use std::path::Path;
use std::sync::Arc;

pub fn list_addresses(port: u16) {
    println!("🌐 本机地址:");
    for ip in imbridge_core::enumerate_local_addresses() {
        println!("   {}:{}", ip, port);
    }
}

pub fn probe(host: &str, port: u16) {
    match imbridge_core::probe_bind(host, port) {
        Ok(()) => println!("✅ Local bind OK: {}:{}", host, port),
        Err(e) => eprintln!("❌ Local bind FAILED: {}", e),
    }
}

pub async fn ping(ip: &str, count: u32) {
    println!("📡 ping {} ({} 次)...", ip, count);
    let (reachable, output) = imbridge_core::ping_host(ip, count).await;
    println!("{}", output.trim_end());
    if reachable {
        println!("✅ {} 可达", ip);
    } else {
        println!("❌ {} 不可达", ip);
    }
}

/// 在终端打印二维码，失败时只给出提示
pub fn print_qr(url: &str) {
    match imbridge_core::qr_terminal(url) {
        Ok(code) => println!("{}", code),
        Err(e) => eprintln!("⚠️  无法生成二维码: {}", e),
    }
}

/// 打印二维码，并在指定时写出 PNG
pub fn qr(settings: &AppSettings, url: &str, size: Option<u32>, output: Option<&Path>) -> Result<()> {
    println!("📱 {}", url);
    print_qr(url);

    let Some(output) = output else {
        return Ok(());
    };
    let logo = match &settings.qr_logo {
        Some(path) => match image::open(path) {
            Ok(img) => Some(img.to_rgba8()),
            Err(e) => {
                eprintln!("⚠️  无法读取徽标 {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };
    imbridge_core::write_qr_png(url, size.unwrap_or(settings.qr_size), logo.as_ref(), output)?;
    println!("✅ 二维码已保存: {}", output.display());
    Ok(())
}

/// 把一张图片裁剪后导出为位图或矢量图
pub async fn export(
    settings: &AppSettings,
    input: &Path,
    output: &Path,
    crop: bool,
    keep_alpha: bool,
) -> Result<()> {
    let image = image::open(input)?.to_rgba8();

    let result: Result<(), ExportError> = async {
        // 空白图片无论是否裁剪都不导出
        let cropped = crop_to_content(&image)?;
        let image = if crop { cropped } else { image };
        if is_vector_path(output) {
            VectorExporter::new(Arc::new(PathToolRegistry::new()))
                .with_tool(settings.tracer.clone())
                .with_timeout(settings.tracer_timeout())
                .export(&image, output)
                .await
        } else {
            export_bitmap(&image, output, keep_alpha)
        }
    }
    .await;

    match result {
        Ok(()) => {
            println!("✅ 已导出: {}", output.display());
            Ok(())
        }
        Err(ExportError::NoContent) => {
            eprintln!("⚠️  图片是空白的，没有可导出的内容");
            Err(ExportError::NoContent.into())
        }
        Err(ExportError::ToolUnavailable { tool }) => {
            eprintln!("❌ 未找到矢量描摹工具 '{}'", tool);
            eprintln!("   请安装 potrace 并确保它在 PATH 中，或在设置中修改 tracer");
            Err(ExportError::ToolUnavailable { tool }.into())
        }
        Err(e @ ExportError::ToolFailed { .. }) => {
            eprintln!("❌ 矢量描摹失败: {}", e);
            eprintln!("   可以先导出为 PNG 再手动转换");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
