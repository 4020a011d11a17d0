//! 二维码
//!
//! 把桥接服务的访问 URL 编码成二维码，手机扫码即可打开上传页面。
//! 使用最高纠错级别，中间可以嵌入徽标而不影响识别。

use log::info;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Luma, RgbImage, RgbaImage};
use qrcode::render::unicode::Dense1x2;
use qrcode::{EcLevel, QrCode};
use std::path::Path;

pub const DEFAULT_QR_SIZE: u32 = 600;

/// 徽标边长与二维码边长之比的上限
pub const MAX_LOGO_RATIO: f32 = 0.4;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("Failed to encode QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

fn encode(url: &str) -> Result<QrCode, QrError> {
    Ok(QrCode::with_error_correction_level(url.as_bytes(), EcLevel::H)?)
}

/// 生成 `size` x `size` 的二维码图片，可选在中心嵌入徽标
pub fn qr_image(url: &str, size: u32, logo: Option<&RgbaImage>) -> Result<RgbImage, QrError> {
    let size = size.max(1);
    let modules = encode(url)?
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .build();
    let modules = if modules.dimensions() == (size, size) {
        modules
    } else {
        imageops::resize(&modules, size, size, FilterType::Nearest)
    };

    let mut canvas = DynamicImage::ImageLuma8(modules).to_rgba8();
    if let Some(logo) = logo {
        embed_logo(&mut canvas, logo);
    }
    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

fn embed_logo(canvas: &mut RgbaImage, logo: &RgbaImage) {
    let (width, height) = canvas.dimensions();
    let (logo_w, logo_h) = logo.dimensions();
    if logo_w == 0 || logo_h == 0 {
        return;
    }

    let scale = (width as f32 * MAX_LOGO_RATIO / logo_w as f32)
        .min(height as f32 * MAX_LOGO_RATIO / logo_h as f32);
    let new_w = ((logo_w as f32 * scale) as u32).max(1);
    let new_h = ((logo_h as f32 * scale) as u32).max(1);
    let resized = imageops::resize(logo, new_w, new_h, FilterType::Lanczos3);

    let x = i64::from(width.saturating_sub(new_w) / 2);
    let y = i64::from(height.saturating_sub(new_h) / 2);
    imageops::overlay(canvas, &resized, x, y);
}

/// 写出 PNG 二维码
pub fn write_qr_png(
    url: &str,
    size: u32,
    logo: Option<&RgbaImage>,
    path: &Path,
) -> Result<(), QrError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
    }
    qr_image(url, size, logo)?.save_with_format(path, ImageFormat::Png)?;
    info!("QR code for {} written to {}", url, path.display());
    Ok(())
}

/// 终端显示用的二维码（每个字符两行模块，深色背景下可扫）
pub fn qr_terminal(url: &str) -> Result<String, QrError> {
    Ok(encode(url)?
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const URL: &str = "https://192.168.1.20:5000/";

    #[test]
    fn test_image_has_requested_size() {
        for size in [DEFAULT_QR_SIZE, 257, 64] {
            let img = qr_image(URL, size, None).unwrap();
            assert_eq!(img.dimensions(), (size, size));
        }
    }

    #[test]
    fn test_quiet_zone_is_white() {
        let img = qr_image(URL, 300, None).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(299, 299).0, [255, 255, 255]);
        assert!(img.pixels().any(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_logo_sits_in_the_center() {
        let logo = RgbaImage::from_pixel(10, 20, Rgba([255, 0, 0, 255]));
        let img = qr_image(URL, 400, Some(&logo)).unwrap();
        assert_eq!(img.get_pixel(200, 200).0, [255, 0, 0]);
        // 高度受比例上限约束：160 像素
        assert_ne!(img.get_pixel(200, 110).0, [255, 0, 0]);
    }

    #[test]
    fn test_write_png() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("qr").join("server.png");
        write_qr_png(URL, 320, None, &path).unwrap();

        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (320, 320));
    }

    #[test]
    fn test_terminal_rendering() {
        let text = qr_terminal(URL).unwrap();
        assert!(text.lines().count() > 10);
        assert!(text.chars().any(|c| matches!(c, '█' | '▀' | '▄')));
    }
}
