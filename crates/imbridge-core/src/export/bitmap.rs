use log::{info, warn};

use crate::export::{ExportError, extension_of};
use image::{ImageFormat, Rgb, RgbImage, RgbaImage};
use std::path::Path;

/// 按目标扩展名写出位图
///
/// `keep_alpha` 为假（或格式不支持透明，如 JPEG）时先把图像合成到白底上。
pub fn export_bitmap(image: &RgbaImage, path: &Path, keep_alpha: bool) -> Result<(), ExportError> {
    let format = bitmap_format(path)?;

    if keep_alpha && supports_alpha(format) {
        image.save_with_format(path, format)?;
    } else {
        if keep_alpha {
            warn!("{:?} has no alpha channel, flattening onto white", format);
        }
        flatten_on_white(image).save_with_format(path, format)?;
    }

    info!("Drawing {} saved to {}", extension_of(path).to_uppercase(), path.display());
    Ok(())
}

fn bitmap_format(path: &Path) -> Result<ImageFormat, ExportError> {
    match ImageFormat::from_path(path) {
        Ok(f @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Tiff)) => {
            Ok(f)
        }
        _ => Err(ExportError::UnsupportedFormat(extension_of(path))),
    }
}

fn supports_alpha(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tiff)
}

/// 按 alpha 把像素合成到白色背景上
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    let (w, h) = image.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 0]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        img
    }

    #[test]
    fn test_flatten_on_white() {
        let flat = flatten_on_white(&sample());
        assert_eq!(*flat.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*flat.get_pixel(1, 1), Rgb([0, 0, 0]));

        let half = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let px = flatten_on_white(&half).get_pixel(0, 0).0[0];
        assert!((126..=128).contains(&px), "got {}", px);
    }

    #[test]
    fn test_png_keeps_alpha() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sig.png");
        export_bitmap(&sample(), &path, true).unwrap();

        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.get_pixel(0, 0).0[3], 0);
        assert_eq!(back.get_pixel(1, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_png_without_alpha_is_opaque_white() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sig.png");
        export_bitmap(&sample(), &path, false).unwrap();

        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_jpeg_is_always_flattened() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sig.jpg");
        export_bitmap(&sample(), &path, true).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unknown_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sig.xyz");
        assert!(matches!(
            export_bitmap(&sample(), &path, true),
            Err(ExportError::UnsupportedFormat(ext)) if ext == "xyz"
        ));
        assert!(!path.exists());
    }
}
