use crate::export::ExportError;
use image::RgbaImage;
use image::imageops;

/// 裁剪到非透明像素的包围盒
///
/// 全透明时返回 [`ExportError::NoContent`]。
pub fn crop_to_content(image: &RgbaImage) -> Result<RgbaImage, ExportError> {
    let (x0, y0, x1, y1) = content_bounds(image).ok_or(ExportError::NoContent)?;
    Ok(imageops::crop_imm(image, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image())
}

/// alpha 不为 0 的像素包围盒，闭区间 `(x0, y0, x1, y1)`
pub fn content_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_fully_transparent_has_no_content() {
        let img = RgbaImage::from_pixel(40, 30, Rgba([255, 255, 255, 0]));
        assert!(matches!(crop_to_content(&img), Err(ExportError::NoContent)));
    }

    #[test]
    fn test_single_pixel() {
        let mut img = RgbaImage::new(40, 30);
        img.put_pixel(10, 10, Rgba([0, 0, 0, 255]));

        assert_eq!(content_bounds(&img), Some((10, 10, 10, 10)));
        let cropped = crop_to_content(&img).unwrap();
        assert_eq!(cropped.dimensions(), (1, 1));
        assert_eq!(*cropped.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_bounds_span_all_content() {
        let mut img = RgbaImage::new(100, 100);
        img.put_pixel(5, 60, Rgba([0, 0, 0, 255]));
        img.put_pixel(70, 8, Rgba([0, 0, 0, 10]));

        let cropped = crop_to_content(&img).unwrap();
        assert_eq!(cropped.dimensions(), (66, 53));
        assert_eq!(cropped.get_pixel(0, 52).0[3], 255);
        assert_eq!(cropped.get_pixel(65, 0).0[3], 10);
    }
}
