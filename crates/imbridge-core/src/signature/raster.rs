//! 笔画光栅化
//!
//! 沿线段以半像素步长盖圆形笔刷，得到圆头的粗线。

use image::{Rgba, RgbaImage};

/// 画笔
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen {
    pub width: f32,
    pub color: Rgba<u8>,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            width: 2.0,
            color: Rgba([0, 0, 0, 255]),
        }
    }
}

/// 在 `image` 上画一条线段，返回是否至少有一个像素落在画布内
///
/// 线段先裁剪到画布（向外扩展一个笔刷半径），步数因此不超过画布对角线长度。
/// 含非有限坐标的线段不绘制。
pub fn draw_segment(image: &mut RgbaImage, from: (f32, f32), to: (f32, f32), pen: &Pen) -> bool {
    let radius = (pen.width / 2.0).max(0.5);
    let (w, h) = image.dimensions();
    let bounds = (-radius, -radius, w as f32 + radius, h as f32 + radius);
    let Some((from, to)) = clip_segment(from, to, bounds) else {
        return false;
    };

    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = dx.hypot(dy);
    let steps = (length * 2.0).ceil().max(1.0) as u32;

    let mut painted = false;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        painted |= stamp(image, (from.0 + dx * t, from.1 + dy * t), pen);
    }
    painted
}

/// Liang-Barsky 裁剪，`bounds` 为 (x_min, y_min, x_max, y_max)
fn clip_segment(
    from: (f32, f32),
    to: (f32, f32),
    bounds: (f32, f32, f32, f32),
) -> Option<((f32, f32), (f32, f32))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    if !(from.0.is_finite() && from.1.is_finite() && dx.is_finite() && dy.is_finite()) {
        return None;
    }

    let (x_min, y_min, x_max, y_max) = bounds;
    let (mut t0, mut t1) = (0.0_f32, 1.0_f32);
    for (p, q) in [
        (-dx, from.0 - x_min),
        (dx, x_max - from.0),
        (-dy, from.1 - y_min),
        (dy, y_max - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some((
        (from.0 + dx * t0, from.1 + dy * t0),
        (from.0 + dx * t1, from.1 + dy * t1),
    ))
}

/// 以像素中心到圆心的距离判断覆盖
fn stamp(image: &mut RgbaImage, center: (f32, f32), pen: &Pen) -> bool {
    let radius = (pen.width / 2.0).max(0.5);
    let (w, h) = image.dimensions();

    let x0 = (center.0 - radius).floor().max(0.0) as i64;
    let y0 = (center.1 - radius).floor().max(0.0) as i64;
    let x1 = ((center.0 + radius).ceil() as i64).min(i64::from(w) - 1);
    let y1 = ((center.1 + radius).ceil() as i64).min(i64::from(h) - 1);

    let mut painted = false;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let px = x as f32 + 0.5 - center.0;
            let py = y as f32 + 0.5 - center.1;
            if px * px + py * py <= radius * radius {
                image.put_pixel(x as u32, y as u32, pen.color);
                painted = true;
            }
        }
    }
    painted
}
