//! 签名画布
//!
//! 记录指针输入并光栅化到带透明通道的 RGBA 缓冲区。
//!
//! # 状态
//!
//! ```text
//! Idle --down--> Drawing --move--> Drawing
//!   ^               |
//!   +----up/leave---+
//! 任意状态 --clear--> Idle
//! 有未保存内容时关闭 --> Exiting --确认/取消--> 关闭/Idle
//! ```

use log::debug;

use crate::export::{ExportError, crop_to_content};
use crate::signature::raster::{Pen, draw_segment};
use crate::transfer::CanvasSize;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// 透明背景
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// 画布状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// 指针未按下
    Idle,
    /// 指针按下，正在记录笔画
    Drawing,
    /// 等待用户确认放弃未保存内容
    Exiting,
}

/// 指针事件（画布坐标）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    Leave,
}

/// 已绘制的平滑线段，供界面同步显示
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: (f32, f32),
    pub to: (f32, f32),
}

/// 关闭请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// 没有未保存内容，可以直接关闭
    Close,
    /// 需要用户确认，画布已进入 `Exiting`
    Confirm,
}

/// 签名画布
pub struct SignatureCanvas {
    image: RgbaImage,
    state: CaptureState,
    stroke: Vec<(f32, f32)>,
    dirty: bool,
    pen: Pen,
}

impl SignatureCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), BACKGROUND),
            state: CaptureState::Idle,
            stroke: Vec::new(),
            dirty: false,
            pen: Pen::default(),
        }
    }

    pub fn with_size(size: CanvasSize) -> Self {
        Self::new(size.width, size.height)
    }

    pub fn with_pen(mut self, pen: Pen) -> Self {
        self.pen = pen;
        self
    }

    pub fn size(&self) -> CanvasSize {
        let (width, height) = self.image.dimensions();
        CanvasSize { width, height }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// 是否有未保存的内容
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 当前光栅缓冲区
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// 处理一个指针事件，绘制了线段时返回该线段
    pub fn handle(&mut self, event: PointerEvent) -> Option<Segment> {
        match (self.state, event) {
            (CaptureState::Exiting, _) => None,
            (_, PointerEvent::Down { x, y }) => {
                self.state = CaptureState::Drawing;
                self.stroke.clear();
                self.stroke.push((x, y));
                None
            }
            (CaptureState::Drawing, PointerEvent::Move { x, y }) => {
                self.stroke.push((x, y));
                self.paint_latest()
            }
            (CaptureState::Idle, PointerEvent::Move { .. }) => None,
            (_, PointerEvent::Up | PointerEvent::Leave) => {
                self.end_stroke();
                None
            }
        }
    }

    /// 取最后三个点，在两段中点之间画一段
    fn paint_latest(&mut self) -> Option<Segment> {
        let [p1, p2, p3] = match self.stroke.as_slice() {
            [.., a, b, c] => [*a, *b, *c],
            _ => return None,
        };
        let from = midpoint(p1, p2);
        let to = midpoint(p2, p3);

        if draw_segment(&mut self.image, from, to, &self.pen) {
            self.dirty = true;
            Some(Segment { from, to })
        } else {
            None
        }
    }

    fn end_stroke(&mut self) {
        self.stroke.clear();
        if self.state == CaptureState::Drawing {
            self.state = CaptureState::Idle;
        }
    }

    /// 清空画布，回到 `Idle`
    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = BACKGROUND;
        }
        self.stroke.clear();
        self.state = CaptureState::Idle;
        self.dirty = false;
        debug!("Canvas cleared");
    }

    /// 把一张图片投射到画布上（缩放到画布尺寸）
    pub fn load_image(&mut self, image: &RgbaImage) {
        let (width, height) = self.image.dimensions();
        let resized = if image.dimensions() == (width, height) {
            image.clone()
        } else {
            imageops::resize(image, width, height, FilterType::Triangle)
        };
        self.clear();
        self.image = resized;
        self.dirty = true;
    }

    /// 导出用的快照
    ///
    /// 画布为空时返回 [`ExportError::NoContent`]。`cropped` 为真时裁剪到内容边界。
    pub fn snapshot(&self, cropped: bool) -> Result<RgbaImage, ExportError> {
        let content = crop_to_content(&self.image)?;
        if cropped {
            Ok(content)
        } else {
            Ok(self.image.clone())
        }
    }

    /// 导出成功后调用
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// 请求关闭
    pub fn begin_close(&mut self) -> CloseDecision {
        if !self.dirty {
            return CloseDecision::Close;
        }
        self.end_stroke();
        self.state = CaptureState::Exiting;
        CloseDecision::Confirm
    }

    /// 用户对放弃内容的回答，返回是否关闭
    pub fn confirm_close(&mut self, discard: bool) -> bool {
        if self.state != CaptureState::Exiting {
            return !self.dirty || discard;
        }
        self.state = CaptureState::Idle;
        discard
    }

    /// 同步版本的关闭流程，`ask` 仅在有未保存内容时调用
    pub fn request_close(&mut self, ask: impl FnOnce() -> bool) -> bool {
        match self.begin_close() {
            CloseDecision::Close => true,
            CloseDecision::Confirm => {
                let discard = ask();
                self.confirm_close(discard)
            }
        }
    }
}

fn midpoint(a: (f32, f32), b: (f32, f32)) -> (f32, f32) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(canvas: &mut SignatureCanvas, points: &[(f32, f32)]) -> Vec<Segment> {
        let (x, y) = points[0];
        canvas.handle(PointerEvent::Down { x, y });
        let segments = points[1..]
            .iter()
            .filter_map(|&(x, y)| canvas.handle(PointerEvent::Move { x, y }))
            .collect();
        canvas.handle(PointerEvent::Up);
        segments
    }

    #[test]
    fn test_new_canvas_is_transparent_and_clean() {
        let canvas = SignatureCanvas::with_size(CanvasSize::default());
        assert_eq!(canvas.image().dimensions(), (560, 300));
        assert!(canvas.image().pixels().all(|p| *p == BACKGROUND));
        assert!(!canvas.is_dirty());
        assert_eq!(canvas.state(), CaptureState::Idle);
    }

    #[test]
    fn test_segments_need_three_points() {
        let mut canvas = SignatureCanvas::new(100, 100);
        canvas.handle(PointerEvent::Down { x: 10.0, y: 10.0 });
        assert_eq!(canvas.state(), CaptureState::Drawing);
        assert!(canvas.handle(PointerEvent::Move { x: 20.0, y: 10.0 }).is_none());
        assert!(!canvas.is_dirty());

        let seg = canvas
            .handle(PointerEvent::Move { x: 30.0, y: 20.0 })
            .unwrap();
        assert_eq!(seg.from, (15.0, 10.0));
        assert_eq!(seg.to, (25.0, 15.0));
        assert!(canvas.is_dirty());
    }

    #[test]
    fn test_move_without_press_does_nothing() {
        let mut canvas = SignatureCanvas::new(100, 100);
        assert!(canvas.handle(PointerEvent::Move { x: 1.0, y: 1.0 }).is_none());
        assert!(canvas.handle(PointerEvent::Move { x: 50.0, y: 50.0 }).is_none());
        assert!(canvas.handle(PointerEvent::Move { x: 90.0, y: 9.0 }).is_none());
        assert!(!canvas.is_dirty());
    }

    #[test]
    fn test_infinite_move_is_ignored() {
        let mut canvas = SignatureCanvas::new(100, 100);
        canvas.handle(PointerEvent::Down { x: 50.0, y: 50.0 });
        canvas.handle(PointerEvent::Move { x: 60.0, y: 50.0 });

        let started = std::time::Instant::now();
        assert!(canvas.handle(PointerEvent::Move { x: f32::INFINITY, y: 50.0 }).is_none());
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert!(!canvas.is_dirty());
        assert!(canvas.image().pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn test_leave_ends_stroke() {
        let mut canvas = SignatureCanvas::new(100, 100);
        canvas.handle(PointerEvent::Down { x: 10.0, y: 10.0 });
        canvas.handle(PointerEvent::Move { x: 20.0, y: 10.0 });
        canvas.handle(PointerEvent::Leave);
        assert_eq!(canvas.state(), CaptureState::Idle);

        // 新笔画不会连接上一笔的点
        canvas.handle(PointerEvent::Down { x: 80.0, y: 80.0 });
        assert!(canvas.handle(PointerEvent::Move { x: 81.0, y: 80.0 }).is_none());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut canvas = SignatureCanvas::new(100, 100);
        let segments = stroke(&mut canvas, &[(10.0, 10.0), (20.0, 20.0), (30.0, 25.0), (40.0, 40.0)]);
        assert_eq!(segments.len(), 2);
        assert!(canvas.is_dirty());

        canvas.handle(PointerEvent::Down { x: 5.0, y: 5.0 });
        canvas.clear();
        assert_eq!(canvas.state(), CaptureState::Idle);
        assert!(!canvas.is_dirty());
        assert!(canvas.image().pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn test_snapshot() {
        let mut canvas = SignatureCanvas::new(100, 100);
        assert!(matches!(canvas.snapshot(true), Err(ExportError::NoContent)));

        stroke(&mut canvas, &[(10.0, 50.0), (30.0, 50.0), (50.0, 50.0), (70.0, 50.0)]);
        let full = canvas.snapshot(false).unwrap();
        assert_eq!(full.dimensions(), (100, 100));

        let cropped = canvas.snapshot(true).unwrap();
        let (w, h) = cropped.dimensions();
        assert!(w < 100 && h <= 3, "cropped to {}x{}", w, h);
    }

    #[test]
    fn test_close_without_changes() {
        let mut canvas = SignatureCanvas::new(50, 50);
        let mut asked = false;
        assert!(canvas.request_close(|| {
            asked = true;
            false
        }));
        assert!(!asked);
    }

    #[test]
    fn test_close_with_unsaved_content_asks() {
        let mut canvas = SignatureCanvas::new(100, 100);
        stroke(&mut canvas, &[(10.0, 10.0), (20.0, 20.0), (30.0, 30.0)]);

        assert_eq!(canvas.begin_close(), CloseDecision::Confirm);
        assert_eq!(canvas.state(), CaptureState::Exiting);
        // 确认对话框期间忽略输入
        assert!(canvas.handle(PointerEvent::Down { x: 1.0, y: 1.0 }).is_none());
        assert_eq!(canvas.state(), CaptureState::Exiting);

        assert!(!canvas.confirm_close(false));
        assert_eq!(canvas.state(), CaptureState::Idle);
        assert!(canvas.is_dirty());

        assert!(canvas.request_close(|| true));
    }

    #[test]
    fn test_mark_saved_allows_silent_close() {
        let mut canvas = SignatureCanvas::new(100, 100);
        stroke(&mut canvas, &[(10.0, 10.0), (20.0, 20.0), (30.0, 30.0)]);
        canvas.mark_saved();
        assert_eq!(canvas.begin_close(), CloseDecision::Close);
    }

    #[test]
    fn test_load_image_resizes() {
        let mut canvas = SignatureCanvas::new(100, 50);
        let source = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255]));
        canvas.load_image(&source);
        assert_eq!(canvas.image().dimensions(), (100, 50));
        assert!(canvas.is_dirty());
        assert_eq!(canvas.image().get_pixel(50, 25).0[3], 255);
    }
}
