//! 签名采集
//!
//! 指针事件驱动的画布状态机，笔迹用三点中点平滑后栅格化到 RGBA 位图上。
//! 背景是透明白色，导出时按 alpha 裁剪。

pub mod canvas;
pub mod raster;

pub use canvas::{
    BACKGROUND, CaptureState, CloseDecision, PointerEvent, Segment, SignatureCanvas,
};
pub use raster::{Pen, draw_segment};
