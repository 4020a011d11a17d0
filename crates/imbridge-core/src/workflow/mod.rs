//! 工作流模块
//!
//! 桌面端拉取手机上传内容的高层 API

pub mod fetch;

pub use fetch::{FetchError, pull_draw, pull_files};
