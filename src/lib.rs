//! Stride Render - 原生窗口渲染管线
//! 应用描述 → 离屏 Surface → 原生窗口（类注册、窗口外观、消息循环、GDI blit）

mod color;
mod geometry;
mod paint;
pub mod text;

pub use color::Color;
pub use geometry::{Point, Rect};
pub use paint::{Paint, PaintStyle};
pub use text::TextRenderer;

// 应用描述与构建器
pub mod builder;
pub mod model;

// 配置与错误
pub mod config;
pub mod error;
pub mod logging;

// 离屏绘制
pub mod scene;
pub mod surface;

pub use surface::Surface;

// 原生窗口
pub mod chrome;
pub mod platform;
pub mod present;
pub mod session;

mod render;
pub use render::{render, render_offscreen, render_with};
pub use session::{SessionReport, SessionState};

// 单元测试
#[cfg(test)]
mod tests;
