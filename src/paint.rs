//! 画笔模块

use crate::Color;

/// 画笔样式
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
}

/// 画笔
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub style: PaintStyle,
    pub stroke_width: f32,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            style: PaintStyle::Fill,
            stroke_width: 1.0,
        }
    }
}

impl Paint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_style(mut self, style: PaintStyle) -> Self {
        self.style = style;
        self
    }
}
