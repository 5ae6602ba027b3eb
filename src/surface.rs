//! Surface 离屏画布 - 窗口内容先绘制到这里，再 blit 到窗口
//!
//! 像素格式：BGRA8，预乘 alpha，自上而下，行宽 `width * 4`。

use crate::error::AllocationError;
use crate::scene::{Primitive, Scene};
use crate::text::TextRenderer;
use crate::{Color, Paint, PaintStyle, Rect};
use std::path::Path;
use std::sync::Arc;

const BYTES_PER_PIXEL: usize = 4;

/// 离屏画布
#[derive(Default)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    clip_rect: Option<Rect>,
    background: Color,
    scene: Scene,
    text: Option<Arc<TextRenderer>>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("background", &self.background)
            .field("primitives", &self.scene.len())
            .field("has_text_renderer", &self.text.is_some())
            .finish()
    }
}

impl Surface {
    /// 未分配的空画布 (0x0)
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配 `width * height * 4` 字节的像素缓冲，初始化为不透明黑色
    pub fn allocate(&mut self, width: i32, height: i32) -> Result<(), AllocationError> {
        if width <= 0 || height <= 0 {
            return Err(AllocationError::InvalidSize { width, height });
        }

        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or(AllocationError::OutOfMemory { bytes: usize::MAX })?;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(bytes)
            .map_err(|_| AllocationError::OutOfMemory { bytes })?;
        pixels.resize(bytes, 0);
        for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px[3] = 255;
        }

        self.pixels = pixels;
        self.width = width as u32;
        self.height = height as u32;
        self.clip_rect = None;
        Ok(())
    }

    /// 释放像素缓冲，尺寸归零
    pub fn release(&mut self) {
        self.pixels = Vec::new();
        self.width = 0;
        self.height = 0;
        self.clip_rect = None;
    }

    pub fn is_allocated(&self) -> bool {
        !self.pixels.is_empty()
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn set_scene(&mut self, scene: Scene) {
        self.scene = scene;
    }

    pub fn set_text_renderer(&mut self, text: Option<Arc<TextRenderer>>) {
        self.text = text;
    }

    /// 重绘整个缓冲：清屏为背景色，再按顺序绘制场景中的图元。
    /// 只修改自身缓冲，多次调用结果相同。
    pub fn render(&mut self) {
        if self.pixels.is_empty() {
            return;
        }

        self.clear(self.background);
        self.clip_rect = None;

        let scene = std::mem::take(&mut self.scene);
        for primitive in scene.primitives() {
            self.draw_primitive(primitive);
        }
        self.scene = scene;
        self.clip_rect = None;
    }

    fn draw_primitive(&mut self, primitive: &Primitive) {
        match primitive {
            Primitive::Rect { rect, paint } => self.draw_rect(rect, paint),
            Primitive::Text { origin, content, size, color } => {
                if let Some(text) = self.text.clone() {
                    text.draw_text(self, content, origin.x, origin.y, *size, *color);
                }
            }
            Primitive::Clip(rect) => self.clip_rect = *rect,
        }
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    /// 每行字节数
    pub fn row_stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// 像素内存（只读，供 blit 使用）
    pub fn pixel_memory(&self) -> &[u8] {
        &self.pixels
    }

    /// 清空画布
    pub fn clear(&mut self, color: Color) {
        let bgra = color.to_bgra_premultiplied();
        for px in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&bgra);
        }
    }

    /// 获取像素（预乘 BGRA）
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x < self.width && y < self.height {
            let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
            [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2], self.pixels[idx + 3]]
        } else {
            [0; 4]
        }
    }

    /// 设置像素（带 alpha 混合）
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }

        // 检查裁剪区域
        if let Some(clip) = &self.clip_rect {
            if x < clip.x as i32 || x >= clip.right() as i32 ||
               y < clip.y as i32 || y >= clip.bottom() as i32 {
                return;
            }
        }

        if color.a == 0 {
            return;
        }

        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let dst = [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2], self.pixels[idx + 3]];
        let out = Color::blend_premultiplied(color.to_bgra_premultiplied(), dst);
        self.pixels[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&out);
    }

    /// 设置像素（带抗锯齿 coverage）
    pub fn set_pixel_aa(&mut self, x: i32, y: i32, color: Color, coverage: f32) {
        if coverage <= 0.0 { return; }
        let a = (color.a as f32 * coverage.min(1.0)) as u8;
        self.set_pixel(x, y, color.with_alpha(a));
    }

    /// 绘制矩形
    pub fn draw_rect(&mut self, rect: &Rect, paint: &Paint) {
        match paint.style {
            PaintStyle::Fill => self.fill_rect(rect, paint.color),
            PaintStyle::Stroke => self.stroke_rect(rect, paint),
        }
    }

    fn fill_rect(&mut self, rect: &Rect, color: Color) {
        let x0 = rect.x.max(0.0) as i32;
        let y0 = rect.y.max(0.0) as i32;
        let x1 = rect.right().min(self.width as f32) as i32;
        let y1 = rect.bottom().min(self.height as f32) as i32;

        for y in y0..y1 {
            for x in x0..x1 {
                self.set_pixel(x, y, color);
            }
        }
    }

    fn stroke_rect(&mut self, rect: &Rect, paint: &Paint) {
        let w = paint.stroke_width;
        // 上边
        self.fill_rect(&Rect::new(rect.x, rect.y, rect.width, w), paint.color);
        // 下边
        self.fill_rect(&Rect::new(rect.x, rect.bottom() - w, rect.width, w), paint.color);
        // 左边
        self.fill_rect(&Rect::new(rect.x, rect.y + w, w, rect.height - 2.0 * w), paint.color);
        // 右边
        self.fill_rect(&Rect::new(rect.right() - w, rect.y + w, w, rect.height - 2.0 * w), paint.color);
    }

    /// 保存为 PNG
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        save_bgra_png(path, self.width, self.height, &self.pixels)
    }
}

/// 把预乘 BGRA 缓冲写成 PNG
pub fn save_bgra_png(
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
    bgra: &[u8],
) -> Result<(), image::ImageError> {
    use image::{ImageBuffer, Rgba};
    use image::error::{ParameterError, ParameterErrorKind};

    let rgba = crate::color::bgra_premultiplied_to_rgba(bgra);
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, rgba)
        .ok_or_else(|| {
            image::ImageError::Parameter(ParameterError::from_kind(
                ParameterErrorKind::DimensionMismatch,
            ))
        })?;

    img.save(path)
}
