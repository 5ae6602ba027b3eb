//! 文本渲染模块 - 用系统字体把静态文本光栅化到 Surface

use crate::{Color, Surface};
use fontdue::{Font, FontSettings, Metrics};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// 候选系统字体，按顺序尝试
const SYSTEM_FONT_PATHS: &[&str] = &[
    "C:\\Windows\\Fonts\\segoeui.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\tahoma.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
];

static SHARED: Lazy<Option<Arc<TextRenderer>>> = Lazy::new(|| match TextRenderer::load_system_font() {
    Ok(renderer) => Some(Arc::new(renderer)),
    Err(err) => {
        warn!("no system font available, text components will not be drawn: {}", err);
        None
    }
});

/// 文本渲染器
pub struct TextRenderer {
    font: Font,
    /// 字形缓存 (char, size*10) -> (Metrics, Bitmap)
    cache: Mutex<HashMap<(char, u32), (Metrics, Vec<u8>)>>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer").finish_non_exhaustive()
    }
}

impl TextRenderer {
    /// 从字体数据创建
    pub fn from_bytes(font_data: &[u8]) -> Result<Self, String> {
        let settings = FontSettings {
            scale: 40.0,
            ..Default::default()
        };
        let font = Font::from_bytes(font_data, settings)?;
        Ok(Self {
            font,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// 从文件路径加载字体
    pub fn from_file(path: &str) -> Result<Self, String> {
        let font_data = std::fs::read(path)
            .map_err(|e| format!("Failed to read font file: {}", e))?;
        Self::from_bytes(&font_data)
    }

    /// 加载第一个可用的系统字体
    pub fn load_system_font() -> Result<Self, String> {
        for path in SYSTEM_FONT_PATHS {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(renderer) => {
                    debug!("loaded font {}", path);
                    return Ok(renderer);
                }
                Err(err) => debug!("skipping font {}: {}", path, err),
            }
        }
        Err("No system font found".to_string())
    }

    /// 进程内共享的系统字体渲染器，只加载一次
    pub fn shared() -> Option<Arc<TextRenderer>> {
        SHARED.clone()
    }

    fn glyph(&self, ch: char, size: f32) -> (Metrics, Vec<u8>) {
        let key = (ch, (size * 10.0) as u32);
        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }

        // 光栅化不在锁内做
        let (metrics, bitmap) = self.font.rasterize(ch, size);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, (metrics, bitmap.clone()));
        }
        (metrics, bitmap)
    }

    /// 渲染文本到 Surface，`(x, y)` 为基线起点
    pub fn draw_text(&self, surface: &mut Surface, text: &str, x: f32, y: f32, size: f32, color: Color) {
        let mut cursor_x = x;

        for ch in text.chars() {
            let (metrics, bitmap) = self.glyph(ch, size);

            if metrics.width == 0 || metrics.height == 0 {
                cursor_x += metrics.advance_width;
                continue;
            }

            let glyph_x = cursor_x + metrics.xmin as f32;
            let glyph_y = y - metrics.height as f32 - metrics.ymin as f32;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx] as f32 / 255.0;
                    if coverage > 0.001 {
                        let px = (glyph_x + gx as f32).round() as i32;
                        let py = (glyph_y + gy as f32).round() as i32;
                        surface.set_pixel_aa(px, py, color, coverage);
                    }
                }
            }

            cursor_x += metrics.advance_width;
        }
    }
}
