//! 颜色模块

/// RGBA 颜色（非预乘）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
            a: 255,
        }
    }

    /// 解析 `#RRGGBB` / `#RRGGBBAA` 形式的颜色字符串
    pub fn parse_hex(value: &str) -> Option<Self> {
        let digits = value.trim().trim_start_matches('#');
        let raw = u32::from_str_radix(digits, 16).ok()?;
        match digits.len() {
            6 => Some(Self::from_hex(raw)),
            8 => Some(Self::new(
                (raw >> 24) as u8,
                (raw >> 16) as u8,
                (raw >> 8) as u8,
                raw as u8,
            )),
            _ => None,
        }
    }

    /// 同一颜色，替换 alpha
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// 转换为预乘 alpha 的 BGRA 字节（Surface 的像素格式）
    #[inline]
    pub fn to_bgra_premultiplied(&self) -> [u8; 4] {
        let a = self.a as u32;
        [
            ((self.b as u32 * a + 127) / 255) as u8,
            ((self.g as u32 * a + 127) / 255) as u8,
            ((self.r as u32 * a + 127) / 255) as u8,
            self.a,
        ]
    }

    /// 预乘 alpha 源覆盖到预乘 alpha 目标上 (src over dst，整数运算)
    #[inline]
    pub fn blend_premultiplied(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
        let sa = src[3] as u32;
        if sa == 255 {
            return src;
        }
        if sa == 0 {
            return dst;
        }
        let inv = 255 - sa;
        let mix = |s: u8, d: u8| -> u8 { (s as u32 + (d as u32 * inv + 127) / 255).min(255) as u8 };
        [
            mix(src[0], dst[0]),
            mix(src[1], dst[1]),
            mix(src[2], dst[2]),
            mix(src[3], dst[3]),
        ]
    }

    // 预定义颜色
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// 预乘 BGRA 像素转为非预乘 RGBA（导出 PNG 用）
pub fn bgra_premultiplied_to_rgba(bgra: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(bgra.len());
    for px in bgra.chunks_exact(4) {
        let a = px[3] as u32;
        let unpremultiply = |c: u8| -> u8 {
            if a == 0 {
                0
            } else {
                ((c as u32 * 255 + a / 2) / a).min(255) as u8
            }
        };
        data.push(unpremultiply(px[2]));
        data.push(unpremultiply(px[1]));
        data.push(unpremultiply(px[0]));
        data.push(px[3]);
    }
    data
}
