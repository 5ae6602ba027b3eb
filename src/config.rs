//! 渲染配置快照

use crate::builder::{DEFAULT_APPLICATION_NAME, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};
use crate::error::ConfigurationError;
use crate::model::{Application, Backdrop};
use crate::Color;
use tracing::info;

/// 渲染开始时从应用描述中捕获一次，之后不再读取原始描述
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub app_name: String,
    pub width: i32,
    pub height: i32,
    pub dark_mode: bool,
    pub blur: bool,
    pub title_bar: bool,
    pub transparent: bool,
    pub backdrop: Backdrop,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APPLICATION_NAME.to_string(),
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            dark_mode: false,
            blur: false,
            title_bar: false,
            transparent: false,
            backdrop: Backdrop::default(),
        }
    }
}

impl RenderConfig {
    /// 捕获配置；没有窗口时返回 `MissingWindow`
    pub fn capture(application: &Application) -> Result<Self, ConfigurationError> {
        let window = application
            .window
            .as_ref()
            .ok_or(ConfigurationError::MissingWindow)?;

        let config = Self {
            app_name: application
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string()),
            width: window.width.unwrap_or(DEFAULT_WINDOW_WIDTH),
            height: window.height.unwrap_or(DEFAULT_WINDOW_HEIGHT),
            dark_mode: application.dark_mode.unwrap_or(false),
            blur: window.blur.unwrap_or(false),
            title_bar: window.title_bar.unwrap_or(false),
            transparent: window.transparent.unwrap_or(false),
            backdrop: window.backdrop.unwrap_or_default(),
        };

        info!(
            app = %config.app_name,
            width = config.width,
            height = config.height,
            transparent = config.transparent,
            dark_mode = config.dark_mode,
            title_bar = config.title_bar,
            blur = config.blur,
            "captured render config"
        );
        Ok(config)
    }

    /// 窗口类背景画刷
    pub fn background_brush(&self) -> crate::platform::StockBrush {
        use crate::platform::StockBrush;
        if self.transparent {
            StockBrush::Null
        } else if self.dark_mode {
            StockBrush::DarkGray
        } else {
            StockBrush::LightGray
        }
    }

    /// Surface 清屏色调
    pub fn background_tone(&self) -> Color {
        if self.transparent {
            Color::new(0x00, 0x00, 0x00, 0x20)
        } else if self.dark_mode {
            Color::rgb(0x20, 0x20, 0x20)
        } else {
            Color::rgb(0xF3, 0xF3, 0xF3)
        }
    }

    /// 组件默认前景色
    pub fn foreground(&self) -> Color {
        if self.dark_mode {
            Color::rgb(0xF0, 0xF0, 0xF0)
        } else {
            Color::rgb(0x1A, 0x1A, 0x1A)
        }
    }
}
