//! 单元测试模块
//! 覆盖 Surface 绘制、场景布局、配置、窗口会话、窗口外观与渲染入口

pub mod scene_tests;
pub mod session_tests;
pub mod surface_tests;

use crate::builder::ApplicationBuilder;
use crate::config::RenderConfig;
use crate::model::Application;

/// 测试用配置：无标题栏、透明、模糊、深色
pub(crate) fn full_chrome_config() -> RenderConfig {
    RenderConfig {
        app_name: "Test".to_string(),
        width: 800,
        height: 600,
        dark_mode: true,
        blur: true,
        title_bar: false,
        transparent: true,
        ..Default::default()
    }
}

/// 测试用应用：与 `full_chrome_config` 对应
pub(crate) fn full_chrome_application() -> Application {
    ApplicationBuilder::new("Test")
        .with_window(None, Some(800), Some(600))
        .with_title_bar(false)
        .with_blur(true)
        .with_transparency(true)
        .with_dark_mode(true)
        .build()
}

/// 只有默认窗口的简单应用
pub(crate) fn plain_application(width: i32, height: i32) -> Application {
    ApplicationBuilder::new("Plain")
        .with_window(Some("Plain"), Some(width), Some(height))
        .with_title_bar(true)
        .build()
}
