//! 声明式构建器

use crate::model::{Application, Backdrop, Component, Container, StaticText, Window};

pub const DEFAULT_APPLICATION_NAME: &str = "Stride Application";
pub const DEFAULT_WINDOW_TITLE: &str = "Stride Window";
pub const DEFAULT_WINDOW_WIDTH: i32 = 800;
pub const DEFAULT_WINDOW_HEIGHT: i32 = 600;

/// 应用构建器
#[derive(Debug, Clone)]
pub struct ApplicationBuilder {
    application: Application,
    window: Window,
}

impl ApplicationBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            application: Application {
                name: Some(name.into()),
                ..Default::default()
            },
            window: Window {
                title: Some(DEFAULT_WINDOW_TITLE.to_string()),
                width: Some(DEFAULT_WINDOW_WIDTH),
                height: Some(DEFAULT_WINDOW_HEIGHT),
                ..Default::default()
            },
        }
    }

    /// 设置窗口标题与尺寸，`None` 使用默认值
    pub fn with_window(mut self, title: Option<&str>, width: Option<i32>, height: Option<i32>) -> Self {
        self.window.title = Some(title.unwrap_or(DEFAULT_WINDOW_TITLE).to_string());
        self.window.width = Some(width.unwrap_or(DEFAULT_WINDOW_WIDTH));
        self.window.height = Some(height.unwrap_or(DEFAULT_WINDOW_HEIGHT));
        self
    }

    pub fn with_dark_mode(mut self, dark_mode: bool) -> Self {
        self.application.dark_mode = Some(dark_mode);
        self
    }

    pub fn with_blur(mut self, blur: bool) -> Self {
        self.window.blur = Some(blur);
        self
    }

    pub fn with_transparency(mut self, transparent: bool) -> Self {
        self.window.transparent = Some(transparent);
        self
    }

    pub fn with_title_bar(mut self, title_bar: bool) -> Self {
        self.window.title_bar = Some(title_bar);
        self
    }

    pub fn with_backdrop(mut self, backdrop: Backdrop) -> Self {
        self.window.backdrop = Some(backdrop);
        self
    }

    pub fn add_component(mut self, component: Component) -> Self {
        self.window.components.push(component);
        self
    }

    pub fn build(mut self) -> Application {
        self.application.window = Some(self.window);
        self.application
    }
}

/// 容器构建器
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    pub fn new(width: Option<i32>, height: Option<i32>) -> Self {
        Self {
            container: Container {
                width,
                height,
                components: Vec::new(),
            },
        }
    }

    pub fn add_component(mut self, component: Component) -> Self {
        self.container.components.push(component);
        self
    }

    pub fn build(self) -> Component {
        Component::Container(self.container)
    }
}

/// 创建静态文本组件
pub fn static_text(content: &str, size: Option<u32>, title: Option<&str>) -> Component {
    let title = match title {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => "Static Text".to_string(),
    };
    Component::StaticText(StaticText {
        title: Some(title),
        content: Some(content.to_string()),
        size,
        color: None,
    })
}

/// 内置示例应用，命令行没有给出描述文件时使用
pub fn demo_application() -> Application {
    ApplicationBuilder::new("Stride Demo")
        .with_window(Some("Stride Demo"), Some(640), Some(420))
        .with_dark_mode(true)
        .with_blur(true)
        .with_transparency(true)
        .add_component(static_text("Hello from Stride", Some(28), Some("Heading")))
        .add_component(static_text("Rendered into a single off-screen surface.", None, None))
        .add_component(
            ContainerBuilder::new(Some(360), None)
                .add_component(static_text("Blur, dark mode and rounded corners", Some(14), None))
                .add_component(static_text("are applied best-effort.", Some(14), None))
                .build(),
        )
        .build()
}
