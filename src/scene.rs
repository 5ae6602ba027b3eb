//! 场景：把组件树排成一组绘制图元（单 Surface 策略）
//!
//! 布局只是自上而下的简单堆叠，不是布局引擎。

use crate::config::RenderConfig;
use crate::model::{Component, Container, StaticText};
use crate::{Color, Paint, PaintStyle, Point, Rect};

const PADDING: f32 = 24.0;
const SPACING: f32 = 12.0;
const CONTAINER_INSET: f32 = 12.0;
const DEFAULT_TEXT_SIZE: u32 = 16;
/// 行高系数
const LINE_HEIGHT: f32 = 1.5;

/// 绘制图元
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect { rect: Rect, paint: Paint },
    /// `origin` 为基线起点
    Text { origin: Point, content: String, size: f32, color: Color },
    /// 设置（或清除）裁剪区域
    Clip(Option<Rect>),
}

/// 有序图元列表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    primitives: Vec<Primitive>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// 按窗口宽度排布组件
    pub fn layout(components: &[Component], config: &RenderConfig) -> Self {
        let mut scene = Scene::new();
        let bounds = Rect::new(
            PADDING,
            PADDING,
            (config.width as f32 - 2.0 * PADDING).max(0.0),
            (config.height as f32 - 2.0 * PADDING).max(0.0),
        );
        let mut cursor = LayoutCursor::new(bounds);
        for component in components {
            scene.place(component, &mut cursor, config);
        }
        scene
    }

    fn place(&mut self, component: &Component, cursor: &mut LayoutCursor, config: &RenderConfig) {
        match component {
            Component::StaticText(text) => self.place_text(text, cursor, config),
            Component::Container(container) => self.place_container(container, cursor, config),
        }
    }

    fn place_text(&mut self, text: &StaticText, cursor: &mut LayoutCursor, config: &RenderConfig) {
        let content = match text.content.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => return,
        };
        let size = text.size.unwrap_or(DEFAULT_TEXT_SIZE) as f32;
        let color = text
            .color
            .as_deref()
            .and_then(Color::parse_hex)
            .unwrap_or_else(|| config.foreground());

        let line_height = size * LINE_HEIGHT;
        let baseline = cursor.y + size;
        self.push(Primitive::Text {
            origin: Point::new(cursor.bounds.x, baseline),
            content: content.to_string(),
            size,
            color,
        });
        cursor.advance(line_height);
    }

    fn place_container(&mut self, container: &Container, cursor: &mut LayoutCursor, config: &RenderConfig) {
        let width = container
            .width
            .map(|w| (w as f32).min(cursor.bounds.width))
            .unwrap_or(cursor.bounds.width);

        // 先排子组件以确定自动高度
        let inner_bounds = Rect::new(
            cursor.bounds.x + CONTAINER_INSET,
            cursor.y + CONTAINER_INSET,
            (width - 2.0 * CONTAINER_INSET).max(0.0),
            f32::MAX,
        );
        let mut children = Scene::new();
        let frame_clip = Rect::new(cursor.bounds.x, cursor.y, width, f32::MAX);
        let mut inner = LayoutCursor::new(inner_bounds);
        inner.clip = Some(frame_clip);
        for child in &container.components {
            children.place(child, &mut inner, config);
        }
        let content_height = inner.used() + 2.0 * CONTAINER_INSET;
        let height = container.height.map(|h| h as f32).unwrap_or(content_height);

        let frame = Rect::new(cursor.bounds.x, cursor.y, width, height);
        let outline = config.foreground().with_alpha(0x40);
        self.push(Primitive::Rect {
            rect: frame,
            paint: Paint::new().with_color(outline.with_alpha(0x14)),
        });
        self.push(Primitive::Rect {
            rect: frame,
            paint: Paint::new().with_color(outline).with_style(PaintStyle::Stroke),
        });

        self.push(Primitive::Clip(Some(frame.inset(1.0, 1.0))));
        self.primitives.extend(children.primitives);
        self.push(Primitive::Clip(cursor.clip));

        cursor.advance(height);
    }
}

struct LayoutCursor {
    bounds: Rect,
    y: f32,
    placed: bool,
    /// 外层容器的裁剪区域
    clip: Option<Rect>,
}

impl LayoutCursor {
    fn new(bounds: Rect) -> Self {
        Self { bounds, y: bounds.y, placed: false, clip: None }
    }

    fn advance(&mut self, height: f32) {
        self.y += height + SPACING;
        self.placed = true;
    }

    /// 已用高度（不含末尾间距）
    fn used(&self) -> f32 {
        if self.placed {
            self.y - self.bounds.y - SPACING
        } else {
            0.0
        }
    }
}
