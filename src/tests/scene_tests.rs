//! 场景布局单元测试
//! 测试组件到图元的转换

use crate::builder::{static_text, ContainerBuilder};
use crate::config::RenderConfig;
use crate::model::{Component, StaticText};
use crate::scene::{Primitive, Scene};
use crate::Color;

fn texts(scene: &Scene) -> Vec<(f32, f32, String)> {
    scene
        .primitives()
        .iter()
        .filter_map(|p| match p {
            Primitive::Text { origin, content, .. } => Some((origin.x, origin.y, content.clone())),
            _ => None,
        })
        .collect()
}

/// 测试空组件列表
#[test]
fn test_layout_empty() {
    let scene = Scene::layout(&[], &RenderConfig::default());
    assert!(scene.is_empty());
}

/// 测试文本自上而下排列
#[test]
fn test_layout_text_stack() {
    let components = vec![
        static_text("first", Some(20), None),
        static_text("second", None, None),
    ];
    let scene = Scene::layout(&components, &RenderConfig::default());
    let texts = texts(&scene);
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0].2, "first");
    assert_eq!(texts[1].2, "second");
    // 同一左边距，第二行在下方
    assert_eq!(texts[0].0, texts[1].0);
    assert!(texts[1].1 > texts[0].1);
}

/// 测试空白内容被跳过
#[test]
fn test_layout_skips_blank_text() {
    let components = vec![
        Component::StaticText(StaticText::default()),
        static_text("   ", None, None),
        static_text("visible", None, None),
    ];
    let scene = Scene::layout(&components, &RenderConfig::default());
    assert_eq!(scene.len(), 1);
}

/// 测试文本颜色：显式颜色优先，否则使用前景色
#[test]
fn test_layout_text_color() {
    let config = RenderConfig { dark_mode: true, ..Default::default() };
    let colored = Component::StaticText(StaticText {
        content: Some("red".to_string()),
        color: Some("#FF0000".to_string()),
        ..Default::default()
    });
    let scene = Scene::layout(&[colored, static_text("plain", None, None)], &config);

    let colors: Vec<Color> = scene
        .primitives()
        .iter()
        .filter_map(|p| match p {
            Primitive::Text { color, .. } => Some(*color),
            _ => None,
        })
        .collect();
    assert_eq!(colors, vec![Color::rgb(255, 0, 0), config.foreground()]);
}

/// 测试容器：背景、边框、裁剪成对出现
#[test]
fn test_layout_container() {
    let container = ContainerBuilder::new(Some(200), None)
        .add_component(static_text("inside", None, None))
        .build();
    let scene = Scene::layout(&[container, static_text("after", None, None)], &RenderConfig::default());
    let primitives = scene.primitives();

    assert!(matches!(primitives[0], Primitive::Rect { .. }));
    assert!(matches!(primitives[1], Primitive::Rect { .. }));
    assert!(matches!(primitives[2], Primitive::Clip(Some(_))));
    assert!(matches!(primitives[3], Primitive::Text { .. }));
    assert_eq!(primitives[4], Primitive::Clip(None));

    if let Primitive::Rect { rect, .. } = &primitives[0] {
        assert_eq!(rect.width, 200.0);
    }

    let texts = texts(&scene);
    assert_eq!(texts.len(), 2);
    assert!(texts[1].1 > texts[0].1);
}

/// 测试嵌套容器恢复外层裁剪
#[test]
fn test_layout_nested_container_restores_clip() {
    let inner = ContainerBuilder::new(Some(100), Some(40)).build();
    let outer = ContainerBuilder::new(None, None).add_component(inner).build();
    let scene = Scene::layout(&[outer], &RenderConfig::default());

    let clips: Vec<&Option<crate::Rect>> = scene
        .primitives()
        .iter()
        .filter_map(|p| match p {
            Primitive::Clip(rect) => Some(rect),
            _ => None,
        })
        .collect();
    assert_eq!(clips.len(), 4);
    // 内层结束后恢复为外层裁剪，而不是清除
    assert!(clips[2].is_some());
    assert!(clips[3].is_none());
}

/// 测试容器宽度不超过可用宽度
#[test]
fn test_layout_container_width_clamped() {
    let config = RenderConfig { width: 200, ..Default::default() };
    let container = ContainerBuilder::new(Some(1000), Some(10)).build();
    let scene = Scene::layout(&[container], &config);
    if let Primitive::Rect { rect, .. } = &scene.primitives()[0] {
        assert!(rect.width <= 200.0);
    } else {
        panic!("expected container background");
    }
}
