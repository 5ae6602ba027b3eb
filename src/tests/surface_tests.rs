//! Surface 单元测试
//! 测试分配、重绘的确定性、裁剪与像素格式

use crate::scene::{Primitive, Scene};
use crate::error::AllocationError;
use crate::{Color, Paint, PaintStyle, Rect, Surface};

/// 创建已分配的画布
fn allocated(width: i32, height: i32) -> Surface {
    let mut surface = Surface::new();
    surface.allocate(width, height).unwrap();
    surface
}

/// 测试分配后缓冲大小为 width*height*4
#[test]
fn test_allocate_buffer_size() {
    for &(w, h) in &[(1, 1), (3, 7), (64, 48), (800, 600)] {
        let mut surface = allocated(w, h);
        surface.render();
        assert_eq!(surface.pixel_memory().len(), (w * h * 4) as usize);
        assert_eq!(surface.row_stride(), (w * 4) as usize);
        assert_eq!(surface.width(), w as u32);
        assert_eq!(surface.height(), h as u32);
    }
}

/// 测试未分配时尺寸为 0
#[test]
fn test_unallocated_surface() {
    let mut surface = Surface::new();
    assert_eq!(surface.width(), 0);
    assert_eq!(surface.height(), 0);
    assert!(!surface.is_allocated());
    // 未分配时重绘什么都不做
    surface.render();
    assert!(surface.pixel_memory().is_empty());
}

/// 测试无效尺寸
#[test]
fn test_allocate_invalid_size() {
    let mut surface = Surface::new();
    assert_eq!(
        surface.allocate(0, 10),
        Err(AllocationError::InvalidSize { width: 0, height: 10 })
    );
    assert_eq!(
        surface.allocate(10, -1),
        Err(AllocationError::InvalidSize { width: 10, height: -1 })
    );
    assert_eq!(surface.width(), 0);
}

/// 测试初始内容为不透明黑色
#[test]
fn test_allocate_initializes_opaque() {
    let surface = allocated(4, 4);
    for px in surface.pixel_memory().chunks_exact(4) {
        assert_eq!(px, &[0, 0, 0, 255]);
    }
}

/// 测试 render 幂等
#[test]
fn test_render_idempotent() {
    let mut surface = allocated(120, 80);
    surface.set_background(Color::rgb(0xF3, 0xF3, 0xF3));

    let mut scene = Scene::new();
    scene.push(Primitive::Rect {
        rect: Rect::new(10.0, 10.0, 50.0, 30.0),
        paint: Paint::new().with_color(Color::new(255, 0, 0, 128)),
    });
    scene.push(Primitive::Rect {
        rect: Rect::new(40.0, 20.0, 60.0, 40.0),
        paint: Paint::new().with_color(Color::BLUE).with_style(PaintStyle::Stroke),
    });
    surface.set_scene(scene);

    surface.render();
    let first = surface.pixel_memory().to_vec();
    surface.render();
    assert_eq!(first, surface.pixel_memory());
}

/// 测试背景色按预乘 BGRA 写入
#[test]
fn test_render_background_premultiplied() {
    let mut surface = allocated(2, 2);
    surface.set_background(Color::new(200, 100, 50, 128));
    surface.render();
    assert_eq!(surface.get_pixel(1, 1), Color::new(200, 100, 50, 128).to_bgra_premultiplied());
    // B 在前
    let px = surface.get_pixel(0, 0);
    assert!(px[2] > px[0]);
    assert_eq!(px[3], 128);
}

/// 测试填充矩形
#[test]
fn test_draw_rect_fill() {
    let mut surface = allocated(10, 10);
    surface.clear(Color::WHITE);
    surface.draw_rect(&Rect::new(2.0, 2.0, 3.0, 3.0), &Paint::new().with_color(Color::BLUE));
    assert_eq!(surface.get_pixel(3, 3), [255, 0, 0, 255]);
    assert_eq!(surface.get_pixel(6, 6), [255, 255, 255, 255]);
}

/// 测试描边矩形只画边框
#[test]
fn test_draw_rect_stroke() {
    let mut surface = allocated(10, 10);
    surface.clear(Color::WHITE);
    let paint = Paint::new().with_color(Color::BLACK).with_style(PaintStyle::Stroke);
    surface.draw_rect(&Rect::new(1.0, 1.0, 8.0, 8.0), &paint);
    assert_eq!(surface.get_pixel(1, 1), [0, 0, 0, 255]);
    assert_eq!(surface.get_pixel(8, 5), [0, 0, 0, 255]);
    assert_eq!(surface.get_pixel(4, 4), [255, 255, 255, 255]);
}

/// 测试裁剪图元限制绘制范围，且下一次 render 会复位裁剪
#[test]
fn test_clip_primitive() {
    let mut surface = allocated(20, 20);
    surface.set_background(Color::WHITE);
    let mut scene = Scene::new();
    scene.push(Primitive::Clip(Some(Rect::new(0.0, 0.0, 10.0, 10.0))));
    scene.push(Primitive::Rect {
        rect: Rect::new(0.0, 0.0, 20.0, 20.0),
        paint: Paint::new().with_color(Color::BLACK),
    });
    surface.set_scene(scene);
    surface.render();

    assert_eq!(surface.get_pixel(5, 5), [0, 0, 0, 255]);
    assert_eq!(surface.get_pixel(15, 15), [255, 255, 255, 255]);

    // 裁剪不影响场景外的直接绘制
    surface.draw_rect(&Rect::new(12.0, 12.0, 2.0, 2.0), &Paint::new().with_color(Color::BLUE));
    assert_eq!(surface.get_pixel(13, 13), [255, 0, 0, 255]);
}

/// 测试半透明混合
#[test]
fn test_set_pixel_blend() {
    let mut surface = allocated(1, 1);
    surface.clear(Color::WHITE);
    surface.set_pixel(0, 0, Color::new(0, 0, 0, 128));
    let px = surface.get_pixel(0, 0);
    assert_eq!(px[3], 255);
    assert!(px[0] > 120 && px[0] < 135, "got {:?}", px);

    // 越界写入被忽略
    surface.set_pixel(-1, 0, Color::BLACK);
    surface.set_pixel(0, 5, Color::BLACK);
    assert_eq!(surface.get_pixel(0, 0), px);
}

/// 测试释放后尺寸归零
#[test]
fn test_release() {
    let mut surface = allocated(8, 8);
    surface.release();
    assert_eq!(surface.width(), 0);
    assert_eq!(surface.height(), 0);
    assert!(surface.pixel_memory().is_empty());
}

/// 测试预乘 BGRA 转 RGBA
#[test]
fn test_bgra_to_rgba() {
    let bgra = Color::new(255, 0, 0, 128).to_bgra_premultiplied();
    let rgba = crate::color::bgra_premultiplied_to_rgba(&bgra);
    assert_eq!(rgba[3], 128);
    assert!(rgba[0] >= 254);
    assert_eq!(rgba[1], 0);
    assert_eq!(rgba[2], 0);
}
