//! 跨平台预览：用 winit + softbuffer 显示 Surface 的渲染结果
//!
//! 不经过原生会话，因此没有模糊、圆角等窗口外观。
//! 用法：`stride-preview [description.json]`

use softbuffer::{Context, Surface as SoftSurface};
use std::num::NonZeroU32;
use std::sync::Arc;
use stride_render::builder::demo_application;
use stride_render::model::Application;
use stride_render::Surface;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

struct Preview {
    title: String,
    surface: Surface,
    window: Option<Arc<Window>>,
    buffer: Option<SoftSurface<Arc<Window>, Arc<Window>>>,
}

impl Preview {
    fn present(&mut self) {
        let (Some(window), Some(buffer)) = (&self.window, &mut self.buffer) else {
            return;
        };
        let size = window.inner_size();
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return;
        };
        if let Err(err) = buffer.resize(width, height) {
            error!("failed to resize preview buffer: {}", err);
            return;
        }
        let mut frame = match buffer.buffer_mut() {
            Ok(frame) => frame,
            Err(err) => {
                error!("failed to map preview buffer: {}", err);
                return;
            }
        };

        let src = self.surface.pixel_memory();
        let src_width = self.surface.width() as usize;
        let src_height = self.surface.height() as usize;
        for y in 0..size.height as usize {
            for x in 0..size.width as usize {
                // 预乘 BGRA 直接按黑底合成
                let pixel = if x < src_width && y < src_height {
                    let i = (y * src_width + x) * 4;
                    (src[i + 2] as u32) << 16 | (src[i + 1] as u32) << 8 | src[i] as u32
                } else {
                    0
                };
                frame[y * size.width as usize + x] = pixel;
            }
        }
        if let Err(err) = frame.present() {
            error!("failed to present preview: {}", err);
        }
    }
}

impl ApplicationHandler for Preview {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(PhysicalSize::new(self.surface.width(), self.surface.height()))
            .with_resizable(false);

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                error!("failed to create preview window: {}", err);
                event_loop.exit();
                return;
            }
        };
        let buffer = Context::new(window.clone())
            .and_then(|context| SoftSurface::new(&context, window.clone()));
        match buffer {
            Ok(buffer) => {
                self.window = Some(window);
                self.buffer = Some(buffer);
                self.present();
            }
            Err(err) => {
                error!("failed to create preview surface: {}", err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.present(),
            _ => {}
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    stride_render::logging::init();

    let application = match std::env::args().nth(1) {
        Some(path) => Application::from_path(&path)?,
        None => demo_application(),
    };
    let surface = stride_render::render_offscreen(&application)?;
    info!("previewing {}x{} surface", surface.width(), surface.height());

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut preview = Preview {
        title: application.name.clone().unwrap_or_else(|| "Stride Preview".to_string()),
        surface,
        window: None,
        buffer: None,
    };
    event_loop.run_app(&mut preview)?;
    Ok(())
}
