//! 离屏快照：在内存平台上跑完整个渲染流程，把窗口最终画面写成 PNG
//!
//! 用法：`stride-snapshot [description.json] [output.png]`

use stride_render::builder::demo_application;
use stride_render::model::Application;
use stride_render::platform::HeadlessPlatform;
use stride_render::surface::save_bgra_png;
use tracing::{info, warn};

const DEFAULT_OUTPUT: &str = "stride_snapshot.png";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    stride_render::logging::init();

    let mut args = std::env::args().skip(1);
    let application = match args.next() {
        Some(path) if path != "-" => Application::from_path(&path)?,
        _ => demo_application(),
    };
    let output = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let platform = HeadlessPlatform::new();
    let report = stride_render::render_with(platform.clone(), &application)?;
    for effect in &report.degraded_effects {
        warn!("{}", effect);
    }

    let window = platform.last_window().ok_or("no window was created")?;
    let (width, height, pixels) = platform
        .window_pixels(window)
        .ok_or("window has no screen content")?;
    save_bgra_png(&output, width, height, &pixels)?;
    info!(
        "{} native calls, {} paints, snapshot written to {}",
        platform.calls().len(),
        report.paints,
        output
    );
    Ok(())
}
