//! Stride 渲染程序
//!
//! 用法：`stride-app [description.json]`，不带参数时渲染内置示例。

use stride_render::builder::demo_application;
use stride_render::model::Application;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    stride_render::logging::init();

    let application = match std::env::args().nth(1) {
        Some(path) => {
            info!("loading application description {}", path);
            Application::from_path(&path)?
        }
        None => demo_application(),
    };

    stride_render::render(&application)?;
    info!("window closed");
    Ok(())
}
