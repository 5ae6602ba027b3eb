//! 渲染入口

use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::model::Application;
use crate::platform::Platform;
use crate::scene::Scene;
use crate::session::{NativeWindowSession, SessionReport};
use crate::surface::Surface;
use crate::text::TextRenderer;
use tracing::{error, info};

/// 在给定平台上渲染应用，阻塞直到窗口关闭。
///
/// 配置在任何原生调用之前捕获：没有窗口描述时不会产生任何原生资源。
/// 窗口可见之前的失败会释放已取得的资源并返回错误。
pub fn render_with<P: Platform + 'static>(
    platform: P,
    application: &Application,
) -> Result<SessionReport, RenderError> {
    let config = RenderConfig::capture(application)?;
    run_session(platform, config, application)
}

fn run_session<P: Platform + 'static>(
    platform: P,
    config: RenderConfig,
    application: &Application,
) -> Result<SessionReport, RenderError> {
    let components = application
        .window
        .as_ref()
        .map(|window| window.components.as_slice())
        .unwrap_or_default();
    let scene = Scene::layout(components, &config);

    let session = NativeWindowSession::new(platform, config);
    session.prepare_surface(scene, TextRenderer::shared());

    if let Err(err) = session.start() {
        error!("render setup failed: {}", err);
        session.abort();
        return Err(err);
    }

    session.run_message_loop()?;
    let report = session.report();
    info!(
        paints = report.paints,
        degraded_effects = report.degraded_effects.len(),
        release_failures = report.release_failures.len(),
        "session finished"
    );
    Ok(report)
}

/// 只渲染到离屏 Surface，不创建窗口
pub fn render_offscreen(application: &Application) -> Result<Surface, RenderError> {
    let config = RenderConfig::capture(application)?;
    let components = application
        .window
        .as_ref()
        .map(|window| window.components.as_slice())
        .unwrap_or_default();

    let mut surface = Surface::new();
    surface.allocate(config.width, config.height)?;
    surface.set_background(config.background_tone());
    surface.set_scene(Scene::layout(components, &config));
    surface.set_text_renderer(TextRenderer::shared());
    surface.render();
    Ok(surface)
}

/// 用本机窗口系统渲染应用
#[cfg(windows)]
pub fn render(application: &Application) -> Result<(), RenderError> {
    use crate::platform::Win32Platform;

    let config = RenderConfig::capture(application)?;
    let platform = Win32Platform::new().map_err(RenderError::ClassRegistration)?;
    run_session(platform, config, application).map(|_| ())
}

/// 用本机窗口系统渲染应用
#[cfg(not(windows))]
pub fn render(application: &Application) -> Result<(), RenderError> {
    RenderConfig::capture(application)?;
    Err(RenderError::UnsupportedPlatform)
}
