//! 窗口外观：非客户区、深色模式、圆角、透明与模糊
//!
//! 所有效果都是尽力而为：单个调用失败只记录并降级，不会让渲染失败。

use crate::config::RenderConfig;
use crate::error::{ChromeEffect, ChromeEffectError, ChromeFailure, PlatformError};
use crate::model::Backdrop;
use crate::platform::{
    AccentKind, AccentPolicy, BlurBehind, Margins, Platform, WindowAttribute, WindowHandle,
    BACKDROP_MAIN_WINDOW, CORNER_PREFERENCE_ROUND, NONCLIENT_RENDERING_ENABLED,
};
use tracing::{debug, warn};

/// 一次应用的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChromeReport {
    pub applied: Vec<ChromeEffect>,
    pub degraded: Vec<ChromeEffectError>,
}

impl ChromeReport {
    fn record(&mut self, effect: ChromeEffect, result: Result<(), PlatformError>) -> bool {
        match result {
            Ok(()) => {
                debug!("chrome effect {:?} applied", effect);
                self.applied.push(effect);
                true
            }
            Err(err) => {
                self.degrade(effect, ChromeFailure::Failed(err));
                false
            }
        }
    }

    fn degrade(&mut self, effect: ChromeEffect, kind: ChromeFailure) {
        let error = ChromeEffectError { effect, kind };
        warn!("{}", error);
        self.degraded.push(error);
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// 按固定顺序应用窗口外观
pub fn apply<P: Platform>(platform: &P, window: WindowHandle, config: &RenderConfig) -> ChromeReport {
    let mut report = ChromeReport::default();

    if !config.title_bar {
        report.record(
            ChromeEffect::NonClientRendering,
            platform.set_window_attribute(
                window,
                WindowAttribute::NONCLIENT_RENDERING_POLICY,
                NONCLIENT_RENDERING_ENABLED,
            ),
        );
    }

    report.record(
        ChromeEffect::DarkMode,
        platform.set_window_attribute(
            window,
            WindowAttribute::USE_IMMERSIVE_DARK_MODE,
            config.dark_mode as i32,
        ),
    );

    report.record(
        ChromeEffect::RoundedCorners,
        platform.set_window_attribute(
            window,
            WindowAttribute::WINDOW_CORNER_PREFERENCE,
            CORNER_PREFERENCE_ROUND,
        ),
    );

    // 帧扩展必须在 accent policy 之前
    if config.transparent {
        extend_frame(platform, window, &mut report);
    }

    if config.blur {
        apply_blur(platform, window, config, &mut report);
    }

    report
}

/// 合成状态变化时 DWM 会丢掉帧扩展与模糊，这里按原条件重新应用
pub fn reapply_composition<P: Platform>(
    platform: &P,
    window: WindowHandle,
    config: &RenderConfig,
) -> ChromeReport {
    let mut report = ChromeReport::default();
    if config.transparent {
        extend_frame(platform, window, &mut report);
    }
    if config.blur {
        apply_blur(platform, window, config, &mut report);
    }
    report
}

fn extend_frame<P: Platform>(platform: &P, window: WindowHandle, report: &mut ChromeReport) {
    report.record(
        ChromeEffect::FrameExtension,
        platform.extend_frame_into_client_area(window, &Margins::FULLY_EXTENDED),
    );
}

/// 旧的 blur-behind 总是先开启，作为现代 backdrop 失败时的兜底
fn apply_blur<P: Platform>(
    platform: &P,
    window: WindowHandle,
    config: &RenderConfig,
    report: &mut ChromeReport,
) {
    report.record(
        ChromeEffect::BlurBehind,
        platform.enable_blur_behind(window, &BlurBehind::entire_window()),
    );

    if config.backdrop == Backdrop::Mica {
        let mica = platform.set_window_attribute(
            window,
            WindowAttribute::SYSTEM_BACKDROP_TYPE,
            BACKDROP_MAIN_WINDOW,
        );
        if report.record(ChromeEffect::SystemBackdrop, mica) {
            return;
        }
    }

    if !platform.accent_policy_available() {
        report.degrade(ChromeEffect::AccentPolicy, ChromeFailure::Unsupported);
        return;
    }

    let kind = match config.backdrop {
        Backdrop::Blur => AccentKind::BlurBehind,
        Backdrop::Acrylic | Backdrop::Mica => AccentKind::AcrylicBlurBehind,
    };
    report.record(
        ChromeEffect::AccentPolicy,
        platform.set_accent_policy(window, &AccentPolicy::new(kind)),
    );
}
