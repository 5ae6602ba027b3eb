//! 错误类型
//!
//! 致命错误（`RenderError`）在窗口可见之前向 `render` 的调用者传播；
//! 窗口可见之后的错误（视觉效果、绘制、资源释放）只在本地记录。

use crate::session::SessionState;
use thiserror::Error;

/// 一次失败的原生调用
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{call} failed, error code: {code}")]
pub struct PlatformError {
    pub call: &'static str,
    pub code: u32,
}

impl PlatformError {
    pub const fn new(call: &'static str, code: u32) -> Self {
        Self { call, code }
    }
}

/// 应用描述无效
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("application must have a window to render")]
    MissingWindow,
    #[error("invalid application description: {0}")]
    InvalidDescription(#[from] serde_json::Error),
    #[error("failed to read application description: {0}")]
    Io(#[from] std::io::Error),
}

/// Surface 像素缓冲分配失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("invalid surface size {width}x{height}")]
    InvalidSize { width: i32, height: i32 },
    #[error("unable to allocate {bytes} bytes of pixel memory")]
    OutOfMemory { bytes: usize },
}

/// 窗口视觉效果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromeEffect {
    NonClientRendering,
    DarkMode,
    RoundedCorners,
    FrameExtension,
    BlurBehind,
    SystemBackdrop,
    AccentPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChromeFailure {
    #[error(transparent)]
    Failed(#[from] PlatformError),
    #[error("not supported by this system")]
    Unsupported,
}

/// 单个视觉效果应用失败（非致命）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{effect:?} effect degraded: {kind}")]
pub struct ChromeEffectError {
    pub effect: ChromeEffect,
    pub kind: ChromeFailure,
}

/// 一次绘制周期失败（非致命）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaintError {
    #[error("backing bitmap was never created, paint skipped")]
    Degraded,
    #[error(transparent)]
    Native(#[from] PlatformError),
}

/// 关闭时释放资源失败（尽力而为）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to release {resource}: {source}")]
pub struct ReleaseError {
    pub resource: String,
    pub source: PlatformError,
}

/// `render` 的致命错误
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("window class registration failed: {0}")]
    ClassRegistration(PlatformError),
    #[error("window creation failed: {0}")]
    WindowCreation(PlatformError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("invalid session transition from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },
    #[error("native rendering is not available on this platform")]
    UnsupportedPlatform,
}
