//! 原生窗口会话
//!
//! 拥有窗口类、兼容位图、Surface、窗口句柄和消息路由，驱动整个生命周期：
//!
//! ```text
//! Uninitialized → ClassRegistered → WindowCreated → Styled → Visible → Running → Closing → Terminated
//! ```
//!
//! 会话以 `Rc` 持有，平台只保存指向它的 `Weak` 路由。消息处理期间内部状态被借用，
//! 此时重入的消息直接交给默认窗口过程。

use crate::chrome::{self, ChromeReport};
use crate::config::RenderConfig;
use crate::error::{ChromeEffectError, PaintError, PlatformError, ReleaseError, RenderError};
use crate::platform::{
    BitmapInfoHeader, ClassRegistration, ClassSpec, ExtendedWindowStyle, GdiObject, Message,
    MessageKind, Platform, WindowHandle, WindowProcedure, WindowSpec, WindowStyle,
    USE_DEFAULT_POSITION,
};
use crate::present::PaintCoordinator;
use crate::scene::Scene;
use crate::surface::Surface;
use crate::text::TextRenderer;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 所有会话共用的窗口类名
pub const WINDOW_CLASS_NAME: &str = "StrideWindowClassName";

/// 会话生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    ClassRegistered,
    WindowCreated,
    Styled,
    Visible,
    Running,
    Closing,
    Terminated,
}

impl SessionState {
    /// 正常流程中的下一个状态
    pub fn successor(self) -> Option<Self> {
        use SessionState::*;
        match self {
            Uninitialized => Some(ClassRegistered),
            ClassRegistered => Some(WindowCreated),
            WindowCreated => Some(Styled),
            Styled => Some(Visible),
            Visible => Some(Running),
            Running => Some(Closing),
            Closing => Some(Terminated),
            Terminated => None,
        }
    }

    /// 只能前进一步；初始化失败时可以从任意未结束的状态直接终止
    pub fn can_transition(self, to: Self) -> bool {
        self.successor() == Some(to) || (to == SessionState::Terminated && self != SessionState::Terminated)
    }
}

/// 会话取得的原生资源，关闭时逆序释放
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NativeResource {
    Class,
    Bitmap(GdiObject),
    Surface,
    Window(WindowHandle),
    Route(WindowHandle),
}

impl NativeResource {
    fn describe(&self) -> String {
        match self {
            NativeResource::Class => format!("window class {}", WINDOW_CLASS_NAME),
            NativeResource::Bitmap(b) => format!("bitmap {:#x}", b.0),
            NativeResource::Surface => "surface".to_string(),
            NativeResource::Window(w) => format!("window {:#x}", w.0),
            NativeResource::Route(w) => format!("window procedure route {:#x}", w.0),
        }
    }
}

/// 按配置得出窗口样式
pub fn window_styles(config: &RenderConfig) -> (WindowStyle, ExtendedWindowStyle) {
    if config.title_bar {
        (
            WindowStyle::CAPTION
                | WindowStyle::SYSTEM_MENU
                | WindowStyle::THICK_FRAME
                | WindowStyle::MINIMIZE_BOX
                | WindowStyle::MAXIMIZE_BOX,
            ExtendedWindowStyle::NONE,
        )
    } else {
        (
            WindowStyle::POPUP | WindowStyle::THICK_FRAME | WindowStyle::CLIP_CHILDREN,
            ExtendedWindowStyle::LAYERED,
        )
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    state: SessionState,
    visited: Vec<SessionState>,
    window: Option<WindowHandle>,
    bitmap: Option<GdiObject>,
    surface: Surface,
    resources: Vec<NativeResource>,
    degraded: Vec<ChromeEffectError>,
    release_failures: Vec<ReleaseError>,
    paints: usize,
    degraded_paints: usize,
}

impl SessionInner {
    fn transition(&mut self, to: SessionState) -> Result<(), RenderError> {
        if !self.state.can_transition(to) {
            return Err(RenderError::InvalidTransition { from: self.state, to });
        }
        debug!("session {:?} -> {:?}", self.state, to);
        self.state = to;
        self.visited.push(to);
        Ok(())
    }
}

/// 会话结束后的摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    /// 依次经过的状态（含初始状态）
    pub states: Vec<SessionState>,
    pub degraded_effects: Vec<ChromeEffectError>,
    pub release_failures: Vec<ReleaseError>,
    pub paints: usize,
    pub degraded_paints: usize,
}

impl SessionReport {
    pub fn reached(&self, state: SessionState) -> bool {
        self.states.contains(&state)
    }
}

/// 一个原生窗口及其消息循环
pub struct NativeWindowSession<P: Platform> {
    platform: P,
    config: RenderConfig,
    this: Weak<Self>,
    inner: RefCell<SessionInner>,
}

impl<P: Platform + 'static> NativeWindowSession<P> {
    pub fn new(platform: P, config: RenderConfig) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            platform,
            config,
            this: this.clone(),
            inner: RefCell::new(SessionInner {
                visited: vec![SessionState::Uninitialized],
                ..Default::default()
            }),
        })
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.inner.borrow().state
    }

    pub fn window(&self) -> Option<WindowHandle> {
        self.inner.borrow().window
    }

    /// 设置要绘制的场景与字体；在 `start` 之前调用
    pub fn prepare_surface(&self, scene: Scene, text: Option<Arc<TextRenderer>>) {
        let mut inner = self.inner.borrow_mut();
        inner.surface.set_background(self.config.background_tone());
        inner.surface.set_scene(scene);
        inner.surface.set_text_renderer(text);
    }

    /// 注册类、创建窗口、应用外观并显示，完成首次绘制。
    /// 出错时调用者负责 [`abort`](Self::abort)。
    pub fn start(&self) -> Result<(), RenderError> {
        self.register_class()?;
        self.create_window()?;
        self.apply_chrome()?;
        self.show()
    }

    /// 注册窗口类，之后按 Win32 的顺序先建位图和 Surface
    pub fn register_class(&self) -> Result<(), RenderError> {
        let class = ClassSpec {
            name: WINDOW_CLASS_NAME.to_string(),
            background: self.config.background_brush(),
        };
        let registration = self
            .platform
            .register_class(&class)
            .map_err(RenderError::ClassRegistration)?;

        let mut inner = self.inner.borrow_mut();
        match registration {
            ClassRegistration::Registered => inner.resources.push(NativeResource::Class),
            ClassRegistration::AlreadyExists => {
                debug!("window class {} already registered", WINDOW_CLASS_NAME)
            }
        }
        inner.transition(SessionState::ClassRegistered)
    }

    /// 创建兼容位图、分配 Surface、创建窗口并挂接消息路由
    pub fn create_window(&self) -> Result<(), RenderError> {
        let config = &self.config;
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != SessionState::ClassRegistered {
                return Err(RenderError::InvalidTransition {
                    from: inner.state,
                    to: SessionState::WindowCreated,
                });
            }

            // 位图失败不致命，之后的绘制只会降级
            match self
                .platform
                .create_bitmap(&BitmapInfoHeader::top_down_bgra(config.width, config.height))
            {
                Ok(bitmap) => {
                    inner.bitmap = Some(bitmap);
                    inner.resources.push(NativeResource::Bitmap(bitmap));
                }
                Err(err) => warn!("compatible bitmap unavailable, painting degraded: {}", err),
            }

            inner.surface.allocate(config.width, config.height)?;
            inner.resources.push(NativeResource::Surface);
        }

        let (style, ex_style) = window_styles(config);
        let spec = WindowSpec {
            class_name: WINDOW_CLASS_NAME.to_string(),
            title: config.app_name.clone(),
            style,
            ex_style,
            x: USE_DEFAULT_POSITION,
            y: USE_DEFAULT_POSITION,
            width: config.width,
            height: config.height,
        };
        let window = self
            .platform
            .create_window(&spec)
            .map_err(RenderError::WindowCreation)?;

        let mut inner = self.inner.borrow_mut();
        inner.window = Some(window);
        inner.resources.push(NativeResource::Window(window));

        let procedure: Weak<dyn WindowProcedure> = self.this.clone();
        self.platform.attach(window, procedure);
        inner.resources.push(NativeResource::Route(window));
        info!("created window {:#x} ({}x{})", window.0, config.width, config.height);
        inner.transition(SessionState::WindowCreated)
    }

    pub fn apply_chrome(&self) -> Result<ChromeReport, RenderError> {
        let window = self.require_window(SessionState::Styled)?;
        let report = chrome::apply(&self.platform, window, &self.config);
        let mut inner = self.inner.borrow_mut();
        inner.degraded.extend(report.degraded.iter().cloned());
        inner.transition(SessionState::Styled)?;
        Ok(report)
    }

    /// 显示窗口并立即完成首次绘制
    pub fn show(&self) -> Result<(), RenderError> {
        let window = self.require_window(SessionState::Visible)?;
        self.inner.borrow_mut().transition(SessionState::Visible)?;
        // 不持有内部借用，update 会同步回调窗口过程
        self.platform.show_window(window);
        self.platform.update_window(window);
        Ok(())
    }

    /// 阻塞直到收到退出信号
    pub fn run_message_loop(&self) -> Result<(), RenderError> {
        self.inner.borrow_mut().transition(SessionState::Running)?;

        while let Some(message) = self.platform.get_message() {
            self.platform.translate_message(&message);
            self.platform.dispatch_message(&message);
        }

        let mut inner = self.inner.borrow_mut();
        if inner.state != SessionState::Terminated {
            // 没经过 close 就结束（例如外部投递的退出），补做清理
            if inner.state != SessionState::Closing {
                inner.transition(SessionState::Closing)?;
            }
            self.release_all(&mut inner);
            inner.transition(SessionState::Terminated)?;
        }
        info!("message loop finished");
        Ok(())
    }

    /// 初始化失败时释放已经取得的资源并终止
    pub fn abort(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state == SessionState::Terminated {
            return;
        }
        self.release_all(&mut inner);
        let _ = inner.transition(SessionState::Terminated);
    }

    pub fn report(&self) -> SessionReport {
        let inner = self.inner.borrow();
        SessionReport {
            states: inner.visited.clone(),
            degraded_effects: inner.degraded.clone(),
            release_failures: inner.release_failures.clone(),
            paints: inner.paints,
            degraded_paints: inner.degraded_paints,
        }
    }

    fn require_window(&self, to: SessionState) -> Result<WindowHandle, RenderError> {
        let (window, from) = {
            let inner = self.inner.borrow();
            (inner.window, inner.state)
        };
        match window {
            Some(window) if from.can_transition(to) => Ok(window),
            _ => Err(RenderError::InvalidTransition { from, to }),
        }
    }

    fn handle_paint(&self, inner: &mut SessionInner, window: WindowHandle) {
        let bitmap = inner.bitmap;
        let result = PaintCoordinator::new(&self.platform).handle_paint(window, bitmap, &mut inner.surface);
        inner.paints += 1;
        match result {
            Ok(()) => {}
            Err(PaintError::Degraded) => {
                inner.degraded_paints += 1;
                warn!("{}", PaintError::Degraded);
            }
            Err(err) => {
                inner.degraded_paints += 1;
                warn!("paint failed: {}", err);
            }
        }
    }

    fn handle_close(&self, inner: &mut SessionInner) {
        if let Err(err) = inner.transition(SessionState::Closing) {
            warn!("ignoring close request: {}", err);
            return;
        }
        info!("closing window");
        self.release_all(inner);
        self.platform.post_quit_message(0);
    }
}

impl<P: Platform> NativeWindowSession<P> {
    /// 逆序释放全部资源；单步失败不影响后续步骤
    fn release_all(&self, inner: &mut SessionInner) {
        while let Some(resource) = inner.resources.pop() {
            let result: Result<(), PlatformError> = match resource {
                NativeResource::Route(window) => self.platform.detach(window),
                NativeResource::Window(window) => {
                    inner.window = None;
                    self.platform.destroy_window(window)
                }
                NativeResource::Surface => {
                    inner.surface.release();
                    Ok(())
                }
                NativeResource::Bitmap(bitmap) => {
                    inner.bitmap = None;
                    self.platform.delete_object(bitmap)
                }
                NativeResource::Class => self.platform.unregister_class(WINDOW_CLASS_NAME),
            };
            if let Err(source) = result {
                let failure = ReleaseError { resource: resource.describe(), source };
                warn!("{}", failure);
                inner.release_failures.push(failure);
            }
        }
    }
}

impl<P: Platform + 'static> WindowProcedure for NativeWindowSession<P> {
    fn window_procedure(&self, message: &Message) -> Option<isize> {
        let mut inner = match self.inner.try_borrow_mut() {
            Ok(inner) => inner,
            Err(_) => return None,
        };

        match message.kind() {
            // 透明窗口不擦除背景，避免闪烁
            MessageKind::EraseBackground if self.config.transparent => Some(1),
            MessageKind::Paint => {
                self.handle_paint(&mut inner, message.window);
                Some(0)
            }
            MessageKind::Close => {
                self.handle_close(&mut inner);
                Some(0)
            }
            MessageKind::CompositionChanged if self.config.transparent || self.config.blur => {
                let report = chrome::reapply_composition(&self.platform, message.window, &self.config);
                inner.degraded.extend(report.degraded);
                Some(0)
            }
            _ => None,
        }
    }
}

/// 没走完关闭流程就被丢弃时兜底释放
impl<P: Platform> Drop for NativeWindowSession<P> {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        if inner.resources.is_empty() {
            return;
        }
        warn!("session dropped with {} unreleased resources", inner.resources.len());
        self.release_all(&mut inner);
    }
}
