//! 原生窗口会话测试
//! 在内存平台上测试生命周期、消息分发、绘制与资源释放

use super::full_chrome_config;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::platform::{
    CallKind, ClassSpec, ExtendedWindowStyle, HeadlessPlatform, Message, NativeCall, Platform,
    ResourceKind, StockBrush, WindowProcedure, WindowStyle, USE_DEFAULT_POSITION,
    WM_CHAR, WM_CLOSE, WM_DWMCOMPOSITIONCHANGED, WM_ERASEBKGND, WM_KEYDOWN, WM_PAINT,
};
use crate::scene::Scene;
use crate::session::{window_styles, NativeWindowSession, SessionState, WINDOW_CLASS_NAME};
use std::rc::Rc;

type Session = Rc<NativeWindowSession<HeadlessPlatform>>;

/// 创建会话并完成初始化（窗口已显示）
fn started(config: RenderConfig) -> (HeadlessPlatform, Session) {
    let platform = HeadlessPlatform::new();
    let session = NativeWindowSession::new(platform.clone(), config);
    session.prepare_surface(Scene::new(), None);
    session.start().unwrap();
    (platform, session)
}

/// 测试状态机只能前进一步
#[test]
fn test_state_successors() {
    let mut state = SessionState::Uninitialized;
    let mut visited = vec![state];
    while let Some(next) = state.successor() {
        assert!(state.can_transition(next));
        state = next;
        visited.push(state);
    }
    assert_eq!(visited.len(), 8);
    assert_eq!(state, SessionState::Terminated);

    assert!(!SessionState::Uninitialized.can_transition(SessionState::WindowCreated));
    assert!(!SessionState::Closing.can_transition(SessionState::Running));
    assert!(!SessionState::Running.can_transition(SessionState::Visible));
    // 初始化失败可以直接终止
    assert!(SessionState::ClassRegistered.can_transition(SessionState::Terminated));
    assert!(!SessionState::Terminated.can_transition(SessionState::Terminated));
}

/// 测试窗口样式
#[test]
fn test_window_styles() {
    let (style, ex_style) = window_styles(&RenderConfig::default());
    assert!(style.contains(WindowStyle::THICK_FRAME));
    assert!(style.contains(WindowStyle::POPUP));
    assert!(!style.contains(WindowStyle::CAPTION));
    assert_eq!(ex_style, ExtendedWindowStyle::LAYERED);

    let config = RenderConfig { title_bar: true, ..Default::default() };
    let (style, ex_style) = window_styles(&config);
    assert!(style.contains(WindowStyle::CAPTION));
    assert!(style.contains(WindowStyle::SYSTEM_MENU));
    assert!(style.contains(WindowStyle::MINIMIZE_BOX | WindowStyle::MAXIMIZE_BOX));
    assert_eq!(ex_style, ExtendedWindowStyle::NONE);
}

/// 测试初始化顺序：类 → 位图 → 窗口 → 外观 → 显示 → 首次绘制
#[test]
fn test_start_sequence() {
    let (platform, session) = started(full_chrome_config());
    assert_eq!(session.state(), SessionState::Visible);

    let kinds = platform.call_kinds();
    let pos = |kind| kinds.iter().position(|k| *k == kind).unwrap();
    assert!(pos(CallKind::RegisterClass) < pos(CallKind::CreateBitmap));
    assert!(pos(CallKind::CreateBitmap) < pos(CallKind::CreateWindow));
    assert!(pos(CallKind::CreateWindow) < pos(CallKind::Attach));
    assert!(pos(CallKind::Attach) < pos(CallKind::SetWindowAttribute));
    assert!(pos(CallKind::SetWindowAttribute) < pos(CallKind::ShowWindow));
    assert!(pos(CallKind::ShowWindow) < pos(CallKind::UpdateWindow));
    assert!(pos(CallKind::UpdateWindow) < pos(CallKind::BeginPaint));
    assert!(pos(CallKind::BitBlt) < pos(CallKind::EndPaint));

    let window = session.window().unwrap();
    assert!(platform.is_visible(window));
}

/// 测试类注册与窗口创建参数
#[test]
fn test_class_and_window_parameters() {
    let (platform, _session) = started(full_chrome_config());
    let calls = platform.calls();

    assert!(calls.contains(&NativeCall::RegisterClass {
        name: WINDOW_CLASS_NAME.to_string(),
        background: StockBrush::Null,
    }));

    let spec = calls
        .iter()
        .find_map(|c| match c {
            NativeCall::CreateWindow(spec) => Some(spec.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(spec.class_name, WINDOW_CLASS_NAME);
    assert_eq!(spec.title, "Test");
    assert_eq!((spec.x, spec.y), (USE_DEFAULT_POSITION, USE_DEFAULT_POSITION));
    assert_eq!((spec.width, spec.height), (800, 600));
    assert!(spec.ex_style.contains(ExtendedWindowStyle::LAYERED));
}

/// 测试透明窗口的擦除背景消息不交给默认过程
#[test]
fn test_erase_background_suppressed_when_transparent() {
    let (platform, session) = started(full_chrome_config());
    let window = session.window().unwrap();
    let defaults = platform.count(CallKind::DefaultWindowProcedure);

    let result = platform.dispatch_message(&Message::new(window, WM_ERASEBKGND));
    assert_ne!(result, 0);
    assert_eq!(platform.count(CallKind::DefaultWindowProcedure), defaults);
}

/// 测试不透明窗口的擦除背景走默认过程
#[test]
fn test_erase_background_forwarded_when_opaque() {
    let (platform, session) = started(RenderConfig::default());
    let window = session.window().unwrap();

    assert_eq!(session.window_procedure(&Message::new(window, WM_ERASEBKGND)), None);
    platform.dispatch_message(&Message::new(window, WM_ERASEBKGND));
    assert!(platform
        .calls()
        .contains(&NativeCall::DefaultWindowProcedure(WM_ERASEBKGND)));
}

/// 测试未知消息原样交给默认过程
#[test]
fn test_unknown_message_forwarded() {
    let (platform, session) = started(RenderConfig::default());
    let window = session.window().unwrap();
    const WM_SIZE: u32 = 0x0005;

    assert_eq!(session.window_procedure(&Message::new(window, WM_SIZE)), None);
    platform.dispatch_message(&Message::new(window, WM_SIZE));
    assert!(platform.calls().contains(&NativeCall::DefaultWindowProcedure(WM_SIZE)));
}

/// 测试绘制把 Surface 内容 blit 到窗口
#[test]
fn test_paint_blits_surface() {
    let config = RenderConfig { width: 32, height: 16, ..Default::default() };
    let (platform, session) = started(config.clone());
    let window = session.window().unwrap();

    let (width, height, pixels) = platform.window_pixels(window).unwrap();
    assert_eq!((width, height), (32, 16));
    let expected = config.background_tone().to_bgra_premultiplied();
    assert!(pixels.chunks_exact(4).all(|px| px == expected));

    let blit = platform
        .calls()
        .into_iter()
        .find_map(|c| match c {
            NativeCall::BitBlt(blit) => Some(blit),
            _ => None,
        })
        .unwrap();
    assert_eq!((blit.x, blit.y, blit.width, blit.height), (0, 0, 32, 16));
    assert_eq!(blit.rop, crate::platform::SRCCOPY);
}

/// 测试每个绘制周期内取得的句柄都已归还
#[test]
fn test_paint_releases_temporary_handles() {
    let (platform, session) = started(RenderConfig::default());
    let window = session.window().unwrap();
    platform.dispatch_message(&Message::new(window, WM_PAINT));
    platform.dispatch_message(&Message::new(window, WM_PAINT));

    let outstanding = platform.outstanding();
    for kind in [ResourceKind::PaintSession, ResourceKind::DeviceContext, ResourceKind::Selection] {
        assert!(
            !outstanding.iter().any(|(k, _)| *k == kind),
            "{:?} leaked: {:?}",
            kind,
            outstanding
        );
    }
    assert_eq!(platform.count(CallKind::BeginPaint), platform.count(CallKind::EndPaint));
    assert_eq!(platform.count(CallKind::CreateCompatibleDc), platform.count(CallKind::DeleteDc));
    assert_eq!(session.report().paints, 3);
}

/// 测试 blit 失败时仍归还全部临时句柄
#[test]
fn test_paint_failure_releases_handles() {
    let platform = HeadlessPlatform::new();
    platform.fail_on(CallKind::BitBlt);
    let session = NativeWindowSession::new(platform.clone(), RenderConfig::default());
    session.start().unwrap();

    assert!(platform.outstanding().iter().all(|(k, _)| !matches!(
        k,
        ResourceKind::PaintSession | ResourceKind::DeviceContext | ResourceKind::Selection
    )));
    assert_eq!(session.report().degraded_paints, 1);
}

/// 测试没有位图时绘制降级：结束绘制区域，不 blit，不报错
#[test]
fn test_paint_degraded_without_bitmap() {
    let platform = HeadlessPlatform::new();
    platform.fail_on(CallKind::CreateBitmap);
    let session = NativeWindowSession::new(platform.clone(), RenderConfig::default());
    session.start().unwrap();
    session.run_message_loop().unwrap();

    assert_eq!(platform.count(CallKind::BitBlt), 0);
    assert_eq!(platform.count(CallKind::BeginPaint), platform.count(CallKind::EndPaint));
    let report = session.report();
    assert_eq!(report.degraded_paints, report.paints);
    assert!(report.reached(SessionState::Running));
    assert!(platform.outstanding().is_empty());
}

/// 测试 BeginPaint 失败时仍然结束绘制
#[test]
fn test_begin_paint_failure_still_ends_paint() {
    let platform = HeadlessPlatform::new();
    platform.fail_on(CallKind::BeginPaint);
    let session = NativeWindowSession::new(platform.clone(), RenderConfig::default());
    session.start().unwrap();

    assert_eq!(platform.count(CallKind::BeginPaint), 1);
    assert_eq!(platform.count(CallKind::EndPaint), 1);
    assert_eq!(platform.count(CallKind::BitBlt), 0);
    assert_eq!(session.report().degraded_paints, 1);
    assert!(platform
        .outstanding()
        .iter()
        .all(|(k, _)| !matches!(k, ResourceKind::PaintSession)));
}

/// 测试关闭：逆序释放所有资源后投递退出
#[test]
fn test_close_releases_in_reverse_order() {
    let (platform, session) = started(full_chrome_config());
    session.run_message_loop().unwrap();

    assert_eq!(session.state(), SessionState::Terminated);
    assert_eq!(platform.acquire_count(), platform.release_count());
    assert!(platform.outstanding().is_empty());
    assert_eq!(platform.live_windows(), 0);
    assert_eq!(platform.quit_code(), Some(0));

    let kinds = platform.call_kinds();
    let pos = |kind| kinds.iter().rposition(|k| *k == kind).unwrap();
    assert!(pos(CallKind::Detach) < pos(CallKind::DestroyWindow));
    assert!(pos(CallKind::DestroyWindow) < pos(CallKind::DeleteObject));
    assert!(pos(CallKind::DeleteObject) < pos(CallKind::UnregisterClass));
    assert!(pos(CallKind::UnregisterClass) < pos(CallKind::PostQuitMessage));

    let report = session.report();
    assert_eq!(
        report.states,
        vec![
            SessionState::Uninitialized,
            SessionState::ClassRegistered,
            SessionState::WindowCreated,
            SessionState::Styled,
            SessionState::Visible,
            SessionState::Running,
            SessionState::Closing,
            SessionState::Terminated,
        ]
    );
}

/// 测试释放失败不影响后续释放
#[test]
fn test_release_failure_continues() {
    let (platform, session) = started(RenderConfig::default());
    platform.fail_on(CallKind::DestroyWindow);
    session.run_message_loop().unwrap();

    let report = session.report();
    assert_eq!(report.release_failures.len(), 1);
    assert_eq!(report.release_failures[0].source.call, "DestroyWindow");
    assert_eq!(platform.count(CallKind::DeleteObject), 1);
    assert_eq!(platform.count(CallKind::UnregisterClass), 1);
    assert_eq!(platform.quit_code(), Some(0));

    let outstanding = platform.outstanding();
    assert_eq!(outstanding.len(), 1);
    assert_eq!(outstanding[0].0, ResourceKind::Window);
}

/// 测试窗口类已存在：继续运行，关闭时不注销别人的类
#[test]
fn test_class_already_registered() {
    let platform = HeadlessPlatform::new();
    platform
        .register_class(&ClassSpec {
            name: WINDOW_CLASS_NAME.to_string(),
            background: StockBrush::White,
        })
        .unwrap();

    let session = NativeWindowSession::new(platform.clone(), RenderConfig::default());
    session.start().unwrap();
    session.run_message_loop().unwrap();

    assert_eq!(platform.count(CallKind::UnregisterClass), 0);
    let outstanding = platform.outstanding();
    assert_eq!(outstanding.len(), 1);
    assert_eq!(outstanding[0].0, ResourceKind::WindowClass);
}

/// 测试类注册失败
#[test]
fn test_class_registration_failure() {
    let platform = HeadlessPlatform::new();
    platform.fail_on(CallKind::RegisterClass);
    let session = NativeWindowSession::new(platform.clone(), RenderConfig::default());

    let err = session.start().unwrap_err();
    assert!(matches!(err, RenderError::ClassRegistration(_)));
    session.abort();
    assert_eq!(session.state(), SessionState::Terminated);
    assert_eq!(platform.count(CallKind::CreateWindow), 0);
    assert!(platform.outstanding().is_empty());
}

/// 测试窗口创建失败：释放已取得的类和位图，窗口从未显示
#[test]
fn test_window_creation_failure_partial_teardown() {
    let platform = HeadlessPlatform::new();
    platform.fail_on(CallKind::CreateWindow);
    let session = NativeWindowSession::new(platform.clone(), RenderConfig::default());

    let err = session.start().unwrap_err();
    assert!(matches!(err, RenderError::WindowCreation(_)));
    session.abort();

    assert_eq!(platform.count(CallKind::ShowWindow), 0);
    assert_eq!(platform.count(CallKind::DestroyWindow), 0);
    assert_eq!(platform.count(CallKind::DeleteObject), 1);
    assert_eq!(platform.count(CallKind::UnregisterClass), 1);
    assert!(platform.outstanding().is_empty());
    assert_eq!(
        session.report().states,
        vec![SessionState::Uninitialized, SessionState::ClassRegistered, SessionState::Terminated]
    );
}

/// 测试 start 之外的乱序调用被拒绝
#[test]
fn test_out_of_order_transition() {
    let platform = HeadlessPlatform::new();
    let session = NativeWindowSession::new(platform.clone(), RenderConfig::default());
    assert!(matches!(
        session.create_window(),
        Err(RenderError::InvalidTransition { from: SessionState::Uninitialized, .. })
    ));
    assert!(matches!(session.show(), Err(RenderError::InvalidTransition { .. })));
    assert!(platform.calls().is_empty());
}

/// 测试进入消息循环之前收到的关闭请求被忽略，窗口保持可用
#[test]
fn test_close_before_running_ignored() {
    let (platform, session) = started(RenderConfig::default());
    let window = session.window().unwrap();

    assert_eq!(session.window_procedure(&Message::new(window, WM_CLOSE)), Some(0));
    assert_eq!(session.state(), SessionState::Visible);
    assert_eq!(platform.count(CallKind::DestroyWindow), 0);
    assert!(!platform.calls().contains(&NativeCall::DefaultWindowProcedure(WM_CLOSE)));
    assert_eq!(platform.quit_code(), None);

    // 之后的正常关闭不受影响
    session.run_message_loop().unwrap();
    assert_eq!(session.state(), SessionState::Terminated);
    assert!(platform.outstanding().is_empty());
}

/// 测试按键消息被翻译成字符消息
#[test]
fn test_key_down_translated() {
    let (platform, session) = started(RenderConfig::default());
    let window = session.window().unwrap();
    platform.post_message(Message::new(window, WM_KEYDOWN));
    session.run_message_loop().unwrap();

    let calls = platform.calls();
    assert!(calls.contains(&NativeCall::TranslateMessage(WM_KEYDOWN)));
    assert!(calls.contains(&NativeCall::DispatchMessage(WM_CHAR)));
    assert!(calls.contains(&NativeCall::DefaultWindowProcedure(WM_CHAR)));
}

/// 测试合成状态变化时重新应用帧扩展与模糊
#[test]
fn test_composition_changed_reapplies_blur() {
    let (platform, session) = started(full_chrome_config());
    let window = session.window().unwrap();
    assert_eq!(platform.count(CallKind::ExtendFrame), 1);
    assert_eq!(platform.count(CallKind::EnableBlurBehind), 1);

    platform.post_message(Message::new(window, WM_DWMCOMPOSITIONCHANGED));
    session.run_message_loop().unwrap();

    assert_eq!(platform.count(CallKind::ExtendFrame), 2);
    assert_eq!(platform.count(CallKind::EnableBlurBehind), 2);
    assert_eq!(platform.count(CallKind::SetAccentPolicy), 2);
    assert!(!platform
        .calls()
        .contains(&NativeCall::DefaultWindowProcedure(WM_DWMCOMPOSITIONCHANGED)));
}

/// 测试只开模糊时合成状态变化不扩展边框
#[test]
fn test_composition_changed_blur_only() {
    let config = RenderConfig { blur: true, ..Default::default() };
    let (platform, session) = started(config);
    let window = session.window().unwrap();
    platform.post_message(Message::new(window, WM_DWMCOMPOSITIONCHANGED));
    session.run_message_loop().unwrap();

    assert_eq!(platform.count(CallKind::ExtendFrame), 0);
    assert_eq!(platform.count(CallKind::EnableBlurBehind), 2);
    assert!(!platform
        .calls()
        .contains(&NativeCall::DefaultWindowProcedure(WM_DWMCOMPOSITIONCHANGED)));
}

/// 测试只开透明时合成状态变化重新扩展边框，不开模糊
#[test]
fn test_composition_changed_transparent_only() {
    let config = RenderConfig { transparent: true, ..Default::default() };
    let (platform, session) = started(config);
    let window = session.window().unwrap();
    assert_eq!(platform.count(CallKind::ExtendFrame), 1);
    platform.post_message(Message::new(window, WM_DWMCOMPOSITIONCHANGED));
    session.run_message_loop().unwrap();

    assert_eq!(platform.count(CallKind::ExtendFrame), 2);
    assert_eq!(platform.count(CallKind::EnableBlurBehind), 0);
    assert_eq!(platform.count(CallKind::SetAccentPolicy), 0);
    assert!(!platform
        .calls()
        .contains(&NativeCall::DefaultWindowProcedure(WM_DWMCOMPOSITIONCHANGED)));
}

/// 测试既不透明也不模糊时合成状态变化交给默认过程
#[test]
fn test_composition_changed_forwarded_without_blur() {
    let (platform, session) = started(RenderConfig::default());
    let window = session.window().unwrap();
    platform.post_message(Message::new(window, WM_DWMCOMPOSITIONCHANGED));
    session.run_message_loop().unwrap();

    assert_eq!(platform.count(CallKind::EnableBlurBehind), 0);
    assert!(platform
        .calls()
        .contains(&NativeCall::DefaultWindowProcedure(WM_DWMCOMPOSITIONCHANGED)));
}

/// 测试会话丢弃时兜底释放
#[test]
fn test_drop_releases_resources() {
    let (platform, session) = started(RenderConfig::default());
    assert!(!platform.outstanding().is_empty());
    drop(session);
    assert!(platform.outstanding().is_empty());
    assert_eq!(platform.live_windows(), 0);
}
