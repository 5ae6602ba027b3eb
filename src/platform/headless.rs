//! 内存中的平台实现
//!
//! 行为与 Win32 调用保持一致，同时：
//! - 按顺序记录每一次原生调用
//! - 记录资源获取/释放流水，用于检查关闭后是否全部归还
//! - 可以让指定调用失败
//! - BitBlt 写入每个窗口的"屏幕"缓冲，可导出为图片
//! - 消息队列为空时模拟用户关闭窗口，使消息循环能确定地结束

use super::{
    AccentPolicy, BitmapInfoHeader, Blit, BlurBehind, ClassRegistration, ClassSpec, DeviceContext,
    GdiObject, Margins, Message, PaintRect, PaintStruct, Platform, StockBrush, WindowAttribute,
    WindowHandle, WindowProcedure, WindowSpec, SRCCOPY, WM_CHAR, WM_CLOSE, WM_KEYDOWN, WM_PAINT,
};
use crate::error::PlatformError;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};
use tracing::trace;

const ERROR_INVALID_PARAMETER: u32 = 87;
const ERROR_PROC_NOT_FOUND: u32 = 127;
const ERROR_INVALID_WINDOW_HANDLE: u32 = 1400;
const ERROR_CANNOT_FIND_WND_CLASS: u32 = 1407;
const ERROR_CLASS_DOES_NOT_EXIST: u32 = 1411;
const ERROR_INVALID_HANDLE: u32 = 6;

/// 一次原生调用及其参数
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    RegisterClass { name: String, background: StockBrush },
    UnregisterClass { name: String },
    CreateBitmap { width: i32, height: i32 },
    WriteBitmap { bitmap: GdiObject, bytes: usize },
    DeleteObject(GdiObject),
    CreateWindow(WindowSpec),
    DestroyWindow(WindowHandle),
    ShowWindow(WindowHandle),
    UpdateWindow(WindowHandle),
    Attach(WindowHandle),
    Detach(WindowHandle),
    SetWindowAttribute { window: WindowHandle, attribute: WindowAttribute, value: i32 },
    ExtendFrame { window: WindowHandle, margins: Margins },
    EnableBlurBehind { window: WindowHandle, blur: BlurBehind },
    SetAccentPolicy { window: WindowHandle, policy: AccentPolicy },
    BeginPaint(WindowHandle),
    EndPaint(WindowHandle),
    CreateCompatibleDc(DeviceContext),
    SelectObject { dc: DeviceContext, object: GdiObject },
    BitBlt(Blit),
    DeleteDc(DeviceContext),
    GetMessage,
    TranslateMessage(u32),
    DispatchMessage(u32),
    DefaultWindowProcedure(u32),
    PostQuitMessage(i32),
}

/// 调用种类，用于失败注入与顺序断言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    RegisterClass,
    UnregisterClass,
    CreateBitmap,
    WriteBitmap,
    DeleteObject,
    CreateWindow,
    DestroyWindow,
    ShowWindow,
    UpdateWindow,
    Attach,
    Detach,
    SetWindowAttribute,
    ExtendFrame,
    EnableBlurBehind,
    SetAccentPolicy,
    BeginPaint,
    EndPaint,
    CreateCompatibleDc,
    SelectObject,
    BitBlt,
    DeleteDc,
    GetMessage,
    TranslateMessage,
    DispatchMessage,
    DefaultWindowProcedure,
    PostQuitMessage,
}

impl CallKind {
    /// 对应的 Win32 函数名
    pub fn native_name(self) -> &'static str {
        match self {
            CallKind::RegisterClass => "RegisterClassExW",
            CallKind::UnregisterClass => "UnregisterClassW",
            CallKind::CreateBitmap => "CreateDIBSection",
            CallKind::WriteBitmap => "WriteBitmap",
            CallKind::DeleteObject => "DeleteObject",
            CallKind::CreateWindow => "CreateWindowExW",
            CallKind::DestroyWindow => "DestroyWindow",
            CallKind::ShowWindow => "ShowWindow",
            CallKind::UpdateWindow => "UpdateWindow",
            CallKind::Attach => "AttachWindowProcedure",
            CallKind::Detach => "DetachWindowProcedure",
            CallKind::SetWindowAttribute => "DwmSetWindowAttribute",
            CallKind::ExtendFrame => "DwmExtendFrameIntoClientArea",
            CallKind::EnableBlurBehind => "DwmEnableBlurBehindWindow",
            CallKind::SetAccentPolicy => "SetWindowCompositionAttribute",
            CallKind::BeginPaint => "BeginPaint",
            CallKind::EndPaint => "EndPaint",
            CallKind::CreateCompatibleDc => "CreateCompatibleDC",
            CallKind::SelectObject => "SelectObject",
            CallKind::BitBlt => "BitBlt",
            CallKind::DeleteDc => "DeleteDC",
            CallKind::GetMessage => "GetMessageW",
            CallKind::TranslateMessage => "TranslateMessage",
            CallKind::DispatchMessage => "DispatchMessageW",
            CallKind::DefaultWindowProcedure => "DefWindowProcW",
            CallKind::PostQuitMessage => "PostQuitMessage",
        }
    }
}

impl NativeCall {
    pub fn kind(&self) -> CallKind {
        match self {
            NativeCall::RegisterClass { .. } => CallKind::RegisterClass,
            NativeCall::UnregisterClass { .. } => CallKind::UnregisterClass,
            NativeCall::CreateBitmap { .. } => CallKind::CreateBitmap,
            NativeCall::WriteBitmap { .. } => CallKind::WriteBitmap,
            NativeCall::DeleteObject(_) => CallKind::DeleteObject,
            NativeCall::CreateWindow(_) => CallKind::CreateWindow,
            NativeCall::DestroyWindow(_) => CallKind::DestroyWindow,
            NativeCall::ShowWindow(_) => CallKind::ShowWindow,
            NativeCall::UpdateWindow(_) => CallKind::UpdateWindow,
            NativeCall::Attach(_) => CallKind::Attach,
            NativeCall::Detach(_) => CallKind::Detach,
            NativeCall::SetWindowAttribute { .. } => CallKind::SetWindowAttribute,
            NativeCall::ExtendFrame { .. } => CallKind::ExtendFrame,
            NativeCall::EnableBlurBehind { .. } => CallKind::EnableBlurBehind,
            NativeCall::SetAccentPolicy { .. } => CallKind::SetAccentPolicy,
            NativeCall::BeginPaint(_) => CallKind::BeginPaint,
            NativeCall::EndPaint(_) => CallKind::EndPaint,
            NativeCall::CreateCompatibleDc(_) => CallKind::CreateCompatibleDc,
            NativeCall::SelectObject { .. } => CallKind::SelectObject,
            NativeCall::BitBlt(_) => CallKind::BitBlt,
            NativeCall::DeleteDc(_) => CallKind::DeleteDc,
            NativeCall::GetMessage => CallKind::GetMessage,
            NativeCall::TranslateMessage(_) => CallKind::TranslateMessage,
            NativeCall::DispatchMessage(_) => CallKind::DispatchMessage,
            NativeCall::DefaultWindowProcedure(_) => CallKind::DefaultWindowProcedure,
            NativeCall::PostQuitMessage(_) => CallKind::PostQuitMessage,
        }
    }
}

/// 需要成对获取/释放的资源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    WindowClass,
    Bitmap,
    Window,
    Route,
    PaintSession,
    DeviceContext,
    /// 向内存 DC 选入了非默认对象
    Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    Acquire(ResourceKind, isize),
    Release(ResourceKind, isize),
}

struct HeadlessBitmap {
    width: i32,
    height: i32,
    pixels: Vec<u8>,
}

struct HeadlessWindow {
    width: i32,
    height: i32,
    visible: bool,
    screen: Vec<u8>,
}

struct HeadlessDc {
    /// 窗口绘制 DC 绑定的窗口；内存 DC 为 `None`
    window: Option<WindowHandle>,
    selected: GdiObject,
    stock: GdiObject,
}

struct HeadlessState {
    next_handle: isize,
    calls: Vec<NativeCall>,
    ledger: Vec<LedgerEvent>,
    failures: HashSet<CallKind>,
    failing_attributes: HashSet<WindowAttribute>,
    accent_policy_available: bool,
    close_when_idle: bool,
    classes: HashMap<String, isize>,
    bitmaps: HashMap<isize, HeadlessBitmap>,
    windows: HashMap<isize, HeadlessWindow>,
    /// 已销毁窗口最后的画面
    retired: HashMap<isize, HeadlessWindow>,
    routes: HashMap<isize, Weak<dyn WindowProcedure>>,
    dcs: HashMap<isize, HeadlessDc>,
    queue: VecDeque<Message>,
    quit: Option<i32>,
    /// 已投递、尚未被 GetMessage 取走的退出消息
    pending_quit: bool,
    last_window: Option<WindowHandle>,
}

impl HeadlessState {
    fn new() -> Self {
        Self {
            next_handle: 0x100,
            calls: Vec::new(),
            ledger: Vec::new(),
            failures: HashSet::new(),
            failing_attributes: HashSet::new(),
            accent_policy_available: true,
            close_when_idle: true,
            classes: HashMap::new(),
            bitmaps: HashMap::new(),
            windows: HashMap::new(),
            retired: HashMap::new(),
            routes: HashMap::new(),
            dcs: HashMap::new(),
            queue: VecDeque::new(),
            quit: None,
            pending_quit: false,
            last_window: None,
        }
    }

    fn handle(&mut self) -> isize {
        self.next_handle += 4;
        self.next_handle
    }

    /// 记录调用；若该调用被设置为失败则返回错误
    fn record(&mut self, call: NativeCall) -> Result<(), PlatformError> {
        let kind = call.kind();
        trace!(?call, "native call");
        self.calls.push(call);
        if self.failures.contains(&kind) {
            return Err(PlatformError::new(kind.native_name(), ERROR_INVALID_PARAMETER));
        }
        Ok(())
    }

    fn acquire(&mut self, kind: ResourceKind, id: isize) {
        self.ledger.push(LedgerEvent::Acquire(kind, id));
    }

    fn release(&mut self, kind: ResourceKind, id: isize) {
        self.ledger.push(LedgerEvent::Release(kind, id));
    }

    fn require_window(&self, window: WindowHandle, call: CallKind) -> Result<(), PlatformError> {
        if self.windows.contains_key(&window.0) {
            Ok(())
        } else {
            Err(PlatformError::new(call.native_name(), ERROR_INVALID_WINDOW_HANDLE))
        }
    }
}

/// 内存平台；克隆共享同一份状态
#[derive(Clone)]
pub struct HeadlessPlatform {
    state: Rc<RefCell<HeadlessState>>,
}

impl std::fmt::Debug for HeadlessPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HeadlessPlatform")
            .field("calls", &state.calls.len())
            .field("windows", &state.windows.len())
            .field("quit", &state.quit)
            .finish()
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HeadlessState::new())),
        }
    }

    /// 让某类调用此后都失败
    pub fn fail_on(&self, kind: CallKind) {
        self.state.borrow_mut().failures.insert(kind);
    }

    /// 只让设置某个 DWM 属性的调用失败
    pub fn fail_attribute(&self, attribute: WindowAttribute) {
        self.state.borrow_mut().failing_attributes.insert(attribute);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.failures.clear();
        state.failing_attributes.clear();
    }

    /// 模拟没有 accent policy 接口的系统
    pub fn set_accent_policy_available(&self, available: bool) {
        self.state.borrow_mut().accent_policy_available = available;
    }

    /// 队列为空时是否模拟关闭窗口（默认开启）
    pub fn set_close_when_idle(&self, close: bool) {
        self.state.borrow_mut().close_when_idle = close;
    }

    /// 投递一条消息到队列尾部
    pub fn post_message(&self, message: Message) {
        self.state.borrow_mut().queue.push_back(message);
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.borrow().calls.clone()
    }

    pub fn call_kinds(&self) -> Vec<CallKind> {
        self.state.borrow().calls.iter().map(NativeCall::kind).collect()
    }

    /// 某类调用第一次出现的位置
    pub fn position(&self, kind: CallKind) -> Option<usize> {
        self.state.borrow().calls.iter().position(|c| c.kind() == kind)
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.state.borrow().calls.iter().filter(|c| c.kind() == kind).count()
    }

    pub fn ledger(&self) -> Vec<LedgerEvent> {
        self.state.borrow().ledger.clone()
    }

    pub fn acquire_count(&self) -> usize {
        self.state
            .borrow()
            .ledger
            .iter()
            .filter(|e| matches!(e, LedgerEvent::Acquire(..)))
            .count()
    }

    pub fn release_count(&self) -> usize {
        self.state
            .borrow()
            .ledger
            .iter()
            .filter(|e| matches!(e, LedgerEvent::Release(..)))
            .count()
    }

    /// 已获取但尚未释放的资源
    pub fn outstanding(&self) -> Vec<(ResourceKind, isize)> {
        let state = self.state.borrow();
        let mut live: Vec<(ResourceKind, isize)> = Vec::new();
        for event in &state.ledger {
            match *event {
                LedgerEvent::Acquire(kind, id) => live.push((kind, id)),
                LedgerEvent::Release(kind, id) => {
                    if let Some(pos) = live.iter().rposition(|&(k, i)| k == kind && i == id) {
                        live.remove(pos);
                    }
                }
            }
        }
        live
    }

    pub fn live_windows(&self) -> usize {
        self.state.borrow().windows.len()
    }

    pub fn is_visible(&self, window: WindowHandle) -> bool {
        self.state
            .borrow()
            .windows
            .get(&window.0)
            .map(|w| w.visible)
            .unwrap_or(false)
    }

    /// 窗口"屏幕"内容（预乘 BGRA）及尺寸；窗口销毁后仍保留最后的画面
    pub fn window_pixels(&self, window: WindowHandle) -> Option<(u32, u32, Vec<u8>)> {
        let state = self.state.borrow();
        let screen = state
            .windows
            .get(&window.0)
            .or_else(|| state.retired.get(&window.0))
            .map(|w| (w.width as u32, w.height as u32, w.screen.clone()));
        screen
    }

    /// 最近一次创建的窗口
    pub fn last_window(&self) -> Option<WindowHandle> {
        self.state.borrow().last_window
    }

    pub fn quit_code(&self) -> Option<i32> {
        self.state.borrow().quit
    }

    fn route(&self, window: WindowHandle) -> Option<Rc<dyn WindowProcedure>> {
        self.state.borrow().routes.get(&window.0).and_then(Weak::upgrade)
    }

    /// 先交给已挂接的窗口过程，未处理时走默认过程。调用期间不持有内部借用。
    fn deliver(&self, message: &Message) -> isize {
        if let Some(procedure) = self.route(message.window) {
            if let Some(result) = procedure.window_procedure(message) {
                return result;
            }
        }
        self.default_window_procedure(message)
    }
}

impl Platform for HeadlessPlatform {
    fn register_class(&self, class: &ClassSpec) -> Result<ClassRegistration, PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::RegisterClass {
            name: class.name.clone(),
            background: class.background,
        })?;
        if state.classes.contains_key(&class.name) {
            return Ok(ClassRegistration::AlreadyExists);
        }
        let id = state.handle();
        state.classes.insert(class.name.clone(), id);
        state.acquire(ResourceKind::WindowClass, id);
        Ok(ClassRegistration::Registered)
    }

    fn unregister_class(&self, name: &str) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::UnregisterClass { name: name.to_string() })?;
        let id = state
            .classes
            .remove(name)
            .ok_or(PlatformError::new(CallKind::UnregisterClass.native_name(), ERROR_CLASS_DOES_NOT_EXIST))?;
        state.release(ResourceKind::WindowClass, id);
        Ok(())
    }

    fn create_bitmap(&self, header: &BitmapInfoHeader) -> Result<GdiObject, PlatformError> {
        let mut state = self.state.borrow_mut();
        let width = header.pixel_width();
        let height = header.pixel_height();
        state.record(NativeCall::CreateBitmap { width, height })?;
        if header.size as usize != std::mem::size_of::<BitmapInfoHeader>()
            || header.bit_count != 32
            || header.planes != 1
            || width <= 0
            || height <= 0
        {
            return Err(PlatformError::new(CallKind::CreateBitmap.native_name(), ERROR_INVALID_PARAMETER));
        }
        let id = state.handle();
        state.bitmaps.insert(id, HeadlessBitmap {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        });
        state.acquire(ResourceKind::Bitmap, id);
        Ok(GdiObject(id))
    }

    fn write_bitmap(&self, bitmap: GdiObject, pixels: &[u8], stride: usize) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::WriteBitmap { bitmap, bytes: pixels.len() })?;
        let target = state
            .bitmaps
            .get_mut(&bitmap.0)
            .ok_or(PlatformError::new(CallKind::WriteBitmap.native_name(), ERROR_INVALID_HANDLE))?;
        let row_bytes = target.width as usize * 4;
        if stride == 0 {
            return Err(PlatformError::new(CallKind::WriteBitmap.native_name(), ERROR_INVALID_PARAMETER));
        }
        for (row, src) in pixels.chunks(stride).take(target.height as usize).enumerate() {
            let len = row_bytes.min(src.len());
            let start = row * row_bytes;
            target.pixels[start..start + len].copy_from_slice(&src[..len]);
        }
        Ok(())
    }

    fn delete_object(&self, object: GdiObject) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::DeleteObject(object))?;
        if state.bitmaps.remove(&object.0).is_none() {
            return Err(PlatformError::new(CallKind::DeleteObject.native_name(), ERROR_INVALID_HANDLE));
        }
        state.release(ResourceKind::Bitmap, object.0);
        Ok(())
    }

    fn create_window(&self, spec: &WindowSpec) -> Result<WindowHandle, PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::CreateWindow(spec.clone()))?;
        if !state.classes.contains_key(&spec.class_name) {
            return Err(PlatformError::new(CallKind::CreateWindow.native_name(), ERROR_CANNOT_FIND_WND_CLASS));
        }
        let width = spec.width.max(1);
        let height = spec.height.max(1);
        let id = state.handle();
        state.windows.insert(id, HeadlessWindow {
            width,
            height,
            visible: false,
            screen: vec![0; width as usize * height as usize * 4],
        });
        state.acquire(ResourceKind::Window, id);
        state.last_window = Some(WindowHandle(id));
        Ok(WindowHandle(id))
    }

    fn destroy_window(&self, window: WindowHandle) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::DestroyWindow(window))?;
        let mut destroyed = state
            .windows
            .remove(&window.0)
            .ok_or(PlatformError::new(CallKind::DestroyWindow.native_name(), ERROR_INVALID_WINDOW_HANDLE))?;
        destroyed.visible = false;
        state.retired.insert(window.0, destroyed);
        state.release(ResourceKind::Window, window.0);
        Ok(())
    }

    fn show_window(&self, window: WindowHandle) {
        let mut state = self.state.borrow_mut();
        let _ = state.record(NativeCall::ShowWindow(window));
        if let Some(w) = state.windows.get_mut(&window.0) {
            w.visible = true;
        }
    }

    fn update_window(&self, window: WindowHandle) {
        let visible = {
            let mut state = self.state.borrow_mut();
            let _ = state.record(NativeCall::UpdateWindow(window));
            state.windows.get(&window.0).map(|w| w.visible).unwrap_or(false)
        };
        if visible {
            self.deliver(&Message::new(window, WM_PAINT));
        }
    }

    fn attach(&self, window: WindowHandle, procedure: Weak<dyn WindowProcedure>) {
        let mut state = self.state.borrow_mut();
        let _ = state.record(NativeCall::Attach(window));
        if state.routes.insert(window.0, procedure).is_none() {
            state.acquire(ResourceKind::Route, window.0);
        }
    }

    fn detach(&self, window: WindowHandle) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::Detach(window))?;
        if state.routes.remove(&window.0).is_none() {
            return Err(PlatformError::new(CallKind::Detach.native_name(), ERROR_INVALID_WINDOW_HANDLE));
        }
        state.release(ResourceKind::Route, window.0);
        Ok(())
    }

    fn set_window_attribute(&self, window: WindowHandle, attribute: WindowAttribute, value: i32) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::SetWindowAttribute { window, attribute, value })?;
        if state.failing_attributes.contains(&attribute) {
            return Err(PlatformError::new(CallKind::SetWindowAttribute.native_name(), ERROR_INVALID_PARAMETER));
        }
        state.require_window(window, CallKind::SetWindowAttribute)
    }

    fn extend_frame_into_client_area(&self, window: WindowHandle, margins: &Margins) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::ExtendFrame { window, margins: *margins })?;
        state.require_window(window, CallKind::ExtendFrame)
    }

    fn enable_blur_behind(&self, window: WindowHandle, blur: &BlurBehind) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::EnableBlurBehind { window, blur: *blur })?;
        state.require_window(window, CallKind::EnableBlurBehind)
    }

    fn accent_policy_available(&self) -> bool {
        self.state.borrow().accent_policy_available
    }

    fn set_accent_policy(&self, window: WindowHandle, policy: &AccentPolicy) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::SetAccentPolicy { window, policy: *policy })?;
        if !state.accent_policy_available {
            return Err(PlatformError::new(CallKind::SetAccentPolicy.native_name(), ERROR_PROC_NOT_FOUND));
        }
        state.require_window(window, CallKind::SetAccentPolicy)
    }

    fn begin_paint(&self, window: WindowHandle) -> Result<PaintStruct, PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::BeginPaint(window))?;
        let (width, height) = state
            .windows
            .get(&window.0)
            .map(|w| (w.width, w.height))
            .ok_or(PlatformError::new(CallKind::BeginPaint.native_name(), ERROR_INVALID_WINDOW_HANDLE))?;
        let dc = state.handle();
        let stock = GdiObject(state.handle());
        state.dcs.insert(dc, HeadlessDc { window: Some(window), selected: stock, stock });
        state.acquire(ResourceKind::PaintSession, window.0);
        Ok(PaintStruct {
            dc: DeviceContext(dc),
            erase: 0,
            rect: PaintRect { left: 0, top: 0, right: width, bottom: height },
            ..Default::default()
        })
    }

    fn end_paint(&self, window: WindowHandle, paint: &PaintStruct) {
        let mut state = self.state.borrow_mut();
        let _ = state.record(NativeCall::EndPaint(window));
        if state.dcs.remove(&paint.dc.0).is_some() {
            state.release(ResourceKind::PaintSession, window.0);
        }
    }

    fn create_compatible_dc(&self, dc: DeviceContext) -> Result<DeviceContext, PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::CreateCompatibleDc(dc))?;
        if !state.dcs.contains_key(&dc.0) {
            return Err(PlatformError::new(CallKind::CreateCompatibleDc.native_name(), ERROR_INVALID_HANDLE));
        }
        let memory = state.handle();
        let stock = GdiObject(state.handle());
        state.dcs.insert(memory, HeadlessDc { window: None, selected: stock, stock });
        state.acquire(ResourceKind::DeviceContext, memory);
        Ok(DeviceContext(memory))
    }

    fn select_object(&self, dc: DeviceContext, object: GdiObject) -> Result<GdiObject, PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::SelectObject { dc, object })?;
        let target = state
            .dcs
            .get_mut(&dc.0)
            .ok_or(PlatformError::new(CallKind::SelectObject.native_name(), ERROR_INVALID_HANDLE))?;
        let previous = target.selected;
        let stock = target.stock;
        target.selected = object;
        if object == stock && previous != stock {
            state.release(ResourceKind::Selection, dc.0);
        } else if object != stock && previous == stock {
            state.acquire(ResourceKind::Selection, dc.0);
        }
        Ok(previous)
    }

    fn bit_blt(&self, blit: &Blit) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::BitBlt(*blit))?;
        let fail = |code| PlatformError::new(CallKind::BitBlt.native_name(), code);
        if blit.rop != SRCCOPY {
            return Err(fail(ERROR_INVALID_PARAMETER));
        }
        let source = state.dcs.get(&blit.source.0).ok_or(fail(ERROR_INVALID_HANDLE))?.selected;
        let window = state
            .dcs
            .get(&blit.dest.0)
            .and_then(|dc| dc.window)
            .ok_or(fail(ERROR_INVALID_HANDLE))?;

        let (bw, bh, src_pixels) = match state.bitmaps.get(&source.0) {
            Some(b) => (b.width, b.height, b.pixels.clone()),
            // 内存 DC 里还是默认位图，没有内容可复制
            None => return Ok(()),
        };
        let target = state.windows.get_mut(&window.0).ok_or(fail(ERROR_INVALID_WINDOW_HANDLE))?;

        for row in 0..blit.height {
            let sy = blit.source_y + row;
            let dy = blit.y + row;
            if sy < 0 || sy >= bh || dy < 0 || dy >= target.height {
                continue;
            }
            for col in 0..blit.width {
                let sx = blit.source_x + col;
                let dx = blit.x + col;
                if sx < 0 || sx >= bw || dx < 0 || dx >= target.width {
                    continue;
                }
                let s = (sy as usize * bw as usize + sx as usize) * 4;
                let d = (dy as usize * target.width as usize + dx as usize) * 4;
                target.screen[d..d + 4].copy_from_slice(&src_pixels[s..s + 4]);
            }
        }
        Ok(())
    }

    fn delete_dc(&self, dc: DeviceContext) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.record(NativeCall::DeleteDc(dc))?;
        if state.dcs.remove(&dc.0).is_none() {
            return Err(PlatformError::new(CallKind::DeleteDc.native_name(), ERROR_INVALID_HANDLE));
        }
        state.release(ResourceKind::DeviceContext, dc.0);
        Ok(())
    }

    fn get_message(&self) -> Option<Message> {
        let mut state = self.state.borrow_mut();
        let _ = state.record(NativeCall::GetMessage);
        if let Some(message) = state.queue.pop_front() {
            return Some(message);
        }
        if state.pending_quit {
            state.pending_quit = false;
            return None;
        }
        // 真实系统会在这里阻塞；无人关闭时模拟用户关闭窗口
        if state.close_when_idle {
            if let Some(&window) = state.routes.keys().min() {
                return Some(Message::new(WindowHandle(window), WM_CLOSE));
            }
        }
        None
    }

    fn translate_message(&self, message: &Message) {
        let mut state = self.state.borrow_mut();
        let _ = state.record(NativeCall::TranslateMessage(message.id));
        if message.id == WM_KEYDOWN {
            state.queue.push_back(Message {
                id: WM_CHAR,
                ..*message
            });
        }
    }

    fn dispatch_message(&self, message: &Message) -> isize {
        {
            let mut state = self.state.borrow_mut();
            let _ = state.record(NativeCall::DispatchMessage(message.id));
        }
        self.deliver(message)
    }

    fn default_window_procedure(&self, message: &Message) -> isize {
        let mut state = self.state.borrow_mut();
        let _ = state.record(NativeCall::DefaultWindowProcedure(message.id));
        0
    }

    fn post_quit_message(&self, exit_code: i32) {
        let mut state = self.state.borrow_mut();
        let _ = state.record(NativeCall::PostQuitMessage(exit_code));
        state.quit = Some(exit_code);
        state.pending_quit = true;
    }
}
