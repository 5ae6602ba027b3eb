//! 原生窗口平台边界
//!
//! 渲染核心只通过 [`Platform`] 调用原生 API。`Win32Platform` 是真实实现，
//! `HeadlessPlatform` 在内存中模拟同一组调用，用于测试和离屏快照。
//! 下面的 `#[repr(C)]` 结构与 Win32 对应结构逐位一致。

pub mod headless;
#[cfg(windows)]
pub mod win32;

pub use headless::{CallKind, HeadlessPlatform, LedgerEvent, NativeCall, ResourceKind};
#[cfg(windows)]
pub use win32::Win32Platform;

use crate::error::PlatformError;
use std::ffi::c_void;
use std::ops::BitOr;
use std::rc::Weak;

/// 窗口句柄
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub isize);

/// 设备上下文句柄
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceContext(pub isize);

/// GDI 对象句柄（位图、画刷……）
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GdiObject(pub isize);

impl WindowHandle {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

// 窗口消息
pub const WM_PAINT: u32 = 0x000F;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_QUIT: u32 = 0x0012;
pub const WM_ERASEBKGND: u32 = 0x0014;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_CHAR: u32 = 0x0102;
pub const WM_DWMCOMPOSITIONCHANGED: u32 = 0x031E;

/// 消息分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Paint,
    EraseBackground,
    Close,
    CompositionChanged,
    Other(u32),
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessagePoint {
    pub x: i32,
    pub y: i32,
}

/// 对应 `MSG`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Message {
    pub window: WindowHandle,
    pub id: u32,
    pub wparam: usize,
    pub lparam: isize,
    pub time: u32,
    pub point: MessagePoint,
}

impl Message {
    pub fn new(window: WindowHandle, id: u32) -> Self {
        Self {
            window,
            id,
            ..Default::default()
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self.id {
            WM_PAINT => MessageKind::Paint,
            WM_ERASEBKGND => MessageKind::EraseBackground,
            WM_CLOSE => MessageKind::Close,
            WM_DWMCOMPOSITIONCHANGED => MessageKind::CompositionChanged,
            other => MessageKind::Other(other),
        }
    }
}

/// 窗口样式位 (`WS_*`)
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowStyle(pub u32);

impl WindowStyle {
    pub const OVERLAPPED: Self = Self(0x0000_0000);
    pub const POPUP: Self = Self(0x8000_0000);
    pub const VISIBLE: Self = Self(0x1000_0000);
    pub const CLIP_CHILDREN: Self = Self(0x0200_0000);
    pub const CAPTION: Self = Self(0x00C0_0000);
    pub const SYSTEM_MENU: Self = Self(0x0008_0000);
    pub const THICK_FRAME: Self = Self(0x0004_0000);
    pub const MINIMIZE_BOX: Self = Self(0x0002_0000);
    pub const MAXIMIZE_BOX: Self = Self(0x0001_0000);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for WindowStyle {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// 扩展窗口样式位 (`WS_EX_*`)
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExtendedWindowStyle(pub u32);

impl ExtendedWindowStyle {
    pub const NONE: Self = Self(0x0000_0000);
    pub const TRANSPARENT: Self = Self(0x0000_0020);
    pub const LAYERED: Self = Self(0x0008_0000);
    pub const COMPOSITED: Self = Self(0x0200_0000);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ExtendedWindowStyle {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// `CW_USEDEFAULT`
pub const USE_DEFAULT_POSITION: i32 = 0x8000_0000_u32 as i32;

/// 系统预置画刷 (`GetStockObject`)
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockBrush {
    White = 0,
    LightGray = 1,
    Gray = 2,
    DarkGray = 3,
    Black = 4,
    Null = 5,
}

/// 窗口类注册参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSpec {
    pub name: String,
    pub background: StockBrush,
}

/// 注册结果；`AlreadyExists` 不是错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassRegistration {
    Registered,
    AlreadyExists,
}

/// 窗口创建参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub class_name: String,
    pub title: String,
    pub style: WindowStyle,
    pub ex_style: ExtendedWindowStyle,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// DWM 窗口属性 id (`DWMWA_*`)
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowAttribute(pub u32);

impl WindowAttribute {
    pub const NONCLIENT_RENDERING_POLICY: Self = Self(2);
    pub const USE_IMMERSIVE_DARK_MODE: Self = Self(20);
    pub const WINDOW_CORNER_PREFERENCE: Self = Self(33);
    pub const SYSTEM_BACKDROP_TYPE: Self = Self(38);
}

/// `DWMNCRP_ENABLED`
pub const NONCLIENT_RENDERING_ENABLED: i32 = 2;
/// `DWMWCP_ROUND`
pub const CORNER_PREFERENCE_ROUND: i32 = 2;
/// `DWMSBT_MAINWINDOW` (Mica)
pub const BACKDROP_MAIN_WINDOW: i32 = 2;

/// 对应 `MARGINS`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl Margins {
    /// 整个窗口都作为可绘制的扩展边框
    pub const FULLY_EXTENDED: Self = Self { left: -1, right: -1, top: -1, bottom: -1 };
}

pub const DWM_BB_ENABLE: u32 = 0x0000_0001;
pub const DWM_BB_BLURREGION: u32 = 0x0000_0002;

/// 对应 `DWM_BLURBEHIND`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlurBehind {
    pub flags: u32,
    pub enable: i32,
    pub region: isize,
    pub transition_on_maximized: i32,
}

impl BlurBehind {
    /// 整个窗口区域启用模糊（region 为空即整窗）
    pub const fn entire_window() -> Self {
        Self {
            flags: DWM_BB_ENABLE | DWM_BB_BLURREGION,
            enable: 1,
            region: 0,
            transition_on_maximized: 1,
        }
    }
}

/// accent 类型
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccentKind {
    Disabled = 0,
    Gradient = 1,
    TransparentGradient = 2,
    BlurBehind = 3,
    AcrylicBlurBehind = 4,
}

/// accent policy 负载
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccentPolicy {
    pub accent: i32,
    pub flags: u32,
    pub gradient_color: u32,
    pub animation_id: u32,
}

impl AccentPolicy {
    pub const fn new(kind: AccentKind) -> Self {
        Self {
            accent: kind as i32,
            flags: 0,
            gradient_color: 0x0000_0000,
            animation_id: 0,
        }
    }
}

/// `WCA_ACCENT_POLICY`
pub const WCA_ACCENT_POLICY: u32 = 19;

/// `SetWindowCompositionAttribute` 参数
#[repr(C)]
#[derive(Debug)]
pub struct CompositionAttributeData {
    pub attribute: u32,
    pub data: *mut c_void,
    pub size: usize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// 对应 `PAINTSTRUCT`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintStruct {
    pub dc: DeviceContext,
    pub erase: i32,
    pub rect: PaintRect,
    pub restore: i32,
    pub inc_update: i32,
    pub reserved: [u8; 32],
}

/// 对应 `BITMAPINFOHEADER`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitmapInfoHeader {
    pub size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub image_size: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

/// `BI_RGB`
pub const BI_RGB: u32 = 0;

impl BitmapInfoHeader {
    /// 32 位 BGRA、自上而下（高度为负）
    pub fn top_down_bgra(width: i32, height: i32) -> Self {
        Self {
            size: std::mem::size_of::<Self>() as u32,
            width,
            height: -height,
            planes: 1,
            bit_count: 32,
            compression: BI_RGB,
            ..Default::default()
        }
    }

    pub fn pixel_width(&self) -> i32 {
        self.width
    }

    pub fn pixel_height(&self) -> i32 {
        self.height.abs()
    }
}

/// `SRCCOPY`
pub const SRCCOPY: u32 = 0x00CC_0020;

/// 一次 BitBlt 的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blit {
    pub dest: DeviceContext,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub source: DeviceContext,
    pub source_x: i32,
    pub source_y: i32,
    pub rop: u32,
}

/// 窗口过程：把一条消息交给会话处理。
/// 返回 `None` 表示会话当前无法处理（例如重入），应交给默认过程。
pub trait WindowProcedure {
    fn window_procedure(&self, message: &Message) -> Option<isize>;
}

/// 渲染核心使用的原生调用集合
pub trait Platform {
    /// 注册窗口类；类已存在时返回 `AlreadyExists`
    fn register_class(&self, class: &ClassSpec) -> Result<ClassRegistration, PlatformError>;
    fn unregister_class(&self, name: &str) -> Result<(), PlatformError>;

    /// 创建与 `header` 匹配的 DIB 位图
    fn create_bitmap(&self, header: &BitmapInfoHeader) -> Result<GdiObject, PlatformError>;
    /// 把像素复制进位图内存
    fn write_bitmap(&self, bitmap: GdiObject, pixels: &[u8], stride: usize) -> Result<(), PlatformError>;
    fn delete_object(&self, object: GdiObject) -> Result<(), PlatformError>;

    fn create_window(&self, spec: &WindowSpec) -> Result<WindowHandle, PlatformError>;
    fn destroy_window(&self, window: WindowHandle) -> Result<(), PlatformError>;
    fn show_window(&self, window: WindowHandle);
    /// 立即处理待绘制区域（同步发送 paint）
    fn update_window(&self, window: WindowHandle);

    /// 把窗口消息路由到 `procedure`
    fn attach(&self, window: WindowHandle, procedure: Weak<dyn WindowProcedure>);
    fn detach(&self, window: WindowHandle) -> Result<(), PlatformError>;

    fn set_window_attribute(&self, window: WindowHandle, attribute: WindowAttribute, value: i32) -> Result<(), PlatformError>;
    fn extend_frame_into_client_area(&self, window: WindowHandle, margins: &Margins) -> Result<(), PlatformError>;
    fn enable_blur_behind(&self, window: WindowHandle, blur: &BlurBehind) -> Result<(), PlatformError>;
    /// 当前系统是否提供 accent policy 接口
    fn accent_policy_available(&self) -> bool;
    fn set_accent_policy(&self, window: WindowHandle, policy: &AccentPolicy) -> Result<(), PlatformError>;

    fn begin_paint(&self, window: WindowHandle) -> Result<PaintStruct, PlatformError>;
    fn end_paint(&self, window: WindowHandle, paint: &PaintStruct);
    fn create_compatible_dc(&self, dc: DeviceContext) -> Result<DeviceContext, PlatformError>;
    /// 选入对象，返回之前选入的对象
    fn select_object(&self, dc: DeviceContext, object: GdiObject) -> Result<GdiObject, PlatformError>;
    fn bit_blt(&self, blit: &Blit) -> Result<(), PlatformError>;
    fn delete_dc(&self, dc: DeviceContext) -> Result<(), PlatformError>;

    /// 取下一条消息；`None` 表示收到退出信号
    fn get_message(&self) -> Option<Message>;
    fn translate_message(&self, message: &Message);
    fn dispatch_message(&self, message: &Message) -> isize;
    fn default_window_procedure(&self, message: &Message) -> isize;
    fn post_quit_message(&self, exit_code: i32);
}
