//! Win32 平台实现
//!
//! 所有 `unsafe` 都集中在这里。窗口消息经由一个共享的 `extern "system"` 窗口过程，
//! 按窗口句柄查路由表转交给会话；没有路由或会话正忙时走 `DefWindowProcW`。

use super::{
    AccentPolicy, BitmapInfoHeader, Blit, BlurBehind, ClassRegistration, ClassSpec,
    CompositionAttributeData, DeviceContext, ExtendedWindowStyle, GdiObject, Margins, Message,
    MessagePoint, PaintRect, PaintStruct, Platform, WindowAttribute, WindowHandle,
    WindowProcedure, WindowSpec, WCA_ACCENT_POLICY,
};
use crate::error::PlatformError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::rc::Weak;
use tracing::{debug, warn};
use windows::core::{BOOL, PCSTR, PCWSTR};
use windows::Win32::Foundation::{
    GetLastError, COLORREF, ERROR_CLASS_ALREADY_EXISTS, HINSTANCE, HWND, LPARAM, LRESULT, POINT,
    WPARAM,
};
use windows::Win32::Graphics::Dwm::{
    DwmEnableBlurBehindWindow, DwmExtendFrameIntoClientArea, DwmSetWindowAttribute,
    DWMWINDOWATTRIBUTE, DWM_BLURBEHIND,
};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, BitBlt, CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, EndPaint,
    GetStockObject, SelectObject, UpdateWindow, BITMAPINFO, BITMAPINFOHEADER, DIB_RGB_COLORS,
    GET_STOCK_OBJECT_FLAGS, HBRUSH, HDC, HGDIOBJ, HRGN, PAINTSTRUCT, ROP_CODE,
};
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::Win32::UI::Controls::MARGINS;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, LoadCursorW,
    PostQuitMessage, RegisterClassExW, SetLayeredWindowAttributes, ShowWindow, TranslateMessage,
    UnregisterClassW, CS_HREDRAW, CS_VREDRAW, IDC_ARROW, LWA_ALPHA, MSG, SW_SHOW,
    WINDOW_EX_STYLE, WINDOW_STYLE, WNDCLASSEXW,
};

/// `SetWindowCompositionAttribute` 未公开导出，运行时从 user32 查找
type SetWindowCompositionAttributeFn =
    unsafe extern "system" fn(HWND, *mut CompositionAttributeData) -> i32;

thread_local! {
    static ROUTES: RefCell<HashMap<isize, Weak<dyn WindowProcedure>>> = RefCell::new(HashMap::new());
}

unsafe extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let procedure = ROUTES.with(|routes| {
        routes
            .borrow()
            .get(&(hwnd.0 as isize))
            .and_then(Weak::upgrade)
    });

    if let Some(procedure) = procedure {
        let message = Message {
            window: WindowHandle(hwnd.0 as isize),
            id: msg,
            wparam: wparam.0,
            lparam: lparam.0,
            ..Default::default()
        };
        if let Some(result) = procedure.window_procedure(&message) {
            return LRESULT(result);
        }
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut c_void)
}

fn hdc(dc: DeviceContext) -> HDC {
    HDC(dc.0 as *mut c_void)
}

fn hgdiobj(object: GdiObject) -> HGDIOBJ {
    HGDIOBJ(object.0 as *mut c_void)
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn last_error(call: &'static str) -> PlatformError {
    let code = unsafe { GetLastError() }.0;
    PlatformError::new(call, code)
}

fn native_message(message: &Message) -> MSG {
    MSG {
        hwnd: hwnd(message.window),
        message: message.id,
        wParam: WPARAM(message.wparam),
        lParam: LPARAM(message.lparam),
        time: message.time,
        pt: POINT { x: message.point.x, y: message.point.y },
        ..Default::default()
    }
}

/// DIB 位图的像素内存
struct DibBits {
    bits: *mut u8,
    row_bytes: usize,
    rows: usize,
}

/// 真实的 Win32 平台
pub struct Win32Platform {
    instance: HINSTANCE,
    set_composition_attribute: Option<SetWindowCompositionAttributeFn>,
    dibs: RefCell<HashMap<isize, DibBits>>,
}

impl std::fmt::Debug for Win32Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Win32Platform")
            .field("accent_policy", &self.set_composition_attribute.is_some())
            .finish_non_exhaustive()
    }
}

impl Win32Platform {
    pub fn new() -> Result<Self, PlatformError> {
        let module = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|e| PlatformError::new("GetModuleHandleW", e.code().0 as u32))?;

        let set_composition_attribute = unsafe {
            let user32 = wide("user32.dll");
            GetModuleHandleW(PCWSTR(user32.as_ptr()))
                .ok()
                .and_then(|user32| {
                    GetProcAddress(user32, PCSTR(b"SetWindowCompositionAttribute\0".as_ptr()))
                })
                .map(|proc| std::mem::transmute::<_, SetWindowCompositionAttributeFn>(proc))
        };
        if set_composition_attribute.is_none() {
            debug!("SetWindowCompositionAttribute not exported by user32");
        }

        Ok(Self {
            instance: module.into(),
            set_composition_attribute,
            dibs: RefCell::new(HashMap::new()),
        })
    }
}

impl Platform for Win32Platform {
    fn register_class(&self, class: &ClassSpec) -> Result<ClassRegistration, PlatformError> {
        let name = wide(&class.name);
        let atom = unsafe {
            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(window_proc),
                hInstance: self.instance,
                hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
                hbrBackground: HBRUSH(GetStockObject(GET_STOCK_OBJECT_FLAGS(class.background as i32)).0),
                lpszClassName: PCWSTR(name.as_ptr()),
                ..Default::default()
            };
            RegisterClassExW(&wc)
        };
        if atom != 0 {
            return Ok(ClassRegistration::Registered);
        }
        let err = last_error("RegisterClassExW");
        if err.code == ERROR_CLASS_ALREADY_EXISTS.0 {
            Ok(ClassRegistration::AlreadyExists)
        } else {
            Err(err)
        }
    }

    fn unregister_class(&self, name: &str) -> Result<(), PlatformError> {
        let name = wide(name);
        unsafe { UnregisterClassW(PCWSTR(name.as_ptr()), Some(self.instance)) }
            .map_err(|_| last_error("UnregisterClassW"))
    }

    fn create_bitmap(&self, header: &BitmapInfoHeader) -> Result<GdiObject, PlatformError> {
        let info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: header.size,
                biWidth: header.width,
                biHeight: header.height,
                biPlanes: header.planes,
                biBitCount: header.bit_count,
                biCompression: header.compression,
                biSizeImage: header.image_size,
                biXPelsPerMeter: header.x_pels_per_meter,
                biYPelsPerMeter: header.y_pels_per_meter,
                biClrUsed: header.colors_used,
                biClrImportant: header.colors_important,
            },
            ..Default::default()
        };
        let mut bits: *mut c_void = std::ptr::null_mut();
        let bitmap = unsafe { CreateDIBSection(None, &info, DIB_RGB_COLORS, &mut bits, None, 0) }
            .map_err(|_| last_error("CreateDIBSection"))?;
        if bits.is_null() {
            unsafe {
                let _ = DeleteObject(HGDIOBJ(bitmap.0));
            }
            return Err(PlatformError::new("CreateDIBSection", 0));
        }

        let handle = bitmap.0 as isize;
        self.dibs.borrow_mut().insert(handle, DibBits {
            bits: bits as *mut u8,
            row_bytes: header.pixel_width() as usize * 4,
            rows: header.pixel_height() as usize,
        });
        Ok(GdiObject(handle))
    }

    fn write_bitmap(&self, bitmap: GdiObject, pixels: &[u8], stride: usize) -> Result<(), PlatformError> {
        let dibs = self.dibs.borrow();
        let dib = dibs
            .get(&bitmap.0)
            .ok_or(PlatformError::new("WriteBitmap", 6))?;
        if stride == 0 {
            return Err(PlatformError::new("WriteBitmap", 87));
        }
        for (row, src) in pixels.chunks(stride).take(dib.rows).enumerate() {
            let len = dib.row_bytes.min(src.len());
            // DIB 每行 4 字节对齐，32 位像素下行宽即 width * 4
            unsafe {
                std::ptr::copy_nonoverlapping(src.as_ptr(), dib.bits.add(row * dib.row_bytes), len);
            }
        }
        Ok(())
    }

    fn delete_object(&self, object: GdiObject) -> Result<(), PlatformError> {
        self.dibs.borrow_mut().remove(&object.0);
        if unsafe { DeleteObject(hgdiobj(object)) }.as_bool() {
            Ok(())
        } else {
            Err(last_error("DeleteObject"))
        }
    }

    fn create_window(&self, spec: &WindowSpec) -> Result<WindowHandle, PlatformError> {
        let class_name = wide(&spec.class_name);
        let title = wide(&spec.title);
        let window = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(spec.ex_style.0),
                PCWSTR(class_name.as_ptr()),
                PCWSTR(title.as_ptr()),
                WINDOW_STYLE(spec.style.0),
                spec.x,
                spec.y,
                spec.width,
                spec.height,
                None,
                None,
                Some(self.instance),
                None,
            )
        }
        .map_err(|_| last_error("CreateWindowExW"))?;

        if window.is_invalid() {
            return Err(last_error("CreateWindowExW"));
        }

        // 分层窗口在设置属性之前不可见
        if spec.ex_style.contains(ExtendedWindowStyle::LAYERED) {
            if let Err(e) = unsafe { SetLayeredWindowAttributes(window, COLORREF(0), 255, LWA_ALPHA) } {
                warn!("SetLayeredWindowAttributes failed: {}", e);
            }
        }
        Ok(WindowHandle(window.0 as isize))
    }

    fn destroy_window(&self, window: WindowHandle) -> Result<(), PlatformError> {
        unsafe { DestroyWindow(hwnd(window)) }.map_err(|_| last_error("DestroyWindow"))
    }

    fn show_window(&self, window: WindowHandle) {
        unsafe {
            let _ = ShowWindow(hwnd(window), SW_SHOW);
        }
    }

    fn update_window(&self, window: WindowHandle) {
        unsafe {
            let _ = UpdateWindow(hwnd(window));
        }
    }

    fn attach(&self, window: WindowHandle, procedure: Weak<dyn WindowProcedure>) {
        ROUTES.with(|routes| {
            routes.borrow_mut().insert(window.0, procedure);
        });
    }

    fn detach(&self, window: WindowHandle) -> Result<(), PlatformError> {
        let removed = ROUTES.with(|routes| routes.borrow_mut().remove(&window.0));
        match removed {
            Some(_) => Ok(()),
            None => Err(PlatformError::new("DetachWindowProcedure", 1400)),
        }
    }

    fn set_window_attribute(&self, window: WindowHandle, attribute: WindowAttribute, value: i32) -> Result<(), PlatformError> {
        unsafe {
            DwmSetWindowAttribute(
                hwnd(window),
                DWMWINDOWATTRIBUTE(attribute.0 as i32),
                &value as *const i32 as *const c_void,
                std::mem::size_of::<i32>() as u32,
            )
        }
        .map_err(|e| PlatformError::new("DwmSetWindowAttribute", e.code().0 as u32))
    }

    fn extend_frame_into_client_area(&self, window: WindowHandle, margins: &Margins) -> Result<(), PlatformError> {
        let margins = MARGINS {
            cxLeftWidth: margins.left,
            cxRightWidth: margins.right,
            cyTopHeight: margins.top,
            cyBottomHeight: margins.bottom,
        };
        unsafe { DwmExtendFrameIntoClientArea(hwnd(window), &margins) }
            .map_err(|e| PlatformError::new("DwmExtendFrameIntoClientArea", e.code().0 as u32))
    }

    fn enable_blur_behind(&self, window: WindowHandle, blur: &BlurBehind) -> Result<(), PlatformError> {
        let blur = DWM_BLURBEHIND {
            dwFlags: blur.flags,
            fEnable: BOOL(blur.enable),
            hRgnBlur: HRGN(blur.region as *mut c_void),
            fTransitionOnMaximized: BOOL(blur.transition_on_maximized),
        };
        unsafe { DwmEnableBlurBehindWindow(hwnd(window), &blur) }
            .map_err(|e| PlatformError::new("DwmEnableBlurBehindWindow", e.code().0 as u32))
    }

    fn accent_policy_available(&self) -> bool {
        self.set_composition_attribute.is_some()
    }

    fn set_accent_policy(&self, window: WindowHandle, policy: &AccentPolicy) -> Result<(), PlatformError> {
        let set = self
            .set_composition_attribute
            .ok_or(PlatformError::new("SetWindowCompositionAttribute", 127))?;
        let mut policy = *policy;
        let mut data = CompositionAttributeData {
            attribute: WCA_ACCENT_POLICY,
            data: &mut policy as *mut AccentPolicy as *mut c_void,
            size: std::mem::size_of::<AccentPolicy>(),
        };
        if unsafe { set(hwnd(window), &mut data) } != 0 {
            Ok(())
        } else {
            Err(last_error("SetWindowCompositionAttribute"))
        }
    }

    fn begin_paint(&self, window: WindowHandle) -> Result<PaintStruct, PlatformError> {
        let mut ps = PAINTSTRUCT::default();
        let dc = unsafe { BeginPaint(hwnd(window), &mut ps) };
        if dc.is_invalid() {
            return Err(last_error("BeginPaint"));
        }
        Ok(PaintStruct {
            dc: DeviceContext(dc.0 as isize),
            erase: ps.fErase.0,
            rect: PaintRect {
                left: ps.rcPaint.left,
                top: ps.rcPaint.top,
                right: ps.rcPaint.right,
                bottom: ps.rcPaint.bottom,
            },
            restore: ps.fRestore.0,
            inc_update: ps.fIncUpdate.0,
            reserved: ps.rgbReserved,
        })
    }

    fn end_paint(&self, window: WindowHandle, paint: &PaintStruct) {
        let mut ps = PAINTSTRUCT {
            hdc: hdc(paint.dc),
            fErase: BOOL(paint.erase),
            fRestore: BOOL(paint.restore),
            fIncUpdate: BOOL(paint.inc_update),
            rgbReserved: paint.reserved,
            ..Default::default()
        };
        ps.rcPaint.left = paint.rect.left;
        ps.rcPaint.top = paint.rect.top;
        ps.rcPaint.right = paint.rect.right;
        ps.rcPaint.bottom = paint.rect.bottom;
        unsafe {
            let _ = EndPaint(hwnd(window), &ps);
        }
    }

    fn create_compatible_dc(&self, dc: DeviceContext) -> Result<DeviceContext, PlatformError> {
        let memory = unsafe { CreateCompatibleDC(Some(hdc(dc))) };
        if memory.is_invalid() {
            return Err(last_error("CreateCompatibleDC"));
        }
        Ok(DeviceContext(memory.0 as isize))
    }

    fn select_object(&self, dc: DeviceContext, object: GdiObject) -> Result<GdiObject, PlatformError> {
        let previous = unsafe { SelectObject(hdc(dc), hgdiobj(object)) };
        if previous.is_invalid() {
            return Err(last_error("SelectObject"));
        }
        Ok(GdiObject(previous.0 as isize))
    }

    fn bit_blt(&self, blit: &Blit) -> Result<(), PlatformError> {
        unsafe {
            BitBlt(
                hdc(blit.dest),
                blit.x,
                blit.y,
                blit.width,
                blit.height,
                Some(hdc(blit.source)),
                blit.source_x,
                blit.source_y,
                ROP_CODE(blit.rop),
            )
        }
        .map_err(|_| last_error("BitBlt"))
    }

    fn delete_dc(&self, dc: DeviceContext) -> Result<(), PlatformError> {
        if unsafe { DeleteDC(hdc(dc)) }.as_bool() {
            Ok(())
        } else {
            Err(last_error("DeleteDC"))
        }
    }

    fn get_message(&self) -> Option<Message> {
        let mut msg = MSG::default();
        // 0 为 WM_QUIT，-1 为错误，两者都结束循环
        let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        if result.0 <= 0 {
            if result.0 < 0 {
                warn!("GetMessageW failed: {}", last_error("GetMessageW"));
            }
            return None;
        }
        Some(Message {
            window: WindowHandle(msg.hwnd.0 as isize),
            id: msg.message,
            wparam: msg.wParam.0,
            lparam: msg.lParam.0,
            time: msg.time,
            point: MessagePoint { x: msg.pt.x, y: msg.pt.y },
        })
    }

    fn translate_message(&self, message: &Message) {
        let msg = native_message(message);
        unsafe {
            let _ = TranslateMessage(&msg);
        }
    }

    fn dispatch_message(&self, message: &Message) -> isize {
        let msg = native_message(message);
        unsafe { DispatchMessageW(&msg) }.0
    }

    fn default_window_procedure(&self, message: &Message) -> isize {
        unsafe {
            DefWindowProcW(
                hwnd(message.window),
                message.id,
                WPARAM(message.wparam),
                LPARAM(message.lparam),
            )
        }
        .0
    }

    fn post_quit_message(&self, exit_code: i32) {
        unsafe { PostQuitMessage(exit_code) };
    }
}
