//! 绘制协调：把 Surface 的像素经兼容位图 blit 到窗口
//!
//! 每个绘制周期内取得的原生句柄都由守卫持有，任何返回路径上都会归还。

use crate::error::{PaintError, PlatformError};
use crate::platform::{Blit, DeviceContext, GdiObject, PaintStruct, Platform, WindowHandle, SRCCOPY};
use crate::surface::Surface;
use tracing::warn;

/// BeginPaint/EndPaint 配对
struct PaintScope<'a, P: Platform> {
    platform: &'a P,
    window: WindowHandle,
    paint: PaintStruct,
}

impl<'a, P: Platform> PaintScope<'a, P> {
    /// BeginPaint 失败时也调用一次 EndPaint 再返回错误
    fn begin(platform: &'a P, window: WindowHandle) -> Result<Self, PlatformError> {
        match platform.begin_paint(window) {
            Ok(paint) => Ok(Self { platform, window, paint }),
            Err(err) => {
                platform.end_paint(window, &PaintStruct::default());
                Err(err)
            }
        }
    }
}

impl<P: Platform> Drop for PaintScope<'_, P> {
    fn drop(&mut self) {
        self.platform.end_paint(self.window, &self.paint);
    }
}

/// 临时内存 DC，析构时恢复原先选入的对象并删除 DC
struct MemoryDc<'a, P: Platform> {
    platform: &'a P,
    dc: DeviceContext,
    previous: Option<GdiObject>,
}

impl<'a, P: Platform> MemoryDc<'a, P> {
    fn compatible_with(platform: &'a P, dc: DeviceContext) -> Result<Self, PlatformError> {
        let dc = platform.create_compatible_dc(dc)?;
        Ok(Self { platform, dc, previous: None })
    }

    fn select(&mut self, object: GdiObject) -> Result<(), PlatformError> {
        let previous = self.platform.select_object(self.dc, object)?;
        // 只记住第一次选入前的对象
        self.previous.get_or_insert(previous);
        Ok(())
    }
}

impl<P: Platform> Drop for MemoryDc<'_, P> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(err) = self.platform.select_object(self.dc, previous) {
                warn!("failed to restore memory DC selection: {}", err);
            }
        }
        if let Err(err) = self.platform.delete_dc(self.dc) {
            warn!("failed to delete memory DC: {}", err);
        }
    }
}

/// 处理 paint 消息
pub struct PaintCoordinator<'a, P: Platform> {
    platform: &'a P,
}

impl<'a, P: Platform> PaintCoordinator<'a, P> {
    pub fn new(platform: &'a P) -> Self {
        Self { platform }
    }

    /// 一次完整的绘制周期。
    ///
    /// 没有兼容位图时只结束绘制区域，返回 [`PaintError::Degraded`]，窗口保持可见。
    pub fn handle_paint(
        &self,
        window: WindowHandle,
        bitmap: Option<GdiObject>,
        surface: &mut Surface,
    ) -> Result<(), PaintError> {
        let scope = PaintScope::begin(self.platform, window)?;

        let bitmap = match bitmap {
            Some(bitmap) => bitmap,
            None => return Err(PaintError::Degraded),
        };

        surface.render();
        self.platform
            .write_bitmap(bitmap, surface.pixel_memory(), surface.row_stride())?;

        let mut memory = MemoryDc::compatible_with(self.platform, scope.paint.dc)?;
        memory.select(bitmap)?;
        self.platform.bit_blt(&Blit {
            dest: scope.paint.dc,
            x: 0,
            y: 0,
            width: surface.width() as i32,
            height: surface.height() as i32,
            source: memory.dc,
            source_x: 0,
            source_y: 0,
            rop: SRCCOPY,
        })?;

        // 先归还内存 DC，再结束绘制区域
        drop(memory);
        drop(scope);
        Ok(())
    }
}
