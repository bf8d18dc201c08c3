#![forbid(unsafe_code)]

use m3_backend::{
    ClipboardError, InputEvent, WindowConfig, WindowSystem, WsConfig, object_type, validate,
    write_clipboard,
};
use m3_core::log::LogLevel;
use m3_core::{Handle, Result};

use crate::device::NullDevice;
use crate::objects::NullWindow;

impl NullDevice {
    fn window(&mut self, window: Handle) -> Result<&mut NullWindow> {
        self.handles.get_mut::<NullWindow>(window, object_type::WINDOW)
    }

    fn resolve_window(&self, window: Handle) -> Result<()> {
        self.handles
            .get::<NullWindow>(window, object_type::WINDOW)
            .map(|_| ())
    }

    pub(crate) fn window_visible(&self, window: Handle) -> Result<bool> {
        self.handles
            .get::<NullWindow>(window, object_type::WINDOW)
            .map(|w| w.visible)
    }
}

impl WindowSystem for NullDevice {
    fn init(&mut self, _config: &WsConfig<'_>) -> Result<()> {
        self.log(LogLevel::Info, "ws.init")
    }

    fn shutdown(&mut self) -> Result<()> {
        self.log(LogLevel::Info, "ws.shutdown")
    }

    fn create_window(&mut self, config: &WindowConfig<'_>) -> Result<Handle> {
        validate::positive_size(config.width, config.height)?;
        self.log(LogLevel::Info, "ws.create_window")?;
        let window = NullWindow::new(&self.allocator, config.width, config.height, config.flags)?;
        self.register(Box::new(window))
    }

    fn destroy_window(&mut self, window: Handle) -> Result<()> {
        self.resolve_window(window)?;
        self.log(LogLevel::Info, "ws.destroy_window")?;
        self.handles.release(window)
    }

    fn show_window(&mut self, window: Handle) -> Result<()> {
        self.resolve_window(window)?;
        self.log(LogLevel::Info, "ws.show_window")?;
        self.window(window)?.visible = true;
        Ok(())
    }

    fn hide_window(&mut self, window: Handle) -> Result<()> {
        self.resolve_window(window)?;
        self.log(LogLevel::Info, "ws.hide_window")?;
        self.window(window)?.visible = false;
        Ok(())
    }

    fn set_window_title(&mut self, window: Handle, _title: &str) -> Result<()> {
        self.resolve_window(window)?;
        self.log(LogLevel::Info, "ws.set_window_title")
    }

    fn set_window_size(&mut self, window: Handle, width: i32, height: i32) -> Result<()> {
        validate::positive_size(width, height)?;
        self.resolve_window(window)?;
        self.log(LogLevel::Info, "ws.set_window_size")?;
        let resolved = self.window(window)?;
        resolved.width = width;
        resolved.height = height;
        Ok(())
    }

    fn get_window_size(&mut self, window: Handle) -> Result<(i32, i32)> {
        self.resolve_window(window)?;
        self.log(LogLevel::Info, "ws.get_window_size")?;
        let resolved = self.window(window)?;
        Ok((resolved.width, resolved.height))
    }

    fn set_window_dpi_scale(&mut self, window: Handle, scale: f32) -> Result<()> {
        validate::dpi_scale(scale)?;
        self.resolve_window(window)?;
        self.log(LogLevel::Info, "ws.set_window_dpi_scale")?;
        self.window(window)?.dpi_scale = scale;
        Ok(())
    }

    fn get_window_dpi_scale(&mut self, window: Handle) -> Result<f32> {
        self.resolve_window(window)?;
        self.log(LogLevel::Info, "ws.get_window_dpi_scale")?;
        Ok(self.window(window)?.dpi_scale)
    }

    fn set_clipboard_text(&mut self, text: &str) -> Result<()> {
        self.log(LogLevel::Info, "ws.set_clipboard_text")?;
        self.store_clipboard(text.as_bytes())
    }

    fn get_clipboard_text(&mut self, buffer: &mut [u8]) -> Result<usize, ClipboardError> {
        self.log(LogLevel::Info, "ws.get_clipboard_text")?;
        write_clipboard(self.clipboard_text(), buffer)
    }

    fn poll_event(&mut self) -> Result<Option<InputEvent>> {
        self.log(LogLevel::Debug, "ws.poll_event")?;
        Ok(None)
    }

    fn pump_events(&mut self) -> Result<()> {
        self.log(LogLevel::Debug, "ws.pump_events")
    }

    fn get_time_ms(&mut self) -> Result<u32> {
        self.log(LogLevel::Debug, "ws.get_time_ms")?;
        Ok(self.tick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use m3_backend::{BackendConfig, WindowFlags};
    use m3_core::Error;

    fn device() -> NullDevice {
        NullDevice::new(BackendConfig::default().with_logging(false)).unwrap()
    }

    #[test]
    fn window_state_round_trips() {
        let mut dev = device();
        let window = dev
            .create_window(&WindowConfig::new(640, 480, "demo").with_flags(WindowFlags::RESIZABLE))
            .unwrap();
        assert_eq!(dev.get_window_size(window), Ok((640, 480)));
        dev.set_window_size(window, 800, 600).unwrap();
        assert_eq!(dev.get_window_size(window), Ok((800, 600)));
        assert_eq!(dev.get_window_dpi_scale(window), Ok(1.0));
        dev.set_window_dpi_scale(window, 2.0).unwrap();
        assert_eq!(dev.get_window_dpi_scale(window), Ok(2.0));
        assert_eq!(dev.window_visible(window), Ok(false));
        dev.show_window(window).unwrap();
        assert_eq!(dev.window_visible(window), Ok(true));
        dev.hide_window(window).unwrap();
        assert_eq!(dev.window_visible(window), Ok(false));
        dev.destroy_window(window).unwrap();
        assert_eq!(dev.get_window_size(window), Err(Error::InvalidArgument));
    }

    #[test]
    fn range_checks_precede_handle_lookup() {
        let mut dev = device();
        assert_eq!(
            dev.create_window(&WindowConfig::new(0, 10, "t")),
            Err(Error::Range)
        );
        assert_eq!(dev.set_window_size(Handle::NULL, -1, 1), Err(Error::Range));
        assert_eq!(dev.set_window_dpi_scale(Handle::NULL, 0.0), Err(Error::Range));
        assert_eq!(
            dev.set_window_size(Handle::NULL, 1, 1),
            Err(Error::InvalidArgument)
        );
        assert_eq!(dev.handles.live_count(), 0);
    }

    #[test]
    fn clipboard_grows_and_reports_required_length() {
        let mut dev = device();
        let mut buffer = [0u8; 16];
        assert_eq!(dev.get_clipboard_text(&mut buffer), Ok(0));
        assert_eq!(buffer[0], 0);

        dev.set_clipboard_text("hi").unwrap();
        dev.set_clipboard_text("hello world").unwrap();
        assert_eq!(dev.get_clipboard_text(&mut buffer), Ok(11));
        assert_eq!(&buffer[..12], b"hello world\0");

        let mut small = [0u8; 11];
        let err = dev.get_clipboard_text(&mut small).unwrap_err();
        assert_eq!(err.error, Error::Range);
        assert_eq!(err.required, 11);

        // Shorter text reuses the buffer.
        dev.set_clipboard_text("ok").unwrap();
        assert_eq!(dev.clipboard.as_ref().map(|b| b.len()), Some(12));
        assert_eq!(dev.get_clipboard_text(&mut buffer), Ok(2));
        assert_eq!(&buffer[..3], b"ok\0");
    }

    #[test]
    fn clipboard_limit_keeps_previous_text() {
        let mut dev =
            NullDevice::new(BackendConfig::default().with_logging(false).with_clipboard_limit(4))
                .unwrap();
        dev.set_clipboard_text("four").unwrap();
        assert_eq!(dev.set_clipboard_text("fives"), Err(Error::Range));
        assert_eq!(dev.clipboard_text(), b"four");
    }

    #[test]
    fn time_advances_sixteen_ms_per_query() {
        let mut dev = device();
        assert_eq!(WindowSystem::get_time_ms(&mut dev), Ok(16));
        assert_eq!(WindowSystem::get_time_ms(&mut dev), Ok(32));
    }

    #[test]
    fn poll_never_yields() {
        let mut dev = device();
        assert_eq!(dev.poll_event(), Ok(None));
        assert_eq!(dev.pump_events(), Ok(()));
    }
}
