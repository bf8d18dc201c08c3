//! Backend creation and teardown through the public entry points.

use m3_backend::Backend;
use m3_backend_win32::Win32Backend;
use m3_core::Error;
use pretty_assertions::assert_eq;

#[test]
fn availability_tracks_the_target() {
    assert_eq!(Win32Backend::is_available(), cfg!(windows));
}

#[test]
fn default_config_matches_the_null_backend() {
    let config = Win32Backend::config_init();
    let null = m3_backend_null::NullBackend::config_init();
    assert_eq!(config.handle_capacity, null.handle_capacity);
    assert_eq!(config.clipboard_limit, null.clipboard_limit);
    assert_eq!(config.enable_logging, null.enable_logging);
    assert_eq!(config.inline_tasks, null.inline_tasks);
}

#[cfg(not(windows))]
#[test]
fn create_is_unsupported_off_windows() {
    let config = Win32Backend::config_init().with_logging(false);
    assert_eq!(Win32Backend::create(config).unwrap_err(), Error::Unsupported);
}

#[cfg(windows)]
mod native {
    use super::*;
    use std::sync::Arc;

    use m3_backend::{Color, NetworkRequest, Rect};
    use m3_core::SharedAllocator;
    use m3_core::alloc::FaultyAllocator;

    fn backend() -> Win32Backend {
        Win32Backend::create(Win32Backend::config_init().with_logging(false)).unwrap()
    }

    #[test]
    fn destroy_refuses_while_objects_live() {
        let mut backend = backend();
        let texture = backend
            .gfx()
            .unwrap()
            .create_texture(4, 4, 1, &[0xff; 64])
            .unwrap();
        let font = backend
            .gfx()
            .unwrap()
            .text()
            .create_font("Segoe UI", 14, 400, false)
            .unwrap();
        assert_eq!(backend.live_objects(), Ok(2));

        assert_eq!(backend.destroy(), Err(Error::Busy));
        assert!(backend.is_live());

        backend.gfx().unwrap().destroy_texture(texture).unwrap();
        backend.gfx().unwrap().text().destroy_font(font).unwrap();
        assert_eq!(backend.destroy(), Ok(()));
        assert!(!backend.is_live());
        assert_eq!(backend.ws().err(), Some(Error::State));
        assert_eq!(backend.destroy(), Err(Error::State));
    }

    #[test]
    fn drawing_requires_a_frame() {
        let mut backend = backend();
        let gfx = backend.gfx().unwrap();
        assert_eq!(gfx.clear(Color::rgba(0.0, 0.0, 0.0, 1.0)), Err(Error::State));
        assert_eq!(
            gfx.draw_rect(&Rect::new(0.0, 0.0, 4.0, 4.0), Color::rgba(1.0, 0.0, 0.0, 1.0), 0.0),
            Err(Error::State)
        );
        assert_eq!(gfx.pop_clip(), Err(Error::State));
    }

    #[test]
    fn texture_updates_stay_in_bounds() {
        let mut backend = backend();
        let gfx = backend.gfx().unwrap();
        let texture = gfx.create_texture(4, 4, 3, &[]).unwrap();
        assert_eq!(gfx.update_texture(texture, 0, 0, 2, 2, &[0x80; 4]), Ok(()));
        assert_eq!(
            gfx.update_texture(texture, 3, 3, 2, 2, &[0x80; 4]),
            Err(Error::Range)
        );
        assert_eq!(
            gfx.update_texture(texture, 0, 0, 2, 2, &[0x80; 3]),
            Err(Error::Range)
        );
        gfx.destroy_texture(texture).unwrap();
        assert_eq!(gfx.destroy_texture(texture), Err(Error::InvalidArgument));
    }

    #[test]
    fn empty_text_measures_line_height() {
        let mut backend = backend();
        let text = backend.gfx().unwrap().text();
        let font = text.create_font("Segoe UI", 16, 400, false).unwrap();
        let metrics = text.measure_text(font, "").unwrap();
        assert_eq!(metrics.width, 0.0);
        assert!(metrics.height > 0.0);
        assert!(metrics.baseline > 0.0);
        let wide = text.measure_text(font, "LibM3C").unwrap();
        assert!(wide.width > 0.0);
        text.destroy_font(font).unwrap();
    }

    #[test]
    fn texture_footprint_comes_from_the_configured_allocator() {
        let faulty = Arc::new(FaultyAllocator::new());
        let allocator: SharedAllocator = faulty.clone();
        let mut backend = Win32Backend::create(
            Win32Backend::config_init()
                .with_logging(false)
                .with_allocator(allocator),
        )
        .unwrap();

        faulty.fail_alloc_on_call(faulty.alloc_calls() + 1);
        assert_eq!(
            backend.gfx().unwrap().create_texture(2, 2, 1, &[]),
            Err(Error::OutOfMemory)
        );
        assert_eq!(backend.live_objects(), Ok(0));

        let before = faulty.live_blocks();
        let texture = backend.gfx().unwrap().create_texture(2, 2, 1, &[]).unwrap();
        assert_eq!(faulty.live_blocks(), before + 1);
        backend.gfx().unwrap().destroy_texture(texture).unwrap();
        assert_eq!(faulty.live_blocks(), before);
    }

    #[test]
    fn unsupported_schemes_are_rejected_before_connecting() {
        let mut backend = backend();
        let allocator = m3_core::alloc::allocator_or_default(None);
        let network = backend.env().unwrap().network().unwrap();
        assert_eq!(
            network
                .request(&NetworkRequest::get("ftp://example.invalid/"), allocator.as_ref())
                .unwrap_err(),
            Error::Unsupported
        );
        assert_eq!(
            network
                .request(&NetworkRequest::get(""), allocator.as_ref())
                .unwrap_err(),
            Error::InvalidArgument
        );
    }
}
