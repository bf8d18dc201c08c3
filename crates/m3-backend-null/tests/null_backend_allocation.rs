//! Null backend behaviour under allocator faults.

use std::sync::Arc;

use m3_backend::{Backend, WindowConfig};
use m3_backend_null::NullBackend;
use m3_core::alloc::FaultyAllocator;
use m3_core::{Error, SharedAllocator};
use pretty_assertions::assert_eq;

fn backend_with(faulty: &Arc<FaultyAllocator>) -> NullBackend {
    let allocator: SharedAllocator = faulty.clone();
    NullBackend::create(
        NullBackend::config_init()
            .with_logging(false)
            .with_allocator(allocator),
    )
    .unwrap()
}

#[test]
fn objects_draw_from_backend_allocator() {
    let faulty = Arc::new(FaultyAllocator::new());
    let mut backend = backend_with(&faulty);

    let window = backend
        .ws()
        .unwrap()
        .create_window(&WindowConfig::new(8, 8, "w"))
        .unwrap();
    let texture = backend
        .gfx()
        .unwrap()
        .create_texture(2, 2, 1, &[0; 16])
        .unwrap();
    let font = backend
        .gfx()
        .unwrap()
        .text()
        .create_font("Mono", 12, 400, true)
        .unwrap();
    assert_eq!(faulty.live_blocks(), 3);

    backend.gfx().unwrap().text().destroy_font(font).unwrap();
    backend.gfx().unwrap().destroy_texture(texture).unwrap();
    backend.ws().unwrap().destroy_window(window).unwrap();
    assert_eq!(faulty.live_blocks(), 0);
    backend.destroy().unwrap();
}

#[test]
fn failed_allocation_registers_nothing() {
    let faulty = Arc::new(FaultyAllocator::new());
    let mut backend = backend_with(&faulty);
    faulty.fail_alloc_on_call(1);

    assert_eq!(
        backend
            .ws()
            .unwrap()
            .create_window(&WindowConfig::new(8, 8, "w")),
        Err(Error::OutOfMemory)
    );
    assert_eq!(backend.live_objects(), Ok(0));
    assert_eq!(faulty.live_blocks(), 0);
    backend.destroy().unwrap();
}

#[test]
fn full_table_returns_object_storage() {
    let faulty = Arc::new(FaultyAllocator::new());
    let allocator: SharedAllocator = faulty.clone();
    let mut backend = NullBackend::create(
        NullBackend::config_init()
            .with_logging(false)
            .with_handle_capacity(1)
            .with_allocator(allocator),
    )
    .unwrap();

    let ws = backend.ws().unwrap();
    let first = ws.create_window(&WindowConfig::new(8, 8, "a")).unwrap();
    assert_eq!(
        ws.create_window(&WindowConfig::new(8, 8, "b")),
        Err(Error::OutOfMemory)
    );
    assert_eq!(faulty.live_blocks(), 1);
    ws.destroy_window(first).unwrap();
    backend.destroy().unwrap();
}

#[test]
fn clipboard_growth_failure_keeps_old_text() {
    let faulty = Arc::new(FaultyAllocator::new());
    let mut backend = backend_with(&faulty);
    let ws = backend.ws().unwrap();

    ws.set_clipboard_text("ab").unwrap();
    faulty.fail_realloc_on_call(1);
    assert_eq!(ws.set_clipboard_text("abcdef"), Err(Error::OutOfMemory));

    let mut buffer = [0u8; 8];
    assert_eq!(ws.get_clipboard_text(&mut buffer), Ok(2));
    assert_eq!(&buffer[..3], b"ab\0");

    ws.set_clipboard_text("abcdef").unwrap();
    assert_eq!(faulty.realloc_calls(), 2);
    assert_eq!(ws.get_clipboard_text(&mut buffer), Ok(6));
    backend.destroy().unwrap();
    assert_eq!(faulty.live_blocks(), 0);
}

#[test]
fn destroy_reports_clipboard_free_failure_but_tears_down() {
    let faulty = Arc::new(FaultyAllocator::new());
    let mut backend = backend_with(&faulty);
    backend.ws().unwrap().set_clipboard_text("keep").unwrap();
    faulty.fail_frees(true);

    assert_eq!(backend.destroy(), Err(Error::Io));
    assert!(!backend.is_live());
    assert_eq!(backend.ws().err(), Some(Error::State));
    assert_eq!(faulty.live_blocks(), 0);
}
