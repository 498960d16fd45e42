//! Integration tests: the display surface facade over a scripted backend.

mod common;

use std::rc::Rc;

use common::{Event, MockBackend, WINDOW, pixel_at};
use fbview_core::{
    CaptureMode, Dimension, DisplaySurface, ModeSwitch, OwnedSurface, PixelFormat, Rect,
    RenderConfig, RenderError, RenderMode,
};

// ── Helpers ──────────────────────────────────────────────────────

fn attached(backend: &MockBackend, mode: RenderMode) -> DisplaySurface<MockBackend> {
    let mut display = DisplaySurface::new(backend.clone(), RenderConfig::default());
    display
        .attach(Dimension::new(32, 16), PixelFormat::BGRX32, WINDOW, mode)
        .expect("attach succeeds");
    display
}

fn assert_invalid(result: fbview_core::Result<()>) {
    assert!(matches!(result, Err(RenderError::InvalidOperation(_))));
}

// ── Before attachment ────────────────────────────────────────────

#[test]
fn test_present_scaled_before_attach_is_uninitialized() {
    let mut display = DisplaySurface::new(MockBackend::new(), RenderConfig::default());
    let rect = Rect::new(0, 0, 10, 10);

    let err = display.present_scaled(&rect, &rect).unwrap_err();
    assert!(matches!(err, RenderError::Uninitialized(_)));
    assert!(!display.is_attached());
}

#[test]
fn test_presentation_before_attach_is_uninitialized() {
    let mut display = DisplaySurface::new(MockBackend::new(), RenderConfig::default());
    let rect = Rect::new(0, 0, 10, 10);

    assert!(matches!(display.capture(&rect), Err(RenderError::Uninitialized(_))));
    assert!(matches!(
        display.capture_transparent(&rect),
        Err(RenderError::Uninitialized(_))
    ));
    assert!(matches!(display.present(&rect), Err(RenderError::Uninitialized(_))));
    assert!(matches!(display.resize(&rect), Err(RenderError::Uninitialized(_))));
    assert!(matches!(
        display.set_render_mode(RenderMode::Hardware),
        Err(RenderError::Uninitialized(_))
    ));
    assert!(matches!(display.draw_test_pattern(), Err(RenderError::Uninitialized(_))));
}

#[test]
fn test_render_mode_defaults_to_software() {
    let display = DisplaySurface::new(MockBackend::new(), RenderConfig::default());
    assert_eq!(display.render_mode(), RenderMode::Software);
}

// ── Attachment ───────────────────────────────────────────────────

#[test]
fn test_attach_backs_the_surface() {
    let backend = MockBackend::new();
    let display = attached(&backend, RenderMode::Hardware);

    assert_eq!(display.render_mode(), RenderMode::Hardware);
    assert_eq!(display.dimension(), Dimension::new(32, 16));
    assert_eq!(display.bytes_per_row(), 32 * 4);
    assert_eq!(display.buffer().unwrap().len(), display.buffer_size());
}

#[test]
fn test_set_properties_uses_configured_mode() {
    let backend = MockBackend::new();
    let config = RenderConfig {
        preferred_mode: RenderMode::Hardware,
        ..RenderConfig::default()
    };
    let mut display = DisplaySurface::new(backend, config);
    display
        .set_properties(Dimension::new(8, 8), PixelFormat::BGRX32, WINDOW)
        .unwrap();

    assert_eq!(display.render_mode(), RenderMode::Hardware);
}

#[test]
fn test_unsupported_format_is_rejected() {
    let backend = MockBackend::new();
    let mut display = DisplaySurface::new(backend.clone(), RenderConfig::default());
    let rgb24 = PixelFormat {
        bits_per_pixel: 24,
        ..PixelFormat::BGRX32
    };

    assert_invalid(display.attach(Dimension::new(8, 8), rgb24, WINDOW, RenderMode::Software));
    assert!(backend.events().is_empty());
    assert!(!display.is_attached());
}

#[test]
fn test_failed_attach_leaves_surface_unbacked() {
    let backend = MockBackend::new();
    backend.configure(|s| s.fail_software = true);
    let mut display = DisplaySurface::new(backend, RenderConfig::default());

    let err = display
        .attach(Dimension::new(8, 8), PixelFormat::BGRX32, WINDOW, RenderMode::Software)
        .unwrap_err();
    assert!(matches!(err, RenderError::ConstructionFailed { .. }));
    assert!(display.buffer().is_none());
    assert!(!display.is_attached());
}

#[test]
fn test_reattach_releases_previous_engine() {
    let backend = MockBackend::new();
    let mut display = attached(&backend, RenderMode::Software);
    let first = display.buffer().unwrap();

    display
        .attach(Dimension::new(64, 64), PixelFormat::BGRX32, WINDOW, RenderMode::Software)
        .unwrap();

    assert!(first.is_revoked());
    assert_eq!(backend.live_engines(), 1);
    assert_eq!(display.dimension(), Dimension::new(64, 64));
    assert!(!Rc::ptr_eq(&first, &display.buffer().unwrap()));
}

// ── Presentation ─────────────────────────────────────────────────

#[test]
fn test_capture_variants_select_capture_mode() {
    let backend = MockBackend::new();
    let mut display = attached(&backend, RenderMode::Software);
    backend.clear_events();
    let rect = Rect::new(0, 0, 8, 8);

    display.capture(&rect).unwrap();
    display.capture_transparent(&rect).unwrap();

    assert_eq!(
        backend.events(),
        vec![
            Event::Captured {
                id: 0,
                rect,
                mode: CaptureMode::Opaque
            },
            Event::Captured {
                id: 0,
                rect,
                mode: CaptureMode::IncludeLayered
            },
        ]
    );
}

#[test]
fn test_draw_test_pattern_presents_whole_surface() {
    let backend = MockBackend::new();
    let mut display = attached(&backend, RenderMode::Software);
    backend.clear_events();

    display.draw_test_pattern().unwrap();

    assert_eq!(pixel_at(display.surface(), 0, 0), 0x00FF_FFFF);
    assert_eq!(
        backend.events(),
        vec![Event::Presented {
            id: 0,
            rect: Rect::new(0, 0, 32, 16)
        }]
    );
}

#[test]
fn test_mode_switch_keeps_surface_backed() {
    let backend = MockBackend::new();
    let mut display = attached(&backend, RenderMode::Software);
    display.fill_rect(&Rect::new(0, 0, 4, 4), 0x0012_3456).unwrap();

    let outcome = display.set_render_mode(RenderMode::Hardware).unwrap();

    assert_eq!(outcome, ModeSwitch::Switched(RenderMode::Hardware));
    assert_eq!(display.render_mode(), RenderMode::Hardware);
    assert_eq!(pixel_at(display.surface(), 1, 1), 0x0012_3456);
}

// ── Pixel operations ─────────────────────────────────────────────

#[test]
fn test_copy_from_another_surface() {
    let backend = MockBackend::new();
    let mut display = attached(&backend, RenderMode::Software);
    let mut source = OwnedSurface::new(Dimension::new(8, 8), PixelFormat::BGRX32);
    source.fill_rect(&Rect::new(0, 0, 8, 8), 0x00C0_FFEE).unwrap();

    display.copy_from(&Rect::new(4, 4, 12, 12), &source, 0, 0).unwrap();

    assert_eq!(pixel_at(display.surface(), 4, 4), 0x00C0_FFEE);
    assert_eq!(pixel_at(display.surface(), 11, 11), 0x00C0_FFEE);
    assert_eq!(pixel_at(display.surface(), 12, 12), 0);
    assert!(display.cmp_from(&Rect::new(4, 4, 12, 12), &source, 0, 0).unwrap());
}

// ── Rejected mutators ────────────────────────────────────────────

#[test]
fn test_set_dimension_after_attach_is_rejected() {
    let backend = MockBackend::new();
    let mut display = attached(&backend, RenderMode::Software);
    let before = display.buffer().unwrap();

    assert_invalid(display.set_dimension(Dimension::new(640, 480)));

    assert_eq!(display.dimension(), Dimension::new(32, 16));
    assert_eq!(display.pixel_format(), PixelFormat::BGRX32);
    assert!(Rc::ptr_eq(&before, &display.buffer().unwrap()));
}

#[test]
fn test_all_structural_mutators_fail() {
    let backend = MockBackend::new();
    let mut display = attached(&backend, RenderMode::Software);
    let other = OwnedSurface::new(Dimension::new(4, 4), PixelFormat::RGB565);
    let rect = Rect::new(0, 0, 4, 4);
    let dim = Dimension::new(4, 4);

    assert_invalid(display.set_dimension(dim));
    assert_invalid(display.set_dimension_rect(&rect));
    assert_invalid(display.set_pixel_format(PixelFormat::RGB565));
    assert_invalid(display.set_buffer(Some(other.memory())));
    assert_invalid(display.set_properties_without_window(dim, PixelFormat::RGB565));
    assert_invalid(display.set_properties_without_resize(dim, PixelFormat::RGB565));
    assert_invalid(display.set_empty_dimension(&rect));
    assert_invalid(display.set_empty_pixel_format(PixelFormat::RGB565));
    assert_invalid(display.assign_properties(&other));
    assert_invalid(display.clone_from_surface(&other));

    assert_eq!(display.dimension(), Dimension::new(32, 16));
    assert_eq!(display.pixel_format(), PixelFormat::BGRX32);
    assert_eq!(backend.live_engines(), 1);
}

// ── Release ──────────────────────────────────────────────────────

#[test]
fn test_release_is_idempotent() {
    let backend = MockBackend::new();
    let mut display = attached(&backend, RenderMode::Hardware);

    display.release();
    display.release();

    assert_eq!(backend.live_engines(), 0);
    assert_eq!(backend.count(|e| matches!(e, Event::Released { .. })), 1);
    assert!(display.buffer().is_none());
    assert_eq!(display.render_mode(), RenderMode::Software);
    assert!(matches!(
        display.present(&Rect::new(0, 0, 1, 1)),
        Err(RenderError::Uninitialized(_))
    ));
}

#[test]
fn test_drop_releases_engine() {
    let backend = MockBackend::new();
    let display = attached(&backend, RenderMode::Software);

    drop(display);

    assert_eq!(backend.live_engines(), 0);
}
