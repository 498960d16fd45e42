//! Scripted in-memory render backend shared by the integration tests.
//!
//! Every engine call is appended to an event log so tests can assert on
//! exactly what reached the engines. Failures are scripted through
//! [`MockState`].

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use fbview_core::{
    CaptureMode, Dimension, EngineSpec, PixelBuffer, PixelFormat, PixelSurface, Rect,
    RenderBackend, RenderEngine, RenderError, RenderMode, Result, SharedBuffer, WindowHandle,
};

// ── Event log ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Created {
        id: usize,
        mode: RenderMode,
        dimension: Dimension,
    },
    Released {
        id: usize,
        mode: RenderMode,
    },
    Captured {
        id: usize,
        rect: Rect,
        mode: CaptureMode,
    },
    Presented {
        id: usize,
        rect: Rect,
    },
    PresentedScaled {
        id: usize,
        src: Rect,
        dst: Rect,
    },
    Resized {
        id: usize,
        rect: Rect,
    },
}

#[derive(Debug, Default)]
pub struct MockState {
    pub hardware_available: bool,
    pub fail_hardware: bool,
    pub fail_software: bool,
    /// The hardware engine reports capture as unsupported.
    pub hardware_capture_unsupported: bool,
    /// The next present (1:1 or scaled) fails once.
    pub fail_next_present: bool,
    pub events: Vec<Event>,
    pub live: usize,
    next_id: usize,
}

// ── MockBackend ──────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockBackend {
    state: Rc<RefCell<MockState>>,
}

impl MockBackend {
    /// A backend whose hardware probe succeeds.
    pub fn new() -> Self {
        let backend = Self::default();
        backend.configure(|s| s.hardware_available = true);
        backend
    }

    pub fn without_hardware() -> Self {
        Self::default()
    }

    pub fn configure(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.borrow_mut());
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.state.borrow().events.iter().filter(|e| predicate(e)).count()
    }

    pub fn live_engines(&self) -> usize {
        self.state.borrow().live
    }
}

impl RenderBackend for MockBackend {
    type Software = MockEngine;
    type Hardware = MockEngine;

    fn hardware_available(&self) -> bool {
        self.state.borrow().hardware_available
    }

    fn create_software(&self, spec: &EngineSpec) -> Result<MockEngine> {
        MockEngine::create(&self.state, RenderMode::Software, spec)
    }

    fn create_hardware(&self, spec: &EngineSpec) -> Result<MockEngine> {
        MockEngine::create(&self.state, RenderMode::Hardware, spec)
    }
}

// ── MockEngine ───────────────────────────────────────────────────

pub struct MockEngine {
    id: usize,
    mode: RenderMode,
    buffer: SharedBuffer,
    state: Rc<RefCell<MockState>>,
    released: bool,
}

impl MockEngine {
    fn create(state: &Rc<RefCell<MockState>>, mode: RenderMode, spec: &EngineSpec) -> Result<Self> {
        let mut s = state.borrow_mut();
        let fail = match mode {
            RenderMode::Software => s.fail_software,
            RenderMode::Hardware => s.fail_hardware,
        };
        if fail {
            return Err(RenderError::construction(mode, "scripted failure"));
        }

        let id = s.next_id;
        s.next_id += 1;
        s.live += 1;
        s.events.push(Event::Created {
            id,
            mode,
            dimension: spec.dimension(),
        });

        Ok(Self {
            id,
            mode,
            buffer: PixelBuffer::owned(spec.buffer_len()),
            state: Rc::clone(state),
            released: false,
        })
    }

    fn record(&self, event: Event) {
        self.state.borrow_mut().events.push(event);
    }

    fn take_present_failure(&self) -> Result<()> {
        let mut s = self.state.borrow_mut();
        if s.fail_next_present {
            s.fail_next_present = false;
            return Err(RenderError::transient("present", "scripted failure"));
        }
        Ok(())
    }
}

impl RenderEngine for MockEngine {
    fn mode(&self) -> RenderMode {
        self.mode
    }

    fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    fn capture(&mut self, rect: &Rect, mode: CaptureMode) -> Result<()> {
        if self.mode == RenderMode::Hardware && self.state.borrow().hardware_capture_unsupported {
            return Err(RenderError::Unsupported {
                operation: "capture",
                mode: self.mode,
            });
        }
        self.record(Event::Captured {
            id: self.id,
            rect: *rect,
            mode,
        });
        Ok(())
    }

    fn present(&mut self, rect: &Rect) -> Result<()> {
        self.take_present_failure()?;
        self.record(Event::Presented { id: self.id, rect: *rect });
        Ok(())
    }

    fn present_scaled(&mut self, src: &Rect, dst: &Rect) -> Result<()> {
        self.take_present_failure()?;
        self.record(Event::PresentedScaled {
            id: self.id,
            src: *src,
            dst: *dst,
        });
        Ok(())
    }

    fn resize(&mut self, rect: &Rect) -> Result<()> {
        self.record(Event::Resized { id: self.id, rect: *rect });
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.buffer.revoke();
        let mut s = self.state.borrow_mut();
        s.live -= 1;
        s.events.push(Event::Released {
            id: self.id,
            mode: self.mode,
        });
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.release();
    }
}

// ── Helpers ──────────────────────────────────────────────────────

pub const WINDOW: WindowHandle = WindowHandle(0x1234);

pub fn spec(width: i32, height: i32) -> EngineSpec {
    EngineSpec::new(PixelFormat::BGRX32, Dimension::new(width, height), WINDOW)
}

/// An unbacked surface matching `spec`.
pub fn surface_for(spec: &EngineSpec) -> PixelSurface {
    PixelSurface::with_properties(spec.dimension(), spec.format())
}

/// Read the 32-bit pixel at `(x, y)`.
pub fn pixel_at(surface: &PixelSurface, x: i32, y: i32) -> u32 {
    let offset = surface.pixel_offset(x, y).expect("pixel inside surface");
    surface
        .buffer()
        .expect("surface is backed")
        .with_bytes(|b| u32::from_le_bytes([b[offset], b[offset + 1], b[offset + 2], b[offset + 3]]))
        .expect("buffer readable")
}
