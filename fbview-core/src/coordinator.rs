//! Render coordinator: owns the single active engine, chooses between
//! the software and hardware variants and keeps the pixel surface
//! pointed at whichever engine is alive.
//!
//! ```text
//!                      new(preferred)
//!  Uninitialized ─────────────────────────► Active(mode)
//!        ▲                                    │   ▲
//!        │ fatal switch failure               │   │ set_mode
//!        └────────────────────────────────────┘   │
//!                                             ────┘
//!  any state ──── destroy() ────► Destroyed
//! ```
//!
//! # Buffer hand-over
//!
//! Before an engine is torn down the surface view is cleared; after a new
//! engine is installed the surface is pointed at its buffer. The surface
//! therefore never refers to memory of an engine that no longer exists.
//!
//! # Fallback
//!
//! A hardware request first consults [`RenderBackend::hardware_available`].
//! If the hardware engine then fails to construct, exactly one software
//! construction is attempted; its failure is returned to the caller.
//!
//! # Threading
//!
//! Single caller, no internal locking. The `Rc`-based buffers make the
//! coordinator `!Send`.

use tracing::{debug, error, info, warn};

use crate::buffer::SharedBuffer;
use crate::config::RenderConfig;
use crate::engine::{CaptureMode, EngineSpec, RenderBackend, RenderEngine, RenderMode};
use crate::error::{RenderError, Result};
use crate::geometry::Rect;
use crate::surface::PixelSurface;

// ── ActiveEngine ─────────────────────────────────────────────────

/// Exactly one live engine of either variant.
pub enum ActiveEngine<S, H> {
    Software(S),
    Hardware(H),
}

impl<S: RenderEngine, H: RenderEngine> ActiveEngine<S, H> {
    pub fn mode(&self) -> RenderMode {
        match self {
            ActiveEngine::Software(_) => RenderMode::Software,
            ActiveEngine::Hardware(_) => RenderMode::Hardware,
        }
    }

    fn engine(&self) -> &dyn RenderEngine {
        match self {
            ActiveEngine::Software(e) => e,
            ActiveEngine::Hardware(e) => e,
        }
    }

    fn engine_mut(&mut self) -> &mut dyn RenderEngine {
        match self {
            ActiveEngine::Software(e) => e,
            ActiveEngine::Hardware(e) => e,
        }
    }
}

enum Slot<S, H> {
    Uninitialized,
    Active(ActiveEngine<S, H>),
    Destroyed,
}

// ── CoordinatorState / ModeSwitch ────────────────────────────────

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Uninitialized,
    Active(RenderMode),
    Destroyed,
}

/// Outcome of [`RenderCoordinator::set_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSwitch {
    /// Already in the requested mode; nothing was rebuilt.
    Unchanged,
    /// The requested engine is now active.
    Switched(RenderMode),
    /// The hardware engine failed to construct, or no engine was live and
    /// the probe reports no hardware support; software is active.
    FellBack { requested: RenderMode },
    /// The probe reports no hardware support; the live engine is kept.
    Unavailable,
}

impl ModeSwitch {
    /// Whether a new engine (and buffer) was installed.
    pub fn rebuilt(&self) -> bool {
        matches!(self, ModeSwitch::Switched(_) | ModeSwitch::FellBack { .. })
    }
}

// ── RenderCoordinator ────────────────────────────────────────────

pub struct RenderCoordinator<B: RenderBackend> {
    backend: B,
    spec: EngineSpec,
    preserve_contents: bool,
    slot: Slot<B::Software, B::Hardware>,
}

impl<B: RenderBackend> RenderCoordinator<B> {
    /// Build the preferred engine (or its fallback) and point `surface`
    /// at its buffer.
    pub fn new(
        backend: B,
        spec: EngineSpec,
        preferred: RenderMode,
        config: &RenderConfig,
        surface: &mut PixelSurface,
    ) -> Result<Self> {
        let mut coordinator = Self {
            backend,
            spec,
            preserve_contents: config.preserve_contents,
            slot: Slot::Uninitialized,
        };

        let target = if preferred == RenderMode::Hardware && !coordinator.backend.hardware_available() {
            info!("hardware rendering unavailable, starting in software mode");
            RenderMode::Software
        } else {
            preferred
        };

        let (engine, fell_back) = coordinator.construct(target)?;
        if fell_back {
            info!("started in software mode after hardware construction failed");
        }
        coordinator.install(engine, surface, None);
        Ok(coordinator)
    }

    pub fn state(&self) -> CoordinatorState {
        match &self.slot {
            Slot::Uninitialized => CoordinatorState::Uninitialized,
            Slot::Active(e) => CoordinatorState::Active(e.mode()),
            Slot::Destroyed => CoordinatorState::Destroyed,
        }
    }

    /// Mode of the live engine, `None` when there is none.
    pub fn mode(&self) -> Option<RenderMode> {
        match &self.slot {
            Slot::Active(e) => Some(e.mode()),
            _ => None,
        }
    }

    /// Buffer of the live engine.
    pub fn buffer(&self) -> Option<&SharedBuffer> {
        match &self.slot {
            Slot::Active(e) => Some(e.engine().buffer()),
            _ => None,
        }
    }

    pub fn spec(&self) -> &EngineSpec {
        &self.spec
    }

    pub fn hardware_available(&self) -> bool {
        self.backend.hardware_available()
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Switch to `mode`.
    ///
    /// On a fatal failure no engine is left; the coordinator is back in
    /// `Uninitialized` and a later call may retry. A retry from there
    /// downgrades an unavailable hardware request to software, as `new`
    /// does.
    pub fn set_mode(&mut self, mode: RenderMode, surface: &mut PixelSurface) -> Result<ModeSwitch> {
        match &self.slot {
            Slot::Destroyed => {
                return Err(RenderError::Uninitialized("render coordinator was destroyed"));
            }
            Slot::Active(e) if e.mode() == mode => return Ok(ModeSwitch::Unchanged),
            _ => {}
        }

        let mut target = mode;
        if mode == RenderMode::Hardware && !self.backend.hardware_available() {
            if let Slot::Active(_) = self.slot {
                info!("hardware rendering requested but unavailable; keeping current engine");
                return Ok(ModeSwitch::Unavailable);
            }
            info!("hardware rendering unavailable, rebuilding in software mode");
            target = RenderMode::Software;
        }

        let snapshot = self.teardown(surface);
        let (engine, fell_back) = self.construct(target).inspect_err(|e| {
            error!("render mode switch to {target} failed: {e}");
        })?;
        let active = engine.mode();
        self.install(engine, surface, snapshot);

        if fell_back || target != mode {
            Ok(ModeSwitch::FellBack { requested: mode })
        } else {
            info!("render mode switched to {active}");
            Ok(ModeSwitch::Switched(active))
        }
    }

    /// Release the live engine. Idempotent.
    pub fn destroy(&mut self, surface: &mut PixelSurface) {
        surface.set_buffer(None);
        if let Slot::Active(mut engine) = std::mem::replace(&mut self.slot, Slot::Destroyed) {
            engine.engine_mut().release();
            debug!("render coordinator destroyed ({} engine released)", engine.mode());
        }
    }

    /// Build an engine for `target`, with the single hardware → software
    /// fallback. The flag reports whether the fallback was taken.
    fn construct(
        &self,
        target: RenderMode,
    ) -> Result<(ActiveEngine<B::Software, B::Hardware>, bool)> {
        match target {
            RenderMode::Software => self
                .backend
                .create_software(&self.spec)
                .map(|e| (ActiveEngine::Software(e), false)),
            RenderMode::Hardware => match self.backend.create_hardware(&self.spec) {
                Ok(e) => Ok((ActiveEngine::Hardware(e), false)),
                Err(err @ RenderError::ConstructionFailed { .. }) => {
                    warn!("{err}; falling back to software rendering");
                    self.backend
                        .create_software(&self.spec)
                        .map(|e| (ActiveEngine::Software(e), true))
                }
                Err(err) => Err(err),
            },
        }
    }

    /// Make `engine` the live one and point `surface` at its buffer.
    fn install(
        &mut self,
        engine: ActiveEngine<B::Software, B::Hardware>,
        surface: &mut PixelSurface,
        snapshot: Option<Vec<u8>>,
    ) {
        let buffer = engine.engine().buffer();
        if let Some(data) = snapshot {
            match buffer.restore(&data) {
                Ok(n) => debug!("restored {n} bytes into the new {} buffer", engine.mode()),
                Err(e) => warn!("could not restore buffer contents: {e}"),
            }
        }
        surface.set_buffer(Some(buffer));
        self.slot = Slot::Active(engine);
    }

    /// Clear the surface view, then release the live engine. Returns its
    /// pixels when contents are preserved across switches.
    fn teardown(&mut self, surface: &mut PixelSurface) -> Option<Vec<u8>> {
        surface.set_buffer(None);
        match std::mem::replace(&mut self.slot, Slot::Uninitialized) {
            Slot::Active(mut engine) => {
                let snapshot = if self.preserve_contents {
                    engine.engine().buffer().snapshot()
                } else {
                    None
                };
                engine.engine_mut().release();
                debug!("{} engine released", engine.mode());
                snapshot
            }
            other => {
                self.slot = other;
                None
            }
        }
    }

    // ── Presentation ─────────────────────────────────────────────

    fn active_mut(&mut self) -> Result<&mut ActiveEngine<B::Software, B::Hardware>> {
        match &mut self.slot {
            Slot::Active(e) => Ok(e),
            Slot::Uninitialized => Err(RenderError::Uninitialized("no render engine is active")),
            Slot::Destroyed => Err(RenderError::Uninitialized("render coordinator was destroyed")),
        }
    }

    pub fn capture(&mut self, rect: &Rect, mode: CaptureMode) -> Result<()> {
        let result = self.active_mut()?.engine_mut().capture(rect, mode);
        report("capture", &result);
        result
    }

    pub fn present(&mut self, rect: &Rect) -> Result<()> {
        let result = self.active_mut()?.engine_mut().present(rect);
        report("present", &result);
        result
    }

    pub fn present_scaled(&mut self, src: &Rect, dst: &Rect) -> Result<()> {
        let result = self.active_mut()?.engine_mut().present_scaled(src, dst);
        report("scaled present", &result);
        result
    }

    /// Forward a window resize to the hardware engine.
    ///
    /// In software mode this is a no-op: the DIB section keeps its
    /// logical size and the window DC does not depend on the client
    /// area, so nothing needs rebuilding.
    pub fn resize(&mut self, rect: &Rect) -> Result<()> {
        match self.active_mut()? {
            ActiveEngine::Hardware(e) => {
                let result = e.resize(rect);
                report("resize", &result);
                result
            }
            ActiveEngine::Software(_) => {
                debug!("software mode: resize to {}x{} is a no-op", rect.width(), rect.height());
                Ok(())
            }
        }
    }
}

impl<B: RenderBackend> Drop for RenderCoordinator<B> {
    fn drop(&mut self) {
        if let Slot::Active(engine) = &mut self.slot {
            engine.engine_mut().release();
        }
    }
}

fn report(operation: &str, result: &Result<()>) {
    match result {
        Err(e) if e.is_recoverable() => warn!("{operation} failed: {e}"),
        Err(e) => error!("{operation} failed: {e}"),
        Ok(()) => {}
    }
}
