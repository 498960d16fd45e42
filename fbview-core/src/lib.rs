//! # fbview-core
//!
//! Frame buffer of the remote desktop viewer and its two presentation
//! engines.
//!
//! This crate contains:
//! - **Pixels**: `PixelFormat`, `Rect`, `Dimension`, and `PixelBuffer`
//!   (engine-owned memory that surfaces only observe)
//! - **Surface**: `PixelSurface` raster operations (fill, copy, move,
//!   compare, masked overlay)
//! - **Engines**: `RenderEngine` contract with the GDI DIB-section
//!   (software) and Direct2D (hardware) variants behind `Win32Backend`
//! - **Coordinator**: `RenderCoordinator` owning the active engine, mode
//!   switches and the hardware → software fallback
//! - **Facade**: `DisplaySurface`, the surface the viewer draws into
//! - **Error**: `RenderError`, typed `thiserror`-based errors

pub mod buffer;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod facade;
pub mod geometry;
pub mod pattern;
pub mod pixel;
pub mod surface;
pub mod window;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use buffer::{BufferView, PixelBuffer, SharedBuffer};
pub use config::RenderConfig;
pub use coordinator::{CoordinatorState, ModeSwitch, RenderCoordinator};
pub use engine::{
    CaptureMode, Direct2dSection, EngineSpec, GdiSection, Interpolation, RenderBackend,
    RenderEngine, RenderMode, Win32Backend,
};
pub use error::{RenderError, Result};
pub use facade::DisplaySurface;
pub use geometry::{Dimension, Rect};
pub use pixel::PixelFormat;
pub use surface::{OwnedSurface, PixelSurface};
pub use window::{WindowHandle, WindowSystem};
