//! # fbview-gui: frame buffer viewer window
//!
//! Opens a native Win32 window, attaches an `fbview-core` display
//! surface to it and lets the user exercise the render engines:
//! presenting, scaling on resize, screen capture and switching
//! between GDI and Direct2D at runtime.

pub mod config;
pub mod input;
pub mod window;
