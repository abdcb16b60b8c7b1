//! Scene picking and transform-gizmo core for a 3D level editor.
//!
//! The library has no windowing dependency; the `sceneedit` binary drives it
//! from winit input.

pub mod config;
pub mod editor;
pub mod geometry;
pub mod render;
pub mod scene;

pub use config::EditorSettings;
pub use editor::{Editor, PointerButton, SelectionSet};
