//! Sceneedit - level editor viewport host
//!
//! Opens a window and drives the editor core from real mouse and keyboard
//! input: picking, selection, gizmo drags and the editing shortcuts. The
//! scene is loaded from the JSON file given as the first argument.

mod app;

fn main() {
    app::run();
}
