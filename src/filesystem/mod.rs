// src/filesystem/mod.rs

//! Filesystem helpers shared by the layout and archive modules

pub mod path;

pub use path::{sanitize_filename, sanitize_path, PathError};
