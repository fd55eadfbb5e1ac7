//! termpaste - paste clipboard images into terminals as shell-safe paths
//!
//! The library exposes platform detection, the clipboard reader chain, format
//! conversion, image storage and shell quoting so they can be tested and
//! reused outside the binary.

pub mod clipboard;
pub mod exec;
pub mod image;
pub mod logging;
pub mod paste;
pub mod platform;
pub mod storage;
pub mod terminal;
