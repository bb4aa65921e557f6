//! Data models for SCS Packer.
//!
//! - [`ScsLists`]: archive names per game and the accessory allow-list, loaded from `scs_files.txt`
//! - [`PackerSettings`]: optional user settings loaded from `settings.yaml`
//! - [`GameType`]: which game a selected folder belongs to
//!
//! All of these are plain values. They are built once at startup and passed explicitly to
//! the pipeline; nothing here is global or mutable after loading.

pub mod config;

pub use config::{GameType, PackerSettings, ScsLists};
