// src/core/mod.rs

pub mod active_view;
pub mod bootstrap;
pub mod config_loader;
pub mod error;
pub mod field_editor;
pub mod normalizer;
pub mod project_resolver;
pub mod stage_expander;
