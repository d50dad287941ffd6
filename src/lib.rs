//! # roku_builder
//!
//! Resolves the layered JSON configuration that drives building, sideloading,
//! testing and profiling apps on Roku devices: parent-config chains, the local
//! project overlay, repeat-stage macros, project inheritance, the active
//! device/project/stage view, and in-place field edits.

include!(concat!(env!("OUT_DIR"), "/messages.rs"));

pub mod cli;
pub mod constants;
pub mod context;
pub mod core;
pub mod models;
pub mod options;
