// src/cli/handlers/mod.rs

pub mod configure;
pub mod edit;
pub mod show;
