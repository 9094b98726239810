//! Interactive console for exercising the notification pipeline.

pub mod commands;
pub mod config;
pub mod console;
