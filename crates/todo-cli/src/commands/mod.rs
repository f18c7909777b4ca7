//! Command handlers

pub mod config;
pub mod item;
pub mod status;
