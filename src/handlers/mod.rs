// src/handlers/mod.rs

pub mod attempts;
pub mod goals;
pub mod stats;
