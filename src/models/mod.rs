// src/models/mod.rs

pub mod attempt;
pub mod goal;
pub mod question;
pub mod test;
