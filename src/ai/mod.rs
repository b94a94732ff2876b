// src/ai/mod.rs
pub mod connector;
pub mod remote_model;
pub mod report;
