// src/config/mod.rs
pub mod ai;
pub mod monitor;
pub mod profile;

pub use ai::AiConfig;
pub use monitor::MonitorConfig;
pub use profile::{MatchProfile, RoleKeywords};
