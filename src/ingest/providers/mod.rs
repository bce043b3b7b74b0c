// src/ingest/providers/mod.rs
pub mod fixture;
pub mod greenhouse;

pub use fixture::FixtureSource;
pub use greenhouse::GreenhouseBoardSource;
