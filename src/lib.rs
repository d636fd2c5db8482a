#[cfg(feature = "desktop")]
pub mod camera;
pub mod config;
pub mod control;
pub mod handoff;
pub mod keys;
pub mod overlay;
pub mod pose;
pub mod render;
pub mod tracker;
pub mod worker;
