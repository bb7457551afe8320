pub mod action;
pub mod analysis;
pub mod app;
pub mod chart;
pub mod config;
pub mod event;
pub mod format;
pub mod investigate;
pub mod logging;
pub mod output;
pub mod system;
pub mod ui;
