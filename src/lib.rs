#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod deeplink;
pub mod embed;
pub mod logging;
pub mod player;
pub mod shelf;
pub mod source;
pub mod storage;
pub mod ui;
pub mod view;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
