//! Вспомогательные модули

pub mod logger;

pub use logger::{init_logger, try_init_logger};
