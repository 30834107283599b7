#![forbid(unsafe_code)]

pub mod ops;
pub mod watch_ctrl;
