#![forbid(unsafe_code)]

pub mod init;
pub mod palette;
pub mod shortcuts;
pub mod statusbar;
pub mod toasts;
pub mod topbar;
pub mod updates;
