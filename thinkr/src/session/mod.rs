//! Session state and the operations users drive.

mod context;
mod controller;
mod state_file;

pub use context::ContextWindow;
pub use controller::Session;
pub use state_file::{active_path, read_active, write_active};
