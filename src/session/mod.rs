//! Session lifecycle and the action-handling entry point

mod controller;
mod state;

pub use controller::SessionController;
pub use state::SessionState;
