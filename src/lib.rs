pub mod core;
pub mod executor;
pub mod permissions;
pub mod session;

// Optional components
pub mod cli;
pub mod logging;
