//! Terminal front-end pieces

mod console;

pub use console::ConsolePromptResolver;
