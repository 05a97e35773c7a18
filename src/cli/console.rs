use colored::*;
use std::io::{self, Write};

use async_trait::async_trait;

use crate::core::ActionRequest;
use crate::permissions::{PromptResolution, PromptResolver};

/// Interactive terminal resolver with colored y/n/a/d prompts
pub struct ConsolePromptResolver {
    tool_color: Color,
}

impl ConsolePromptResolver {
    /// Create a resolver with default colors
    pub fn new() -> Self {
        Self {
            tool_color: Color::Magenta,
        }
    }

    /// Create a resolver with a custom tool-name color
    pub fn with_tool_color(tool_color: Color) -> Self {
        Self { tool_color }
    }

    fn ask(&self, request: &ActionRequest) -> io::Result<PromptResolution> {
        let category = request.category();
        let tool_name = category.rule_name();

        println!();
        println!("{}", "─".repeat(60).yellow());
        println!(
            "{} The agent wants to use tool: {}",
            "⚠️ Permission Required".yellow().bold(),
            tool_name.color(self.tool_color).bold()
        );
        println!();
        println!("  {}", request.describe());
        println!();
        println!("{}", "Options:".yellow());
        println!("  [y] Allow this action");
        println!("  [n] Deny this action");
        println!("  [a] Always allow this action");
        println!("  [d] Always deny this action");
        println!("{}", "─".repeat(60).yellow());
        print!("{} ", "Your choice (y/n/a/d):".yellow().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        let resolution = match input.as_str() {
            "y" | "yes" => PromptResolution::AllowOnce,
            "n" | "no" => PromptResolution::DenyOnce,
            "a" | "always" => PromptResolution::AllowAlways,
            "d" | "deny" | "never" => PromptResolution::DenyAlways,
            _ => {
                println!("{}", "Invalid choice. Defaulting to Deny.".red());
                PromptResolution::DenyOnce
            }
        };

        match resolution {
            PromptResolution::AllowOnce => {
                println!("{}", "✓ Allowed".green());
            }
            PromptResolution::DenyOnce => {
                println!("{}", "✗ Denied".red());
            }
            PromptResolution::AllowAlways => {
                println!(
                    "{}",
                    format!("✓ Always allowing: {}", request.describe()).green()
                );
            }
            PromptResolution::DenyAlways => {
                println!(
                    "{}",
                    format!("✗ Always denying: {}", request.describe()).red()
                );
            }
        }
        println!();

        Ok(resolution)
    }
}

impl Default for ConsolePromptResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PromptResolver for ConsolePromptResolver {
    async fn resolve(&self, request: &ActionRequest) -> Option<PromptResolution> {
        // Blocking terminal I/O stays off the async workers
        let request = request.clone();
        let tool_color = self.tool_color;
        tokio::task::spawn_blocking(move || {
            ConsolePromptResolver { tool_color }.ask(&request).ok()
        })
        .await
        .ok()
        .flatten()
    }
}
