//! Built-in command handlers.

use herald_core::command::{
    CommandContext, CommandHandler, CommandOutput, CommandSide,
};
use herald_core::error::CommandError;

/// `/help` — lists commands runnable on the current side, or shows one
/// command's usage.
#[derive(Default)]
pub struct HelpCommand;

impl CommandHandler for HelpCommand {
    fn triggers(&self) -> &[&str] {
        &["help"]
    }

    fn side(&self) -> CommandSide {
        CommandSide::Both
    }

    fn description(&self) -> &str {
        "List available commands or show usage for one command"
    }

    fn usage(&self) -> &str {
        "/help [command]"
    }

    fn run(
        &self,
        ctx: &CommandContext<'_>,
    ) -> std::result::Result<Vec<CommandOutput>, CommandError> {
        match ctx.args.first() {
            None => {
                let triggers = ctx.registry.triggers_for(ctx.side);
                let mut text = format!("Available commands: {}", triggers.join(", "));
                text.push_str("\nUsage: /help [command]");
                Ok(vec![CommandOutput::info(text)])
            }
            Some(name) => match ctx.registry.lookup(name) {
                Some(entry) if entry.handler().side().runs_on(ctx.side) => {
                    let handler = entry.handler();
                    let mut text = String::new();
                    if !handler.usage().is_empty() {
                        text.push_str(handler.usage());
                    }
                    if !handler.description().is_empty() {
                        if !text.is_empty() {
                            text.push_str(" - ");
                        }
                        text.push_str(handler.description());
                    }
                    if text.is_empty() {
                        text = format!("No usage recorded for {name}");
                    }
                    Ok(vec![CommandOutput::info(text)])
                }
                _ => Ok(vec![CommandOutput::error(format!(
                    "Command {name} does not exist!"
                ))]),
            },
        }
    }
}
