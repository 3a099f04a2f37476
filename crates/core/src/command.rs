//! Command handler trait and registry.
//!
//! A command handler binds one or more case-insensitive trigger names to a
//! piece of game logic. Handlers are registered in the [`CommandRegistry`]
//! and invoked by the dispatch engine once a complete Command message has
//! been reassembled and passed the permission gate.

use std::any::TypeId;
use std::collections::HashMap;

use crate::error::{CommandError, RegistryError};
use crate::message::{ConnectionId, MessageStatus};
use crate::world::WorldView;

/// Which dispatch engine a handler runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSide {
    Server,
    Client,
}

impl std::fmt::Display for EngineSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineSide::Server => write!(f, "server"),
            EngineSide::Client => write!(f, "client"),
        }
    }
}

/// Which side(s) a command may execute on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSide {
    Server,
    Client,
    Both,
}

impl CommandSide {
    /// Whether a command declared for this side runs on the given engine.
    pub fn runs_on(self, side: EngineSide) -> bool {
        match self {
            CommandSide::Both => true,
            CommandSide::Server => side == EngineSide::Server,
            CommandSide::Client => side == EngineSide::Client,
        }
    }
}

/// One message produced by a handler, sent back to the caller as a Response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: MessageStatus,
    pub text: String,
}

impl CommandOutput {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            status: MessageStatus::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            status: MessageStatus::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            status: MessageStatus::Error,
            text: text.into(),
        }
    }
}

/// Everything a handler may inspect while executing.
pub struct CommandContext<'a> {
    /// The connection that submitted the command.
    pub sender: ConnectionId,

    /// Whitespace-split arguments after the trigger token.
    pub args: &'a [&'a str],

    /// The raw message text, prefix and trigger included.
    pub raw: &'a str,

    /// The engine side the command is executing on.
    pub side: EngineSide,

    /// World state collaborator, for trust and display-name lookups.
    pub world: &'a dyn WorldView,

    /// The registry the command was dispatched from (lets `/help` enumerate
    /// its neighbours).
    pub registry: &'a CommandRegistry,
}

/// Optional autocompletion capability.
///
/// A handler that can complete partial input implements this alongside
/// [`CommandHandler`] and returns itself from
/// [`CommandHandler::completer`]. Dispatch queries the capability through
/// that method instead of downcasting.
pub trait Completer {
    /// Candidate completions for a partial argument.
    fn complete(&self, partial: &str) -> Vec<String>;
}

/// The core command handler trait.
///
/// Execution is synchronous: handlers run inline during the dispatch pass
/// and must not block. Errors are contained per invocation by the engine.
pub trait CommandHandler: Send + Sync {
    /// Trigger names this handler answers to. Matching is case-insensitive;
    /// declare them lowercase. Must be non-empty.
    fn triggers(&self) -> &[&str];

    /// Which side(s) may execute this command.
    fn side(&self) -> CommandSide;

    /// One-line description shown by `/help`.
    fn description(&self) -> &str {
        ""
    }

    /// Usage string shown by `/help <trigger>`, e.g. `"/kick <player>"`.
    fn usage(&self) -> &str {
        ""
    }

    /// Execute the command.
    fn run(
        &self,
        ctx: &CommandContext<'_>,
    ) -> std::result::Result<Vec<CommandOutput>, CommandError>;

    /// The autocompletion capability, if this handler has one.
    fn completer(&self) -> Option<&dyn Completer> {
        None
    }
}

/// A parsed command line: prefix stripped, trigger lowercased, args split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub trigger: String,
    pub args: Vec<&'a str>,
    pub raw: &'a str,
}

impl<'a> CommandLine<'a> {
    /// Parse raw message text into trigger and arguments.
    ///
    /// The prefix character is stripped if present; the first whitespace
    /// token becomes the (lowercased) trigger. Returns `None` when no
    /// trigger token remains.
    pub fn parse(raw: &'a str, prefix: char) -> Option<Self> {
        let stripped = raw.trim_start();
        let stripped = stripped.strip_prefix(prefix).unwrap_or(stripped);
        let mut tokens = stripped.split_whitespace();
        let trigger = tokens.next()?.to_lowercase();
        Some(Self {
            trigger,
            args: tokens.collect(),
            raw,
        })
    }
}

/// A registered handler plus its registration metadata.
pub struct RegisteredCommand {
    /// The declaring module's name, used to group permission settings.
    owner: String,
    handler: Box<dyn CommandHandler>,
}

impl RegisteredCommand {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn handler(&self) -> &dyn CommandHandler {
        self.handler.as_ref()
    }
}

/// Maps trigger names to registered handlers.
///
/// Identity is the handler's Rust type: re-registering the same type
/// replaces the stored instance (a no-op update), while a trigger already
/// owned by a *different* type rejects the registration. The registry is a
/// plain owned value — one per dispatch engine, never a process-wide
/// singleton.
pub struct CommandRegistry {
    handlers: HashMap<TypeId, RegisteredCommand>,
    /// Lowercased trigger name → owning handler type.
    triggers: HashMap<String, TypeId>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            triggers: HashMap::new(),
        }
    }

    /// Register a handler type with a default constructor.
    pub fn register<H>(&mut self, owner: &str) -> std::result::Result<(), RegistryError>
    where
        H: CommandHandler + Default + 'static,
    {
        self.register_with(owner, H::default)
    }

    /// Register a handler built by a factory closure.
    ///
    /// Fails (without mutating the registry) when the handler declares no
    /// triggers or when one of its triggers is owned by another handler
    /// type. Registration failures are recoverable: callers log and skip.
    pub fn register_with<H>(
        &mut self,
        owner: &str,
        build: impl FnOnce() -> H,
    ) -> std::result::Result<(), RegistryError>
    where
        H: CommandHandler + 'static,
    {
        let handler = build();
        let type_id = TypeId::of::<H>();
        let triggers: Vec<String> = handler
            .triggers()
            .iter()
            .map(|t| t.to_lowercase())
            .collect();

        if triggers.is_empty() {
            return Err(RegistryError::NoTriggers {
                owner: owner.to_string(),
            });
        }

        for trigger in &triggers {
            if let Some(existing) = self.triggers.get(trigger) {
                if *existing != type_id {
                    let owner = self
                        .handlers
                        .get(existing)
                        .map(|r| r.owner.clone())
                        .unwrap_or_default();
                    return Err(RegistryError::TriggerTaken {
                        trigger: trigger.clone(),
                        owner,
                    });
                }
            }
        }

        // Re-registration of the same type: drop triggers the new instance
        // no longer declares.
        self.triggers
            .retain(|_, owned_by| *owned_by != type_id);
        for trigger in triggers {
            self.triggers.insert(trigger, type_id);
        }
        self.handlers.insert(
            type_id,
            RegisteredCommand {
                owner: owner.to_string(),
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    /// Remove a handler type and all of its triggers.
    pub fn unregister<H>(&mut self) -> std::result::Result<(), RegistryError>
    where
        H: CommandHandler + 'static,
    {
        let type_id = TypeId::of::<H>();
        if self.handlers.remove(&type_id).is_none() {
            return Err(RegistryError::UnknownHandler);
        }
        self.triggers.retain(|_, owned_by| *owned_by != type_id);
        Ok(())
    }

    /// Look up the handler owning a trigger name (case-insensitive).
    pub fn lookup(&self, trigger: &str) -> Option<&RegisteredCommand> {
        let type_id = self.triggers.get(&trigger.to_lowercase())?;
        self.handlers.get(type_id)
    }

    /// Look up a registration by handler type.
    pub fn get<H>(&self) -> Option<&RegisteredCommand>
    where
        H: CommandHandler + 'static,
    {
        self.handlers.get(&TypeId::of::<H>())
    }

    /// All handlers that run on the given side.
    pub fn handlers_for(&self, side: EngineSide) -> impl Iterator<Item = &RegisteredCommand> {
        self.handlers
            .values()
            .filter(move |r| r.handler.side().runs_on(side))
    }

    /// Sorted trigger names runnable on the given side (for `/help`).
    pub fn triggers_for(&self, side: EngineSide) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .triggers
            .iter()
            .filter(|(_, type_id)| {
                self.handlers
                    .get(*type_id)
                    .is_some_and(|r| r.handler.side().runs_on(side))
            })
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
