//! The per-side dispatch state machine.

use herald_codec::segment::encode_text;
use herald_codec::reassembly::ReassemblyTable;
use herald_config::{BoolSetting, PERMISSIONS_SECTION, SettingsStore};
use herald_core::command::{
    CommandContext, CommandHandler, CommandLine, CommandOutput, CommandRegistry, EngineSide,
};
use herald_core::error::TransportError;
use herald_core::message::{ConnectionId, Message, MessageFlags, MessageKind, MessageStatus};
use herald_core::transport::Transport;
use herald_core::world::WorldView;
use herald_security::PermissionGate;
use tracing::{debug, error, info, warn};

use crate::hints::hint_for;
use crate::queue::ReceivedQueue;

/// Default command prefix character.
pub const DEFAULT_PREFIX: char = '/';

/// Settings section holding the engine's own knobs.
pub const COMMANDS_SECTION: &str = "commands";

/// The dispatch engine — one per server or client instance.
///
/// Owns the reassembly table, the bounded received-message queue, the
/// command registry, and the settings store. All processing happens inside
/// [`DispatchEngine::pump`], called once per simulation tick from a single
/// thread; nothing here blocks or suspends.
pub struct DispatchEngine {
    side: EngineSide,
    prefix: char,
    registry: CommandRegistry,
    settings: SettingsStore,
    table: ReassemblyTable,
    queue: ReceivedQueue,
    next_seq: u32,

    hints_enabled: BoolSetting,
    log_all_commands: BoolSetting,
    security_enabled: BoolSetting,
    allow_unknown_commands: BoolSetting,

    /// Client side only: responses and chat lines awaiting the host UI.
    display: Vec<Message>,
}

impl DispatchEngine {
    /// Build the server-side engine.
    pub fn server(settings: SettingsStore) -> Self {
        Self::new(EngineSide::Server, settings)
    }

    /// Build the client-side engine.
    pub fn client(settings: SettingsStore) -> Self {
        Self::new(EngineSide::Client, settings)
    }

    fn new(side: EngineSide, mut settings: SettingsStore) -> Self {
        let hints_enabled = settings.bool_setting(
            COMMANDS_SECTION,
            "hints_enabled",
            true,
            "Append a usage hint when a command fails",
        );
        let log_all_commands = settings.bool_setting(
            COMMANDS_SECTION,
            "log_all_commands",
            false,
            "Log every accepted command with its sender",
        );
        let security_enabled = settings.bool_setting(
            COMMANDS_SECTION,
            "security_enabled",
            true,
            "Enforce per-command permission checks",
        );
        let allow_unknown_commands = settings.bool_setting(
            COMMANDS_SECTION,
            "allow_unknown_commands",
            false,
            "Relay unrecognized client commands to all other clients",
        );

        Self {
            side,
            prefix: DEFAULT_PREFIX,
            registry: CommandRegistry::new(),
            settings,
            table: ReassemblyTable::new(),
            queue: ReceivedQueue::new(),
            next_seq: 1,
            hints_enabled,
            log_all_commands,
            security_enabled,
            allow_unknown_commands,
            display: Vec::new(),
        }
    }

    /// Override the command prefix character.
    pub fn with_prefix(mut self, prefix: char) -> Self {
        self.prefix = prefix;
        self
    }

    /// Replace the reassembly table (e.g. to tune the expiry horizon).
    pub fn with_reassembly(mut self, table: ReassemblyTable) -> Self {
        self.table = table;
        self
    }

    pub fn side(&self) -> EngineSide {
        self.side
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    // --- Registration ---

    /// Register a handler type with a default constructor.
    ///
    /// Registration failures (no triggers, trigger already owned) are
    /// logged and skipped; the engine keeps running with whatever
    /// registrations succeeded.
    pub fn register_handler<H>(&mut self, owner: &str)
    where
        H: CommandHandler + Default + 'static,
    {
        self.register_handler_with(owner, H::default);
    }

    /// Register a handler built by a factory closure.
    pub fn register_handler_with<H>(&mut self, owner: &str, build: impl FnOnce() -> H)
    where
        H: CommandHandler + 'static,
    {
        if let Err(e) = self.registry.register_with(owner, build) {
            warn!(owner = owner, error = %e, "command registration skipped");
            return;
        }

        // Lazily create one permission entry per trigger, grouped under the
        // declaring module's name in the description.
        let triggers: Vec<String> = self
            .registry
            .get::<H>()
            .map(|entry| {
                entry
                    .handler()
                    .triggers()
                    .iter()
                    .map(|t| t.to_lowercase())
                    .collect()
            })
            .unwrap_or_default();
        for trigger in triggers {
            let description =
                format!("[{owner}] Allow non-admin players to run /{trigger}");
            self.settings
                .bool_setting(PERMISSIONS_SECTION, &trigger, false, &description);
        }
        info!(owner = owner, side = %self.side, "registered command handler");
    }

    // --- Outbound operations ---

    /// Submit a command to a peer (client → server).
    pub fn send_command(
        &mut self,
        transport: &mut dyn Transport,
        to: ConnectionId,
        text: &str,
        flags: MessageFlags,
    ) -> Result<(), TransportError> {
        self.send_message(
            transport,
            to,
            MessageKind::Command,
            MessageStatus::None,
            flags,
            text,
        )
    }

    /// Send a chat line to one peer, or broadcast to all when `target` is
    /// `None` (server side).
    pub fn send_chat(
        &mut self,
        transport: &mut dyn Transport,
        target: Option<ConnectionId>,
        text: &str,
    ) -> Result<(), TransportError> {
        match target {
            Some(to) => self.send_message(
                transport,
                to,
                MessageKind::ChatMessage,
                MessageStatus::None,
                MessageFlags::empty(),
                text,
            ),
            None => {
                for peer in transport.peers() {
                    self.send_message(
                        transport,
                        peer,
                        MessageKind::ChatMessage,
                        MessageStatus::None,
                        MessageFlags::empty(),
                        text,
                    )?;
                }
                Ok(())
            }
        }
    }

    fn send_message(
        &mut self,
        transport: &mut dyn Transport,
        to: ConnectionId,
        kind: MessageKind,
        status: MessageStatus,
        flags: MessageFlags,
        text: &str,
    ) -> Result<(), TransportError> {
        let seq = self.alloc_seq();
        for record in encode_text(seq, kind, status, flags, text) {
            transport.send(to, record)?;
        }
        Ok(())
    }

    fn alloc_seq(&mut self) -> u32 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        seq
    }

    // --- Per-tick processing ---

    /// Run one tick: drain arrived segments into the reassembly table, then
    /// dispatch every queued message.
    ///
    /// Handler failures are contained per invocation; nothing that happens
    /// here propagates to the host loop.
    pub fn pump(&mut self, world: &dyn WorldView, transport: &mut dyn Transport) {
        self.table.tick();
        for inbound in transport.drain() {
            if let Some(message) = self.table.accept(inbound.from, inbound.record) {
                self.queue.push(message);
            }
        }

        while let Some(message) = self.queue.pop() {
            self.dispatch(message, world, transport);
        }
    }

    fn dispatch(&mut self, message: Message, world: &dyn WorldView, transport: &mut dyn Transport) {
        match (self.side, message.kind) {
            (EngineSide::Server, MessageKind::Command | MessageKind::RelayCommand) => {
                self.dispatch_server_command(message, world, transport);
            }
            (EngineSide::Server, MessageKind::ChatMessage) => {
                self.relay_chat(message, world, transport);
            }
            (EngineSide::Server, MessageKind::Response) => {
                debug!(seq = message.seq, sender = %message.sender, "ignoring response sent to server");
            }
            (EngineSide::Client, MessageKind::Command) => {
                self.dispatch_client_command(message, world);
            }
            (EngineSide::Client, MessageKind::RelayCommand) => {
                self.dispatch_client_relay(message, world);
            }
            (EngineSide::Client, MessageKind::Response | MessageKind::ChatMessage) => {
                self.display.push(message);
            }
        }
    }

    // --- Server path ---

    fn dispatch_server_command(
        &mut self,
        message: Message,
        world: &dyn WorldView,
        transport: &mut dyn Transport,
    ) {
        let text = message.text().unwrap_or_default().to_string();
        let Some(line) = CommandLine::parse(&text, self.prefix) else {
            self.respond(
                transport,
                &message,
                MessageStatus::Error,
                "Could not parse command.",
            );
            return;
        };

        let registered = self
            .registry
            .lookup(&line.trigger)
            .is_some_and(|entry| entry.handler().side().runs_on(EngineSide::Server));

        if !registered {
            if self.allow_unknown_commands.get() {
                // The trigger has no registration, so the gate falls through
                // to the stored entry and fails closed unless an operator
                // explicitly allowed it (or the sender is an admin).
                let decision = PermissionGate::check(
                    world,
                    message.sender,
                    &line.trigger,
                    self.security_enabled.get(),
                    &self.settings,
                );
                if decision.is_allowed() {
                    self.relay_command(transport, &message, &text);
                } else {
                    self.respond_denied(transport, &message, &line.trigger);
                }
            } else {
                let reply = format!("Command {} does not exist!", line.trigger);
                self.respond(transport, &message, MessageStatus::Error, &reply);
            }
            return;
        }

        let decision = PermissionGate::check(
            world,
            message.sender,
            &line.trigger,
            self.security_enabled.get(),
            &self.settings,
        );
        if !decision.is_allowed() {
            debug!(
                sender = %message.sender,
                trigger = %line.trigger,
                decision = ?decision,
                "command denied"
            );
            self.respond_denied(transport, &message, &line.trigger);
            return;
        }

        if self.log_all_commands.get() {
            info!(
                player = %world.display_name(message.sender),
                command = %text,
                "command accepted"
            );
        }

        let outputs = self.invoke(&line, &message, world);
        let failed = outputs
            .first()
            .is_some_and(|o| o.status == MessageStatus::Error);
        for output in &outputs {
            self.respond(transport, &message, output.status, &output.text);
        }
        if failed && message.flags.wants_hints() && self.hints_enabled.get() {
            self.respond(transport, &message, MessageStatus::Hint, hint_for(&text));
        }
    }

    /// Forward an unrecognized command verbatim to every other connection.
    fn relay_command(&mut self, transport: &mut dyn Transport, message: &Message, text: &str) {
        for peer in transport.peers() {
            if peer == message.sender {
                continue;
            }
            if let Err(e) = self.send_message(
                transport,
                peer,
                MessageKind::RelayCommand,
                MessageStatus::None,
                message.flags,
                text,
            ) {
                warn!(peer = %peer, error = %e, "failed to relay command");
            }
        }
    }

    /// Forward a chat line to every other connection, prefixed with the
    /// sender's display name.
    fn relay_chat(&mut self, message: Message, world: &dyn WorldView, transport: &mut dyn Transport) {
        let text = message.text().unwrap_or_default();
        let line = format!("{}: {}", world.display_name(message.sender), text);
        for peer in transport.peers() {
            if peer == message.sender {
                continue;
            }
            if let Err(e) = self.send_message(
                transport,
                peer,
                MessageKind::ChatMessage,
                MessageStatus::None,
                MessageFlags::empty(),
                &line,
            ) {
                warn!(peer = %peer, error = %e, "failed to relay chat");
            }
        }
    }

    // --- Client path ---

    fn dispatch_client_command(&mut self, message: Message, world: &dyn WorldView) {
        let text = message.text().unwrap_or_default().to_string();
        let Some(line) = CommandLine::parse(&text, self.prefix) else {
            self.push_display(&message, MessageStatus::Error, "Could not parse command.");
            return;
        };

        enum Route {
            ClientHandler,
            ServerOnly,
            Unknown,
        }
        let route = match self.registry.lookup(&line.trigger) {
            Some(entry) if entry.handler().side().runs_on(EngineSide::Client) => {
                Route::ClientHandler
            }
            Some(_) => Route::ServerOnly,
            None => Route::Unknown,
        };

        match route {
            Route::ClientHandler => {
                let decision = PermissionGate::check(
                    world,
                    message.sender,
                    &line.trigger,
                    self.security_enabled.get(),
                    &self.settings,
                );
                if !decision.is_allowed() {
                    let reply =
                        format!("Not enough permissions to run command {}!", line.trigger);
                    self.push_display(&message, MessageStatus::Error, &reply);
                    return;
                }
                self.run_client_handler(&line, &message, world, &text);
            }
            Route::ServerOnly => {
                // Server-only trigger: immediate local error, no round-trip.
                let reply = format!(
                    "Command {} can only be run on the server!",
                    line.trigger
                );
                self.push_display(&message, MessageStatus::Error, &reply);
            }
            Route::Unknown => {
                let reply = format!("Command {} does not exist!", line.trigger);
                self.push_display(&message, MessageStatus::Error, &reply);
            }
        }
    }

    /// Relayed commands are executed unconditionally: the server enforced
    /// permissions before forwarding.
    fn dispatch_client_relay(&mut self, message: Message, world: &dyn WorldView) {
        let text = message.text().unwrap_or_default().to_string();
        let Some(line) = CommandLine::parse(&text, self.prefix) else {
            warn!(seq = message.seq, "unparseable relayed command, dropping");
            return;
        };

        let handled = self
            .registry
            .lookup(&line.trigger)
            .is_some_and(|entry| entry.handler().side().runs_on(EngineSide::Client));
        if !handled {
            warn!(trigger = %line.trigger, "no client handler for relayed command, dropping");
            return;
        }
        self.run_client_handler(&line, &message, world, &text);
    }

    fn run_client_handler(
        &mut self,
        line: &CommandLine<'_>,
        message: &Message,
        world: &dyn WorldView,
        text: &str,
    ) {
        let outputs = self.invoke(line, message, world);
        let failed = outputs
            .first()
            .is_some_and(|o| o.status == MessageStatus::Error);
        for output in &outputs {
            self.push_display(message, output.status, &output.text);
        }
        if failed && message.flags.wants_hints() && self.hints_enabled.get() {
            self.push_display(message, MessageStatus::Hint, hint_for(text));
        }
    }

    // --- Shared helpers ---

    /// Invoke the registered handler, containing any failure.
    fn invoke(
        &self,
        line: &CommandLine<'_>,
        message: &Message,
        world: &dyn WorldView,
    ) -> Vec<CommandOutput> {
        let Some(entry) = self.registry.lookup(&line.trigger) else {
            return Vec::new();
        };
        let ctx = CommandContext {
            sender: message.sender,
            args: &line.args,
            raw: line.raw,
            side: self.side,
            world,
            registry: &self.registry,
        };
        match entry.handler().run(&ctx) {
            Ok(outputs) => outputs,
            Err(e) => {
                error!(trigger = %line.trigger, error = %e, "command handler failed");
                vec![CommandOutput::error(format!(
                    "Error executing command {}!",
                    line.trigger
                ))]
            }
        }
    }

    fn respond(
        &mut self,
        transport: &mut dyn Transport,
        message: &Message,
        status: MessageStatus,
        text: &str,
    ) {
        if let Err(e) = self.send_message(
            transport,
            message.sender,
            MessageKind::Response,
            status,
            MessageFlags::empty(),
            text,
        ) {
            warn!(peer = %message.sender, error = %e, "failed to send response");
        }
    }

    fn respond_denied(&mut self, transport: &mut dyn Transport, message: &Message, trigger: &str) {
        let reply = format!("Not enough permissions to run command {trigger}!");
        self.respond(transport, message, MessageStatus::Error, &reply);
    }

    fn push_display(&mut self, message: &Message, status: MessageStatus, text: &str) {
        let seq = self.alloc_seq();
        self.display.push(Message::complete(
            seq,
            MessageKind::Response,
            status,
            message.sender,
            MessageFlags::empty(),
            text,
        ));
    }

    /// Take everything queued for the host UI (client side).
    pub fn take_display(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.display)
    }
}
