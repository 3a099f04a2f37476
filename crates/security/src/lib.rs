//! Permission gate — decides whether a connection may run a trigger.
//!
//! Pure policy over (world state, connection, trigger, configuration); the
//! only lookup it performs is the connection's trust level. It never fails:
//! every call resolves to an allow or a deny with a reason.

use herald_config::{PERMISSIONS_SECTION, SettingsStore};
use herald_core::message::ConnectionId;
use herald_core::world::WorldView;

/// Why a connection was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The handle does not resolve to a live world entity.
    NoEntity,
    /// The world is in guest mode; guests never run gated commands.
    GuestMode,
    /// No admin level and no (true) permission entry for the trigger.
    NotPermitted,
}

/// Result of checking a trigger against the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    Allowed,
    Denied { reason: DenyReason },
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionDecision::Allowed)
    }
}

/// The permission gate policy.
pub struct PermissionGate;

impl PermissionGate {
    /// Decide whether `conn` may execute `trigger`.
    ///
    /// Rules, in order, short-circuiting:
    /// 1. Security globally disabled → allow.
    /// 2. Connection does not resolve to a live entity → deny.
    /// 3. World in guest mode → deny.
    /// 4. Admin level above zero → allow.
    /// 5. Stored permission entry for the trigger if present, else deny
    ///    (fail closed).
    pub fn check(
        world: &dyn WorldView,
        conn: ConnectionId,
        trigger: &str,
        security_enabled: bool,
        settings: &SettingsStore,
    ) -> PermissionDecision {
        if !security_enabled {
            return PermissionDecision::Allowed;
        }

        let Some(trust) = world.connection_trust(conn) else {
            return PermissionDecision::Denied {
                reason: DenyReason::NoEntity,
            };
        };

        if trust.guest_mode {
            return PermissionDecision::Denied {
                reason: DenyReason::GuestMode,
            };
        }

        if trust.admin_level > 0 {
            return PermissionDecision::Allowed;
        }

        match settings.peek_bool(PERMISSIONS_SECTION, &trigger.to_lowercase()) {
            Some(true) => PermissionDecision::Allowed,
            Some(false) | None => PermissionDecision::Denied {
                reason: DenyReason::NotPermitted,
            },
        }
    }

    /// Convenience boolean form of [`Self::check`].
    pub fn is_allowed(
        world: &dyn WorldView,
        conn: ConnectionId,
        trigger: &str,
        security_enabled: bool,
        settings: &SettingsStore,
    ) -> bool {
        Self::check(world, conn, trigger, security_enabled, settings).is_allowed()
    }
}
