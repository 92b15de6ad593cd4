//! Handler descriptors.
//!
//! A [`HandlerDescriptor`] is a callback plus everything the registry and the
//! dispatcher need to know about it: its name, what kind of interaction it
//! answers and how that interaction is acknowledged.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use disunity_core::ApplicationCommandKind;

use crate::handler::BoxedCallback;

/// How an interaction is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ack {
    /// The callback runs before the response is sent and its result is the
    /// response.
    #[default]
    Immediate,
    /// A placeholder is sent right away; the callback runs afterwards and its
    /// result is delivered as a follow-up.
    Deferred {
        /// Whether the placeholder and follow-up are visible to the invoking
        /// user only.
        ephemeral: bool,
    },
}

impl Ack {
    /// Returns `true` for deferred acknowledgement.
    pub fn is_deferred(self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}

/// What a descriptor is registered as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorKind {
    /// A top-level command without sub-commands.
    Command {
        /// Application command kind the command is bucketed by.
        kind: ApplicationCommandKind,
    },
    /// A leaf sub-command, optionally inside a group.
    Subcommand {
        /// Owning top-level command.
        command: String,
        /// Group the leaf lives in, if any.
        group: Option<String>,
    },
    /// A message component or modal, routed by custom identifier prefix.
    Component {
        /// Maximum age of the message the component is attached to.
        timeout: Option<Duration>,
        /// Whether the component is removed after its first use.
        single_use: bool,
    },
    /// An autocomplete provider for a command's options.
    Autocomplete,
}

impl DescriptorKind {
    /// Returns a short label for logs and errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Subcommand { .. } => "sub-command",
            Self::Component { .. } => "component",
            Self::Autocomplete => "autocomplete",
        }
    }
}

/// A registered callback together with its metadata.
#[derive(Clone)]
pub struct HandlerDescriptor {
    name: String,
    kind: DescriptorKind,
    ack: Ack,
    callback: BoxedCallback,
}

impl HandlerDescriptor {
    pub(crate) fn new(
        name: impl Into<String>,
        kind: DescriptorKind,
        ack: Ack,
        callback: BoxedCallback,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            ack,
            callback,
        }
    }

    /// Returns the name the descriptor is keyed by.
    ///
    /// For sub-commands this is the leaf name, for components the custom
    /// identifier prefix, for autocompletes the owning command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the descriptor kind.
    pub fn kind(&self) -> &DescriptorKind {
        &self.kind
    }

    /// Returns the acknowledgement policy.
    pub fn ack(&self) -> Ack {
        self.ack
    }

    /// Returns the callback.
    pub fn callback(&self) -> &BoxedCallback {
        &self.callback
    }

    /// Returns the space-separated command path for commands and
    /// sub-commands.
    pub fn path(&self) -> String {
        match &self.kind {
            DescriptorKind::Subcommand {
                command,
                group: Some(group),
            } => format!("{command} {group} {}", self.name),
            DescriptorKind::Subcommand {
                command,
                group: None,
            } => format!("{command} {}", self.name),
            _ => self.name.clone(),
        }
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("ack", &self.ack)
            .finish_non_exhaustive()
    }
}

/// Generates a fresh custom identifier routed to the component `prefix`.
///
/// The result has the form `<prefix>-<tag>`, where the tag is unique per
/// call, so several messages can carry their own instance of one component.
pub fn new_custom_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Returns the registry key of a custom identifier: everything before the
/// first `-`.
pub fn component_key(custom_id: &str) -> &str {
    custom_id
        .split_once('-')
        .map_or(custom_id, |(prefix, _)| prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_key_splits_on_first_dash() {
        assert_eq!(component_key("foo-123"), "foo");
        assert_eq!(component_key("foo-456-789"), "foo");
        assert_eq!(component_key("foo"), "foo");
        assert_eq!(component_key("-x"), "");
    }

    #[test]
    fn test_new_custom_id_routes_to_prefix() {
        let a = new_custom_id("confirm");
        let b = new_custom_id("confirm");
        assert_ne!(a, b);
        assert_eq!(component_key(&a), "confirm");
        assert!(!a["confirm-".len()..].contains('-'));
    }
}
