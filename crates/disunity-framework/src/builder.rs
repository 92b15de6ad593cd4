//! Builders for handler descriptors and packages.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use disunity_framework::{Package, autocomplete, command, component, subcommand};
//!
//! let package = Package::new("moderation")
//!     .add_command(command("ping"), ping)
//!     .add_command(command("report").defer_ephemeral(), report)
//!     .add_subcommand(subcommand("mod", "ban").group("admin"), ban)
//!     .add_component(
//!         component("confirm").single_use().timeout(Duration::from_secs(60)),
//!         confirm,
//!     )
//!     .add_autocomplete(autocomplete("search"), suggest);
//! ```

use std::time::Duration;

use disunity_core::ApplicationCommandKind;

use crate::descriptor::{Ack, DescriptorKind, HandlerDescriptor};
use crate::handler::{Handler, into_callback};

// =============================================================================
// Descriptor builders
// =============================================================================

/// Starts a top-level command.
pub fn command(name: impl Into<String>) -> CommandBuilder {
    CommandBuilder {
        name: name.into(),
        kind: ApplicationCommandKind::CHAT_INPUT,
        ack: Ack::Immediate,
    }
}

/// Starts a leaf sub-command of `command`.
pub fn subcommand(command: impl Into<String>, name: impl Into<String>) -> SubcommandBuilder {
    SubcommandBuilder {
        command: command.into(),
        group: None,
        name: name.into(),
        ack: Ack::Immediate,
    }
}

/// Starts a component (or modal) routed by custom identifier prefix `name`.
pub fn component(name: impl Into<String>) -> ComponentBuilder {
    ComponentBuilder {
        name: name.into(),
        timeout: None,
        single_use: false,
        ack: Ack::Immediate,
    }
}

/// Starts an autocomplete provider for the top-level command `command`.
pub fn autocomplete(command: impl Into<String>) -> AutocompleteBuilder {
    AutocompleteBuilder {
        command: command.into(),
    }
}

macro_rules! impl_ack_setters {
    ($builder:ty) => {
        impl $builder {
            /// Sets the acknowledgement policy.
            pub fn ack(mut self, ack: Ack) -> Self {
                self.ack = ack;
                self
            }

            /// Acknowledges with a public placeholder and runs the handler
            /// afterwards.
            pub fn defer(self) -> Self {
                self.ack(Ack::Deferred { ephemeral: false })
            }

            /// Acknowledges with a placeholder only the invoking user sees and
            /// runs the handler afterwards.
            pub fn defer_ephemeral(self) -> Self {
                self.ack(Ack::Deferred { ephemeral: true })
            }
        }
    };
}

/// Builder for a top-level command.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    name: String,
    kind: ApplicationCommandKind,
    ack: Ack,
}

impl CommandBuilder {
    /// Sets the application command kind. Defaults to chat input.
    pub fn kind(mut self, kind: ApplicationCommandKind) -> Self {
        self.kind = kind;
        self
    }

    /// Finishes the descriptor with its handler.
    pub fn handler<F, T>(self, f: F) -> HandlerDescriptor
    where
        F: Handler<T>,
        T: 'static,
    {
        HandlerDescriptor::new(
            self.name,
            DescriptorKind::Command { kind: self.kind },
            self.ack,
            into_callback(f),
        )
    }
}

impl_ack_setters!(CommandBuilder);

/// Builder for a leaf sub-command.
#[derive(Debug, Clone)]
pub struct SubcommandBuilder {
    command: String,
    group: Option<String>,
    name: String,
    ack: Ack,
}

impl SubcommandBuilder {
    /// Places the leaf inside a sub-command group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Finishes the descriptor with its handler.
    pub fn handler<F, T>(self, f: F) -> HandlerDescriptor
    where
        F: Handler<T>,
        T: 'static,
    {
        HandlerDescriptor::new(
            self.name,
            DescriptorKind::Subcommand {
                command: self.command,
                group: self.group,
            },
            self.ack,
            into_callback(f),
        )
    }
}

impl_ack_setters!(SubcommandBuilder);

/// Builder for a component.
#[derive(Debug, Clone)]
pub struct ComponentBuilder {
    name: String,
    timeout: Option<Duration>,
    single_use: bool,
    ack: Ack,
}

impl ComponentBuilder {
    /// Expires the component once the message it is attached to is older
    /// than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Removes the component after its first use.
    pub fn single_use(mut self) -> Self {
        self.single_use = true;
        self
    }

    /// Finishes the descriptor with its handler.
    pub fn handler<F, T>(self, f: F) -> HandlerDescriptor
    where
        F: Handler<T>,
        T: 'static,
    {
        HandlerDescriptor::new(
            self.name,
            DescriptorKind::Component {
                timeout: self.timeout,
                single_use: self.single_use,
            },
            self.ack,
            into_callback(f),
        )
    }
}

impl_ack_setters!(ComponentBuilder);

/// Builder for an autocomplete provider. Autocompletes are always answered
/// immediately.
#[derive(Debug, Clone)]
pub struct AutocompleteBuilder {
    command: String,
}

impl AutocompleteBuilder {
    /// Finishes the descriptor with its handler.
    pub fn handler<F, T>(self, f: F) -> HandlerDescriptor
    where
        F: Handler<T>,
        T: 'static,
    {
        HandlerDescriptor::new(
            self.command,
            DescriptorKind::Autocomplete,
            Ack::Immediate,
            into_callback(f),
        )
    }
}

// =============================================================================
// Package
// =============================================================================

/// A named batch of descriptors loaded into the registry together.
#[derive(Debug, Clone, Default)]
pub struct Package {
    name: String,
    descriptors: Vec<HandlerDescriptor>,
}

impl Package {
    /// Creates an empty package.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptors: Vec::new(),
        }
    }

    /// Returns the package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a top-level command.
    pub fn add_command<F, T>(self, builder: CommandBuilder, f: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.add(builder.handler(f))
    }

    /// Adds a sub-command.
    pub fn add_subcommand<F, T>(self, builder: SubcommandBuilder, f: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.add(builder.handler(f))
    }

    /// Adds a component.
    pub fn add_component<F, T>(self, builder: ComponentBuilder, f: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.add(builder.handler(f))
    }

    /// Adds an autocomplete provider.
    pub fn add_autocomplete<F, T>(self, builder: AutocompleteBuilder, f: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.add(builder.handler(f))
    }

    /// Adds a pre-built descriptor.
    pub fn add(mut self, descriptor: HandlerDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Returns the descriptors in insertion order.
    pub fn descriptors(&self) -> &[HandlerDescriptor] {
        &self.descriptors
    }

    /// Returns the number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if the package has no descriptors.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub(crate) fn into_descriptors(self) -> Vec<HandlerDescriptor> {
        self.descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop() {}

    #[test]
    fn test_builders_encode_metadata() {
        let cmd = command("report").defer_ephemeral().handler(noop);
        assert_eq!(cmd.ack(), Ack::Deferred { ephemeral: true });
        assert_eq!(
            cmd.kind(),
            &DescriptorKind::Command {
                kind: ApplicationCommandKind::CHAT_INPUT
            }
        );

        let leaf = subcommand("mod", "ban").group("admin").handler(noop);
        assert_eq!(leaf.name(), "ban");
        assert_eq!(leaf.path(), "mod admin ban");

        let button = component("confirm")
            .single_use()
            .timeout(Duration::from_secs(30))
            .handler(noop);
        assert_eq!(
            button.kind(),
            &DescriptorKind::Component {
                timeout: Some(Duration::from_secs(30)),
                single_use: true
            }
        );
        assert_eq!(button.ack(), Ack::Immediate);

        assert_eq!(autocomplete("search").handler(noop).kind().label(), "autocomplete");
    }

    #[test]
    fn test_package_keeps_insertion_order() {
        let package = Package::new("demo")
            .add_component(component("b"), noop)
            .add_command(command("a"), noop);
        assert_eq!(package.name(), "demo");
        let names: Vec<_> = package.descriptors().iter().map(|d| d.name()).collect();
        assert_eq!(names, ["b", "a"]);
    }
}
