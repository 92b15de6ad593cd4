//! Payload matching.
//!
//! The matcher turns a parsed [`Interaction`] into an [`InvocationRecord`]:
//! the descriptor to call and the options to inject. For commands it walks
//! the option tree to find the leaf sub-command, for components and modals it
//! claims the component from the registry.
//!
//! Command resolution looks at `data.options` in this order:
//!
//! 1. a single sub-command group: the nested single leaf inside that group
//! 2. a single sub-command: the ungrouped leaf
//! 3. any other options: the top-level command, options injected verbatim
//! 4. no options: the top-level command, nothing injected

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::trace;

use disunity_core::{CommandOption, Interaction, InteractionKind};

use crate::descriptor::HandlerDescriptor;
use crate::error::{DispatchError, DispatchResult};
use crate::registry::{CommandEntry, CommandGroupNode, ComponentClaim, Registry};

/// What an invocation was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationTarget {
    /// A command or sub-command, by space-separated path.
    Command { path: String },
    /// A message component, by full custom identifier.
    Component { custom_id: String },
    /// A modal submission, by full custom identifier.
    Modal { custom_id: String },
    /// An autocomplete query, by top-level command name.
    Autocomplete { command: String },
}

impl std::fmt::Display for InvocationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command { path } => write!(f, "command '{path}'"),
            Self::Component { custom_id } => write!(f, "component '{custom_id}'"),
            Self::Modal { custom_id } => write!(f, "modal '{custom_id}'"),
            Self::Autocomplete { command } => write!(f, "autocomplete '{command}'"),
        }
    }
}

/// A resolved invocation. Computed once per interaction, never mutated.
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    /// What was resolved.
    pub target: InvocationTarget,
    /// The handler to call.
    pub descriptor: Arc<HandlerDescriptor>,
    /// The options injected into the handler.
    pub options: Vec<CommandOption>,
}

/// The outcome of matching an interaction.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Invoke the handler.
    Invoke(InvocationRecord),
    /// The component timed out and must not be invoked.
    TimedOut(InvocationTarget),
}

/// Resolves interactions against a registry.
#[derive(Debug, Clone)]
pub struct PayloadMatcher {
    registry: Registry,
}

impl PayloadMatcher {
    /// Creates a matcher over the given registry.
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Resolves an interaction at time `now`.
    ///
    /// Pings and unknown kinds are not matchable and yield
    /// [`DispatchError::UnknownInteraction`].
    pub fn resolve(
        &self,
        interaction: &Interaction,
        now: OffsetDateTime,
    ) -> DispatchResult<Resolution> {
        match interaction.interaction_kind() {
            InteractionKind::ApplicationCommand => {
                self.resolve_command(interaction).map(Resolution::Invoke)
            }
            InteractionKind::Autocomplete => {
                self.resolve_autocomplete(interaction).map(Resolution::Invoke)
            }
            InteractionKind::MessageComponent => {
                let custom_id = required_custom_id(interaction)?;
                self.claim(interaction, now, custom_id, |custom_id| {
                    InvocationTarget::Component { custom_id }
                })
            }
            InteractionKind::ModalSubmit => {
                let custom_id = required_custom_id(interaction)?;
                self.claim(interaction, now, custom_id, |custom_id| {
                    InvocationTarget::Modal { custom_id }
                })
            }
            other => Err(DispatchError::UnknownInteraction(other.code())),
        }
    }

    fn resolve_command(&self, interaction: &Interaction) -> DispatchResult<InvocationRecord> {
        let data = interaction.data();
        let name = data
            .name
            .as_deref()
            .ok_or_else(|| DispatchError::MalformedPayload("command has no name".into()))?;
        let options = data.options.as_deref().unwrap_or_default();

        self.registry
            .with_command(data.command_kind(), name, |entry| -> DispatchResult<_> {
                let entry = entry.ok_or_else(|| DispatchError::CommandNotFound(name.to_owned()))?;

                match options {
                    [group] if group.is_subcommand_group() => {
                        let node = group_node(entry, name)?;
                        let leaf = single_leaf(group)?;
                        let path = format!("{name} {} {}", group.name, leaf.name);
                        let descriptor = node
                            .grouped(&group.name, &leaf.name)
                            .ok_or_else(|| DispatchError::CommandNotFound(path.clone()))?;
                        Ok((path, Arc::clone(descriptor), leaf.children().to_vec()))
                    }
                    [leaf] if leaf.is_subcommand() => {
                        let node = group_node(entry, name)?;
                        let path = format!("{name} {}", leaf.name);
                        let descriptor = node
                            .subcommand(&leaf.name)
                            .ok_or_else(|| DispatchError::CommandNotFound(path.clone()))?;
                        Ok((path, Arc::clone(descriptor), leaf.children().to_vec()))
                    }
                    _ => match entry {
                        CommandEntry::Command(descriptor) => {
                            Ok((name.to_owned(), Arc::clone(descriptor), options.to_vec()))
                        }
                        CommandEntry::Group(_) => Err(DispatchError::InvalidMethodUse(format!(
                            "'{name}' has sub-commands but none was invoked"
                        ))),
                    },
                }
            })
            .map(|(path, descriptor, options)| {
                trace!(command = %path, options = options.len(), "Command matched");
                InvocationRecord {
                    target: InvocationTarget::Command { path },
                    descriptor,
                    options,
                }
            })
    }

    fn resolve_autocomplete(&self, interaction: &Interaction) -> DispatchResult<InvocationRecord> {
        let data = interaction.data();
        let name = data
            .name
            .as_deref()
            .ok_or_else(|| DispatchError::MalformedPayload("autocomplete has no name".into()))?;
        let descriptor = self
            .registry
            .lookup_autocomplete(name)
            .ok_or_else(|| DispatchError::AutocompleteNotFound(name.to_owned()))?;

        // Descend through sub-command layers so the focused option is reachable.
        let mut options = data.options.as_deref().unwrap_or_default();
        while let [nested] = options {
            if !(nested.is_subcommand() || nested.is_subcommand_group()) {
                break;
            }
            options = nested.children();
        }

        Ok(InvocationRecord {
            target: InvocationTarget::Autocomplete {
                command: name.to_owned(),
            },
            descriptor,
            options: options.to_vec(),
        })
    }

    fn claim(
        &self,
        interaction: &Interaction,
        now: OffsetDateTime,
        custom_id: String,
        target: impl FnOnce(String) -> InvocationTarget,
    ) -> DispatchResult<Resolution> {
        let sent_at = interaction.message.as_ref().and_then(|m| m.created_at());

        match self.registry.claim_component(&custom_id, sent_at, now) {
            Some(ComponentClaim::Active(descriptor)) => Ok(Resolution::Invoke(InvocationRecord {
                target: target(custom_id),
                descriptor,
                options: Vec::new(),
            })),
            Some(ComponentClaim::Expired) => Ok(Resolution::TimedOut(target(custom_id))),
            None => Err(DispatchError::ComponentNotFound(custom_id)),
        }
    }
}

fn required_custom_id(interaction: &Interaction) -> DispatchResult<String> {
    interaction
        .data()
        .custom_id
        .clone()
        .ok_or_else(|| DispatchError::MalformedPayload("component has no custom_id".into()))
}

fn group_node<'a>(
    entry: &'a CommandEntry,
    name: &str,
) -> DispatchResult<&'a CommandGroupNode> {
    match entry {
        CommandEntry::Group(node) => Ok(node),
        CommandEntry::Command(_) => Err(DispatchError::InvalidMethodUse(format!(
            "'{name}' is registered without sub-commands"
        ))),
    }
}

fn single_leaf(group: &CommandOption) -> DispatchResult<&CommandOption> {
    match group.children() {
        [leaf] if leaf.is_subcommand() => Ok(leaf),
        _ => Err(DispatchError::MalformedPayload(format!(
            "group '{}' does not hold exactly one sub-command",
            group.name
        ))),
    }
}
