//! The handler registry.
//!
//! Commands are bucketed by application command kind and keyed by name.
//! A top-level command is either a plain [`CommandEntry::Command`] or a
//! [`CommandGroupNode`] holding its sub-commands, never both. Components are
//! keyed by custom identifier prefix, autocompletes by the owning command.
//!
//! All maps sit behind one `parking_lot` lock that is never held across an
//! `.await`. Component claims (expiry and single-use removal) happen inside a
//! single write critical section.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use time::OffsetDateTime;
use tracing::{debug, info, trace};

use disunity_core::ApplicationCommandKind;

use crate::builder::Package;
use crate::descriptor::{DescriptorKind, HandlerDescriptor, component_key};
use crate::error::{RegistrationError, RegistrationResult};

// =============================================================================
// Command tree
// =============================================================================

/// The sub-commands of one top-level command.
#[derive(Debug, Clone, Default)]
pub struct CommandGroupNode {
    /// Ungrouped leaves.
    pub subcommands: HashMap<String, Arc<HandlerDescriptor>>,
    /// Grouped leaves, by group name.
    pub groups: HashMap<String, HashMap<String, Arc<HandlerDescriptor>>>,
}

impl CommandGroupNode {
    /// Returns an ungrouped leaf.
    pub fn subcommand(&self, name: &str) -> Option<&Arc<HandlerDescriptor>> {
        self.subcommands.get(name)
    }

    /// Returns a grouped leaf.
    pub fn grouped(&self, group: &str, name: &str) -> Option<&Arc<HandlerDescriptor>> {
        self.groups.get(group)?.get(name)
    }

    fn leaf_count(&self) -> usize {
        self.subcommands.len() + self.groups.values().map(HashMap::len).sum::<usize>()
    }
}

/// A top-level command entry.
#[derive(Debug, Clone)]
pub enum CommandEntry {
    /// A command without sub-commands.
    Command(Arc<HandlerDescriptor>),
    /// A command made of sub-commands.
    Group(CommandGroupNode),
}

// =============================================================================
// Components
// =============================================================================

#[derive(Debug, Clone)]
struct ComponentEntry {
    descriptor: Arc<HandlerDescriptor>,
    timeout: Option<Duration>,
    single_use: bool,
    expires_at: Option<OffsetDateTime>,
}

impl ComponentEntry {
    fn new(descriptor: Arc<HandlerDescriptor>, now: OffsetDateTime) -> Self {
        let (timeout, single_use) = match descriptor.kind() {
            DescriptorKind::Component {
                timeout,
                single_use,
            } => (*timeout, *single_use),
            _ => (None, false),
        };
        let expires_at = timeout
            .and_then(|t| time::Duration::try_from(t).ok())
            .and_then(|t| now.checked_add(t));
        Self {
            descriptor,
            timeout,
            single_use,
            expires_at,
        }
    }

    /// A component is expired once the message carrying it is older than the
    /// timeout. Without a message timestamp, the registration-time deadline
    /// applies.
    fn is_expired(&self, sent_at: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
        let Some(timeout) = self.timeout else {
            return false;
        };
        match sent_at {
            Some(sent_at) => now - sent_at > timeout,
            None => self.expires_at.is_some_and(|deadline| now > deadline),
        }
    }
}

/// The outcome of claiming a component for one invocation.
#[derive(Debug, Clone)]
pub enum ComponentClaim {
    /// The component may be invoked. Single-use components have already been
    /// removed.
    Active(Arc<HandlerDescriptor>),
    /// The component timed out and has been removed.
    Expired,
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Default)]
struct RegistryInner {
    commands: HashMap<u8, HashMap<String, CommandEntry>>,
    components: HashMap<String, ComponentEntry>,
    autocompletes: HashMap<String, Arc<HandlerDescriptor>>,
}

/// Counts of registered handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Plain top-level commands.
    pub commands: usize,
    /// Sub-command leaves across all command trees.
    pub subcommands: usize,
    /// Components.
    pub components: usize,
    /// Autocomplete providers.
    pub autocompletes: usize,
}

/// The in-memory index of registered handlers.
///
/// Cloning is cheap and every clone shares the same maps.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor according to its kind.
    ///
    /// A later registration under the same key replaces the earlier one.
    pub fn register(&self, descriptor: HandlerDescriptor) -> RegistrationResult<()> {
        match descriptor.kind() {
            DescriptorKind::Command { .. } | DescriptorKind::Subcommand { .. } => {
                self.register_command(descriptor)
            }
            DescriptorKind::Component { .. } => {
                self.register_component(descriptor);
                Ok(())
            }
            DescriptorKind::Autocomplete => {
                self.register_autocomplete(descriptor);
                Ok(())
            }
        }
    }

    /// Registers every descriptor of a package, in order.
    ///
    /// Stops at the first failing descriptor; earlier ones stay registered.
    pub fn register_package(&self, package: Package) -> RegistrationResult<()> {
        let name = package.name().to_owned();
        let count = package.len();
        for descriptor in package.into_descriptors() {
            self.register(descriptor)?;
        }
        info!(package = %name, handlers = count, "Package registered");
        Ok(())
    }

    /// Registers a plain command or a sub-command.
    ///
    /// Sub-commands are placed in the command tree of their owning command
    /// under the chat input bucket, creating the tree on first use.
    pub fn register_command(&self, descriptor: HandlerDescriptor) -> RegistrationResult<()> {
        let path = descriptor.path();
        let mut inner = self.inner.write();

        match descriptor.kind().clone() {
            DescriptorKind::Command { kind } => {
                let bucket = inner.commands.entry(kind.0).or_default();
                if let Some(CommandEntry::Group(_)) = bucket.get(descriptor.name()) {
                    return Err(RegistrationError::InvalidMethodUse {
                        name: descriptor.name().to_owned(),
                        reason: "already registered with sub-commands".into(),
                    });
                }
                let name = descriptor.name().to_owned();
                bucket.insert(name, CommandEntry::Command(Arc::new(descriptor)));
            }
            DescriptorKind::Subcommand { command, group } => {
                let bucket = inner
                    .commands
                    .entry(ApplicationCommandKind::CHAT_INPUT.0)
                    .or_default();
                let entry = bucket
                    .entry(command.clone())
                    .or_insert_with(|| CommandEntry::Group(CommandGroupNode::default()));
                let CommandEntry::Group(node) = entry else {
                    return Err(RegistrationError::InvalidMethodUse {
                        name: command,
                        reason: "already registered as a plain command".into(),
                    });
                };
                let name = descriptor.name().to_owned();
                let leaves = match group {
                    Some(group) => node.groups.entry(group).or_default(),
                    None => &mut node.subcommands,
                };
                leaves.insert(name, Arc::new(descriptor));
            }
            other => {
                return Err(RegistrationError::InvalidMethodUse {
                    name: descriptor.name().to_owned(),
                    reason: format!("a {} is not a command", other.label()),
                });
            }
        }

        debug!(command = %path, "Command registered");
        Ok(())
    }

    /// Registers a component under its custom identifier prefix.
    ///
    /// The timeout deadline is fixed at this point.
    pub fn register_component(&self, descriptor: HandlerDescriptor) {
        let entry = ComponentEntry::new(Arc::new(descriptor), OffsetDateTime::now_utc());
        let name = entry.descriptor.name().to_owned();
        debug!(
            component = %name,
            timeout = ?entry.timeout,
            single_use = entry.single_use,
            "Component registered"
        );
        self.inner.write().components.insert(name, entry);
    }

    /// Registers an autocomplete provider under its owning command name.
    pub fn register_autocomplete(&self, descriptor: HandlerDescriptor) {
        let name = descriptor.name().to_owned();
        debug!(command = %name, "Autocomplete registered");
        self.inner
            .write()
            .autocompletes
            .insert(name, Arc::new(descriptor));
    }

    /// Runs `f` on the top-level command entry under the read lock.
    pub fn with_command<R>(
        &self,
        kind: ApplicationCommandKind,
        name: &str,
        f: impl FnOnce(Option<&CommandEntry>) -> R,
    ) -> R {
        let inner = self.inner.read();
        f(inner.commands.get(&kind.0).and_then(|bucket| bucket.get(name)))
    }

    /// Returns the component a custom identifier routes to, without applying
    /// any lifecycle rule.
    pub fn lookup_component(&self, custom_id: &str) -> Option<Arc<HandlerDescriptor>> {
        self.inner
            .read()
            .components
            .get(component_key(custom_id))
            .map(|entry| Arc::clone(&entry.descriptor))
    }

    /// Claims a component for one invocation.
    ///
    /// Expired components and single-use components are removed in the same
    /// critical section as the lookup, so two concurrent clicks on a
    /// single-use component invoke it once. Returns `None` when nothing is
    /// registered under the prefix.
    pub fn claim_component(
        &self,
        custom_id: &str,
        sent_at: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Option<ComponentClaim> {
        let key = component_key(custom_id);
        let mut inner = self.inner.write();
        let entry = inner.components.get(key)?;

        if entry.is_expired(sent_at, now) {
            inner.components.remove(key);
            debug!(component = %key, "Component timed out, removed");
            return Some(ComponentClaim::Expired);
        }

        let descriptor = Arc::clone(&entry.descriptor);
        if entry.single_use {
            inner.components.remove(key);
            trace!(component = %key, "Single-use component consumed");
        }
        Some(ComponentClaim::Active(descriptor))
    }

    /// Removes a component. Returns `true` if it was registered.
    pub fn remove_component(&self, name: &str) -> bool {
        self.inner.write().components.remove(name).is_some()
    }

    /// Returns the autocomplete provider for a command.
    pub fn lookup_autocomplete(&self, command: &str) -> Option<Arc<HandlerDescriptor>> {
        self.inner.read().autocompletes.get(command).cloned()
    }

    /// Returns handler counts.
    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.read();
        let mut stats = RegistryStats {
            components: inner.components.len(),
            autocompletes: inner.autocompletes.len(),
            ..RegistryStats::default()
        };
        for entry in inner.commands.values().flat_map(HashMap::values) {
            match entry {
                CommandEntry::Command(_) => stats.commands += 1,
                CommandEntry::Group(node) => stats.subcommands += node.leaf_count(),
            }
        }
        stats
    }
}
