//! Handler parameter extractors.
//!
//! Each handler parameter is extracted from the [`InteractionContext`] before
//! the handler runs. A failed extraction aborts the invocation with
//! [`CallbackError::Extract`](crate::error::CallbackError::Extract); wrap the
//! parameter in `Option` to make it optional.

use std::collections::HashMap;
use std::sync::Arc;

use disunity_core::{CommandOption, Interaction, User};

use crate::context::InteractionContext;
use crate::error::{ExtractError, ExtractResult};

/// A trait for types that can be extracted from an [`InteractionContext`].
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self>;
}

/// The full context, for handlers that need follow-ups or several fields.
impl FromContext for Arc<InteractionContext> {
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self> {
        Ok(Arc::clone(ctx))
    }
}

/// The raw interaction payload.
impl FromContext for Arc<Interaction> {
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self> {
        Ok(ctx.interaction_arc())
    }
}

impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

/// The options injected into this invocation.
///
/// For sub-commands these are the leaf's options, not the top-level ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options(pub Vec<CommandOption>);

impl Options {
    /// Returns the option with the given name.
    pub fn get(&self, name: &str) -> Option<&CommandOption> {
        self.0.iter().find(|o| o.name == name)
    }

    /// Returns the string value of the option with the given name.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name)?.value.as_ref()?.as_str()
    }

    /// Returns the integer value of the option with the given name.
    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.value.as_ref()?.as_i64()
    }
}

impl FromContext for Options {
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self> {
        Ok(Self(ctx.options().to_vec()))
    }
}

/// The custom identifier of a component or modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomId(pub String);

impl CustomId {
    /// Returns the part after the registry key, if any.
    pub fn tag(&self) -> Option<&str> {
        self.0.split_once('-').map(|(_, tag)| tag)
    }
}

impl FromContext for CustomId {
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self> {
        ctx.custom_id()
            .map(|id| Self(id.to_owned()))
            .ok_or(ExtractError::Missing("custom id"))
    }
}

/// The selected values of a select menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values(pub Vec<String>);

impl FromContext for Values {
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self> {
        Ok(Self(ctx.values().to_vec()))
    }
}

/// The user who triggered the interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker(pub User);

impl FromContext for Invoker {
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self> {
        ctx.invoker()
            .cloned()
            .map(Self)
            .ok_or(ExtractError::Missing("invoking user"))
    }
}

/// The submitted text inputs of a modal, keyed by input custom identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalValues(pub HashMap<String, String>);

impl FromContext for ModalValues {
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self> {
        Ok(Self(ctx.modal_values()))
    }
}

/// The option the user is typing in, for autocompletes.
#[derive(Debug, Clone, PartialEq)]
pub struct Focused(pub CommandOption);

impl FromContext for Focused {
    fn from_context(ctx: &Arc<InteractionContext>) -> ExtractResult<Self> {
        ctx.focused_option()
            .cloned()
            .map(Self)
            .ok_or(ExtractError::Missing("focused option"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_accessors() {
        let options = Options(vec![
            serde_json::from_value(json!({ "name": "q", "type": 3, "value": "rust" })).unwrap(),
            serde_json::from_value(json!({ "name": "n", "type": 4, "value": 3 })).unwrap(),
        ]);
        assert_eq!(options.str("q"), Some("rust"));
        assert_eq!(options.i64("n"), Some(3));
        assert_eq!(options.i64("q"), None);
        assert!(options.get("missing").is_none());
    }

    #[test]
    fn test_custom_id_tag() {
        assert_eq!(CustomId("vote-42".into()).tag(), Some("42"));
        assert_eq!(CustomId("vote".into()).tag(), None);
    }
}
