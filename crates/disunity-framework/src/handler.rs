//! Handler system for the Disunity framework.
//!
//! Callbacks are plain async functions. Any function taking up to eight
//! parameters that implement [`FromContext`] and returning a type that
//! implements [`IntoCallbackResult`] is a [`Handler`]:
//!
//! ```rust,ignore
//! use disunity_framework::{Invoker, Options};
//!
//! // No parameters, no response body
//! async fn noop() {}
//!
//! // Reply with a message
//! async fn greet(Invoker(user): Invoker) -> String {
//!     format!("Hello, {}!", user.display_name())
//! }
//!
//! // Fallible handler
//! async fn sum(Options(options): Options) -> anyhow::Result<String> {
//!     let total: i64 = options.iter().filter_map(|o| o.value.as_ref()?.as_i64()).sum();
//!     Ok(total.to_string())
//! }
//! ```

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use disunity_core::{InteractionResponse, MessageBody};

use crate::context::InteractionContext;
use crate::error::CallbackError;
use crate::extractor::FromContext;

/// The outcome of one handler invocation.
///
/// `Ok(None)` means the handler produced no response body.
pub type CallbackResult = Result<Option<InteractionResponse>, CallbackError>;

// ============================================================================
// IntoCallbackResult - Handler return values
// ============================================================================

/// A trait for types that can be returned from handlers.
pub trait IntoCallbackResult: Send {
    /// Converts this value into a callback result.
    fn into_callback_result(self) -> CallbackResult;
}

/// No response body.
impl IntoCallbackResult for () {
    fn into_callback_result(self) -> CallbackResult {
        Ok(None)
    }
}

impl IntoCallbackResult for InteractionResponse {
    fn into_callback_result(self) -> CallbackResult {
        Ok(Some(self))
    }
}

/// Responds with a channel message.
impl IntoCallbackResult for MessageBody {
    fn into_callback_result(self) -> CallbackResult {
        Ok(Some(InteractionResponse::message(self)))
    }
}

/// Responds with a plain text channel message.
impl IntoCallbackResult for String {
    fn into_callback_result(self) -> CallbackResult {
        Ok(Some(InteractionResponse::message(self)))
    }
}

impl IntoCallbackResult for &'static str {
    fn into_callback_result(self) -> CallbackResult {
        Ok(Some(InteractionResponse::message(self)))
    }
}

/// On `Some`, the inner value is converted. On `None`, there is no body.
impl<T: IntoCallbackResult> IntoCallbackResult for Option<T> {
    fn into_callback_result(self) -> CallbackResult {
        match self {
            Some(t) => t.into_callback_result(),
            None => Ok(None),
        }
    }
}

/// On `Err`, the error is turned into [`CallbackError::Failed`].
impl<T: IntoCallbackResult, E: Display + Send> IntoCallbackResult for Result<T, E> {
    fn into_callback_result(self) -> CallbackResult {
        match self {
            Ok(t) => t.into_callback_result(),
            Err(e) => Err(CallbackError::Failed(e.to_string())),
        }
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for interaction handlers.
///
/// Implemented for async functions of up to eight [`FromContext`]
/// parameters. The type parameter `T` is the tuple of parameter types and
/// only exists to keep the blanket implementations apart.
#[async_trait]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Calls the handler with the given context.
    async fn call(self, ctx: Arc<InteractionContext>) -> CallbackResult;
}

/// A type-erased handler stored in a descriptor.
pub type BoxedCallback =
    Arc<dyn Fn(Arc<InteractionContext>) -> BoxFuture<'static, CallbackResult> + Send + Sync>;

/// Converts a handler function into a boxed callback.
pub fn into_callback<F, T>(f: F) -> BoxedCallback
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(move |ctx| f.clone().call(ctx))
}

// ============================================================================
// Handler implementations for functions
// ============================================================================

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        #[async_trait]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoCallbackResult + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            async fn call(self, ctx: Arc<InteractionContext>) -> CallbackResult {
                $(
                    let $ty = $ty::from_context(&ctx)?;
                )*

                (self)($($ty,)*).await.into_callback_result()
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
