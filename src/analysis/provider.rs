//! Chat model provider trait.

use std::future::Future;
use std::pin::Pin;

use super::task::ChatPrompt;
use crate::error::Result;

/// A chat model that answers a prompt with JSON text.
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Send the prompt and return the raw message content.
    fn complete(&self, prompt: &ChatPrompt) -> impl Future<Output = Result<String>> + Send;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe form of [`LlmProvider`].
trait LlmProviderBoxed: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    fn complete_boxed<'a>(&'a self, prompt: &'a ChatPrompt) -> BoxFuture<'a, Result<String>>;
}

struct Wrapper<P>(P);

impl<P: LlmProvider> LlmProviderBoxed for Wrapper<P> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn model(&self) -> &str {
        self.0.model()
    }

    fn complete_boxed<'a>(&'a self, prompt: &'a ChatPrompt) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.0.complete(prompt))
    }
}

/// Provider chosen at runtime.
pub struct BoxedProvider {
    inner: Box<dyn LlmProviderBoxed>,
}

impl BoxedProvider {
    pub fn new<P: LlmProvider + 'static>(provider: P) -> Self {
        Self {
            inner: Box::new(Wrapper(provider)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.inner.model()
    }

    /// Send the prompt and return the raw message content.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying provider fails with.
    pub async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        self.inner.complete_boxed(prompt).await
    }
}

impl std::fmt::Debug for BoxedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedProvider")
            .field("name", &self.name())
            .field("model", &self.model())
            .finish()
    }
}

/// Provider that always answers with the same content.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct StaticProvider {
    reply: std::result::Result<String, String>,
}

#[cfg(test)]
impl StaticProvider {
    #[must_use]
    pub fn replying(content: &str) -> Self {
        Self {
            reply: Ok(content.to_string()),
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
        }
    }
}

#[cfg(test)]
impl LlmProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn model(&self) -> &str {
        "none"
    }

    async fn complete(&self, _prompt: &ChatPrompt) -> Result<String> {
        self.reply
            .clone()
            .map_err(crate::error::Error::Analysis)
    }
}
