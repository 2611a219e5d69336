//! Operation abstraction consumed by the command runner
//!
//! A domain command supplies one fetch-and-normalize function, one human
//! renderer and, through [`Diff`] on its output type, one delta function.
//! The runner drives any such operation through the four execution modes
//! without knowing anything about the domain.

use async_trait::async_trait;
use serde::Serialize;

use crate::context::AppContext;
use crate::diff::Diff;
use crate::error::CommandError;

/// One fetch-and-render unit
#[async_trait]
pub trait Operation: Send + Sync {
    /// Canonical record produced by one invocation
    type Output: Diff + Clone + Serialize + Send + Sync;

    /// Name used in cache keys, log events and tick documents
    fn name(&self) -> &'static str;

    /// Fetches and normalizes one result
    ///
    /// Composition with the cache and the fallback chain happens inside the
    /// implementation; the runner never touches the network directly.
    async fn fetch(&self, ctx: &AppContext) -> Result<Self::Output, CommandError>;

    /// Renders a human-readable block
    ///
    /// `previous` is the previous successful value within a watch session so
    /// renderers can show inline changes; it is absent on the first tick and
    /// in one-shot mode.
    fn render(&self, data: &Self::Output, previous: Option<&Self::Output>) -> String;

    /// Machine-readable view of the record; defaults to its serde shape
    fn json(&self, data: &Self::Output) -> serde_json::Value {
        serde_json::to_value(data).unwrap_or(serde_json::Value::Null)
    }
}
