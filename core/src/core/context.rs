// storefront/src/core/context.rs

//! The boxed handler type every pipeline phase stores.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A pipeline step handler.
///
/// Takes a clone of the shared `ContextData<TData>` and resolves to a
/// [`PipelineControl`] or the pipeline's error type. Handlers read what they
/// need under a short lock, drop the guard, then await their I/O.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
