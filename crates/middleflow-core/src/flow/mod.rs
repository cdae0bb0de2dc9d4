//! Flow - 4 つの実行エンジン
//!
//! - **Pipeline / AsyncPipeline**: every handler runs, in registration order.
//! - **ResponsibilityChain / AsyncResponsibilityChain**: handlers run until
//!   one stops delegating; an optional fallback ends the chain otherwise.
//!
//! Each `execute` builds its continuation on the fly: a continuation is the
//! flow reference plus the next position, passed by value into the current
//! handler. Nothing about an in-flight execution is stored on the flow, so
//! one flow can serve many concurrent executions.

use std::future::Future;
use std::pin::Pin;

pub mod async_chain;
pub mod async_pipeline;
pub mod chain;
pub mod pipeline;

/// Boxed future returned by async continuations and fallbacks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use self::async_chain::{
    AsyncChainMiddleware, AsyncChainNext, AsyncFallback, AsyncResponsibilityChain,
};
pub use self::async_pipeline::{AsyncMiddleware, AsyncNext, AsyncPipeline};
pub use self::chain::{ChainMiddleware, ChainNext, Fallback, ResponsibilityChain};
pub use self::pipeline::{Middleware, Next, Pipeline};
