//! middleflow-core
//!
//! Ordered handler composition with two execution disciplines:
//!
//! - **pipeline**: every registered handler runs, in order, on every call
//! - **responsibility chain**: handlers run in order until one handles the
//!   parameter; the rest are skipped and an optional fallback covers the
//!   case where nobody does
//!
//! Both come in a synchronous and an async flavour and share one
//! registration core.
//!
//! # モジュール構成
//! - **descriptor**: handler 型の識別子と capability table（`HandlerType`）
//! - **resolver**: descriptor → instance（`ActivatorResolver`, `FactoryResolver`）
//! - **registry**: 登録順の handler 列と登録時検証
//! - **flow**: 4 つのエンジン（Pipeline, AsyncPipeline, ResponsibilityChain, AsyncResponsibilityChain）
//! - **config / error**: FlowConfig と FlowError

pub mod config;
pub mod descriptor;
pub mod error;
pub mod flow;
pub mod registry;
pub mod resolver;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::FlowConfig;
pub use descriptor::{Capabilities, Capability, HandlerDescriptor, HandlerType};
pub use error::{BoxError, FlowError, Result};
pub use flow::{
    AsyncChainMiddleware, AsyncChainNext, AsyncFallback, AsyncMiddleware, AsyncNext,
    AsyncPipeline, AsyncResponsibilityChain, BoxFuture, ChainMiddleware, ChainNext, Fallback,
    Middleware, Next, Pipeline, ResponsibilityChain,
};
pub use registry::HandlerRegistry;
pub use resolver::{ActivatorResolver, FactoryResolver, Resolver};

// Re-exported so handler crates implement the async traits with the same macro.
pub use async_trait::async_trait;
