//! HandlerRegistry - 登録順の handler 列と resolver
//!
//! Shared by all four engines. `H` is the handler trait object the flow
//! runs (`dyn Middleware<P>`, `dyn ChainMiddleware<P, R>`, ...).

use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::FlowConfig;
use crate::descriptor::{Capability, Caster, HandlerDescriptor};
use crate::error::{FlowError, Result};
use crate::resolver::Resolver;

struct HandlerEntry<H: ?Sized> {
    descriptor: HandlerDescriptor,
    caster: Caster<H>,
}

/// Ordered, append-only sequence of handler descriptors plus the resolver
/// that turns them into instances.
///
/// Design:
/// - Built during initialization (mutable, `&mut self`).
/// - Read-only while executing (`&self`), so concurrent executions never
///   observe a registration in progress.
pub struct HandlerRegistry<H: ?Sized> {
    entries: Vec<HandlerEntry<H>>,
    resolver: Arc<dyn Resolver>,
    config: FlowConfig,
}

impl<H: ?Sized + 'static> HandlerRegistry<H> {
    /// Fails with `MissingResolver` when no resolver is supplied.
    pub fn new(resolver: Option<Arc<dyn Resolver>>) -> Result<Self> {
        let resolver = resolver.ok_or(FlowError::MissingResolver)?;
        Ok(Self::with_resolver(resolver))
    }

    pub fn with_resolver(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            entries: Vec::new(),
            resolver,
            config: FlowConfig::default(),
        }
    }

    pub fn set_config(&mut self, config: FlowConfig) {
        self.config = config;
    }

    /// Register by descriptor.
    ///
    /// Validation happens here, not at execution: the descriptor must be
    /// present and must declare `H` in its capability table.
    pub fn register(&mut self, descriptor: Option<HandlerDescriptor>) -> Result<()> {
        let descriptor = descriptor.ok_or(FlowError::NullDescriptor)?;
        let caster = descriptor
            .caster::<H>()
            .ok_or(FlowError::InvalidMiddlewareType {
                handler: descriptor.type_name(),
                capability: std::any::type_name::<H>(),
            })?;
        self.push(descriptor, caster);
        Ok(())
    }

    /// Register `T` directly; the capability is proven by the bound.
    pub fn register_type<T>(&mut self)
    where
        T: Default + Send + 'static,
        H: Capability<T>,
    {
        self.push(HandlerDescriptor::activatable::<T, H>(), Caster::of::<T>());
    }

    fn push(&mut self, descriptor: HandlerDescriptor, caster: Caster<H>) {
        debug!(
            flow = %self.config.name,
            handler = descriptor.type_name(),
            position = self.entries.len(),
            "registered handler"
        );
        self.entries.push(HandlerEntry { descriptor, caster });
    }

    /// Resolve a fresh instance of the handler at `position`.
    ///
    /// `None` past the last handler. Resolver errors are returned unchanged.
    pub(crate) fn resolve(&self, position: usize) -> Option<Result<Box<H>>> {
        let entry = self.entries.get(position)?;
        trace!(
            flow = %self.config.name,
            handler = entry.descriptor.type_name(),
            position,
            "resolving handler"
        );
        let resolved = self.resolver.resolve(&entry.descriptor).and_then(|instance| {
            entry
                .caster
                .cast(instance)
                .ok_or(FlowError::ResolvedTypeMismatch(entry.descriptor.type_name()))
        });
        Some(resolved)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered descriptors, in execution order. Each one can be passed to
    /// `register` on another registry of the same handler kind.
    pub fn descriptors(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.entries.iter().map(|entry| &entry.descriptor)
    }

    pub fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.resolver
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }
}
