//! Resolver - descriptor から handler instance を作る
//!
//! Flows call the resolver once per handler per `execute`. Instances are
//! never cached by the flow; a resolver that wants pooling or singletons
//! does it itself.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::HandlerDescriptor;
use crate::error::{FlowError, Result};

/// Maps a handler descriptor to a live instance.
///
/// Plug a DI container in by implementing this trait. Any
/// `Fn(&HandlerDescriptor) -> Result<Box<dyn Any + Send>>` closure is a
/// resolver as well.
pub trait Resolver: Send + Sync {
    fn resolve(&self, descriptor: &HandlerDescriptor) -> Result<Box<dyn Any + Send>>;
}

impl<F> Resolver for F
where
    F: Fn(&HandlerDescriptor) -> Result<Box<dyn Any + Send>> + Send + Sync,
{
    fn resolve(&self, descriptor: &HandlerDescriptor) -> Result<Box<dyn Any + Send>> {
        self(descriptor)
    }
}

/// Default resolver: parameterless construction through `Default`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivatorResolver;

impl Resolver for ActivatorResolver {
    fn resolve(&self, descriptor: &HandlerDescriptor) -> Result<Box<dyn Any + Send>> {
        descriptor
            .construct()
            .ok_or(FlowError::NotActivatable(descriptor.type_name()))
    }
}

type Factory = Arc<dyn Fn() -> Result<Box<dyn Any + Send>> + Send + Sync>;

/// Resolver backed by per-type factory closures.
///
/// Types without a factory fall back to their parameterless constructor.
///
/// Design:
/// - Built during initialization (mutable).
/// - Shared by the flow afterwards (immutable).
#[derive(Default)]
pub struct FactoryResolver {
    factories: HashMap<TypeId, Factory>,
}

impl FactoryResolver {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an infallible factory for `T`.
    pub fn register<T, F>(&mut self, factory: F) -> Result<()>
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_fallible::<T, _>(move || Ok(factory()))
    }

    /// Register a factory for `T` that may fail; its error reaches the
    /// `execute` caller untouched.
    pub fn register_fallible<T, F>(&mut self, factory: F) -> Result<()>
    where
        T: Any + Send,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        if self.factories.contains_key(&type_id) {
            return Err(FlowError::DuplicateFactory(std::any::type_name::<T>()));
        }
        let factory: Factory =
            Arc::new(move || factory().map(|instance| Box::new(instance) as Box<dyn Any + Send>));
        self.factories.insert(type_id, factory);
        Ok(())
    }

    pub fn contains(&self, descriptor: &HandlerDescriptor) -> bool {
        self.factories.contains_key(&descriptor.type_id())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Resolver for FactoryResolver {
    fn resolve(&self, descriptor: &HandlerDescriptor) -> Result<Box<dyn Any + Send>> {
        match self.factories.get(&descriptor.type_id()) {
            Some(factory) => factory(),
            None => ActivatorResolver.resolve(descriptor),
        }
    }
}
