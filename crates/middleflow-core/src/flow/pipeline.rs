//! Pipeline - 全 handler を登録順に必ず実行する（同期版）

use std::cell::Cell;
use std::sync::Arc;

use crate::config::FlowConfig;
use crate::descriptor::{Capability, HandlerDescriptor};
use crate::error::Result;
use crate::registry::HandlerRegistry;
use crate::resolver::{ActivatorResolver, Resolver};

/// A pipeline handler.
///
/// `next` runs the rest of the pipeline. Work placed after `next.run(..)`
/// happens once the remaining handlers are done.
pub trait Middleware<P>: Send + Sync {
    fn run(&self, parameter: &mut P, next: Next<'_, P>) -> Result<()>;
}

impl<T: Middleware<P> + 'static, P: 'static> Capability<T> for dyn Middleware<P> {
    fn upcast(handler: Box<T>) -> Box<Self> {
        handler
    }
}

/// The remainder of a pipeline, starting at `position`.
pub struct Next<'a, P> {
    registry: &'a HandlerRegistry<dyn Middleware<P>>,
    position: usize,
    delegated: &'a Cell<bool>,
}

impl<P: 'static> Next<'_, P> {
    pub fn run(self, parameter: &mut P) -> Result<()> {
        self.delegated.set(true);
        run_from(self.registry, self.position, parameter)
    }
}

fn run_from<P: 'static>(
    registry: &HandlerRegistry<dyn Middleware<P>>,
    position: usize,
    parameter: &mut P,
) -> Result<()> {
    let Some(resolved) = registry.resolve(position) else {
        return Ok(());
    };
    let handler = resolved?;

    let delegated = Cell::new(false);
    let next = Next {
        registry,
        position: position + 1,
        delegated: &delegated,
    };
    handler.run(parameter, next)?;

    // A pipeline has no short-circuit: the rest still runs when the handler
    // returned without calling `next`.
    if delegated.get() {
        Ok(())
    } else {
        run_from(registry, position + 1, parameter)
    }
}

/// Runs every registered handler, once, in registration order.
///
/// # 使用例
/// ```ignore
/// let pipeline = Pipeline::<Log>::default()
///     .add::<AppendOne>()
///     .add_type(HandlerDescriptor::of::<AppendTwo>())?;
///
/// let mut log = Log::default();
/// pipeline.execute(&mut log)?;
/// ```
///
/// Registration consumes the builder and `execute` borrows it, so a
/// pipeline cannot change while it runs. Share it behind an `Arc` to
/// execute concurrently.
pub struct Pipeline<P> {
    registry: HandlerRegistry<dyn Middleware<P>>,
}

impl<P: 'static> Pipeline<P> {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            registry: HandlerRegistry::with_resolver(resolver),
        }
    }

    /// Fails with `MissingResolver` when `resolver` is `None`.
    pub fn try_new(resolver: Option<Arc<dyn Resolver>>) -> Result<Self> {
        Ok(Self {
            registry: HandlerRegistry::new(resolver)?,
        })
    }

    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.registry.set_config(config);
        self
    }

    /// Add a handler type. The capability is checked by the compiler.
    pub fn add<M: Middleware<P> + Default + 'static>(mut self) -> Self {
        self.registry.register_type::<M>();
        self
    }

    /// Add a handler by descriptor; fails eagerly when the descriptor is
    /// missing or the type does not implement `Middleware<P>`.
    pub fn add_type(mut self, descriptor: impl Into<Option<HandlerDescriptor>>) -> Result<Self> {
        self.registry.register(descriptor.into())?;
        Ok(self)
    }

    pub fn execute(&self, parameter: &mut P) -> Result<()> {
        if self.registry.is_empty() {
            return Ok(());
        }
        run_from(&self.registry, 0, parameter)
    }

    pub fn registry(&self) -> &HandlerRegistry<dyn Middleware<P>> {
        &self.registry
    }
}

impl<P: 'static> Default for Pipeline<P> {
    fn default() -> Self {
        Self::new(Arc::new(ActivatorResolver))
    }
}
