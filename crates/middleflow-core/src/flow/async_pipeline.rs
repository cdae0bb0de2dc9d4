//! AsyncPipeline - 全 handler を登録順に必ず実行する（非同期版）

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::BoxFuture;
use crate::config::FlowConfig;
use crate::descriptor::{Capability, HandlerDescriptor};
use crate::error::Result;
use crate::registry::HandlerRegistry;
use crate::resolver::{ActivatorResolver, Resolver};

/// An asynchronous pipeline handler.
///
/// # 使用例
/// ```ignore
/// #[derive(Default)]
/// struct Audit;
///
/// #[async_trait]
/// impl AsyncMiddleware<Request> for Audit {
///     async fn run(&self, request: &mut Request, next: AsyncNext<'_, Request>) -> Result<()> {
///         request.audited = true;
///         next.run(request).await
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncMiddleware<P: Send>: Send + Sync {
    async fn run(&self, parameter: &mut P, next: AsyncNext<'_, P>) -> Result<()>;
}

impl<T: AsyncMiddleware<P> + 'static, P: Send + 'static> Capability<T> for dyn AsyncMiddleware<P> {
    fn upcast(handler: Box<T>) -> Box<Self> {
        handler
    }
}

/// The remainder of an async pipeline, starting at `position`.
pub struct AsyncNext<'a, P: Send> {
    registry: &'a HandlerRegistry<dyn AsyncMiddleware<P>>,
    position: usize,
    delegated: &'a AtomicBool,
}

impl<'a, P: Send + 'static> AsyncNext<'a, P> {
    /// Counts as delegation only once the returned future is polled; a
    /// dropped continuation leaves the rest of the pipeline to the engine.
    pub fn run<'p>(self, parameter: &'p mut P) -> BoxFuture<'p, Result<()>>
    where
        'a: 'p,
    {
        let Self {
            registry,
            position,
            delegated,
        } = self;
        Box::pin(async move {
            delegated.store(true, Ordering::Release);
            drive(registry, position, parameter).await
        })
    }
}

/// One step of the pipeline. The current handler (and whatever it awaits
/// through `next`) completes before this future does.
fn drive<'a, P: Send + 'static>(
    registry: &'a HandlerRegistry<dyn AsyncMiddleware<P>>,
    position: usize,
    parameter: &'a mut P,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let Some(resolved) = registry.resolve(position) else {
            return Ok(());
        };
        let handler = resolved?;

        let delegated = AtomicBool::new(false);
        let next = AsyncNext {
            registry,
            position: position + 1,
            delegated: &delegated,
        };
        handler.run(&mut *parameter, next).await?;

        if delegated.load(Ordering::Acquire) {
            Ok(())
        } else {
            drive(registry, position + 1, parameter).await
        }
    })
}

/// Runs every registered async handler, once, in registration order.
///
/// Handlers never overlap: handler N+1 starts only when handler N calls
/// `next` (or returns without calling it).
pub struct AsyncPipeline<P: Send> {
    registry: HandlerRegistry<dyn AsyncMiddleware<P>>,
}

impl<P: Send + 'static> AsyncPipeline<P> {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            registry: HandlerRegistry::with_resolver(resolver),
        }
    }

    pub fn try_new(resolver: Option<Arc<dyn Resolver>>) -> Result<Self> {
        Ok(Self {
            registry: HandlerRegistry::new(resolver)?,
        })
    }

    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.registry.set_config(config);
        self
    }

    pub fn add<M: AsyncMiddleware<P> + Default + 'static>(mut self) -> Self {
        self.registry.register_type::<M>();
        self
    }

    pub fn add_type(mut self, descriptor: impl Into<Option<HandlerDescriptor>>) -> Result<Self> {
        self.registry.register(descriptor.into())?;
        Ok(self)
    }

    pub async fn execute(&self, parameter: &mut P) -> Result<()> {
        if self.registry.is_empty() {
            return Ok(());
        }
        drive(&self.registry, 0, parameter).await
    }

    pub fn registry(&self) -> &HandlerRegistry<dyn AsyncMiddleware<P>> {
        &self.registry
    }
}

impl<P: Send + 'static> Default for AsyncPipeline<P> {
    fn default() -> Self {
        Self::new(Arc::new(ActivatorResolver))
    }
}
