//! AsyncResponsibilityChain - 最初に処理した handler で打ち切る（非同期版）

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::BoxFuture;
use crate::config::FlowConfig;
use crate::descriptor::{Capability, HandlerDescriptor};
use crate::error::Result;
use crate::registry::HandlerRegistry;
use crate::resolver::{ActivatorResolver, Resolver};

/// An asynchronous responsibility-chain handler.
///
/// # 使用例
/// ```ignore
/// #[derive(Default)]
/// struct InvalidateDataHandler;
///
/// #[async_trait]
/// impl AsyncChainMiddleware<Fault, bool> for InvalidateDataHandler {
///     async fn run(&self, fault: &mut Fault, next: AsyncChainNext<'_, Fault, bool>) -> Result<bool> {
///         if fault.kind == FaultKind::InvalidateData {
///             fault.handled_by = Some("InvalidateDataHandler");
///             return Ok(true);
///         }
///         next.run(fault).await
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncChainMiddleware<P: Send, R: Send>: Send + Sync {
    async fn run(&self, parameter: &mut P, next: AsyncChainNext<'_, P, R>) -> Result<R>;
}

impl<T, P, R> Capability<T> for dyn AsyncChainMiddleware<P, R>
where
    T: AsyncChainMiddleware<P, R> + 'static,
    P: Send + 'static,
    R: Send + 'static,
{
    fn upcast(handler: Box<T>) -> Box<Self> {
        handler
    }
}

/// Terminal continuation of an async chain.
///
/// Written as a closure returning a boxed future:
/// `|fault| Box::pin(async move { Ok(true) })`.
pub type AsyncFallback<P, R> =
    Arc<dyn for<'p> Fn(&'p mut P) -> BoxFuture<'p, Result<R>> + Send + Sync>;

/// The remainder of an async chain, starting at `position`.
pub struct AsyncChainNext<'a, P: Send, R: Send> {
    chain: &'a AsyncResponsibilityChain<P, R>,
    position: usize,
}

impl<'a, P, R> AsyncChainNext<'a, P, R>
where
    P: Send + 'static,
    R: Send + Default + 'static,
{
    pub fn run<'p>(self, parameter: &'p mut P) -> BoxFuture<'p, Result<R>>
    where
        'a: 'p,
    {
        drive(self.chain, self.position, parameter)
    }
}

fn drive<'a, P, R>(
    chain: &'a AsyncResponsibilityChain<P, R>,
    position: usize,
    parameter: &'a mut P,
) -> BoxFuture<'a, Result<R>>
where
    P: Send + 'static,
    R: Send + Default + 'static,
{
    Box::pin(async move {
        match chain.registry.resolve(position) {
            Some(resolved) => {
                let handler = resolved?;
                let next = AsyncChainNext {
                    chain,
                    position: position + 1,
                };
                handler.run(parameter, next).await
            }
            None => chain.fall_through(parameter).await,
        }
    })
}

/// Asynchronous chain of responsibility.
///
/// Same short-circuit and fallback rules as `ResponsibilityChain`; a
/// delegating handler awaits the rest of the chain before its own result is
/// final.
pub struct AsyncResponsibilityChain<P: Send, R: Send> {
    registry: HandlerRegistry<dyn AsyncChainMiddleware<P, R>>,
    fallback: Option<AsyncFallback<P, R>>,
}

impl<P, R> AsyncResponsibilityChain<P, R>
where
    P: Send + 'static,
    R: Send + Default + 'static,
{
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            registry: HandlerRegistry::with_resolver(resolver),
            fallback: None,
        }
    }

    pub fn try_new(resolver: Option<Arc<dyn Resolver>>) -> Result<Self> {
        Ok(Self {
            registry: HandlerRegistry::new(resolver)?,
            fallback: None,
        })
    }

    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.registry.set_config(config);
        self
    }

    pub fn chain<M: AsyncChainMiddleware<P, R> + Default + 'static>(mut self) -> Self {
        self.registry.register_type::<M>();
        self
    }

    pub fn chain_type(mut self, descriptor: impl Into<Option<HandlerDescriptor>>) -> Result<Self> {
        self.registry.register(descriptor.into())?;
        Ok(self)
    }

    /// Set the fallback; a second call replaces the first.
    pub fn finally<F>(mut self, fallback: F) -> Self
    where
        F: for<'p> Fn(&'p mut P) -> BoxFuture<'p, Result<R>> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    pub async fn execute(&self, parameter: &mut P) -> Result<R> {
        if self.registry.is_empty() {
            return Ok(R::default());
        }
        drive(self, 0, parameter).await
    }

    async fn fall_through(&self, parameter: &mut P) -> Result<R> {
        let flow = &self.registry.config().name;
        match &self.fallback {
            Some(fallback) => {
                debug!(flow = %flow, "no handler took the parameter, awaiting fallback");
                fallback(parameter).await
            }
            None => {
                debug!(flow = %flow, "no handler took the parameter, returning default");
                Ok(R::default())
            }
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn registry(&self) -> &HandlerRegistry<dyn AsyncChainMiddleware<P, R>> {
        &self.registry
    }
}

impl<P, R> Default for AsyncResponsibilityChain<P, R>
where
    P: Send + 'static,
    R: Send + Default + 'static,
{
    fn default() -> Self {
        Self::new(Arc::new(ActivatorResolver))
    }
}
