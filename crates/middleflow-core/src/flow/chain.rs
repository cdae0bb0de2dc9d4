//! ResponsibilityChain - 最初に処理した handler で打ち切る（同期版）

use std::sync::Arc;

use tracing::debug;

use crate::config::FlowConfig;
use crate::descriptor::{Capability, HandlerDescriptor};
use crate::error::Result;
use crate::registry::HandlerRegistry;
use crate::resolver::{ActivatorResolver, Resolver};

/// A responsibility-chain handler.
///
/// Returning without calling `next` handles the parameter and ends the
/// chain. Delegating means returning `next.run(parameter)`.
pub trait ChainMiddleware<P, R>: Send + Sync {
    fn run(&self, parameter: &mut P, next: ChainNext<'_, P, R>) -> Result<R>;
}

impl<T, P, R> Capability<T> for dyn ChainMiddleware<P, R>
where
    T: ChainMiddleware<P, R> + 'static,
    P: 'static,
    R: 'static,
{
    fn upcast(handler: Box<T>) -> Box<Self> {
        handler
    }
}

/// Terminal continuation of a chain, run when every handler delegates.
pub type Fallback<P, R> = Arc<dyn Fn(&mut P) -> Result<R> + Send + Sync>;

/// The remainder of a chain, starting at `position`.
pub struct ChainNext<'a, P, R> {
    chain: &'a ResponsibilityChain<P, R>,
    position: usize,
}

impl<P: 'static, R: Default + 'static> ChainNext<'_, P, R> {
    pub fn run(self, parameter: &mut P) -> Result<R> {
        self.chain.run_from(self.position, parameter)
    }
}

/// Chain of responsibility over registered handler types.
///
/// # 使用例
/// ```ignore
/// let chain = ResponsibilityChain::<Fault, bool>::default()
///     .chain::<UnavailableResourcesHandler>()
///     .chain::<InvalidateDataHandler>()
///     .finally(|fault| {
///         fault.source = Some("fallback".into());
///         Ok(true)
///     });
///
/// let handled = chain.execute(&mut fault)?;
/// ```
pub struct ResponsibilityChain<P, R> {
    registry: HandlerRegistry<dyn ChainMiddleware<P, R>>,
    fallback: Option<Fallback<P, R>>,
}

impl<P: 'static, R: Default + 'static> ResponsibilityChain<P, R> {
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

    pub fn chain<M: ChainMiddleware<P, R> + Default + 'static>(mut self) -> Self {
        self.registry.register_type::<M>();
        self
    }

    pub fn chain_type(mut self, descriptor: impl Into<Option<HandlerDescriptor>>) -> Result<Self> {
        self.registry.register(descriptor.into())?;
        Ok(self)
    }

    /// Set the fallback run when the last handler delegates.
    ///
    /// A chain has at most one fallback; calling this again replaces it.
    pub fn finally<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&mut P) -> Result<R> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Run the chain. With no handlers registered this returns
    /// `R::default()` without touching the fallback.
    pub fn execute(&self, parameter: &mut P) -> Result<R> {
        if self.registry.is_empty() {
            return Ok(R::default());
        }
        self.run_from(0, parameter)
    }

    fn run_from(&self, position: usize, parameter: &mut P) -> Result<R> {
        match self.registry.resolve(position) {
            Some(resolved) => {
                let handler = resolved?;
                handler.run(
                    parameter,
                    ChainNext {
                        chain: self,
                        position: position + 1,
                    },
                )
            }
            None => self.fall_through(parameter),
        }
    }

    fn fall_through(&self, parameter: &mut P) -> Result<R> {
        let flow = &self.registry.config().name;
        match &self.fallback {
            Some(fallback) => {
                debug!(flow = %flow, "no handler took the parameter, running fallback");
                fallback(parameter)
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

    pub fn registry(&self) -> &HandlerRegistry<dyn ChainMiddleware<P, R>> {
        &self.registry
    }
}

impl<P: 'static, R: Default + 'static> Default for ResponsibilityChain<P, R> {
    fn default() -> Self {
        Self::new(Arc::new(ActivatorResolver))
    }
}
