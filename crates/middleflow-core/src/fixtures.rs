//! テスト用の parameter 型と handler 群

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::descriptor::{Capabilities, HandlerDescriptor, HandlerType};
use crate::error::{FlowError, Result};
use crate::flow::{
    AsyncChainMiddleware, AsyncChainNext, AsyncMiddleware, AsyncNext, ChainMiddleware, ChainNext,
    Middleware, Next,
};
use crate::resolver::{ActivatorResolver, Resolver};

// ── pipeline fixtures ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Log {
    pub entries: Vec<String>,
}

impl Log {
    fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }
}

/// Appends `N` to the log, then delegates.
#[derive(Default)]
pub struct AppendIndex<const N: usize>;

impl<const N: usize> Middleware<Log> for AppendIndex<N> {
    fn run(&self, log: &mut Log, next: Next<'_, Log>) -> Result<()> {
        log.push(N.to_string());
        next.run(log)
    }
}

#[async_trait]
impl<const N: usize> AsyncMiddleware<Log> for AppendIndex<N> {
    async fn run(&self, log: &mut Log, next: AsyncNext<'_, Log>) -> Result<()> {
        log.push(N.to_string());
        next.run(log).await
    }
}

impl<const N: usize> HandlerType for AppendIndex<N> {
    fn declare(capabilities: &mut Capabilities<Self>) {
        capabilities
            .implements::<dyn Middleware<Log>>()
            .implements::<dyn AsyncMiddleware<Log>>();
    }
}

/// Handler with state and no parameterless constructor.
pub struct Prefixed {
    pub prefix: String,
}

impl Prefixed {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

impl Middleware<Log> for Prefixed {
    fn run(&self, log: &mut Log, next: Next<'_, Log>) -> Result<()> {
        log.push(self.prefix.clone());
        next.run(log)
    }
}

impl HandlerType for Prefixed {
    fn declare(capabilities: &mut Capabilities<Self>) {
        capabilities.implements::<dyn Middleware<Log>>();
    }
}

/// Returns without calling `next`.
#[derive(Default)]
pub struct SkipsNext;

impl Middleware<Log> for SkipsNext {
    fn run(&self, log: &mut Log, _next: Next<'_, Log>) -> Result<()> {
        log.push("skip");
        Ok(())
    }
}

#[async_trait]
impl AsyncMiddleware<Log> for SkipsNext {
    async fn run(&self, log: &mut Log, _next: AsyncNext<'_, Log>) -> Result<()> {
        log.push("skip");
        Ok(())
    }
}

/// Does work on both sides of `next`.
#[derive(Default)]
pub struct Wraps;

impl Middleware<Log> for Wraps {
    fn run(&self, log: &mut Log, next: Next<'_, Log>) -> Result<()> {
        log.push("before");
        next.run(log)?;
        log.push("after");
        Ok(())
    }
}

#[derive(Default)]
pub struct Failing;

impl Middleware<Log> for Failing {
    fn run(&self, _log: &mut Log, _next: Next<'_, Log>) -> Result<()> {
        Err(FlowError::handler("boom"))
    }
}

#[async_trait]
impl AsyncMiddleware<Log> for Failing {
    async fn run(&self, _log: &mut Log, _next: AsyncNext<'_, Log>) -> Result<()> {
        Err(FlowError::handler("boom"))
    }
}

/// Builds the continuation and drops it without awaiting, like a
/// `select!` branch that lost.
#[derive(Default)]
pub struct DropsNext;

#[async_trait]
impl AsyncMiddleware<Log> for DropsNext {
    async fn run(&self, log: &mut Log, next: AsyncNext<'_, Log>) -> Result<()> {
        log.push("drop");
        drop(next.run(log));
        Ok(())
    }
}

/// Suspends before appending, so ordering bugs would show up.
#[derive(Default)]
pub struct SlowAppend;

#[async_trait]
impl AsyncMiddleware<Log> for SlowAppend {
    async fn run(&self, log: &mut Log, next: AsyncNext<'_, Log>) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        log.push("slow");
        next.run(log).await
    }
}

/// Not a handler of anything.
pub struct Unrelated;

/// Activator that counts how many instances it built.
pub fn counting_resolver(calls: Arc<AtomicUsize>) -> Arc<dyn Resolver> {
    Arc::new(
        move |descriptor: &HandlerDescriptor| -> Result<Box<dyn Any + Send>> {
            calls.fetch_add(1, Ordering::SeqCst);
            ActivatorResolver.resolve(descriptor)
        },
    )
}

// ── chain fixtures ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    UnavailableResources,
    InvalidateData,
    /// Any other application fault.
    Domain,
    /// A fault from outside the application; no handler recognises it.
    ArgumentNull,
}

#[derive(Debug)]
pub struct Fault {
    pub kind: FaultKind,
    pub handled_by: Option<&'static str>,
    pub source: Option<String>,
    pub visited: Vec<&'static str>,
}

impl Fault {
    pub fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            handled_by: None,
            source: None,
            visited: Vec::new(),
        }
    }

    /// Record the visit and claim the fault when `accepts` matches.
    fn claim(&mut self, handler: &'static str, accepts: fn(FaultKind) -> bool) -> bool {
        self.visited.push(handler);
        if accepts(self.kind) {
            self.handled_by = Some(handler);
            return true;
        }
        false
    }
}

#[derive(Default)]
pub struct UnavailableResourcesHandler;

impl UnavailableResourcesHandler {
    fn accepts(kind: FaultKind) -> bool {
        kind == FaultKind::UnavailableResources
    }
}

impl ChainMiddleware<Fault, bool> for UnavailableResourcesHandler {
    fn run(&self, fault: &mut Fault, next: ChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.claim("UnavailableResourcesHandler", Self::accepts) {
            return Ok(true);
        }
        next.run(fault)
    }
}

#[async_trait]
impl AsyncChainMiddleware<Fault, bool> for UnavailableResourcesHandler {
    async fn run(&self, fault: &mut Fault, next: AsyncChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.claim("UnavailableResourcesHandler", Self::accepts) {
            return Ok(true);
        }
        next.run(fault).await
    }
}

#[derive(Default)]
pub struct InvalidateDataHandler;

impl InvalidateDataHandler {
    fn accepts(kind: FaultKind) -> bool {
        kind == FaultKind::InvalidateData
    }
}

impl ChainMiddleware<Fault, bool> for InvalidateDataHandler {
    fn run(&self, fault: &mut Fault, next: ChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.claim("InvalidateDataHandler", Self::accepts) {
            return Ok(true);
        }
        next.run(fault)
    }
}

#[async_trait]
impl AsyncChainMiddleware<Fault, bool> for InvalidateDataHandler {
    async fn run(&self, fault: &mut Fault, next: AsyncChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.claim("InvalidateDataHandler", Self::accepts) {
            return Ok(true);
        }
        next.run(fault).await
    }
}

impl HandlerType for InvalidateDataHandler {
    fn declare(capabilities: &mut Capabilities<Self>) {
        capabilities
            .implements::<dyn ChainMiddleware<Fault, bool>>()
            .implements::<dyn AsyncChainMiddleware<Fault, bool>>();
    }
}

/// Claims every application fault.
#[derive(Default)]
pub struct MyFaultHandler;

impl MyFaultHandler {
    fn accepts(kind: FaultKind) -> bool {
        kind != FaultKind::ArgumentNull
    }
}

impl ChainMiddleware<Fault, bool> for MyFaultHandler {
    fn run(&self, fault: &mut Fault, next: ChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.claim("MyFaultHandler", Self::accepts) {
            return Ok(true);
        }
        next.run(fault)
    }
}

#[async_trait]
impl AsyncChainMiddleware<Fault, bool> for MyFaultHandler {
    async fn run(&self, fault: &mut Fault, next: AsyncChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.claim("MyFaultHandler", Self::accepts) {
            return Ok(true);
        }
        next.run(fault).await
    }
}

impl ChainMiddleware<Fault, bool> for Failing {
    fn run(&self, _fault: &mut Fault, _next: ChainNext<'_, Fault, bool>) -> Result<bool> {
        Err(FlowError::handler("boom"))
    }
}

#[async_trait]
impl AsyncChainMiddleware<Fault, bool> for Failing {
    async fn run(
        &self,
        _fault: &mut Fault,
        _next: AsyncChainNext<'_, Fault, bool>,
    ) -> Result<bool> {
        Err(FlowError::handler("boom"))
    }
}

/// Always delegates.
#[derive(Default)]
pub struct Visits;

impl ChainMiddleware<Fault, bool> for Visits {
    fn run(&self, fault: &mut Fault, next: ChainNext<'_, Fault, bool>) -> Result<bool> {
        fault.visited.push("Visits");
        next.run(fault)
    }
}

#[async_trait]
impl AsyncChainMiddleware<Fault, bool> for Visits {
    async fn run(&self, fault: &mut Fault, next: AsyncChainNext<'_, Fault, bool>) -> Result<bool> {
        fault.visited.push("Visits");
        next.run(fault).await
    }
}

impl HandlerType for Visits {
    fn declare(capabilities: &mut Capabilities<Self>) {
        capabilities
            .implements::<dyn ChainMiddleware<Fault, bool>>()
            .implements::<dyn AsyncChainMiddleware<Fault, bool>>();
    }
}
