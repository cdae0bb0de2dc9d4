use std::error::Error;

use async_trait::async_trait;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use middleflow_core::{
    AsyncChainMiddleware, AsyncChainNext, AsyncResponsibilityChain, Capabilities, ChainMiddleware,
    ChainNext, FlowConfig, FlowError, HandlerDescriptor, HandlerType, Middleware, Next, Pipeline,
    ResponsibilityChain, Result,
};

/// Fault を parameter として chain に流す（handler が handled_by を書き込む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaultKind {
    UnavailableResources,
    InvalidateData,
    Timeout,
    ArgumentNull,
}

#[derive(Debug)]
struct Fault {
    kind: FaultKind,
    handled_by: Option<&'static str>,
    source: Option<String>,
}

impl Fault {
    fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            handled_by: None,
            source: None,
        }
    }
}

#[derive(Default)]
struct UnavailableResourcesHandler;

#[async_trait]
impl AsyncChainMiddleware<Fault, bool> for UnavailableResourcesHandler {
    async fn run(&self, fault: &mut Fault, next: AsyncChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.kind == FaultKind::UnavailableResources {
            fault.handled_by = Some("UnavailableResourcesHandler");
            return Ok(true);
        }
        next.run(fault).await
    }
}

#[derive(Default)]
struct InvalidateDataHandler;

#[async_trait]
impl AsyncChainMiddleware<Fault, bool> for InvalidateDataHandler {
    async fn run(&self, fault: &mut Fault, next: AsyncChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.kind == FaultKind::InvalidateData {
            fault.handled_by = Some("InvalidateDataHandler");
            return Ok(true);
        }
        next.run(fault).await
    }
}

impl HandlerType for InvalidateDataHandler {
    fn declare(capabilities: &mut Capabilities<Self>) {
        capabilities.implements::<dyn AsyncChainMiddleware<Fault, bool>>();
    }
}

#[derive(Default)]
struct TimeoutHandler;

impl ChainMiddleware<Fault, bool> for TimeoutHandler {
    fn run(&self, fault: &mut Fault, next: ChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.kind == FaultKind::Timeout {
            fault.handled_by = Some("TimeoutHandler");
            return Ok(true);
        }
        next.run(fault)
    }
}

#[async_trait]
impl AsyncChainMiddleware<Fault, bool> for TimeoutHandler {
    async fn run(&self, fault: &mut Fault, next: AsyncChainNext<'_, Fault, bool>) -> Result<bool> {
        if fault.kind == FaultKind::Timeout {
            // 実際の handler ならここで I/O を待つ
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            fault.handled_by = Some("TimeoutHandler");
            return Ok(true);
        }
        next.run(fault).await
    }
}

/// Pipeline の parameter: 各 handler が自分の番号を追記する
#[derive(Debug, Default)]
struct RequestLog {
    entries: Vec<u32>,
}

#[derive(Default)]
struct Step<const N: u32>;

impl<const N: u32> Middleware<RequestLog> for Step<N> {
    fn run(&self, log: &mut RequestLog, next: Next<'_, RequestLog>) -> Result<()> {
        log.entries.push(N);
        next.run(log)
    }
}

/// Not a handler: registering it must fail.
struct NotAHandler;

fn load_config(default_name: &str) -> std::result::Result<FlowConfig, serde_json::Error> {
    match std::env::var("MIDDLEFLOW_CONFIG") {
        Ok(raw) => serde_json::from_str(&raw),
        Err(_) => Ok(FlowConfig::named(default_name)),
    }
}

fn fault_chain(config: FlowConfig) -> Result<AsyncResponsibilityChain<Fault, bool>> {
    Ok(AsyncResponsibilityChain::default()
        .with_config(config)
        .chain::<UnavailableResourcesHandler>()
        .chain_type(HandlerDescriptor::of::<InvalidateDataHandler>())?
        .chain::<TimeoutHandler>())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,middleflow_core=debug")),
        )
        .init();

    let config = load_config("fault-classifier")?;

    // (1) 該当 handler が処理し、後続は走らない
    let chain = fault_chain(config.clone())?;
    let mut fault = Fault::new(FaultKind::InvalidateData);
    let handled = chain.execute(&mut fault).await?;
    info!(handled, handled_by = ?fault.handled_by, "scenario 1: invalidate-data fault");

    // (2) 誰も処理しない → bool の既定値
    let mut fault = Fault::new(FaultKind::ArgumentNull);
    let handled = chain.execute(&mut fault).await?;
    info!(handled, "scenario 2: unrecognised fault, no fallback");

    // (3) fallback が source を書き込む
    let chain = fault_chain(config)?.finally(|fault: &mut Fault| {
        Box::pin(async move {
            fault.source = Some("EXCEPTION_SOURCE".to_string());
            Ok(true)
        })
    });
    let mut fault = Fault::new(FaultKind::ArgumentNull);
    let handled = chain.execute(&mut fault).await?;
    info!(handled, source = ?fault.source, "scenario 3: fallback");

    // (4) pipeline は全 handler を登録順に実行する
    let pipeline = Pipeline::<RequestLog>::default()
        .with_config(FlowConfig::named("request-log"))
        .add::<Step<1>>()
        .add::<Step<2>>()
        .add::<Step<3>>();
    let mut log = RequestLog::default();
    pipeline.execute(&mut log)?;
    info!(entries = ?log.entries, "scenario 4: logging pipeline");

    // (5) handler でない型は登録時に失敗する
    match Pipeline::<RequestLog>::default().add_type(HandlerDescriptor::plain::<NotAHandler>()) {
        Err(err @ FlowError::InvalidMiddlewareType { .. }) => {
            info!(error = %err, "scenario 5: rejected at registration")
        }
        Err(err) => warn!(error = %err, "scenario 5: unexpected error"),
        Ok(_) => warn!("scenario 5: NotAHandler was accepted"),
    }

    // 同期版 chain も同じ規則
    let sync_chain = ResponsibilityChain::<Fault, bool>::default()
        .chain::<TimeoutHandler>()
        .finally(|_: &mut Fault| Ok(false));
    let mut fault = Fault::new(FaultKind::Timeout);
    let handled = sync_chain.execute(&mut fault)?;
    info!(handled, handled_by = ?fault.handled_by, "sync chain");

    Ok(())
}
