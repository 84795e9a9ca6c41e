// Prometheus counters exposed at GET /metrics

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref JOBS_QUEUED: IntCounter = IntCounter::new(
        "fixit_jobs_queued_total",
        "Check jobs pushed onto the worker queue"
    )
    .expect("metric can be created");

    pub static ref VALIDATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("fixit_validations_total", "Synchronous validations by verdict"),
        &["verdict"]
    )
    .expect("metric can be created");

    pub static ref SUBMISSIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("fixit_submissions_total", "Recorded solutions by game mode"),
        &["game_mode"]
    )
    .expect("metric can be created");
}

/// Register all collectors; call once at startup
pub fn register() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(JOBS_QUEUED.clone()))?;
    REGISTRY.register(Box::new(VALIDATIONS.clone()))?;
    REGISTRY.register(Box::new(SUBMISSIONS.clone()))?;
    Ok(())
}

/// Render the registry in the Prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
