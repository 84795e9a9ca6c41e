mod config;

use config::WorkerConfig;
use fixit_common::config::Config;
use fixit_common::redis;
use fixit_common::types::{CheckJob, CheckReport, ExecutionResult, ValidationVerdict};
use fixit_engine::Executor;
use tokio::signal;
use tracing::{debug, error, info, instrument, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Fixit Worker booting...");

    let worker_config = WorkerConfig::load_default().map_err(|e| {
        error!("Failed to load worker configuration: {}", e);
        error!("Make sure config/worker.json exists or set FIXIT_WORKER_CONFIG");
        e
    })?;
    let config = Config::from_env();

    info!(
        recursion_limit = worker_config.engine.recursion_limit,
        stack_size_limit = worker_config.engine.stack_size_limit,
        loop_iteration_limit = ?worker_config.engine.loop_iteration_limit,
        result_ttl_secs = config.result_ttl_secs,
        "Engine limits loaded"
    );
    if worker_config.engine.loop_iteration_limit.is_none() {
        warn!("No loop iteration limit set; a non-terminating submission will stall this worker");
    }

    // Connect to Redis
    let client = ::redis::Client::open(config.redis_url.as_str())?;
    let mut redis_conn = ::redis::aio::ConnectionManager::new(client).await?;

    info!("Connected to Redis: {}", config.redis_url);

    // Setup graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        warn!("Received shutdown signal, finishing current job...");
    };

    tokio::select! {
        _ = worker_loop(&mut redis_conn, &worker_config, &config) => {},
        _ = shutdown => {},
    }

    info!("Worker shutdown complete");
    Ok(())
}

/// Validate and run one job on a blocking thread
///
/// The interpreter is single-threaded and may spin for as long as the
/// submission does, so it never runs on the async executor.
async fn run_job(job: CheckJob, worker_config: &WorkerConfig) -> CheckReport {
    let job_id = job.id;
    let engine_config = worker_config.engine.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        Executor::new(engine_config).check(job.id, &job.source_code, &job.test_cases, job.is_async)
    })
    .await;

    match outcome {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            error!(job_id = %job_id, error = %e, "Engine failure");
            engine_failure(job_id, format!("Engine error: {}", e))
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Execution task panicked");
            engine_failure(job_id, "Engine error: execution aborted".to_string())
        }
    }
}

fn engine_failure(job_id: uuid::Uuid, message: String) -> CheckReport {
    CheckReport {
        job_id,
        verdict: ValidationVerdict::accepted(),
        execution: Some(ExecutionResult::failure(message)),
    }
}

#[instrument(skip_all)]
async fn worker_loop(
    redis_conn: &mut ::redis::aio::ConnectionManager,
    worker_config: &WorkerConfig,
    config: &Config,
) -> anyhow::Result<()> {
    loop {
        // BLPOP with timeout for graceful shutdown
        match redis::pop_job(redis_conn, worker_config.queue_timeout_secs).await {
            Ok(Some(job)) => {
                let job_id = job.id;
                info!(
                    job_id = %job_id,
                    test_cases = job.test_cases.len(),
                    is_async = job.is_async,
                    source_size = job.source_code.len(),
                    question = ?job.question,
                    "Received job"
                );

                let start = std::time::Instant::now();
                let report = run_job(job, worker_config).await;
                let execution_time = start.elapsed();

                match &report.execution {
                    Some(result) => info!(
                        job_id = %job_id,
                        success = result.success,
                        all_passed = result.all_passed,
                        error = ?result.error,
                        execution_ms = execution_time.as_millis(),
                        "Execution completed"
                    ),
                    None => info!(
                        job_id = %job_id,
                        error = ?report.verdict.error,
                        "Rejected by validator"
                    ),
                }

                if let Some(result) = &report.execution {
                    for (idx, outcome) in result.results.iter().enumerate() {
                        debug!(
                            job_id = %job_id,
                            test_num = idx + 1,
                            passed = outcome.passed,
                            description = %outcome.description,
                            "Test result"
                        );
                    }
                }

                // Persist result to Redis
                match redis::store_result(redis_conn, &report, config.result_ttl_secs).await {
                    Ok(_) => {
                        info!(job_id = %job_id, "Result persisted to Redis");
                    }
                    Err(e) => {
                        error!(job_id = %job_id, error = %e, "Failed to persist result");
                        // Non-fatal - worker continues
                    }
                }
            }
            Ok(None) => {
                // Timeout - check for shutdown
                continue;
            }
            Err(e) => {
                error!(error = %e, "Redis error");
                tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
            }
        }
    }
}
