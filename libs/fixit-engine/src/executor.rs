/// Submission Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Coordinate validator, engine and evaluator to produce final results.
///
/// **Architecture:**
/// 1. Screen the source with the denylist (validator.rs)
/// 2. Build the callable and run each test case (engine.rs)
/// 3. Compare and aggregate outcomes (evaluator.rs)
///
/// This module is the glue layer - it knows nothing about:
/// - How code executes (engine's job)
/// - How values are compared (evaluator's job)
///
/// Everything here is synchronous and owns its interpreter for the whole
/// call. Async callers should run it on a blocking thread.

use crate::engine::{entry_point_name, EngineConfig, EngineError, JsEngine, Synthesis};
use crate::evaluator::{self, InvocationResult};
use crate::validator;
use fixit_common::types::{CheckReport, ExecutionResult, TestCase};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const NO_FUNCTION_MESSAGE: &str = "No function found in code";
pub const NO_TEST_CASES_MESSAGE: &str = "No test cases provided";

pub struct Executor {
    config: EngineConfig,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Executor {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `source` against `test_cases`
    ///
    /// Synthesis problems, missing functions and per-case throws are all
    /// reported inside the returned `ExecutionResult`, as is any engine
    /// error raised while a case runs. `Err` is reserved for failures to
    /// set up the interpreter and harness.
    pub fn execute(
        &self,
        source: &str,
        test_cases: &[TestCase],
        is_async: bool,
    ) -> Result<ExecutionResult, EngineError> {
        let mut engine = JsEngine::new(&self.config)?;
        let entry_point = entry_point_name(source);

        let synthesis = match engine.synthesize(source, entry_point) {
            Ok(synthesis) => synthesis,
            // Top-level code tripped a runtime limit
            Err(EngineError::Interpreter(message)) => Synthesis::SyntaxError(message),
            Err(e) => return Err(e),
        };
        self.forward_console(&mut engine);

        match synthesis {
            Synthesis::Ready => {}
            Synthesis::SyntaxError(message) => {
                return Ok(ExecutionResult::failure(format!("Syntax Error: {}", message)));
            }
            Synthesis::MissingFunction => {
                return Ok(ExecutionResult::failure(NO_FUNCTION_MESSAGE));
            }
        }

        if is_async {
            debug!(entry_point, "Async submission; reporting structural verdict");
            return Ok(evaluator::async_placeholder(test_cases));
        }

        if test_cases.is_empty() {
            return Ok(ExecutionResult::failure(NO_TEST_CASES_MESSAGE));
        }

        let mut outcomes = Vec::with_capacity(test_cases.len());
        let mut faulted = false;

        for (index, test_case) in test_cases.iter().enumerate() {
            let result = match engine.invoke(&test_case.input) {
                Ok(result) => result,
                Err(EngineError::NotSynthesized) => return Err(EngineError::NotSynthesized),
                // Runtime limits and unreadable replies belong to this case only
                Err(e) => InvocationResult::Threw(e.to_string()),
            };
            self.forward_console(&mut engine);

            let (outcome, case_faulted) = evaluator::evaluate_test(test_case, result);
            if case_faulted {
                warn!(test_index = index, actual = ?outcome.actual, "Test case faulted");
            } else {
                debug!(test_index = index, passed = outcome.passed, "Test case evaluated");
            }
            faulted |= case_faulted;
            outcomes.push(outcome);
        }

        Ok(evaluator::aggregate_results(outcomes, faulted))
    }

    /// Validate, then execute only when the source is accepted
    pub fn check(
        &self,
        job_id: Uuid,
        source: &str,
        test_cases: &[TestCase],
        is_async: bool,
    ) -> Result<CheckReport, EngineError> {
        let verdict = validator::validate(source);
        if !verdict.valid {
            info!(job_id = %job_id, "Submission rejected before execution");
            return Ok(CheckReport {
                job_id,
                verdict,
                execution: None,
            });
        }

        let execution = self.execute(source, test_cases, is_async)?;
        info!(
            job_id = %job_id,
            success = execution.success,
            all_passed = execution.all_passed,
            test_count = execution.results.len(),
            "Submission checked"
        );

        Ok(CheckReport {
            job_id,
            verdict,
            execution: Some(execution),
        })
    }

    fn forward_console(&self, engine: &mut JsEngine) {
        for line in engine.drain_console() {
            debug!(target: "fixit::console", "{}", line);
        }
    }
}

/// Run `source` with the default engine limits
pub fn execute(
    source: &str,
    test_cases: &[TestCase],
    is_async: bool,
) -> Result<ExecutionResult, EngineError> {
    Executor::default().execute(source, test_cases, is_async)
}
