/// End-to-end tests for the check pipeline
///
/// These run real JavaScript through the in-process interpreter:
/// 1. Synthesis failures are structural (no outcomes)
/// 2. Per-case results, mismatches and faults are reported in order
/// 3. Denylisted source never reaches the engine
/// 4. Async questions get the structural verdict
/// 5. Every seeded fixedCode solves its own question
/// 6. Submitted code can neither reach nor forge harness replies

#[cfg(test)]
mod check_pipeline_tests {
    use crate::engine::EngineConfig;
    use crate::evaluator::{ASYNC_DESCRIPTION, RUNTIME_FAULT_MESSAGE};
    use crate::executor::{execute, Executor, NO_FUNCTION_MESSAGE, NO_TEST_CASES_MESSAGE};
    use crate::validator::REJECTION_MESSAGE;
    use fixit_common::types::{Question, TestCase};
    use serde_json::{json, Value};
    use uuid::Uuid;

    const SEEDED_QUESTIONS: &str = include_str!("../../../content/questions.json");

    fn case(input: Vec<Value>, expected: Value) -> TestCase {
        TestCase {
            input,
            expected,
            description: String::new(),
        }
    }

    #[test]
    fn test_missing_parenthesis_is_syntax_error() {
        let result = execute(
            "function calculateSum(a, b { return a + b; }",
            &[case(vec![json!(5), json!(3)], json!(8))],
            false,
        )
        .unwrap();

        assert!(!result.success);
        assert!(!result.all_passed);
        assert!(result.results.is_empty());
        assert!(result.error.unwrap().starts_with("Syntax Error"));
    }

    #[test]
    fn test_single_passing_case() {
        let result = execute(
            "function calculateSum(a, b) { return a + b; }",
            &[case(vec![json!(5), json!(3)], json!(8))],
            false,
        )
        .unwrap();

        assert!(result.success);
        assert!(result.all_passed);
        assert_eq!(result.error, None);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].input, vec![json!(5), json!(3)]);
        assert_eq!(result.results[0].expected, json!(8));
        assert_eq!(result.results[0].actual, Some(json!(8)));
        assert!(result.results[0].passed);
    }

    #[test]
    fn test_mismatch_is_clean_failure() {
        let result = execute(
            "function calculateSum(a, b) { return a + b; }",
            &[
                case(vec![json!(5), json!(3)], json!(8)),
                case(vec![json!(1), json!(1)], json!(3)),
            ],
            false,
        )
        .unwrap();

        assert!(result.success);
        assert!(!result.all_passed);
        assert_eq!(result.error, None);
        assert!(result.results[0].passed);
        assert!(!result.results[1].passed);
        assert_eq!(result.results[1].actual, Some(json!(2)));
    }

    #[test]
    fn test_denylisted_source_is_never_executed() {
        let executor = Executor::default();
        let report = executor
            .check(
                Uuid::new_v4(),
                "function spin() { while(true) {} }",
                &[case(vec![], json!(1))],
                false,
            )
            .unwrap();

        assert!(!report.verdict.valid);
        assert_eq!(report.verdict.error.as_deref(), Some(REJECTION_MESSAGE));
        assert!(report.execution.is_none());
        assert!(!report.is_solved());
    }

    #[test]
    fn test_async_question_is_structural_only() {
        // Invoking this would throw; the structural verdict must not call it
        let source = "async function fetchUser(id) { throw new Error('network'); }";
        let result = execute(source, &[case(vec![json!(7)], json!({"id": 7}))], true).unwrap();

        assert!(result.success);
        assert!(result.all_passed);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].input, vec![json!(7)]);
        assert_eq!(result.results[0].expected, json!({"id": 7}));
        assert_eq!(result.results[0].actual, Some(json!("Promise")));
        assert_eq!(result.results[0].description, ASYNC_DESCRIPTION);
    }

    #[test]
    fn test_async_still_requires_valid_source() {
        let result = execute("async function broken( {", &[], true).unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Syntax Error"));
    }

    #[test]
    fn test_runtime_fault_continues_with_remaining_cases() {
        let source = "function firstChar(s) { return s.charAt(0); }";
        let result = execute(
            source,
            &[
                case(vec![Value::Null], json!("")),
                case(vec![json!("abc")], json!("a")),
            ],
            false,
        )
        .unwrap();

        assert!(!result.success);
        assert!(!result.all_passed);
        assert_eq!(result.error.as_deref(), Some(RUNTIME_FAULT_MESSAGE));
        assert_eq!(result.results.len(), 2);
        assert!(!result.results[0].passed);
        let actual = result.results[0].actual.clone().unwrap();
        assert!(actual.as_str().unwrap().starts_with("Error: "));
        assert!(result.results[1].passed);
    }

    #[test]
    fn test_no_function_found() {
        let result = execute("const answer = 42;", &[case(vec![], json!(42))], false).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(NO_FUNCTION_MESSAGE));

        // Falls back to `main` when no declaration exists
        let result = execute(
            "const main = () => 42;",
            &[case(vec![], json!(42))],
            false,
        )
        .unwrap();
        assert!(result.all_passed);
    }

    #[test]
    fn test_empty_test_cases_is_structural_failure() {
        let result = execute("function f() { return 1; }", &[], false).unwrap();
        assert!(!result.success);
        assert!(!result.all_passed);
        assert_eq!(result.error.as_deref(), Some(NO_TEST_CASES_MESSAGE));
    }

    #[test]
    fn test_execute_is_idempotent() {
        // Module-level state would leak between runs if contexts were shared
        let source = "let calls = 0;\nfunction tick(n) { calls += 1; return calls + n; }";
        let cases = [case(vec![json!(1)], json!(2)), case(vec![json!(1)], json!(3))];

        let first = execute(source, &cases, false).unwrap();
        let second = execute(source, &cases, false).unwrap();
        assert_eq!(first, second);
        assert!(first.all_passed);
    }

    #[test]
    fn test_structural_and_type_marker_comparison() {
        let source = r#"
function describe(name) {
  return { name: name, tags: ["a", "b"], nested: { ok: true } };
}"#;
        let result = execute(
            source,
            &[
                case(
                    vec![json!("x")],
                    json!({"nested": {"ok": true}, "tags": ["a", "b"], "name": "x"}),
                ),
                case(vec![json!("y")], json!("object")),
            ],
            false,
        )
        .unwrap();
        assert!(result.all_passed);
    }

    #[test]
    fn test_undefined_result_has_no_actual() {
        let result = execute(
            "function nothing() { }",
            &[case(vec![], json!("undefined")), case(vec![], Value::Null)],
            false,
        )
        .unwrap();

        assert!(result.success);
        assert_eq!(result.results[0].actual, None);
        assert!(result.results[0].passed);
        assert!(!result.results[1].passed);
    }

    #[test]
    fn test_recursion_limit_is_a_case_fault() {
        let executor = Executor::new(EngineConfig {
            recursion_limit: 64,
            ..EngineConfig::default()
        });
        let result = executor
            .execute(
                "function down(n) { return down(n + 1); }",
                &[case(vec![json!(0)], json!(0)), case(vec![json!(0)], json!(0))],
                false,
            )
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.results.len(), 2);
        assert!(result.results.iter().all(|r| !r.passed));
    }

    #[test]
    fn test_seeded_fixed_code_solves_every_question() {
        let questions: Vec<Question> = serde_json::from_str(SEEDED_QUESTIONS).unwrap();
        assert!(!questions.is_empty());

        let executor = Executor::default();
        for question in &questions {
            let report = executor
                .check(
                    Uuid::new_v4(),
                    &question.fixed_code,
                    &question.test_cases,
                    question.is_async,
                )
                .unwrap();
            assert!(
                report.is_solved(),
                "{} level {} question {} fixedCode did not pass: {:?}",
                question.game_mode,
                question.level_id,
                question.question_id,
                report
            );
        }
    }

    #[test]
    fn test_seeded_broken_code_with_syntax_errors_fails() {
        let questions: Vec<Question> = serde_json::from_str(SEEDED_QUESTIONS).unwrap();
        let broken = questions
            .iter()
            .find(|q| q.title == "Mismatched Brackets")
            .unwrap();

        let result = execute(&broken.broken_code, &broken.test_cases, false).unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Syntax Error"));
    }

    #[test]
    fn test_submission_cannot_reach_the_harness() {
        // Strict mode: the harness has no global name, so touching it throws
        let result = execute(
            "function f(a) { __fixit.invoke = function () { return 1; }; return a; }",
            &[case(vec![json!(1)], json!(1)), case(vec![json!(2)], json!(2))],
            false,
        )
        .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(RUNTIME_FAULT_MESSAGE));
        assert_eq!(result.results.len(), 2);

        let result = execute(
            "function f(a) { try { __fixit.invoke = function () { return 1; }; } catch (e) {} return a; }",
            &[case(vec![json!(1)], json!(1)), case(vec![json!(2)], json!(2))],
            false,
        )
        .unwrap();
        assert!(result.success);
        assert!(result.all_passed);
    }

    #[test]
    fn test_forged_harness_reply_does_not_pass() {
        let source = "function f() {
            globalThis.__fixit = {
                invoke: function () { return ['returned', 'number', '99']; }
            };
            Object.prototype.toJSON = function () {
                return { status: 'returned', kind: 'number', json: '99' };
            };
            return 1;
        }";
        let result = execute(
            source,
            &[case(vec![], json!(99)), case(vec![], json!(99))],
            false,
        )
        .unwrap();

        assert!(!result.all_passed);
        assert_eq!(result.results.len(), 2);
        for outcome in &result.results {
            assert!(!outcome.passed);
            assert_eq!(outcome.actual, Some(json!(1)));
        }
    }

    #[test]
    fn test_lone_surrogate_result_keeps_the_batch() {
        let result = execute(
            r"function f(n) { return n === 1 ? '\ud800' : 'ok'; }",
            &[
                case(vec![json!(1)], json!("x")),
                case(vec![json!(2)], json!("ok")),
            ],
            false,
        )
        .unwrap();

        assert!(result.success);
        assert!(!result.all_passed);
        assert_eq!(result.results.len(), 2);
        assert!(!result.results[0].passed);
        assert_eq!(result.results[0].actual, None);
        assert!(result.results[1].passed);
    }

    #[test]
    fn test_default_limits_allow_deep_recursion() {
        let result = execute(
            "function depth(n) { return n === 0 ? 0 : 1 + depth(n - 1); }",
            &[case(vec![json!(600)], json!(600))],
            false,
        )
        .unwrap();
        assert!(result.success);
        assert!(result.all_passed);
    }
}
