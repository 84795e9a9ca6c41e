// Denylist screening applied to every submission before it reaches the engine.
// A coarse guard against host escapes and trivially infinite loops; anything it
// misses runs under whatever runtime limits the engine is configured with.

use fixit_common::types::ValidationVerdict;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

pub const REJECTION_MESSAGE: &str = "Code contains potentially dangerous patterns";

const DENYLIST_PATTERNS: &[(&str, &str)] = &[
    ("eval", r"eval\s*\("),
    ("function-constructor", r"Function\s*\("),
    ("document", r"document\."),
    ("window", r"window\."),
    ("global", r"global\."),
    ("process", r"process\."),
    ("require", r"require\s*\("),
    ("import", r"import\s+"),
    ("export", r"export\s+"),
    ("while-true", r"while\s*\(\s*true\s*\)"),
    ("empty-for", r"for\s*\(\s*;\s*;\s*\)"),
];

lazy_static! {
    static ref DENYLIST: Vec<(&'static str, Regex)> = DENYLIST_PATTERNS
        .iter()
        .map(|(label, pattern)| (*label, Regex::new(pattern).expect("denylist pattern compiles")))
        .collect();
}

/// Label of the first denylisted pattern found in `code`
pub fn first_match(code: &str) -> Option<&'static str> {
    DENYLIST
        .iter()
        .find(|(_, regex)| regex.is_match(code))
        .map(|(label, _)| *label)
}

/// Screen source text. Purely lexical: matches inside comments and string
/// literals count, and identifiers such as `myFunction(` trip the
/// `Function(` pattern.
pub fn validate(code: &str) -> ValidationVerdict {
    match first_match(code) {
        Some(label) => {
            debug!(pattern = label, "Submission rejected by denylist");
            ValidationVerdict::rejected(REJECTION_MESSAGE)
        }
        None => ValidationVerdict::accepted(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_function() {
        let verdict = validate("function add(a, b) { return a + b; }");
        assert!(verdict.valid);
        assert_eq!(verdict.error, None);
    }

    #[test]
    fn test_rejects_each_pattern() {
        let samples = [
            "function f() { return eval('1'); }",
            "function f() { return new Function('return 1')(); }",
            "function f() { return document.title; }",
            "function f() { return window.location; }",
            "function f() { return global.x; }",
            "function f() { return process.env; }",
            "function f() { return require('fs'); }",
            "import fs from 'fs';",
            "export default 1;",
            "function f() { while ( true ) {} }",
            "function f() { for (;;) {} }",
        ];
        for sample in samples {
            let verdict = validate(sample);
            assert!(!verdict.valid, "expected rejection for {}", sample);
            assert_eq!(verdict.error.as_deref(), Some(REJECTION_MESSAGE));
        }
    }

    #[test]
    fn test_whitespace_variants() {
        assert_eq!(first_match("eval  (x)"), Some("eval"));
        assert_eq!(first_match("for ( ; ; ) {}"), Some("empty-for"));
        assert_eq!(first_match("while(true){}"), Some("while-true"));
    }

    #[test]
    fn test_lexical_false_positives() {
        // Inside a comment
        assert!(!validate("// never use eval(x)\nfunction f() { return 1; }").valid);
        // Identifier ending in Function
        assert!(!validate("function f() { return myFunction(1); }").valid);
        // Case-sensitive
        assert!(validate("function f() { return Eval; }").valid);
    }

    #[test]
    fn test_bounded_loops_are_allowed() {
        assert!(validate("function f(n) { for (let i = 0; i < n; i++) {} while (n > 0) { n--; } return n; }").valid);
    }
}
