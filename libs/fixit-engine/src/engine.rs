/// Execution Engine - In-process JavaScript Interpreter
///
/// **Core Responsibility:**
/// Build a callable from submitted source, then invoke it with test inputs
/// and capture raw results.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to execute (boa interpreter, harness script)
/// - Engine does NOT know comparison rules
/// - Engine does NOT evaluate correctness
/// - Engine returns raw results for the Evaluator to judge
///
/// **Harness:**
/// A small prelude is evaluated into every fresh context before user code.
/// Its completion value is an object holding `synthesize`, `invoke` and
/// `drain`; the engine keeps those as function handles and never binds the
/// object to a global, so submitted code has no way to reach or replace it.
/// The prelude also captures `JSON.stringify`, `JSON.parse` and
/// `Reflect.apply` so that a submission overwriting those globals cannot
/// disturb result capture. Replies are plain arrays read field by field.
///
/// **Isolation:**
/// One `JsEngine` serves exactly one submission. The entry point lives in a
/// fresh `Context`; nothing persists between submissions.

use crate::evaluator::{InvocationResult, JsType, ReturnedValue};
use boa_engine::object::builtins::JsFunction;
use boa_engine::{Context, JsObject, JsString, JsValue, Source};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Entry point name used when no `function NAME` declaration is found
pub const FALLBACK_ENTRY_POINT: &str = "main";

lazy_static! {
    static ref FUNCTION_DECLARATION: Regex =
        Regex::new(r"function\s+([A-Za-z0-9_]+)").expect("entry point pattern compiles");
}

const HARNESS_PRELUDE: &str = r#"
(function (global) {
  "use strict";
  var stringify = JSON.stringify;
  var parse = JSON.parse;
  var apply = Reflect.apply;
  var toText = String;
  var FunctionCtor = Function;
  var logs = [];
  var entry = null;

  function messageOf(e) {
    if (e === null || e === undefined) { return toText(e); }
    return toText(e.message);
  }

  function format(arg) {
    if (typeof arg === "string") { return arg; }
    try {
      var text = stringify(arg);
      return text === undefined ? toText(arg) : text;
    } catch (_) {
      return toText(arg);
    }
  }

  function record() {
    var parts = [];
    for (var i = 0; i < arguments.length; i++) { parts[parts.length] = format(arguments[i]); }
    logs[logs.length] = parts.join(" ");
  }

  global.console = { log: record, info: record, warn: record, error: record, debug: record };

  return {
    synthesize: function (source, name) {
      try {
        var factory = new FunctionCtor(
          '"use strict";\n' + source +
          "\nreturn typeof " + name + " !== 'undefined' ? " + name + " : null;"
        );
        var resolved = factory();
        if (typeof resolved !== "function") { return ["missing"]; }
        entry = resolved;
        return ["ready"];
      } catch (e) {
        return ["syntax_error", messageOf(e)];
      }
    },
    invoke: function (argsJson) {
      var args = parse(argsJson);
      var actual;
      try {
        actual = apply(entry, undefined, args);
      } catch (e) {
        return ["threw", messageOf(e)];
      }
      var kind = actual === null ? "null" : typeof actual;
      var json;
      try { json = stringify(actual); } catch (_) { json = undefined; }
      return ["returned", kind, json];
    },
    drain: function () {
      var out = stringify(logs);
      logs = [];
      return out;
    }
  };
})(globalThis);
"#;

/// Interpreter limits, loaded from the worker config
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum call depth before a RangeError is raised
    pub recursion_limit: usize,
    /// Maximum VM stack size
    pub stack_size_limit: usize,
    /// Iterations any single loop may run; `None` leaves loops unbounded
    pub loop_iteration_limit: Option<u64>,
    /// Forward console output from submissions to tracing
    pub capture_console: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        // Roughly the call depth a browser allows
        Self {
            recursion_limit: 10_000,
            stack_size_limit: 1024 * 1024,
            loop_iteration_limit: None,
            capture_console: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The interpreter itself failed (runtime limit, uncatchable error)
    #[error("{0}")]
    Interpreter(String),

    #[error("harness is missing its {0} function")]
    MissingHarnessFunction(&'static str),

    #[error("harness reply does not match the request")]
    UnexpectedReply,

    #[error("failed to encode arguments: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("no entry point has been synthesized")]
    NotSynthesized,
}

/// Outcome of building the callable from source
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesis {
    Ready,
    /// Source failed to parse or threw while defining its functions
    SyntaxError(String),
    /// Source evaluated but the resolved name is not a function
    MissingFunction,
}

/// A harness reply, decoded from `[status, ...fields]`
enum HarnessReply {
    Ready,
    Missing,
    SyntaxError { message: String },
    Returned { kind: JsType, json: Option<String> },
    Threw { message: String },
}

fn interpreter_error(e: impl ToString) -> EngineError {
    EngineError::Interpreter(e.to_string())
}

/// Rust string for a JS string value; lone surrogates are escaped
fn text_of(value: &JsValue) -> Option<String> {
    value
        .as_string()
        .map(|s| s.to_std_string().unwrap_or_else(|_| s.to_std_string_escaped()))
}

fn type_of(name: &str) -> Option<JsType> {
    match name {
        "null" => Some(JsType::Null),
        other => JsType::from_marker(other),
    }
}

impl HarnessReply {
    fn decode(value: JsValue, context: &mut Context) -> Result<Self, EngineError> {
        let fields = value.as_object().ok_or(EngineError::UnexpectedReply)?;
        let mut field = |index: u32| -> Result<Option<String>, EngineError> {
            let value = fields.get(index, context).map_err(interpreter_error)?;
            Ok(text_of(&value))
        };

        let status = field(0)?.ok_or(EngineError::UnexpectedReply)?;
        let reply = match status.as_str() {
            "ready" => HarnessReply::Ready,
            "missing" => HarnessReply::Missing,
            "syntax_error" => HarnessReply::SyntaxError {
                message: field(1)?.unwrap_or_default(),
            },
            "threw" => HarnessReply::Threw {
                message: field(1)?.unwrap_or_default(),
            },
            "returned" => HarnessReply::Returned {
                kind: field(1)?
                    .as_deref()
                    .and_then(type_of)
                    .ok_or(EngineError::UnexpectedReply)?,
                json: field(2)?,
            },
            _ => return Err(EngineError::UnexpectedReply),
        };
        Ok(reply)
    }
}

/// Function handles taken from the prelude's completion value
struct Harness {
    synthesize: JsFunction,
    invoke: JsFunction,
    drain: JsFunction,
}

impl Harness {
    fn load(context: &mut Context) -> Result<Self, EngineError> {
        let value = context
            .eval(Source::from_bytes(HARNESS_PRELUDE))
            .map_err(interpreter_error)?;
        let object = value
            .as_object()
            .cloned()
            .ok_or(EngineError::UnexpectedReply)?;

        Ok(Self {
            synthesize: Self::function(&object, "synthesize", context)?,
            invoke: Self::function(&object, "invoke", context)?,
            drain: Self::function(&object, "drain", context)?,
        })
    }

    fn function(
        object: &JsObject,
        name: &'static str,
        context: &mut Context,
    ) -> Result<JsFunction, EngineError> {
        let value = object
            .get(JsString::from(name), context)
            .map_err(interpreter_error)?;
        value
            .as_object()
            .cloned()
            .and_then(JsFunction::from_object)
            .ok_or(EngineError::MissingHarnessFunction(name))
    }
}

fn call(
    function: &JsFunction,
    args: &[&str],
    context: &mut Context,
) -> Result<JsValue, EngineError> {
    let args: Vec<JsValue> = args
        .iter()
        .map(|arg| JsValue::from(JsString::from(*arg)))
        .collect();
    function
        .call(&JsValue::undefined(), &args, context)
        .map_err(interpreter_error)
}

/// Name of the function the source declares first, or `main`
///
/// Purely lexical: the first `function NAME` in the text wins, even inside
/// a comment or string literal.
pub fn entry_point_name(source: &str) -> &str {
    FUNCTION_DECLARATION
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(FALLBACK_ENTRY_POINT)
}

pub struct JsEngine {
    context: Context,
    harness: Harness,
    synthesized: bool,
    capture_console: bool,
}

impl JsEngine {
    /// Create a fresh interpreter with limits applied and the harness loaded
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut context = Context::default();

        let limits = context.runtime_limits_mut();
        limits.set_recursion_limit(config.recursion_limit);
        limits.set_stack_size_limit(config.stack_size_limit);
        if let Some(iterations) = config.loop_iteration_limit {
            limits.set_loop_iteration_limit(iterations);
        }

        let harness = Harness::load(&mut context)?;

        Ok(Self {
            context,
            harness,
            synthesized: false,
            capture_console: config.capture_console,
        })
    }

    /// Evaluate the source in a strict-mode function body and resolve `name`
    pub fn synthesize(&mut self, source: &str, name: &str) -> Result<Synthesis, EngineError> {
        let value = call(&self.harness.synthesize, &[source, name], &mut self.context)?;

        let synthesis = match HarnessReply::decode(value, &mut self.context)? {
            HarnessReply::Ready => {
                self.synthesized = true;
                Synthesis::Ready
            }
            HarnessReply::Missing => Synthesis::MissingFunction,
            HarnessReply::SyntaxError { message } => Synthesis::SyntaxError(message),
            _ => return Err(EngineError::UnexpectedReply),
        };

        debug!(entry_point = name, ?synthesis, "Synthesis finished");
        Ok(synthesis)
    }

    /// Call the entry point with `input` spread as positional arguments
    ///
    /// A throw inside the entry point is a normal result, not an error. A
    /// value whose JSON text has no serde form (a lone surrogate, say) comes
    /// back with `json: None`.
    pub fn invoke(&mut self, input: &[Value]) -> Result<InvocationResult, EngineError> {
        if !self.synthesized {
            return Err(EngineError::NotSynthesized);
        }

        let args = serde_json::to_string(input)?;
        let value = call(&self.harness.invoke, &[&args], &mut self.context)?;

        match HarnessReply::decode(value, &mut self.context)? {
            HarnessReply::Returned { kind, json } => {
                let json = json.and_then(|text| serde_json::from_str(&text).ok());
                Ok(InvocationResult::Returned(ReturnedValue { kind, json }))
            }
            HarnessReply::Threw { message } => Ok(InvocationResult::Threw(message)),
            _ => Err(EngineError::UnexpectedReply),
        }
    }

    /// Take console lines recorded since the last drain
    pub fn drain_console(&mut self) -> Vec<String> {
        if !self.capture_console {
            return Vec::new();
        }
        call(&self.harness.drain, &[], &mut self.context)
            .ok()
            .and_then(|value| text_of(&value))
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }
}
