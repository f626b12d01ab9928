//! Isolated execution of extracted player code
//!
//! Every call builds a fresh `JsRuntime`, so no state survives between evaluations. The
//! host-provided `Deno` namespace is removed before the untrusted program runs, leaving only
//! language builtins. The result travels back through one global binding.

use crate::diag;
use crate::error::SigError;
use deno_core::{serde_v8, v8, FastString, JsRuntime, RuntimeOptions};
use regex::Regex;
use serde_json::Value;

/// Global the synthesized call stores its return value in
pub const RESULT_BINDING: &str = "__rytsigResult";

const ISOLATE_PRELUDE: &str = "delete globalThis.Deno; delete globalThis.__bootstrap;";

/// Synthesized program text bound to one entrypoint name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableProgram {
    entrypoint: &'static str,
    source: String,
}

impl ExecutableProgram {
    pub const DECIPHER: &'static str = "decipher";
    pub const N_TRANSFORM: &'static str = "nTransform";

    pub fn new(entrypoint: &'static str, source: impl Into<String>) -> Self {
        Self {
            entrypoint,
            source: source.into(),
        }
    }

    /// Helpers joined ahead of the bound decipher function
    pub fn decipher(helpers: &[String], fragment: &str) -> Self {
        Self::new(
            Self::DECIPHER,
            format!("{}\nvar {} = ({});", helpers.join(";\n"), Self::DECIPHER, fragment),
        )
    }

    pub fn n_transform(fragment: &str) -> Self {
        Self::new(
            Self::N_TRANSFORM,
            format!("var {} = ({});", Self::N_TRANSFORM, fragment),
        )
    }

    pub fn entrypoint(&self) -> &str {
        self.entrypoint
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Invoke the entrypoint with `argument` in a fresh runtime
    pub fn run(&self, argument: &Value) -> Result<Value, SigError> {
        run(&self.source, self.entrypoint, argument)
    }
}

/// Whether `program` already declares `var <entrypoint> =`
fn declares_binding(program: &str, entrypoint: &str) -> bool {
    Regex::new(&format!(r"var\s+{}\s*=", regex::escape(entrypoint)))
        .map(|re| re.is_match(program))
        .unwrap_or(false)
}

/// Build the full script: the bound program followed by the call storing [`RESULT_BINDING`]
pub fn synthesize(program: &str, entrypoint: &str, argument: &Value) -> Result<String, SigError> {
    let setup = if declares_binding(program, entrypoint) {
        program.to_string()
    } else {
        format!("var {} = ({});", entrypoint, program)
    };
    let argument = serde_json::to_string(argument)?;

    Ok(format!(
        "{}\nvar {} = {}({});",
        setup, RESULT_BINDING, entrypoint, argument
    ))
}

fn evaluation_error(stage: &str, error: impl std::fmt::Display) -> SigError {
    SigError::Evaluation(format!("{}: {}", stage, error))
}

/// Execute `program` bound to `entrypoint` against `argument`.
///
/// Blocking; callers on an async runtime should go through `spawn_blocking`.
pub fn run(program: &str, entrypoint: &str, argument: &Value) -> Result<Value, SigError> {
    let source = synthesize(program, entrypoint, argument)?;
    diag!(
        "Running {} ({} chars) in fresh runtime",
        entrypoint,
        source.len()
    );

    let mut runtime = JsRuntime::new(RuntimeOptions::default());
    runtime
        .execute_script("<isolate>", FastString::from(ISOLATE_PRELUDE.to_string()))
        .map_err(|e| evaluation_error("isolation prelude", e))?;
    runtime
        .execute_script("<program>", FastString::from(source))
        .map_err(|e| evaluation_error(entrypoint, e))?;
    let result = runtime
        .execute_script("<result>", FastString::from(RESULT_BINDING.to_string()))
        .map_err(|e| evaluation_error("result read-back", e))?;

    let scope = &mut runtime.handle_scope();
    let local = v8::Local::new(scope, &result);
    serde_v8::from_v8::<Value>(scope, local).map_err(|e| evaluation_error("result conversion", e))
}

/// JavaScript truthiness of a converted result
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a result as a query parameter value
pub fn value_to_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
