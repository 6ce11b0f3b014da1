//! Sandboxed evaluation environment for user expressions and scripts
//!
//! Every script run gets a fresh [`Sandbox`]: a Rhai engine built from an explicit
//! allow-list of packages and functions, plus a [`Scope`] holding the injected
//! collaborator handles (as constants) and the user variables.
//!
//! Nothing that can escape the sandbox is available: `eval`, function-pointer
//! dispatch, and module import are disabled and the module resolver is a dummy.
//! There is no file, process, or clock access.

use crate::collaborators::Environment;
use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::runtime::cancel::CancelToken;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::packages::{
    ArithmeticPackage, BasicArrayPackage, BasicIteratorPackage, BasicMapPackage,
    BasicStringPackage, LogicPackage, MoreStringPackage, Package,
};
use rhai::{Dynamic, Engine, EvalAltResult, FLOAT, INT, ImmutableString, Scope};
use std::collections::BTreeMap;
use std::time::Duration;

mod handles;

pub use handles::{ResourcesHandle, RobotHandle, VideoStreamHandle, VisionHandle};

/// Language symbols removed from the evaluator
pub const DISABLED_SYMBOLS: &[&str] = &[
    "eval", "Fn", "call", "curry", "import", "export", "is_def_fn", "is_def_var",
];

const LOG_TARGET: &str = "armscript::sandbox";

/// Evaluation namespace owned by one script run
pub struct Sandbox {
    engine: Engine,
    scope: Scope<'static>,
}

impl Sandbox {
    pub fn new(
        env: &Environment,
        token: CancelToken,
        config: &SandboxConfig,
        sleep_poll: Duration,
    ) -> Self {
        let mut engine = restricted_engine();
        apply_limits(&mut engine, config);
        register_math(&mut engine);
        handles::register(&mut engine);

        engine.on_print(|text| log::info!(target: "armscript::script", "{text}"));
        engine.on_debug(|text, _source, pos| {
            log::debug!(target: "armscript::script", "{pos}: {text}")
        });

        let progress_token = token.clone();
        engine.on_progress(move |_| progress_token.is_cancelled().then_some(Dynamic::UNIT));

        let sleep_token = token.clone();
        engine.register_fn("sleep", move |seconds: INT| -> Result<bool, Box<EvalAltResult>> {
            abortable_sleep(&sleep_token, seconds as f64, sleep_poll)
        });
        let sleep_token = token.clone();
        engine.register_fn("sleep", move |seconds: FLOAT| -> Result<bool, Box<EvalAltResult>> {
            abortable_sleep(&sleep_token, seconds, sleep_poll)
        });
        let stop_token = token;
        engine.register_fn("is_stopping", move || stop_token.is_cancelled());

        let mut scope = Scope::new();
        scope.push_constant("pi", std::f64::consts::PI);
        scope.push_constant("e", std::f64::consts::E);
        scope.push_constant("robot", RobotHandle::new(env.robot().clone()));
        scope.push_constant("vision", VisionHandle::new(env.vision().clone()));
        scope.push_constant("resources", ResourcesHandle::new(env.resources().clone()));
        scope.push_constant("vstream", VideoStreamHandle::new(env.vstream().clone()));

        let settings = rhai::serde::to_dynamic(env.settings()).unwrap_or_else(|err| {
            log::warn!(target: LOG_TARGET, "settings are not representable in scripts: {err}");
            Dynamic::from_map(rhai::Map::new())
        });
        scope.push_constant_dynamic("settings", settings);

        Self { engine, scope }
    }

    /// Evaluate a single expression, propagating the failure
    pub fn try_evaluate(&mut self, expression: &str) -> Result<Dynamic, SandboxError> {
        let value = self
            .engine
            .eval_expression_with_scope::<Dynamic>(&mut self.scope, expression)
            .map_err(|err| SandboxError::evaluation(err.to_string()))?;

        if value.is_unit() {
            return Err(SandboxError::NoValue);
        }
        Ok(value)
    }

    /// Evaluate a single expression.
    ///
    /// Returns the value and `true`, or unit and `false` on any failure. A result
    /// of unit counts as a failure. Failures are logged, never raised.
    pub fn evaluate(&mut self, expression: &str) -> (Dynamic, bool) {
        match self.try_evaluate(expression) {
            Ok(value) => (value, true),
            Err(err) => {
                log::warn!(target: LOG_TARGET, "EVAL ERROR in `{expression}`: {err}");
                (Dynamic::UNIT, false)
            }
        }
    }

    /// Run a multi-statement script in the shared namespace
    pub fn try_run(&mut self, script: &str) -> Result<(), SandboxError> {
        self.engine
            .run_with_scope(&mut self.scope, script)
            .map_err(|err| SandboxError::evaluation(err.to_string()))
    }

    /// Run a script, logging any failure. Returns whether it completed.
    pub fn run(&mut self, script: &str) -> bool {
        match self.try_run(script) {
            Ok(()) => true,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "EXEC ERROR: {err}");
                false
            }
        }
    }

    pub fn set_var(&mut self, name: &str, value: Dynamic) -> Result<(), SandboxError> {
        if !is_identifier(name) {
            return Err(SandboxError::InvalidName {
                name: name.to_string(),
            });
        }
        if self.scope.is_constant(name) == Some(true) {
            return Err(SandboxError::ReadOnly {
                name: name.to_string(),
            });
        }
        self.scope.set_or_push(name, value);
        Ok(())
    }

    pub fn get_var(&self, name: &str) -> Option<Dynamic> {
        self.scope.get_value::<Dynamic>(name)
    }

    /// User variables currently in the namespace, excluding injected handles
    pub fn variables(&self) -> BTreeMap<String, Dynamic> {
        self.scope
            .iter()
            .filter(|(_, is_constant, _)| !is_constant)
            .map(|(name, _, value)| (name.to_string(), value))
            .collect()
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("variables", &self.variables().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn restricted_engine() -> Engine {
    let mut engine = Engine::new_raw();
    // The language core package is left out: its blocking `sleep` would shadow
    // the abort-aware one.
    engine.register_global_module(ArithmeticPackage::new().as_shared_module());
    engine.register_global_module(LogicPackage::new().as_shared_module());
    engine.register_global_module(BasicStringPackage::new().as_shared_module());
    engine.register_global_module(BasicIteratorPackage::new().as_shared_module());
    engine.register_global_module(MoreStringPackage::new().as_shared_module());
    engine.register_global_module(BasicArrayPackage::new().as_shared_module());
    engine.register_global_module(BasicMapPackage::new().as_shared_module());
    engine.set_module_resolver(DummyModuleResolver::new());
    for symbol in DISABLED_SYMBOLS {
        engine.disable_symbol(*symbol);
    }
    engine
}

fn apply_limits(engine: &mut Engine, config: &SandboxConfig) {
    if config.max_operations > 0 {
        engine.set_max_operations(config.max_operations);
    }
    engine.set_max_call_levels(config.max_call_levels);
    engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
    engine.set_max_string_size(config.max_string_size);
    engine.set_max_array_size(config.max_array_size);
    engine.set_max_map_size(config.max_map_size);
}

macro_rules! unary_math {
    ($engine:expr, $($name:literal => $op:expr),* $(,)?) => {
        $(
            $engine.register_fn($name, |x: Dynamic| -> Result<FLOAT, Box<EvalAltResult>> {
                Ok($op(number(&x)?))
            });
        )*
    };
}

macro_rules! binary_math {
    ($engine:expr, $($name:literal => $op:expr),* $(,)?) => {
        $(
            $engine.register_fn(
                $name,
                |x: Dynamic, y: Dynamic| -> Result<FLOAT, Box<EvalAltResult>> {
                    Ok($op(number(&x)?, number(&y)?))
                },
            );
        )*
    };
}

fn register_math(engine: &mut Engine) {
    unary_math!(engine,
        "acos" => f64::acos,
        "asin" => f64::asin,
        "atan" => f64::atan,
        "ceil" => f64::ceil,
        "cos" => f64::cos,
        "cosh" => f64::cosh,
        "degrees" => f64::to_degrees,
        "exp" => f64::exp,
        "fabs" => f64::abs,
        "floor" => f64::floor,
        "ln" => f64::ln,
        "log" => f64::ln,
        "log10" => f64::log10,
        "radians" => f64::to_radians,
        "round" => f64::round,
        "sin" => f64::sin,
        "sinh" => f64::sinh,
        "sqrt" => f64::sqrt,
        "tan" => f64::tan,
        "tanh" => f64::tanh,
        "float" => std::convert::identity,
    );
    binary_math!(engine,
        "atan2" => f64::atan2,
        "fmod" => |x: f64, y: f64| x % y,
        "hypot" => f64::hypot,
        "pow" => f64::powf,
    );
    engine.register_fn("int", |x: Dynamic| -> Result<INT, Box<EvalAltResult>> {
        Ok(number(&x)?.trunc() as INT)
    });
    engine.register_fn("str", |x: Dynamic| -> ImmutableString { x.to_string().into() });
}

fn abortable_sleep(
    token: &CancelToken,
    seconds: f64,
    poll: Duration,
) -> Result<bool, Box<EvalAltResult>> {
    let duration = Duration::try_from_secs_f64(seconds.max(0.0))
        .map_err(|e| format!("invalid sleep duration: {e}"))?;
    Ok(token.sleep(duration, poll))
}

/// Coerce an integer or float argument to `f64`
pub(crate) fn number(value: &Dynamic) -> Result<f64, Box<EvalAltResult>> {
    if let Ok(float) = value.as_float() {
        return Ok(float);
    }
    if let Ok(int) = value.as_int() {
        return Ok(int as f64);
    }
    Err(format!("expected a number, got {}", value.type_name()).into())
}

/// Truthiness of a script value: zero, empty, false, and unit are false
pub fn truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Ok(flag) = value.as_bool() {
        return flag;
    }
    if let Ok(int) = value.as_int() {
        return int != 0;
    }
    if let Ok(float) = value.as_float() {
        return float != 0.0;
    }
    if let Some(text) = value.read_lock::<ImmutableString>() {
        return !text.is_empty();
    }
    if let Some(array) = value.read_lock::<rhai::Array>() {
        return !array.is_empty();
    }
    if let Some(map) = value.read_lock::<rhai::Map>() {
        return !map.is_empty();
    }
    true
}

/// Whether `name` can be used as a variable name
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse-check an expression without running it
pub fn check_expression(expression: &str) -> Result<(), String> {
    restricted_engine()
        .compile_expression(expression)
        .map(|_| ())
        .map_err(|err| err.to_string())
}

/// Parse-check a multi-statement script without running it
pub fn check_script(script: &str) -> Result<(), String> {
    restricted_engine()
        .compile(script)
        .map(|_| ())
        .map_err(|err| err.to_string())
}
