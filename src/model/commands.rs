//! Built-in command kinds

use super::registry::ActionFactory;
use super::{Action, Built, Parameters, Signal, Structure, params};
use crate::collaborators::Position;
use crate::error::LoadError;
use crate::runtime::context::RunContext;
use crate::sandbox;
use std::time::Duration;

const LOG_TARGET: &str = "armscript::engine";

pub const BUILTINS: &[(&str, ActionFactory)] = &[
    ("StartBlockCommand", start_block),
    ("EndBlockCommand", end_block),
    ("ElseCommand", else_marker),
    ("SetVariableCommand", SetVariable::build),
    ("TestVariableCommand", TestVariable::build),
    ("ExpressionCommand", ExpressionTest::build),
    ("ScriptCommand", RunScript::build),
    ("SleepCommand", Sleep::build),
    ("PrintCommand", Print::build),
    ("RepeatCommand", Repeat::build),
    ("MoveXYZCommand", MoveXyz::build),
    ("SpeedCommand", Speed::build),
    ("GripperCommand", Gripper::build),
    ("ExitEventCommand", exit_event),
    ("EndProgramCommand", end_program),
];

type BuildResult = Result<Built<Box<dyn Action>>, LoadError>;

/// Block markers and other commands that only return a fixed signal
struct Marker {
    structure: Structure,
    signal: Signal,
}

impl Action for Marker {
    fn run(&mut self, _ctx: &mut RunContext<'_>) -> Signal {
        self.signal
    }

    fn structure(&self) -> Structure {
        self.structure
    }
}

fn marker(structure: Structure, signal: Signal) -> BuildResult {
    Ok(Built::ok(Box::new(Marker { structure, signal })))
}

fn start_block(_: &Parameters) -> BuildResult {
    marker(Structure::StartBlock, Signal::Continue)
}

fn end_block(_: &Parameters) -> BuildResult {
    marker(Structure::EndBlock, Signal::Continue)
}

fn else_marker(_: &Parameters) -> BuildResult {
    marker(Structure::Else, Signal::Continue)
}

fn exit_event(_: &Parameters) -> BuildResult {
    marker(Structure::Plain, Signal::Exit)
}

fn end_program(_: &Parameters) -> BuildResult {
    marker(Structure::Plain, Signal::Kill)
}

pub(crate) struct Rejected;

impl Action for Rejected {
    fn run(&mut self, _ctx: &mut RunContext<'_>) -> Signal {
        Signal::Skip
    }
}

/// Assign the value of an expression to a user variable
struct SetVariable {
    variable: String,
    expression: String,
}

impl SetVariable {
    fn build(params: &Parameters) -> BuildResult {
        let variable = params::variable_name(params, "variable")?;
        let expression = params::expression(params, "expression")?;
        Ok(expression.map(|expression| {
            Box::new(SetVariable {
                variable,
                expression,
            }) as Box<dyn Action>
        }))
    }
}

impl Action for SetVariable {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        let sandbox = ctx.sandbox();
        let (value, ok) = sandbox.evaluate(&self.expression);
        if !ok {
            return Signal::Skip;
        }
        match sandbox.set_var(&self.variable, value) {
            Ok(()) => Signal::Continue,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "Cannot set {}: {err}", self.variable);
                Signal::Skip
            }
        }
    }
}

/// Comparison used by [`TestVariable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

impl Comparison {
    fn parse(symbol: &str) -> Option<Self> {
        Some(match symbol.trim() {
            "==" | "=" | "equal" => Comparison::Equal,
            "!=" | "not_equal" => Comparison::NotEqual,
            ">" | "greater" => Comparison::Greater,
            "<" | "less" => Comparison::Less,
            ">=" | "greater_or_equal" => Comparison::GreaterOrEqual,
            "<=" | "less_or_equal" => Comparison::LessOrEqual,
            _ => return None,
        })
    }

    fn operator(self) -> &'static str {
        match self {
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
        }
    }
}

/// Conditional on a comparison between a variable and an expression
struct TestVariable {
    test: String,
}

impl TestVariable {
    fn build(params: &Parameters) -> BuildResult {
        let variable = params::variable_name(params, "variable")?;
        let symbol = params::required_str(params, "test")?;
        let comparison = Comparison::parse(&symbol)
            .ok_or_else(|| LoadError::invalid("test", format!("unknown comparison '{symbol}'")))?;
        let expression = params::expression(params, "expression")?;

        Ok(expression.map(|expression| {
            let test = format!("{variable} {} ({expression})", comparison.operator());
            Box::new(TestVariable { test }) as Box<dyn Action>
        }))
    }
}

impl Action for TestVariable {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        let (value, ok) = ctx.sandbox().evaluate(&self.test);
        Signal::from(ok && sandbox::truthy(&value))
    }
}

/// Conditional on the truthiness of an arbitrary expression
struct ExpressionTest {
    expression: String,
}

impl ExpressionTest {
    fn build(params: &Parameters) -> BuildResult {
        Ok(params::expression(params, "expression")?
            .map(|expression| Box::new(ExpressionTest { expression }) as Box<dyn Action>))
    }
}

impl Action for ExpressionTest {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        let (value, ok) = ctx.sandbox().evaluate(&self.expression);
        Signal::from(ok && sandbox::truthy(&value))
    }
}

/// Run a multi-statement user script
struct RunScript {
    script: String,
}

impl RunScript {
    fn build(params: &Parameters) -> BuildResult {
        Ok(params::script(params, "script")?
            .map(|script| Box::new(RunScript { script }) as Box<dyn Action>))
    }
}

impl Action for RunScript {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        Signal::from(ctx.sandbox().run(&self.script))
    }
}

struct Sleep {
    duration: Duration,
}

impl Sleep {
    fn build(params: &Parameters) -> BuildResult {
        let seconds = params::required_f64(params, "seconds")?;
        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|_| LoadError::invalid("seconds", "expected a non-negative duration"))?;
        Ok(Built::ok(Box::new(Sleep { duration })))
    }
}

impl Action for Sleep {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        ctx.sleep(self.duration);
        Signal::Continue
    }
}

struct Print {
    expression: String,
}

impl Print {
    fn build(params: &Parameters) -> BuildResult {
        Ok(params::expression(params, "expression")?
            .map(|expression| Box::new(Print { expression }) as Box<dyn Action>))
    }
}

impl Action for Print {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        let (value, ok) = ctx.sandbox().evaluate(&self.expression);
        if ok {
            log::info!(target: "armscript::script", "{value}");
        }
        Signal::Continue
    }
}

/// Passes the first `times` executions, then skips its block for the rest of the run
struct Repeat {
    times: u64,
    count: u64,
}

impl Repeat {
    fn build(params: &Parameters) -> BuildResult {
        let times = params::required_f64(params, "times")?;
        if times < 0.0 || times.fract() != 0.0 {
            return Err(LoadError::invalid("times", "expected a whole, non-negative count"));
        }
        Ok(Built::ok(Box::new(Repeat {
            times: times as u64,
            count: 0,
        })))
    }
}

impl Action for Repeat {
    fn run(&mut self, _ctx: &mut RunContext<'_>) -> Signal {
        if self.count < self.times {
            self.count += 1;
            Signal::Continue
        } else {
            Signal::Skip
        }
    }
}

/// Move the robot to coordinates given as expressions
struct MoveXyz {
    x: String,
    y: String,
    z: String,
    relative: bool,
}

impl MoveXyz {
    fn build(params: &Parameters) -> BuildResult {
        let mut errors = Vec::new();
        let mut axis = |name: &str| -> Result<String, LoadError> {
            let built = params::expression(params, name)?;
            errors.extend(built.errors);
            Ok(built.value)
        };
        let x = axis("x")?;
        let y = axis("y")?;
        let z = axis("z")?;
        let relative = params::optional_bool(params, "relative", false)?;

        Ok(Built::with_errors(
            Box::new(MoveXyz { x, y, z, relative }),
            errors,
        ))
    }

    fn coordinate(ctx: &mut RunContext<'_>, expression: &str) -> Option<f64> {
        let (value, ok) = ctx.sandbox().evaluate(expression);
        if !ok {
            return None;
        }
        let coordinate = sandbox::number(&value).ok();
        if coordinate.is_none() {
            log::warn!(target: LOG_TARGET, "`{expression}` is not a coordinate");
        }
        coordinate
    }
}

impl Action for MoveXyz {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        let (Some(x), Some(y), Some(z)) = (
            Self::coordinate(ctx, &self.x),
            Self::coordinate(ctx, &self.y),
            Self::coordinate(ctx, &self.z),
        ) else {
            return Signal::Skip;
        };

        let moved = ctx
            .env()
            .robot()
            .move_to(Position::new(x, y, z), self.relative, true);
        Signal::from(moved)
    }
}

struct Speed {
    expression: String,
}

impl Speed {
    fn build(params: &Parameters) -> BuildResult {
        Ok(params::expression(params, "speed")?
            .map(|expression| Box::new(Speed { expression }) as Box<dyn Action>))
    }
}

impl Action for Speed {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        let (value, ok) = ctx.sandbox().evaluate(&self.expression);
        match ok.then(|| sandbox::number(&value).ok()).flatten() {
            Some(speed) => {
                ctx.env().robot().set_speed(speed);
                Signal::Continue
            }
            None => Signal::Skip,
        }
    }
}

struct Gripper {
    on: bool,
}

impl Gripper {
    fn build(params: &Parameters) -> BuildResult {
        let on = params::optional_bool(params, "on", true)?;
        Ok(Built::ok(Box::new(Gripper { on })))
    }
}

impl Action for Gripper {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> Signal {
        ctx.env().robot().set_gripper(self.on);
        Signal::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Environment, SimRobot};
    use crate::config::SandboxConfig;
    use crate::runtime::cancel::CancelToken;
    use crate::sandbox::Sandbox;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Instant;

    struct Harness {
        env: Environment,
        token: CancelToken,
        sandbox: Sandbox,
    }

    impl Harness {
        fn new(env: Environment) -> Self {
            let token = CancelToken::new();
            let sandbox = Sandbox::new(
                &env,
                token.clone(),
                &SandboxConfig::default(),
                Duration::from_millis(10),
            );
            Self {
                env,
                token,
                sandbox,
            }
        }

        fn run(&mut self, tag: &str, params: serde_json::Value) -> Signal {
            let params = params.as_object().cloned().unwrap_or_default();
            let factory = BUILTINS
                .iter()
                .find(|(name, _)| *name == tag)
                .map(|(_, factory)| *factory)
                .unwrap();
            let mut action = factory(&params).unwrap().value;
            let mut ctx = RunContext::new(
                &mut self.sandbox,
                &self.env,
                &self.token,
                Instant::now(),
                1,
                Duration::from_millis(10),
            );
            action.run(&mut ctx)
        }
    }

    #[test]
    fn set_then_test_variable() {
        let mut h = Harness::new(Environment::simulated());
        assert_eq!(
            h.run("SetVariableCommand", json!({ "variable": "count", "expression": "2 + 3" })),
            Signal::Continue
        );
        assert_eq!(
            h.run(
                "TestVariableCommand",
                json!({ "variable": "count", "test": ">=", "expression": "5" })
            ),
            Signal::Continue
        );
        assert_eq!(
            h.run(
                "TestVariableCommand",
                json!({ "variable": "count", "test": "<", "expression": "count" })
            ),
            Signal::Skip
        );
    }

    #[test]
    fn failed_evaluation_skips() {
        let mut h = Harness::new(Environment::simulated());
        assert_eq!(
            h.run("SetVariableCommand", json!({ "variable": "x", "expression": "nope()" })),
            Signal::Skip
        );
        assert_eq!(
            h.run("ExpressionCommand", json!({ "expression": "undefined_thing" })),
            Signal::Skip
        );
        assert_eq!(
            h.run("ScriptCommand", json!({ "script": "throw \"boom\";" })),
            Signal::Skip
        );
    }

    #[test]
    fn marker_signals() {
        let mut h = Harness::new(Environment::simulated());
        assert_eq!(h.run("ExitEventCommand", json!({})), Signal::Exit);
        assert_eq!(h.run("EndProgramCommand", json!({})), Signal::Kill);
        assert_eq!(h.run("StartBlockCommand", json!({})), Signal::Continue);
    }

    #[test]
    fn repeat_counts_down() {
        let mut action = Repeat::build(json!({ "times": 2 }).as_object().unwrap())
            .unwrap()
            .value;
        let mut h = Harness::new(Environment::simulated());
        let mut ctx = RunContext::new(
            &mut h.sandbox,
            &h.env,
            &h.token,
            Instant::now(),
            1,
            Duration::from_millis(10),
        );
        assert_eq!(action.run(&mut ctx), Signal::Continue);
        assert_eq!(action.run(&mut ctx), Signal::Continue);
        assert_eq!(action.run(&mut ctx), Signal::Skip);
    }

    #[test]
    fn move_and_speed_reach_robot() {
        let robot = Arc::new(SimRobot::new());
        let mut h = Harness::new(Environment::simulated().with_robot(robot.clone()));
        h.run("SetVariableCommand", json!({ "variable": "height", "expression": "12" }));
        assert_eq!(
            h.run("MoveXYZCommand", json!({ "x": "0", "y": "15", "z": "height / 2" })),
            Signal::Continue
        );
        assert_eq!(h.run("SpeedCommand", json!({ "speed": "20" })), Signal::Continue);
        assert_eq!(h.run("GripperCommand", json!({ "on": false })), Signal::Continue);

        let state = robot.state();
        assert_eq!(state.position, Position::new(0.0, 15.0, 6.0));
        assert_eq!(state.speed, 20.0);
        assert!(!state.gripper);
    }

    #[test]
    fn invalid_parameters_are_reported() {
        let unknown = TestVariable::build(
            json!({ "variable": "a", "test": "~", "expression": "1" })
                .as_object()
                .unwrap(),
        );
        assert!(matches!(unknown, Err(LoadError::InvalidParameter { .. })));

        let missing = Sleep::build(&Parameters::new());
        assert!(matches!(missing, Err(LoadError::MissingParameter { .. })));

        let negative = Repeat::build(json!({ "times": -1 }).as_object().unwrap());
        assert!(negative.is_err());
    }
}
