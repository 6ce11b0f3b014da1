//! Tests for the execution engine

use super::*;
use crate::collaborators::SimRobot;
use crate::loader;
use crate::model::{Action, Parameters, Registry};
use crate::types::{CommandDescriptor, EventDescriptor, Script};

struct Fixed(Signal);

impl Action for Fixed {
    fn run(&mut self, _ctx: &mut RunContext<'_>) -> Signal {
        self.0
    }
}

struct Panics;

impl Action for Panics {
    fn run(&mut self, _ctx: &mut RunContext<'_>) -> Signal {
        panic!("servo table missing");
    }
}

fn fixed(signal: Signal) -> Command {
    Command::new("Fixed", Parameters::new(), Box::new(Fixed(signal)))
}

fn cond(result: bool) -> Command {
    fixed(Signal::from(result))
}

fn plain() -> Command {
    fixed(Signal::Continue)
}

fn builtin(tag: &str) -> Command {
    Registry::with_builtins()
        .build_command(tag, &Parameters::new())
        .unwrap()
        .value
}

fn start() -> Command {
    builtin("StartBlockCommand")
}

fn end() -> Command {
    builtin("EndBlockCommand")
}

fn otherwise() -> Command {
    builtin("ElseCommand")
}

struct Harness {
    sandbox: Sandbox,
    env: Environment,
    token: CancelToken,
}

impl Harness {
    fn new() -> Self {
        let env = Environment::simulated();
        let token = CancelToken::new();
        let sandbox = Sandbox::new(
            &env,
            token.clone(),
            &Default::default(),
            Duration::from_millis(5),
        );
        Self {
            sandbox,
            env,
            token,
        }
    }

    fn interpret(&mut self, commands: &mut [Command], abort_responsive: bool) -> Interpreted {
        let mut ctx = RunContext::new(
            &mut self.sandbox,
            &self.env,
            &self.token,
            Instant::now(),
            1,
            Duration::from_millis(5),
        );
        interpret(commands, &mut ctx, abort_responsive)
    }

    fn executed(&mut self, mut commands: Vec<Command>) -> Vec<usize> {
        self.interpret(&mut commands, true).executed
    }
}

#[test]
fn false_condition_skips_nested_block() {
    let mut h = Harness::new();
    let commands = vec![
        cond(false),
        start(),
        plain(),
        start(),
        plain(),
        end(),
        plain(),
        end(),
        plain(),
    ];
    assert_eq!(h.executed(commands), vec![0, 8]);
}

#[test]
fn true_condition_enters_block() {
    let mut h = Harness::new();
    let commands = vec![cond(true), start(), plain(), end(), plain()];
    assert_eq!(h.executed(commands), vec![0, 1, 2, 3, 4]);
}

#[test]
fn false_condition_inside_block_skips_inner_block_only() {
    let mut h = Harness::new();
    let commands = vec![
        cond(true),
        start(),
        cond(false),
        start(),
        plain(),
        end(),
        plain(),
        end(),
        plain(),
    ];
    assert_eq!(h.executed(commands), vec![0, 1, 2, 6, 7, 8]);
}

#[test]
fn else_block_skipped_after_true() {
    let mut h = Harness::new();
    let commands = vec![
        cond(true),
        start(),
        plain(),
        end(),
        otherwise(),
        start(),
        plain(),
        end(),
        plain(),
    ];
    assert_eq!(h.executed(commands), vec![0, 1, 2, 3, 8]);
}

#[test]
fn else_block_runs_after_false() {
    let mut h = Harness::new();
    let commands = vec![
        cond(false),
        start(),
        plain(),
        end(),
        otherwise(),
        start(),
        plain(),
        end(),
        plain(),
    ];
    assert_eq!(h.executed(commands), vec![0, 4, 5, 6, 7, 8]);
}

#[test]
fn else_directly_after_condition() {
    let mut h = Harness::new();
    let skipped = vec![cond(true), otherwise(), start(), plain(), end(), plain()];
    assert_eq!(h.executed(skipped), vec![0, 5]);

    let entered = vec![cond(false), otherwise(), start(), plain(), end(), plain()];
    assert_eq!(h.executed(entered), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn unterminated_block_extends_to_end() {
    let mut h = Harness::new();
    let commands = vec![cond(false), start(), plain(), start(), plain(), end()];
    assert_eq!(h.executed(commands), vec![0]);
}

#[test]
fn false_without_block_guards_nothing() {
    let mut h = Harness::new();
    assert_eq!(h.executed(vec![cond(false), plain(), plain()]), vec![0, 1, 2]);
}

#[test]
fn only_the_following_block_is_skipped() {
    let mut h = Harness::new();
    let commands = vec![cond(false), start(), plain(), end(), start(), plain(), end()];
    assert_eq!(h.executed(commands), vec![0, 4, 5, 6]);
}

#[test]
fn exit_stops_the_event_only() {
    let mut h = Harness::new();
    let mut commands = vec![plain(), fixed(Signal::Exit), plain()];
    let result = h.interpret(&mut commands, true);
    assert_eq!(result.executed, vec![0, 1]);
    assert!(!result.killed);
    assert!(!h.token.is_cancelled());
}

#[test]
fn kill_from_nested_block_cancels_the_run() {
    let mut h = Harness::new();
    let mut commands = vec![
        cond(true),
        start(),
        cond(true),
        start(),
        fixed(Signal::Kill),
        end(),
        end(),
        plain(),
    ];
    let result = h.interpret(&mut commands, true);
    assert_eq!(result.executed, vec![0, 1, 2, 3, 4]);
    assert!(result.killed);
    assert!(h.token.is_cancelled());
}

#[test]
fn abort_checked_between_commands() {
    let mut h = Harness::new();
    h.token.cancel();
    assert!(h.executed(vec![plain(), plain()]).is_empty());

    let mut commands = vec![plain(), plain()];
    assert_eq!(h.interpret(&mut commands, false).executed, vec![0, 1]);
}

#[test]
fn panicking_command_is_treated_as_false() {
    let mut h = Harness::new();
    let commands = vec![
        Command::new("Panics", Parameters::new(), Box::new(Panics)),
        start(),
        plain(),
        end(),
        plain(),
    ];
    assert_eq!(h.executed(commands), vec![0, 4]);
}

#[test]
fn skip_block_positions() {
    let commands = vec![cond(false), start(), start(), end(), end(), plain()];
    assert_eq!(skip_block(&commands, 0), 4);
    assert_eq!(skip_block(&commands, 1), 3);
    assert_eq!(skip_block(&commands, 4), 4);
    assert_eq!(skip_block(&commands, 5), 5);
}

fn set(variable: &str, expression: &str) -> CommandDescriptor {
    CommandDescriptor::new("SetVariableCommand")
        .param("variable", variable)
        .param("expression", expression)
}

fn fast_config() -> InterpreterConfig {
    InterpreterConfig {
        tick_rate: 1000,
        sleep_poll_ms: 5,
        ..Default::default()
    }
}

#[test]
fn kill_ends_run_and_runs_destroy_event() {
    let script = Script::new(vec![
        EventDescriptor::new("InitEvent").command(set("x", "1")),
        EventDescriptor::new("StepEvent")
            .command(set("x", "x + 1"))
            .command(CommandDescriptor::new("ExpressionCommand").param("expression", "x >= 5"))
            .command(CommandDescriptor::new("StartBlockCommand"))
            .command(CommandDescriptor::new("EndProgramCommand"))
            .command(CommandDescriptor::new("EndBlockCommand")),
        EventDescriptor::new("DestroyEvent").command(set("cleaned", "true")),
    ]);
    let loaded = loader::load(&script, &Registry::with_builtins());
    assert!(loaded.is_clean());

    let robot = Arc::new(SimRobot::new());
    let env = Environment::simulated().with_robot(robot.clone());
    let token = CancelToken::new();
    let board = Arc::new(StatusBoard::new());
    let run = Run::new(loaded.events, env, token.clone(), board, &fast_config());

    let outcome = run.execute();
    let summary = outcome.summary;
    assert!(summary.killed);
    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.variables["x"].as_int().unwrap(), 5);
    assert!(summary.variables["cleaned"].as_bool().unwrap());
    assert_eq!(summary.status.get(&2), Some(&vec![0]));

    assert!(token.is_cancelled());
    assert!(robot.is_exiting());
    assert_eq!(outcome.events.len(), 3);
}

#[test]
fn status_records_executed_commands_per_event() {
    let script = Script::new(vec![
        EventDescriptor::new("ExpressionEvent")
            .param("expression", "false")
            .command(set("never", "1")),
        EventDescriptor::new("StepEvent")
            .command(CommandDescriptor::new("ExpressionCommand").param("expression", "1 > 2"))
            .command(CommandDescriptor::new("StartBlockCommand"))
            .command(set("y", "1"))
            .command(CommandDescriptor::new("EndBlockCommand"))
            .command(CommandDescriptor::new("EndProgramCommand")),
    ]);
    let loaded = loader::load(&script, &Registry::with_builtins());

    let board = Arc::new(StatusBoard::new());
    let run = Run::new(
        loaded.events,
        Environment::simulated(),
        CancelToken::new(),
        board.clone(),
        &fast_config(),
    );
    let summary = run.execute().summary;

    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.status, StatusMap::from([(1, vec![0, 4])]));
    assert_eq!(*board.snapshot(), summary.status);
    assert!(!summary.variables.contains_key("never"));
    assert!(!summary.variables.contains_key("y"));
}

#[test]
fn failing_expression_does_not_stop_ticks() {
    let script = Script::new(vec![
        EventDescriptor::new("InitEvent").command(set("n", "0")),
        EventDescriptor::new("StepEvent")
            .command(CommandDescriptor::new("ExpressionCommand").param("expression", "missing_name + 1"))
            .command(set("n", "n + 1"))
            .command(CommandDescriptor::new("ExpressionCommand").param("expression", "n >= 3"))
            .command(CommandDescriptor::new("StartBlockCommand"))
            .command(CommandDescriptor::new("EndProgramCommand"))
            .command(CommandDescriptor::new("EndBlockCommand")),
    ]);
    let loaded = loader::load(&script, &Registry::with_builtins());
    let run = Run::new(
        loaded.events,
        Environment::simulated(),
        CancelToken::new(),
        Arc::new(StatusBoard::new()),
        &fast_config(),
    );
    let summary = run.execute().summary;
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.variables["n"].as_int().unwrap(), 3);
}
