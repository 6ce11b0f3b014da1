//! Built-in event kinds

use super::registry::TriggerFactory;
use super::{Built, EventRole, Parameters, Trigger, params};
use crate::error::LoadError;
use crate::runtime::context::RunContext;
use crate::sandbox;
use std::time::Duration;

pub const BUILTINS: &[(&str, TriggerFactory)] = &[
    ("InitEvent", Init::build),
    ("StepEvent", step),
    ("ExpressionEvent", ExpressionTrigger::build),
    ("TimerEvent", Timer::build),
    ("DestroyEvent", destroy),
];

type BuildResult = Result<Built<Box<dyn Trigger>>, LoadError>;

/// Active on the first tick of a run only
struct Init;

impl Init {
    fn build(_: &Parameters) -> BuildResult {
        Ok(Built::ok(Box::new(Init)))
    }
}

impl Trigger for Init {
    fn is_active(&mut self, ctx: &mut RunContext<'_>) -> bool {
        ctx.tick() == 1
    }
}

struct Always;

impl Trigger for Always {
    fn is_active(&mut self, _ctx: &mut RunContext<'_>) -> bool {
        true
    }
}

fn step(_: &Parameters) -> BuildResult {
    Ok(Built::ok(Box::new(Always)))
}

struct Destroy;

impl Trigger for Destroy {
    fn is_active(&mut self, _ctx: &mut RunContext<'_>) -> bool {
        false
    }

    fn role(&self) -> EventRole {
        EventRole::Destroy
    }
}

fn destroy(_: &Parameters) -> BuildResult {
    Ok(Built::ok(Box::new(Destroy)))
}

/// Active whenever its expression evaluates truthy
struct ExpressionTrigger {
    expression: String,
}

impl ExpressionTrigger {
    fn build(params: &Parameters) -> BuildResult {
        Ok(params::expression(params, "expression")?
            .map(|expression| Box::new(ExpressionTrigger { expression }) as Box<dyn Trigger>))
    }
}

impl Trigger for ExpressionTrigger {
    fn is_active(&mut self, ctx: &mut RunContext<'_>) -> bool {
        let (value, ok) = ctx.sandbox().evaluate(&self.expression);
        ok && sandbox::truthy(&value)
    }
}

/// Active once per elapsed period, counted from the start of the run.
/// Missed periods collapse into a single activation.
struct Timer {
    period: Duration,
    next: Duration,
}

impl Timer {
    fn build(params: &Parameters) -> BuildResult {
        let seconds = params::required_f64(params, "seconds")?;
        let period = Duration::try_from_secs_f64(seconds)
            .ok()
            .filter(|period| !period.is_zero())
            .ok_or_else(|| LoadError::invalid("seconds", "expected a positive period"))?;
        Ok(Built::ok(Box::new(Timer {
            period,
            next: period,
        })))
    }

    fn poll(&mut self, elapsed: Duration) -> bool {
        if elapsed < self.next {
            return false;
        }
        while self.next <= elapsed {
            self.next += self.period;
        }
        true
    }
}

impl Trigger for Timer {
    fn is_active(&mut self, ctx: &mut RunContext<'_>) -> bool {
        let elapsed = ctx.elapsed();
        self.poll(elapsed)
    }
}
