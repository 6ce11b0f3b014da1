//! Script-visible wrappers around the collaborator trait objects
//!
//! Handles are pushed as constants, so every registered method takes the handle
//! by value (a cheap `Arc` clone) rather than `&mut`.

use super::number;
use crate::collaborators::{ObjectManager, Position, Robot, VideoStream, Vision};
use rhai::{Array, Dynamic, Engine, EvalAltResult, INT};
use std::sync::Arc;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

#[derive(Clone)]
pub struct RobotHandle(Arc<dyn Robot>);

impl RobotHandle {
    pub fn new(robot: Arc<dyn Robot>) -> Self {
        Self(robot)
    }
}

#[derive(Clone)]
pub struct VisionHandle(Arc<dyn Vision>);

impl VisionHandle {
    pub fn new(vision: Arc<dyn Vision>) -> Self {
        Self(vision)
    }
}

#[derive(Clone)]
pub struct ResourcesHandle(Arc<dyn ObjectManager>);

impl ResourcesHandle {
    pub fn new(resources: Arc<dyn ObjectManager>) -> Self {
        Self(resources)
    }
}

#[derive(Clone)]
pub struct VideoStreamHandle(Arc<dyn VideoStream>);

impl VideoStreamHandle {
    pub fn new(vstream: Arc<dyn VideoStream>) -> Self {
        Self(vstream)
    }
}

fn position(x: &Dynamic, y: &Dynamic, z: &Dynamic) -> ScriptResult<Position> {
    Ok(Position::new(number(x)?, number(y)?, number(z)?))
}

pub(super) fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<RobotHandle>("Robot")
        .register_fn(
            "set_speed",
            |robot: RobotHandle, speed: Dynamic| -> ScriptResult<()> {
                robot.0.set_speed(number(&speed)?);
                Ok(())
            },
        )
        .register_fn(
            "move_to",
            |robot: RobotHandle, x: Dynamic, y: Dynamic, z: Dynamic| -> ScriptResult<bool> {
                Ok(robot.0.move_to(position(&x, &y, &z)?, false, true))
            },
        )
        .register_fn(
            "move_to",
            |robot: RobotHandle,
             x: Dynamic,
             y: Dynamic,
             z: Dynamic,
             relative: bool|
             -> ScriptResult<bool> {
                Ok(robot.0.move_to(position(&x, &y, &z)?, relative, true))
            },
        )
        .register_fn("set_gripper", |robot: RobotHandle, on: bool| {
            robot.0.set_gripper(on)
        })
        .register_fn("set_active_servos", |robot: RobotHandle, all: bool| {
            robot.0.set_active_servos(all)
        })
        .register_fn("is_moving", |robot: RobotHandle| robot.0.is_moving());

    engine
        .register_type_with_name::<VisionHandle>("Vision")
        .register_fn("is_tracking", |vision: VisionHandle, name: &str| {
            vision.0.is_tracking(name)
        });

    engine
        .register_type_with_name::<ResourcesHandle>("Resources")
        .register_fn("object_names", |resources: ResourcesHandle| -> Array {
            resources
                .0
                .object_names()
                .into_iter()
                .map(Dynamic::from)
                .collect()
        });

    engine
        .register_type_with_name::<VideoStreamHandle>("VideoStream")
        .register_fn("frame_count", |vstream: VideoStreamHandle| -> INT {
            INT::try_from(vstream.0.frame_count()).unwrap_or(INT::MAX)
        });
}
