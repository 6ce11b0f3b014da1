//! Contracts for the hardware and vision collaborators
//!
//! The interpreter never talks to a serial port or a camera directly. It sees the
//! robot, the vision system, and the other services only through these traits,
//! bundled into an [`Environment`] that is handed to the sandbox at every start.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod sim;

pub use sim::{SimObjectManager, SimRobot, SimVideoStream, SimVision};

/// Cartesian target for a robot move
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A robotic arm.
///
/// While exiting, implementations must make every time-consuming call return
/// promptly, polling the flag instead of waiting for hardware completion.
pub trait Robot: Send + Sync {
    /// Toggle fast-abort mode
    fn set_exiting(&self, exiting: bool);

    fn set_active_servos(&self, all: bool);

    fn set_speed(&self, speed: f64);

    /// Move the end effector. With `wait`, block until the move finishes or
    /// exiting is requested. Returns `false` if the move was not carried out.
    fn move_to(&self, target: Position, relative: bool, wait: bool) -> bool;

    fn set_gripper(&self, on: bool);

    fn is_moving(&self) -> bool;
}

/// The computer vision subsystem
pub trait Vision: Send + Sync {
    /// Toggle fast-abort mode
    fn set_exiting(&self, exiting: bool);

    fn is_tracking(&self, name: &str) -> bool;
}

/// Registry of recognizable objects and other saved resources
pub trait ObjectManager: Send + Sync {
    fn object_names(&self) -> Vec<String>;
}

/// Live camera feed
pub trait VideoStream: Send + Sync {
    fn frame_count(&self) -> u64;
}

/// Handles injected into every script run
#[derive(Clone)]
pub struct Environment {
    robot: Arc<dyn Robot>,
    vision: Arc<dyn Vision>,
    settings: Arc<serde_json::Value>,
    resources: Arc<dyn ObjectManager>,
    vstream: Arc<dyn VideoStream>,
}

impl Environment {
    pub fn new(
        robot: Arc<dyn Robot>,
        vision: Arc<dyn Vision>,
        settings: serde_json::Value,
        resources: Arc<dyn ObjectManager>,
        vstream: Arc<dyn VideoStream>,
    ) -> Self {
        Self {
            robot,
            vision,
            settings: Arc::new(settings),
            resources,
            vstream,
        }
    }

    /// Environment backed entirely by in-process simulations
    pub fn simulated() -> Self {
        Self::new(
            Arc::new(SimRobot::new()),
            Arc::new(SimVision::new()),
            serde_json::Value::Object(serde_json::Map::new()),
            Arc::new(SimObjectManager::default()),
            Arc::new(SimVideoStream::default()),
        )
    }

    pub fn with_robot(mut self, robot: Arc<dyn Robot>) -> Self {
        self.robot = robot;
        self
    }

    pub fn with_vision(mut self, vision: Arc<dyn Vision>) -> Self {
        self.vision = vision;
        self
    }

    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn robot(&self) -> &Arc<dyn Robot> {
        &self.robot
    }

    pub fn vision(&self) -> &Arc<dyn Vision> {
        &self.vision
    }

    pub fn settings(&self) -> &serde_json::Value {
        &self.settings
    }

    pub fn resources(&self) -> &Arc<dyn ObjectManager> {
        &self.resources
    }

    pub fn vstream(&self) -> &Arc<dyn VideoStream> {
        &self.vstream
    }

    /// Propagate the fast-abort flag to every collaborator that honors it
    pub fn set_exiting(&self, exiting: bool) {
        self.vision.set_exiting(exiting);
        self.robot.set_exiting(exiting);
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
