//! In-process stand-ins for the hardware collaborators
//!
//! Used by the CLI dry-run and by tests. The simulated robot takes real time to
//! finish a move and honors the exiting flag the same way a serial-backed arm must.

use super::{ObjectManager, Position, Robot, VideoStream, Vision};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const MOVE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Observable state of a [`SimRobot`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimRobotState {
    pub position: Position,
    pub speed: f64,
    pub gripper: bool,
    pub servos_active: bool,
    /// Every call that reached the robot, in order
    pub calls: Vec<String>,
}

/// Simulated arm
#[derive(Debug)]
pub struct SimRobot {
    exiting: AtomicBool,
    moving: AtomicBool,
    move_duration: Duration,
    state: Mutex<SimRobotState>,
}

impl Default for SimRobot {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRobot {
    pub fn new() -> Self {
        Self::with_move_duration(Duration::ZERO)
    }

    /// A robot whose waited moves take `move_duration` to complete
    pub fn with_move_duration(move_duration: Duration) -> Self {
        Self {
            exiting: AtomicBool::new(false),
            moving: AtomicBool::new(false),
            move_duration,
            state: Mutex::new(SimRobotState::default()),
        }
    }

    pub fn state(&self) -> SimRobotState {
        self.lock().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, SimRobotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

impl Robot for SimRobot {
    fn set_exiting(&self, exiting: bool) {
        if exiting {
            log::debug!(target: "armscript::sim", "robot entering exiting mode");
        }
        self.exiting.store(exiting, Ordering::SeqCst);
    }

    fn set_active_servos(&self, all: bool) {
        if self.is_exiting() {
            return;
        }
        self.record(format!("set_active_servos({all})"));
        self.lock().servos_active = all;
    }

    fn set_speed(&self, speed: f64) {
        if self.is_exiting() {
            return;
        }
        self.record(format!("set_speed({speed})"));
        self.lock().speed = speed;
    }

    fn move_to(&self, target: Position, relative: bool, wait: bool) -> bool {
        if self.is_exiting() {
            return false;
        }
        self.record(format!(
            "move_to({}, {}, {}, relative={relative})",
            target.x, target.y, target.z
        ));

        self.moving.store(true, Ordering::SeqCst);
        let mut interrupted = false;
        if wait {
            let started = Instant::now();
            while started.elapsed() < self.move_duration {
                if self.is_exiting() {
                    interrupted = true;
                    break;
                }
                thread::sleep(MOVE_POLL_INTERVAL);
            }
        }
        self.moving.store(false, Ordering::SeqCst);
        if interrupted {
            log::debug!(target: "armscript::sim", "Move interrupted by fast-abort");
            return false;
        }

        let mut state = self.lock();
        state.position = if relative {
            Position::new(
                state.position.x + target.x,
                state.position.y + target.y,
                state.position.z + target.z,
            )
        } else {
            target
        };
        true
    }

    fn set_gripper(&self, on: bool) {
        if self.is_exiting() {
            return;
        }
        self.record(format!("set_gripper({on})"));
        self.lock().gripper = on;
    }

    fn is_moving(&self) -> bool {
        self.moving.load(Ordering::SeqCst)
    }
}

/// Simulated vision system with a fixed set of tracked object names
#[derive(Debug, Default)]
pub struct SimVision {
    exiting: AtomicBool,
    tracked: Mutex<HashSet<String>>,
}

impl SimVision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, name: impl Into<String>) {
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into());
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::SeqCst)
    }
}

impl Vision for SimVision {
    fn set_exiting(&self, exiting: bool) {
        self.exiting.store(exiting, Ordering::SeqCst);
    }

    fn is_tracking(&self, name: &str) -> bool {
        if self.is_exiting() {
            return false;
        }
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}

#[derive(Debug, Default)]
pub struct SimObjectManager {
    names: Vec<String>,
}

impl SimObjectManager {
    pub fn with_objects<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ObjectManager for SimObjectManager {
    fn object_names(&self) -> Vec<String> {
        self.names.clone()
    }
}

/// Frame counter that advances each time it is read
#[derive(Debug, Default)]
pub struct SimVideoStream {
    frames: AtomicU64,
}

impl VideoStream for SimVideoStream {
    fn frame_count(&self) -> u64 {
        self.frames.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_ignores_calls_while_exiting() {
        let robot = SimRobot::new();
        robot.set_speed(5.0);
        robot.set_exiting(true);
        robot.set_speed(20.0);
        assert!(!robot.move_to(Position::new(1.0, 2.0, 3.0), false, true));

        let state = robot.state();
        assert_eq!(state.speed, 5.0);
        assert_eq!(state.calls, vec!["set_speed(5)".to_string()]);
    }

    #[test]
    fn relative_moves_accumulate() {
        let robot = SimRobot::new();
        robot.move_to(Position::new(1.0, 1.0, 1.0), false, false);
        robot.move_to(Position::new(0.5, -1.0, 2.0), true, false);
        assert_eq!(robot.state().position, Position::new(1.5, 0.0, 3.0));
    }

    #[test]
    fn waited_move_returns_early_when_exiting() {
        let robot = std::sync::Arc::new(SimRobot::with_move_duration(Duration::from_secs(10)));
        let remote = robot.clone();
        let aborter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.set_exiting(true);
        });

        let started = Instant::now();
        let moved = robot.move_to(Position::new(0.0, 10.0, 5.0), false, true);
        aborter.join().unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(!moved);
        assert_eq!(robot.state().position, Position::default());
    }

    #[test]
    fn vision_reports_tracked_objects() {
        let vision = SimVision::new();
        vision.track("cup");
        assert!(vision.is_tracking("cup"));
        assert!(!vision.is_tracking("ball"));
        vision.set_exiting(true);
        assert!(!vision.is_tracking("cup"));
    }
}
