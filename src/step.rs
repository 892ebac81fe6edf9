//! Step counting from one accelerometer axis
//!
//! Each sample is pushed into a 3-sample window. Once the window is full its
//! mean drives a two-state hysteresis detector:
//!
//! - armed, mean above `threshold + delta`: count a step and disarm
//! - disarmed, mean below `threshold - delta`: re-arm
//!
//! Anything between the two bounds leaves the state unchanged, so a noisy
//! peak counts once.

use crate::types::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Samples averaged before a decision is made
pub const STEP_WINDOW: usize = 3;

/// Accelerometer axis watched for steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn component(self, v: Vector3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Hysteresis step detector over a moving average
#[derive(Debug, Clone)]
pub struct StepDetector {
    axis: Axis,
    threshold: f64,
    delta: f64,
    window: VecDeque<f64>,
    armed: bool,
    steps: u64,
}

impl StepDetector {
    /// `threshold` and `delta` are in Gs
    pub fn new(axis: Axis, threshold: f64, delta: f64) -> Self {
        Self {
            axis,
            threshold,
            delta,
            window: VecDeque::with_capacity(STEP_WINDOW),
            armed: true,
            steps: 0,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Steps counted so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether the next peak will be counted
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Feed one accelerometer reading. Returns true when it completes a step.
    pub fn update(&mut self, accel: Vector3) -> bool {
        self.push(self.axis.component(accel))
    }

    /// Feed one value of the watched axis
    pub fn push(&mut self, value: f64) -> bool {
        if self.window.len() == STEP_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(value);

        if self.window.len() < STEP_WINDOW {
            return false;
        }

        let mean = self.window.iter().sum::<f64>() / STEP_WINDOW as f64;
        if self.armed && mean > self.threshold + self.delta {
            self.armed = false;
            self.steps += 1;
            log::debug!("Step {} (mean {:.3} G)", self.steps, mean);
            true
        } else {
            if !self.armed && mean < self.threshold - self.delta {
                self.armed = true;
            }
            false
        }
    }

    /// Clear the window and the count
    pub fn reset(&mut self) {
        self.window.clear();
        self.armed = true;
        self.steps = 0;
    }
}
