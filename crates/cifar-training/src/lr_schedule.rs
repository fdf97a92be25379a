//! Epoch-granular learning-rate schedules.
//!
//! The scheduler is stepped once at the top of every epoch, before the
//! training pass, matching the historical scripts. With a step size of
//! 10 the first decay therefore lands on epoch 10 exactly.

use cifar_core::SchedulePolicy;

/// Tracks the current learning rate for a [`SchedulePolicy`].
#[derive(Debug, Clone)]
pub struct LrScheduler {
    policy: SchedulePolicy,
    lr_init: f64,
    epoch: usize,
}

impl LrScheduler {
    pub fn new(policy: SchedulePolicy, lr_init: f64) -> Self {
        Self {
            policy,
            lr_init,
            epoch: 0,
        }
    }

    /// Advances to the next epoch.
    pub fn step(&mut self) {
        self.epoch += 1;
    }

    /// Learning rate for the current epoch.
    pub fn lr(&self) -> f64 {
        match &self.policy {
            SchedulePolicy::Step { step_size, gamma } => {
                self.lr_init * gamma.powi((self.epoch / step_size) as i32)
            }
            SchedulePolicy::MultiStep { milestones, gamma } => {
                let hits = milestones.iter().filter(|&&m| m <= self.epoch).count();
                self.lr_init * gamma.powi(hits as i32)
            }
        }
    }
}
