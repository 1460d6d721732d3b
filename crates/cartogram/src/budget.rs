//! Cooperative cancellation and time limits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Shared flag a caller can raise from another thread to stop a running computation.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetState {
    Running,
    /// The deadline passed: finish with what has been computed so far.
    Expired,
}

/// Deadline and cancellation checked between integration steps and diffusion passes.
#[derive(Debug, Clone, Default)]
pub struct RunBudget {
    deadline: Option<Instant>,
    cancel: Option<CancelFlag>,
}

impl RunBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.deadline = Instant::now().checked_add(limit);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Fails with [`Error::Cancelled`] once the flag is raised.
    pub fn check(&self) -> Result<BudgetState> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Ok(BudgetState::Expired),
            _ => Ok(BudgetState::Running),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_flag_cancels() {
        let flag = CancelFlag::new();
        let budget = RunBudget::unlimited().with_cancel_flag(flag.clone());
        assert_eq!(budget.check().unwrap(), BudgetState::Running);
        flag.cancel();
        assert!(matches!(budget.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn past_deadline_expires() {
        let budget = RunBudget::unlimited().with_deadline(Instant::now());
        assert_eq!(budget.check().unwrap(), BudgetState::Expired);
        let budget = RunBudget::unlimited().with_time_limit(Duration::from_secs(3600));
        assert_eq!(budget.check().unwrap(), BudgetState::Running);
    }
}
