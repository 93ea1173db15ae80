//! Transition record.
use crate::{error::TabularError, Info};
use serde::{Deserialize, Serialize};

/// A transition `(s_t, a_t, r_t, s_t+1)` with the episode-end flag.
///
/// Experiences are immutable once constructed. The reward is always a finite number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience<S, A> {
    state: S,
    action: A,
    reward: f64,
    next_state: S,
    done: bool,
    info: Option<Info>,
}

impl<S, A> Experience<S, A> {
    /// Constructs an experience.
    ///
    /// Fails with [`TabularError::Protocol`] if `reward` is NaN or infinite.
    pub fn new(
        state: S,
        action: A,
        reward: f64,
        next_state: S,
        done: bool,
        info: Option<Info>,
    ) -> Result<Self, TabularError> {
        if !reward.is_finite() {
            return Err(TabularError::Protocol(format!(
                "reward must be a finite number, got {}",
                reward
            )));
        }

        Ok(Self {
            state,
            action,
            reward,
            next_state,
            done,
            info,
        })
    }

    /// State before the transition.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Action taken in [`Experience::state`].
    pub fn action(&self) -> &A {
        &self.action
    }

    /// Reward.
    pub fn reward(&self) -> f64 {
        self.reward
    }

    /// State after the transition.
    pub fn next_state(&self) -> &S {
        &self.next_state
    }

    /// Flag denoting if the episode ended with this transition.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Additional information.
    pub fn info(&self) -> Option<&Info> {
        self.info.as_ref()
    }
}
