//! Environment step.
use serde_json::{Map, Value};

/// Additional information attached to a transition.
pub type Info = Map<String, Value>;

/// Result of an environment step.
///
/// Environments report the end of an episode either with a single `done` flag or
/// with separate termination and truncation flags. Both forms are accepted by the
/// [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq)]
pub enum Step<S> {
    /// Step with a single `done` flag.
    Done {
        /// State after the step.
        next_state: S,

        /// Reward.
        reward: f64,

        /// Flag denoting if the episode is over.
        done: bool,

        /// Information defined by the environment.
        info: Info,
    },

    /// Step with separate termination and truncation flags.
    Split {
        /// State after the step.
        next_state: S,

        /// Reward.
        reward: f64,

        /// Flag denoting if the episode is terminated.
        is_terminated: bool,

        /// Flag denoting if the episode is truncated.
        is_truncated: bool,

        /// Information defined by the environment.
        info: Info,
    },
}

impl<S> Step<S> {
    /// Constructs a [`Step::Done`] with empty info.
    pub fn new(next_state: S, reward: f64, done: bool) -> Self {
        Self::Done {
            next_state,
            reward,
            done,
            info: Info::new(),
        }
    }

    /// Constructs a [`Step::Split`] with empty info.
    pub fn with_truncation(
        next_state: S,
        reward: f64,
        is_terminated: bool,
        is_truncated: bool,
    ) -> Self {
        Self::Split {
            next_state,
            reward,
            is_terminated,
            is_truncated,
            info: Info::new(),
        }
    }

    /// Terminated or truncated.
    #[inline]
    pub fn is_done(&self) -> bool {
        match self {
            Self::Done { done, .. } => *done,
            Self::Split {
                is_terminated,
                is_truncated,
                ..
            } => *is_terminated || *is_truncated,
        }
    }

    /// Returns `(next_state, reward, done, info)`.
    ///
    /// For [`Step::Split`], `done` is `is_terminated || is_truncated` and both flags
    /// are folded into `info` under the keys `"terminated"` and `"truncated"`.
    pub fn into_parts(self) -> (S, f64, bool, Info) {
        match self {
            Self::Done {
                next_state,
                reward,
                done,
                info,
            } => (next_state, reward, done, info),
            Self::Split {
                next_state,
                reward,
                is_terminated,
                is_truncated,
                mut info,
            } => {
                info.insert("terminated".to_string(), Value::Bool(is_terminated));
                info.insert("truncated".to_string(), Value::Bool(is_truncated));
                (next_state, reward, is_terminated || is_truncated, info)
            }
        }
    }
}
