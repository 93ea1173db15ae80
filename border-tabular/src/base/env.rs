//! Environment.
use super::{Act, State, Step};
use crate::error::TabularError;
use anyhow::Result;

/// The set of actions available in an environment.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpace<A> {
    /// `n` actions, synthesized as `0..n` with [`Act::from_index`].
    Discrete(usize),

    /// An explicit list of actions.
    Enumerated(Vec<A>),
}

impl<A: Act> ActionSpace<A> {
    /// Turns the action space into a list of distinct actions.
    ///
    /// Fails with [`TabularError::EmptyActionSpace`] if the list is empty and with
    /// [`TabularError::Protocol`] if a discrete space is given for an action type
    /// that cannot be built from an index.
    pub fn resolve(self) -> Result<Vec<A>, TabularError> {
        let acts = match self {
            Self::Discrete(n) => (0..n)
                .map(|ix| {
                    A::from_index(ix).ok_or_else(|| {
                        TabularError::Protocol(format!(
                            "action {} of a discrete action space with {} actions \
                             cannot be converted to the action type",
                            ix, n
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Self::Enumerated(acts) => {
                let mut uniq: Vec<A> = Vec::with_capacity(acts.len());
                for a in acts {
                    if !uniq.contains(&a) {
                        uniq.push(a);
                    }
                }
                uniq
            }
        };

        if acts.is_empty() {
            Err(TabularError::EmptyActionSpace)
        } else {
            Ok(acts)
        }
    }
}

/// Represents an environment, typically an MDP with discrete states and actions.
pub trait Env {
    /// State of the environment.
    type State: State;

    /// Action of the environment.
    type Act: Act;

    /// Returns the actions available in the environment.
    fn action_space(&self) -> ActionSpace<Self::Act>;

    /// Resets the environment and returns the initial state.
    fn reset(&mut self) -> Result<Self::State>;

    /// Performes an environment step.
    fn step(&mut self, a: &Self::Act) -> Result<Step<Self::State>>;
}
