//! Plain key-value export of a trained engine.
//!
//! The engine does not write files. [`EngineSnapshot`] is serializable with serde,
//! so that any writer can store the configuration, the Q-table and the update
//! counts of an [`Engine`](crate::Engine).
use crate::{QTable, TrainingConfigBuilder};
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// An entry of the Q-table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QEntry<S, A> {
    /// State.
    pub state: S,

    /// Action.
    pub action: A,

    /// Action value.
    pub value: f64,
}

/// The number of learning updates of an entry of the Q-table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitCount<S, A> {
    /// State.
    pub state: S,

    /// Action.
    pub action: A,

    /// The number of updates.
    pub count: usize,
}

/// Configuration and learned values of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot<S, A> {
    /// Hyperparameters.
    pub config: TrainingConfigBuilder,

    /// Entries of the Q-table.
    pub q_table: Vec<QEntry<S, A>>,

    /// Update counts of the entries of the Q-table.
    pub visit_counts: Vec<VisitCount<S, A>>,
}

impl<S, A> EngineSnapshot<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    pub(crate) fn new(config: TrainingConfigBuilder, q_table: &QTable<S, A>) -> Self {
        Self {
            config,
            q_table: q_table
                .iter()
                .map(|(s, a, value)| QEntry {
                    state: s.clone(),
                    action: a.clone(),
                    value,
                })
                .collect(),
            visit_counts: q_table
                .iter_visits()
                .map(|(s, a, count)| VisitCount {
                    state: s.clone(),
                    action: a.clone(),
                    count,
                })
                .collect(),
        }
    }
}
