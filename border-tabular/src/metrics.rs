//! Per-episode training metrics.
use crate::record::{Record, RecordValue};
use chrono::prelude::{DateTime, Local};
use std::fmt::Debug;

/// Summary of a training episode.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMetrics<S> {
    /// Episode index, starting from 1 in each call of [`Engine::train`](crate::Engine::train).
    pub episode: usize,

    /// Sum of the (clipped) rewards.
    pub total_reward: f64,

    /// The number of environment steps.
    pub steps: usize,

    /// Exploration rate in effect during the episode.
    pub epsilon: f64,

    /// Mean of the absolute TD errors of the learning steps.
    pub mean_td_error: f64,

    /// Maximum of the absolute TD errors of the learning steps.
    pub max_td_error: f64,

    /// State at the end of the episode.
    pub final_state: S,

    /// `true` if the episode ended with `done`, `false` if the step budget ran out.
    pub terminated: bool,

    /// Time at which the episode finished.
    pub timestamp: DateTime<Local>,
}

impl<S: Debug> TrainingMetrics<S> {
    /// Converts the metrics into a [`Record`].
    ///
    /// The final state is stored with its [`Debug`] representation.
    pub fn to_record(&self) -> Record {
        Record::from_slice(&[
            ("episode", RecordValue::Scalar(self.episode as _)),
            ("total_reward", RecordValue::Scalar(self.total_reward)),
            ("steps", RecordValue::Scalar(self.steps as _)),
            ("epsilon", RecordValue::Scalar(self.epsilon)),
            ("mean_td_error", RecordValue::Scalar(self.mean_td_error)),
            ("max_td_error", RecordValue::Scalar(self.max_td_error)),
            (
                "terminated",
                RecordValue::Scalar(if self.terminated { 1.0 } else { 0.0 }),
            ),
            (
                "final_state",
                RecordValue::String(format!("{:?}", self.final_state)),
            ),
            ("datetime", RecordValue::DateTime(self.timestamp)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_record() {
        let metrics = TrainingMetrics {
            episode: 3,
            total_reward: 1.5,
            steps: 7,
            epsilon: 0.25,
            mean_td_error: 0.1,
            max_td_error: 0.4,
            final_state: (2, 3),
            terminated: true,
            timestamp: Local::now(),
        };
        let record = metrics.to_record();
        assert_eq!(record.len(), 9);
        assert_eq!(record.get_scalar("episode"), Ok(3.0));
        assert_eq!(record.get_scalar("steps"), Ok(7.0));
        assert_eq!(record.get_scalar("terminated"), Ok(1.0));
        assert_eq!(record.get_string("final_state"), Ok("(2, 3)".to_string()));
        assert_eq!(record.get_datetime("datetime"), Ok(metrics.timestamp));
    }
}
