//! Configuration of [`Engine`](crate::Engine).
use crate::error::TabularError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    convert::TryFrom,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Unvalidated hyperparameters of [`Engine`](crate::Engine).
///
/// Values are set with the builder methods or loaded from a YAML file, then
/// checked by [`TrainingConfigBuilder::build`].
///
/// ```ignore
/// let config = TrainingConfigBuilder::default()
///     .episodes(1000)
///     .discount_factor(0.9)
///     .replay_capacity(10_000)
///     .batch_size(32)
///     .build()?;
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainingConfigBuilder {
    /// The number of episodes run by [`Engine::train`](crate::Engine::train).
    pub episodes: usize,

    /// The maximum number of environment steps in an episode.
    pub max_steps_per_episode: usize,

    /// Discount factor, in `(0, 1]`.
    pub discount_factor: f64,

    /// Learning rate.
    pub learning_rate: f64,

    /// Exploration rate of the first episode.
    pub epsilon_start: f64,

    /// Lower bound of the exploration rate.
    pub epsilon_end: f64,

    /// Multiplicative decay of the exploration rate, applied after each episode.
    pub epsilon_decay: f64,

    /// Capacity of the replay buffer. `None` disables experience replay.
    pub replay_capacity: Option<usize>,

    /// The number of experiences in a batched learning step.
    pub batch_size: usize,

    /// The minimum number of experiences in the replay buffer before batched learning.
    pub min_replay_size: usize,

    /// Bounds `(low, high)` rewards are clipped to.
    pub reward_clipping: Option<(f64, f64)>,

    /// Interval of target table synchronization in episodes.
    /// `None` disables the target table.
    pub target_sync_interval: Option<usize>,

    /// Random seed. `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for TrainingConfigBuilder {
    fn default() -> Self {
        Self {
            episodes: 500,
            max_steps_per_episode: 200,
            discount_factor: 0.99,
            learning_rate: 0.1,
            epsilon_start: 1.0,
            epsilon_end: 0.05,
            epsilon_decay: 0.995,
            replay_capacity: None,
            batch_size: 1,
            min_replay_size: 0,
            reward_clipping: None,
            target_sync_interval: None,
            seed: None,
        }
    }
}

impl TrainingConfigBuilder {
    /// Sets the number of episodes.
    pub fn episodes(mut self, v: usize) -> Self {
        self.episodes = v;
        self
    }

    /// Sets the maximum number of steps in an episode.
    pub fn max_steps_per_episode(mut self, v: usize) -> Self {
        self.max_steps_per_episode = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the learning rate.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.learning_rate = v;
        self
    }

    /// Sets the initial exploration rate.
    pub fn epsilon_start(mut self, v: f64) -> Self {
        self.epsilon_start = v;
        self
    }

    /// Sets the lower bound of the exploration rate.
    pub fn epsilon_end(mut self, v: f64) -> Self {
        self.epsilon_end = v;
        self
    }

    /// Sets the decay factor of the exploration rate.
    pub fn epsilon_decay(mut self, v: f64) -> Self {
        self.epsilon_decay = v;
        self
    }

    /// Enables experience replay with the given capacity.
    pub fn replay_capacity(mut self, v: usize) -> Self {
        self.replay_capacity = Some(v);
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the minimum number of experiences for batched learning.
    pub fn min_replay_size(mut self, v: usize) -> Self {
        self.min_replay_size = v;
        self
    }

    /// Enables reward clipping to `[low, high]`.
    pub fn reward_clipping(mut self, low: f64, high: f64) -> Self {
        self.reward_clipping = Some((low, high));
        self
    }

    /// Enables the target table, synchronized every `v` episodes.
    pub fn target_sync_interval(mut self, v: usize) -> Self {
        self.target_sync_interval = Some(v);
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = Some(v);
        self
    }

    /// Constructs [`TrainingConfigBuilder`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainingConfigBuilder`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    fn violations(&self) -> Vec<String> {
        let mut v = Vec::new();

        if self.episodes == 0 {
            v.push("episodes must be positive".to_string());
        }
        if self.max_steps_per_episode == 0 {
            v.push("max_steps_per_episode must be positive".to_string());
        }
        if !(self.discount_factor > 0.0 && self.discount_factor <= 1.0) {
            v.push(format!(
                "discount_factor must be in (0, 1], got {}",
                self.discount_factor
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            v.push(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if !(self.epsilon_end.is_finite() && self.epsilon_end >= 0.0) {
            v.push(format!(
                "epsilon_end must be non-negative, got {}",
                self.epsilon_end
            ));
        }
        if !(self.epsilon_start.is_finite() && self.epsilon_start >= self.epsilon_end) {
            v.push(format!(
                "epsilon_start ({}) must not be less than epsilon_end ({})",
                self.epsilon_start, self.epsilon_end
            ));
        }
        if !(self.epsilon_decay.is_finite() && self.epsilon_decay > 0.0) {
            v.push(format!(
                "epsilon_decay must be positive, got {}",
                self.epsilon_decay
            ));
        }
        if self.replay_capacity == Some(0) {
            v.push("replay_capacity must be positive".to_string());
        }
        if self.batch_size == 0 {
            v.push("batch_size must be positive".to_string());
        }
        if let Some((low, high)) = self.reward_clipping {
            if !(low.is_finite() && high.is_finite() && low <= high) {
                v.push(format!(
                    "reward_clipping must be finite bounds with low <= high, got ({}, {})",
                    low, high
                ));
            }
        }
        if self.target_sync_interval == Some(0) {
            v.push("target_sync_interval must be positive".to_string());
        }

        v
    }

    /// Validates the hyperparameters.
    ///
    /// Every violated invariant is listed in the returned
    /// [`TabularError::ConfigValidation`].
    pub fn build(self) -> Result<TrainingConfig, TabularError> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(TrainingConfig(self))
        } else {
            Err(TabularError::ConfigValidation(violations.join("; ")))
        }
    }
}

/// Validated hyperparameters of [`Engine`](crate::Engine).
///
/// A value of this type always satisfies the invariants checked by
/// [`TrainingConfigBuilder::build`], including when deserialized.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(try_from = "TrainingConfigBuilder", into = "TrainingConfigBuilder")]
pub struct TrainingConfig(TrainingConfigBuilder);

impl TryFrom<TrainingConfigBuilder> for TrainingConfig {
    type Error = TabularError;

    fn try_from(builder: TrainingConfigBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

impl From<TrainingConfig> for TrainingConfigBuilder {
    fn from(config: TrainingConfig) -> Self {
        config.0
    }
}

impl TrainingConfig {
    /// Returns a builder with default values.
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Loads and validates a configuration from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(TrainingConfigBuilder::load(path)?.build()?)
    }

    /// Saves the configuration as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.0.save(path)
    }

    /// Plain key-value view of the configuration.
    pub fn as_builder(&self) -> &TrainingConfigBuilder {
        &self.0
    }

    /// The number of episodes.
    pub fn episodes(&self) -> usize {
        self.0.episodes
    }

    /// The maximum number of steps in an episode.
    pub fn max_steps_per_episode(&self) -> usize {
        self.0.max_steps_per_episode
    }

    /// Discount factor.
    pub fn discount_factor(&self) -> f64 {
        self.0.discount_factor
    }

    /// Learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.0.learning_rate
    }

    /// Initial exploration rate.
    pub fn epsilon_start(&self) -> f64 {
        self.0.epsilon_start
    }

    /// Lower bound of the exploration rate.
    pub fn epsilon_end(&self) -> f64 {
        self.0.epsilon_end
    }

    /// Decay factor of the exploration rate.
    pub fn epsilon_decay(&self) -> f64 {
        self.0.epsilon_decay
    }

    /// Capacity of the replay buffer.
    pub fn replay_capacity(&self) -> Option<usize> {
        self.0.replay_capacity
    }

    /// Batch size.
    pub fn batch_size(&self) -> usize {
        self.0.batch_size
    }

    /// Minimum number of experiences for batched learning.
    pub fn min_replay_size(&self) -> usize {
        self.0.min_replay_size
    }

    /// Reward clipping bounds.
    pub fn reward_clipping(&self) -> Option<(f64, f64)> {
        self.0.reward_clipping
    }

    /// Interval of target table synchronization in episodes.
    pub fn target_sync_interval(&self) -> Option<usize> {
        self.0.target_sync_interval
    }

    /// Random seed.
    pub fn seed(&self) -> Option<u64> {
        self.0.seed
    }
}
