#![warn(missing_docs)]
//! Tabular Q-learning with experience replay.
//!
//! [`Engine`] learns a table of action values for environments implementing [`Env`]
//! with discrete, hashable states and actions. It supports epsilon-greedy exploration
//! with a multiplicative decay schedule, a bounded replay buffer for uniform batch
//! sampling, reward clipping and a target table synchronized every fixed number
//! of episodes.
//!
//! ```ignore
//! use border_tabular::{Engine, TrainingConfig};
//!
//! let config = TrainingConfig::builder()
//!     .episodes(200)
//!     .learning_rate(0.5)
//!     .replay_capacity(1000)
//!     .batch_size(8)
//!     .target_sync_interval(10)
//!     .seed(42)
//!     .build()?;
//! let mut engine = Engine::new(config);
//! let metrics = engine.train(&mut env, None)?;
//! let policy = engine.export_policy();
//! ```
pub mod error;
pub mod record;

mod base;
pub use base::{Act, ActionSpace, Env, Info, State, Step};

mod config;
pub use config::{TrainingConfig, TrainingConfigBuilder};

mod experience;
pub use experience::Experience;

mod replay_buffer;
pub use replay_buffer::ReplayBuffer;

mod q_table;
pub use q_table::QTable;

mod metrics;
pub use metrics::TrainingMetrics;

mod snapshot;
pub use snapshot::{EngineSnapshot, QEntry, VisitCount};

mod engine;
pub use engine::Engine;
