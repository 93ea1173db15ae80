//! Types and traits for recording training metrics.
//!
//! [`Engine::train_with_recorder`](crate::Engine::train_with_recorder) converts the
//! metrics of every episode into a [`Record`] and writes it to a [`Recorder`].
//!
//! ```rust
//! use border_tabular::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("episode", RecordValue::Scalar(1.0));
//! record.insert("total_reward", RecordValue::Scalar(-3.5));
//! assert_eq!(record.get_scalar("total_reward").unwrap(), -3.5);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
