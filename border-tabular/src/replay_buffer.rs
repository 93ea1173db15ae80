//! Bounded replay buffer.
use crate::Experience;
use rand::{seq::index, Rng};
use std::collections::{vec_deque::Iter, VecDeque};

/// A bounded FIFO buffer of [`Experience`]s with uniform random sampling.
///
/// When the buffer is full, pushing an experience evicts the oldest one.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<S, A> {
    capacity: usize,
    buf: VecDeque<Experience<S, A>>,
}

impl<S, A> ReplayBuffer<S, A> {
    /// Constructs an empty buffer.
    ///
    /// Memory is allocated as experiences are pushed. A buffer of zero capacity
    /// keeps nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buf: VecDeque::new(),
        }
    }

    /// Pushes an experience, evicting the oldest one if the buffer is full.
    pub fn push(&mut self, tr: Experience<S, A>) {
        if self.capacity == 0 {
            return;
        }
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(tr);
    }

    /// The number of experiences in the buffer.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the buffer holds no experience.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The maximum number of experiences.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the `ix`-th experience, the oldest being `0`.
    pub fn get(&self, ix: usize) -> Option<&Experience<S, A>> {
        self.buf.get(ix)
    }

    /// Iterates over the experiences from the oldest to the newest.
    pub fn iter(&self) -> Iter<'_, Experience<S, A>> {
        self.buf.iter()
    }

    /// Samples `size` distinct indices uniformly at random.
    ///
    /// `size` is capped by the number of experiences in the buffer.
    pub fn sample_indices<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Vec<usize> {
        let size = size.min(self.buf.len());
        index::sample(rng, self.buf.len(), size).into_vec()
    }

    /// Samples `size` distinct experiences uniformly at random.
    pub fn sample<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Vec<&Experience<S, A>> {
        self.sample_indices(size, rng)
            .into_iter()
            .map(|ix| &self.buf[ix])
            .collect()
    }
}
