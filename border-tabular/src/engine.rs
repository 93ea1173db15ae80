//! Tabular Q-learning engine.
use crate::{
    error::TabularError,
    record::{NullRecorder, Recorder},
    Act, Env, EngineSnapshot, Experience, QTable, ReplayBuffer, State, TrainingConfig,
    TrainingMetrics,
};
use anyhow::Result;
use chrono::Local;
use log::{debug, info, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::{HashMap, HashSet};

type Initializer<S, A> = Box<dyn Fn(&S, &A) -> f64 + Send>;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Epsilon-greedy Q-learning with experience replay and a target table.
///
/// # Training loop
///
/// [`Engine::train`] runs the following loop for each episode:
///
/// 1. Reset the environment: `s = env.reset()`.
/// 2. Up to `max_steps_per_episode` times:
///     1. With probability `epsilon` take a uniformly random action, otherwise
///        the greedy action of [`Engine::policy`].
///     2. Step the environment, clip the reward if `reward_clipping` is given and
///        push the [`Experience`] into the replay buffer.
///     3. Do a learning step (see below) and accumulate the absolute TD error.
///     4. `s = s'`, leave the loop if the episode is done.
/// 3. Emit [`TrainingMetrics`].
/// 4. `epsilon = max(epsilon_end, epsilon * epsilon_decay)`.
/// 5. If `episode % target_sync_interval == 0`, replace the target table with
///    a copy of the Q-table.
///
/// # Learning step
///
/// If the replay buffer holds at least `max(min_replay_size, batch_size)`
/// experiences and `batch_size > 1`, `batch_size` distinct experiences are sampled
/// uniformly and each of them is applied in turn; the reported TD error is the mean
/// over the batch. Otherwise the most recent transition alone is applied and its TD
/// error is reported as is.
///
/// For an experience `(s, a, r, s', done)`, the update is
///
/// ```text
/// target   = r                                 if done
///          = r + discount_factor * max_a' V(s', a')   otherwise
/// td_error = target - Q(s, a)
/// Q(s, a) += learning_rate * td_error
/// ```
///
/// where `V` is the target table if `target_sync_interval` is given and the Q-table
/// itself otherwise.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Engine]-->|Act|B[Env]
///     B -->|"Step&lt;State&gt;"|A
///     A -->|Experience|C[ReplayBuffer]
///     C -->|Experience batch|A
///     D[Target table]-->|"max V(s', a')"|A
/// ```
pub struct Engine<S: State, A: Act> {
    config: TrainingConfig,
    q_table: QTable<S, A>,
    target_table: Option<QTable<S, A>>,
    replay_buffer: Option<ReplayBuffer<S, A>>,
    epsilon: f64,
    rng: StdRng,
    actions: Vec<A>,
    action_set: HashSet<A>,
    initializer: Initializer<S, A>,
}

impl<S: State, A: Act> Engine<S, A> {
    /// Constructs an engine with zero-initialized action values.
    pub fn new(config: TrainingConfig) -> Self {
        let rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let q_table = QTable::new();
        let target_table = config.target_sync_interval().map(|_| q_table.clone());
        let replay_buffer = config.replay_capacity().map(ReplayBuffer::new);

        Self {
            epsilon: config.epsilon_start(),
            config,
            q_table,
            target_table,
            replay_buffer,
            rng,
            actions: Vec::new(),
            action_set: HashSet::new(),
            initializer: Box::new(|_: &S, _: &A| 0.0),
        }
    }

    /// Sets the function giving the initial value of a missing Q-table entry.
    pub fn with_initializer<F>(mut self, f: F) -> Self
    where
        F: Fn(&S, &A) -> f64 + Send + 'static,
    {
        self.initializer = Box::new(f);
        self
    }

    /// Hyperparameters.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Current exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Actions registered so far, in the order of registration.
    pub fn known_actions(&self) -> &[A] {
        &self.actions
    }

    /// The Q-table.
    pub fn q_table(&self) -> &QTable<S, A> {
        &self.q_table
    }

    /// The target table, if enabled.
    pub fn target_table(&self) -> Option<&QTable<S, A>> {
        self.target_table.as_ref()
    }

    /// The replay buffer, if enabled.
    pub fn replay_buffer(&self) -> Option<&ReplayBuffer<S, A>> {
        self.replay_buffer.as_ref()
    }

    fn register_action(&mut self, a: &A) {
        if self.action_set.insert(a.clone()) {
            self.actions.push(a.clone());
        }
    }

    /// Returns an action with the maximum value, breaking ties at random.
    ///
    /// `actions` is expected to be non-empty.
    fn greedy(&mut self, state: &S, actions: &[A]) -> A {
        let q_table = &mut self.q_table;
        let init = &self.initializer;
        let values = actions
            .iter()
            .map(|a| q_table.get_or_insert_with(state, a, || init(state, a)))
            .collect::<Vec<_>>();

        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut maximizers = values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == max)
            .map(|(ix, _)| ix)
            .collect::<Vec<_>>();
        if maximizers.is_empty() {
            // all values are NaN
            maximizers = (0..actions.len()).collect();
        }

        let ix = maximizers[self.rng.gen_range(0..maximizers.len())];
        actions[ix].clone()
    }

    /// Returns the greedy action in `state` among `actions`.
    ///
    /// Missing entries of the Q-table are materialized with the initializer. Ties are
    /// broken uniformly at random with the engine's random number generator, so the
    /// result is reproducible for a given seed and call sequence. If `actions` is
    /// empty, the actions registered so far are used; if there is none,
    /// [`TabularError::RuntimeState`] is returned.
    pub fn policy(&mut self, state: &S, actions: &[A]) -> Result<A> {
        let candidates = if actions.is_empty() {
            if self.actions.is_empty() {
                return Err(TabularError::RuntimeState(
                    "no action is given and none has been registered".to_string(),
                )
                .into());
            }
            self.actions.clone()
        } else {
            actions.to_vec()
        };

        Ok(self.greedy(state, &candidates))
    }

    fn explore(&mut self, state: &S, actions: &[A]) -> A {
        if self.rng.gen::<f64>() < self.epsilon {
            actions[self.rng.gen_range(0..actions.len())].clone()
        } else {
            self.greedy(state, actions)
        }
    }

    fn best_next_value(&mut self, next_state: &S) -> f64 {
        let init = &self.initializer;
        let values = match &self.target_table {
            Some(target) => self
                .actions
                .iter()
                .map(|a| {
                    target
                        .get(next_state, a)
                        .unwrap_or_else(|| init(next_state, a))
                })
                .collect::<Vec<_>>(),
            None => {
                let q_table = &mut self.q_table;
                self.actions
                    .iter()
                    .map(|a| q_table.get_or_insert_with(next_state, a, || init(next_state, a)))
                    .collect::<Vec<_>>()
            }
        };

        if values.is_empty() {
            0.0
        } else {
            values.into_iter().fold(f64::NEG_INFINITY, f64::max)
        }
    }

    /// Applies the update of a single experience and returns its TD error.
    fn update(&mut self, exp: &Experience<S, A>) -> f64 {
        let (s, a) = (exp.state(), exp.action());
        let current = {
            let init = &self.initializer;
            self.q_table.get_or_insert_with(s, a, || init(s, a))
        };
        let target = if exp.is_done() {
            exp.reward()
        } else {
            exp.reward() + self.config.discount_factor() * self.best_next_value(exp.next_state())
        };
        let td_err = target - current;

        let init = &self.initializer;
        let delta = self.config.learning_rate() * td_err;
        let value = self.q_table.update(s, a, delta, || init(s, a));
        trace!("Q({:?}, {:?}) = {} (td_err = {})", s, a, value, td_err);

        td_err
    }

    /// Does a learning step, batched if the replay buffer is warm.
    fn learn(&mut self, latest: &Experience<S, A>, batch_size: usize) -> f64 {
        let min_size = self.config.min_replay_size().max(batch_size);
        let batch = match &self.replay_buffer {
            Some(buffer) if batch_size > 1 && buffer.len() >= min_size => Some(
                buffer
                    .sample_indices(batch_size, &mut self.rng)
                    .into_iter()
                    .filter_map(|ix| buffer.get(ix).cloned())
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        };

        match batch {
            Some(batch) => {
                let td_err_sum: f64 = batch.iter().map(|exp| self.update(exp)).sum();
                td_err_sum / batch.len() as f64
            }
            None => self.update(latest),
        }
    }

    fn push(&mut self, exp: &Experience<S, A>) {
        if let Some(buffer) = self.replay_buffer.as_mut() {
            buffer.push(exp.clone());
        }
    }

    /// Takes an experience collected outside of [`Engine::train`].
    ///
    /// The action is registered, the experience is pushed into the replay buffer if
    /// enabled and, if `learn` is `true`, a learning step is done with the experience
    /// as the most recent transition. Returns the TD error of the learning step, or
    /// `0.0` if `learn` is `false`.
    pub fn ingest_experience(&mut self, experience: Experience<S, A>, learn: bool) -> f64 {
        self.register_action(experience.action());
        self.push(&experience);

        if learn {
            self.learn(&experience, self.config.batch_size())
        } else {
            0.0
        }
    }

    /// Does a learning step with an experience drawn from the replay buffer.
    ///
    /// `batch_size`, if given, replaces the configured batch size for this call.
    /// Returns `0.0` without learning if the replay buffer is disabled or empty.
    pub fn replay(&mut self, batch_size: Option<usize>) -> Result<f64> {
        let batch_size = match batch_size {
            Some(0) => {
                return Err(
                    TabularError::ConfigValidation("batch_size must be positive".to_string())
                        .into(),
                )
            }
            Some(n) => n,
            None => self.config.batch_size(),
        };

        let sampled = match &self.replay_buffer {
            Some(buffer) if !buffer.is_empty() => {
                let ix = self.rng.gen_range(0..buffer.len());
                buffer.get(ix).cloned()
            }
            _ => None,
        };

        Ok(match sampled {
            Some(exp) => self.learn(&exp, batch_size),
            None => 0.0,
        })
    }

    #[inline]
    fn clip_reward(&self, reward: f64) -> f64 {
        match self.config.reward_clipping() {
            Some((low, high)) => reward.max(low).min(high),
            None => reward,
        }
    }

    fn decay_epsilon(&mut self) {
        let epsilon = (self.epsilon * self.config.epsilon_decay()).max(self.config.epsilon_end());
        self.epsilon = epsilon.min(self.epsilon);
    }

    fn sync_target(&mut self, episode: usize) {
        if let (Some(interval), Some(target)) = (
            self.config.target_sync_interval(),
            self.target_table.as_mut(),
        ) {
            if episode % interval == 0 {
                *target = self.q_table.clone();
                debug!("Synchronized the target table at episode {}", episode);
            }
        }
    }

    fn run_episode<E>(
        &mut self,
        env: &mut E,
        actions: &[A],
        episode: usize,
    ) -> Result<TrainingMetrics<S>>
    where
        E: Env<State = S, Act = A>,
    {
        let epsilon = self.epsilon;
        let mut state = env.reset()?;
        let mut total_reward = 0.0;
        let mut steps = 0;
        let mut td_err_sum = 0.0;
        let mut td_err_max = 0f64;
        let mut terminated = false;

        while steps < self.config.max_steps_per_episode() {
            let act = self.explore(&state, actions);
            let (next_state, reward, done, info) = env.step(&act)?.into_parts();
            let reward = self.clip_reward(reward);
            let exp = Experience::new(state, act, reward, next_state.clone(), done, Some(info))?;
            self.push(&exp);

            let td_err = self.learn(&exp, self.config.batch_size()).abs();
            td_err_sum += td_err;
            td_err_max = td_err_max.max(td_err);
            total_reward += reward;
            steps += 1;
            state = next_state;

            if done {
                terminated = true;
                break;
            }
        }

        Ok(TrainingMetrics {
            episode,
            total_reward,
            steps,
            epsilon,
            mean_td_error: if steps > 0 {
                td_err_sum / steps as f64
            } else {
                0.0
            },
            max_td_error: td_err_max,
            final_state: state,
            terminated,
            timestamp: Local::now(),
        })
    }

    /// Trains the engine on the given environment.
    ///
    /// Runs `episodes` episodes, or the configured number if `None`, and returns the
    /// metrics of every episode. An error of the environment or a violation of its
    /// protocol aborts training immediately; updates applied before the error are
    /// kept in the Q-table.
    pub fn train<E>(
        &mut self,
        env: &mut E,
        episodes: Option<usize>,
    ) -> Result<Vec<TrainingMetrics<S>>>
    where
        E: Env<State = S, Act = A>,
    {
        self.train_with_recorder(env, episodes, &mut NullRecorder {})
    }

    /// Trains the engine and writes the metrics of each episode to `recorder`.
    ///
    /// See [`TrainingMetrics::to_record`] for the keys of the records.
    pub fn train_with_recorder<E, R>(
        &mut self,
        env: &mut E,
        episodes: Option<usize>,
        recorder: &mut R,
    ) -> Result<Vec<TrainingMetrics<S>>>
    where
        E: Env<State = S, Act = A>,
        R: Recorder,
    {
        let actions = env.action_space().resolve()?;
        for a in actions.iter() {
            self.register_action(a);
        }

        let n_episodes = episodes.unwrap_or_else(|| self.config.episodes());
        info!(
            "Starts training for {} episodes with {} actions",
            n_episodes,
            actions.len()
        );

        let mut history = Vec::with_capacity(n_episodes);
        for episode in 1..=n_episodes {
            let metrics = self.run_episode(env, &actions, episode)?;
            debug!(
                "Episode {}: {} steps, reward = {}, epsilon = {}, td_err = {}",
                episode, metrics.steps, metrics.total_reward, metrics.epsilon, metrics.mean_td_error
            );
            recorder.write(metrics.to_record());
            history.push(metrics);

            self.decay_epsilon();
            self.sync_target(episode);
        }

        info!(
            "Finished training, {} entries in the Q-table",
            self.q_table.len()
        );
        Ok(history)
    }

    /// Returns `Q(state, action)` without materializing a missing entry.
    ///
    /// Fails with [`TabularError::RuntimeState`] if no action has been registered.
    pub fn q_value(&self, state: &S, action: &A) -> Result<f64> {
        if self.actions.is_empty() {
            return Err(TabularError::RuntimeState(
                "no action has been registered".to_string(),
            )
            .into());
        }

        Ok(self
            .q_table
            .get(state, action)
            .unwrap_or_else(|| (self.initializer)(state, action)))
    }

    /// Returns the greedy action among the registered actions for every state
    /// in the Q-table.
    pub fn export_policy(&mut self) -> HashMap<S, A> {
        let states = self.q_table.states().cloned().collect::<Vec<_>>();
        let actions = self.actions.clone();
        let mut policy = HashMap::with_capacity(states.len());

        if actions.is_empty() {
            return policy;
        }

        for s in states {
            let a = self.greedy(&s, &actions);
            policy.insert(s, a);
        }
        policy
    }

    /// Exports the configuration, the Q-table and the update counts.
    pub fn snapshot(&self) -> EngineSnapshot<S, A> {
        EngineSnapshot::new(self.config.as_builder().clone(), &self.q_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrainingConfigBuilder;

    fn builder() -> TrainingConfigBuilder {
        TrainingConfig::builder()
            .learning_rate(0.5)
            .discount_factor(0.9)
            .seed(42)
    }

    fn exp(s: u8, a: u8, r: f64, s_: u8, done: bool) -> Experience<u8, u8> {
        Experience::new(s, a, r, s_, done, None).unwrap()
    }

    #[test]
    fn test_single_update() {
        let mut engine = Engine::new(builder().build().unwrap());
        let td_err = engine.ingest_experience(exp(0, 1, 2.0, 1, true), true);
        assert_eq!(td_err, 2.0);
        assert_eq!(engine.q_value(&0, &1).unwrap(), 1.0);
        assert_eq!(engine.q_table().visits(&0, &1), 1);

        // bootstrapped from Q(0, 1) = 1.0
        let td_err = engine.ingest_experience(exp(1, 1, 0.0, 0, false), true);
        assert!((td_err - 0.9).abs() < 1e-12);
        assert!((engine.q_value(&1, &1).unwrap() - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_ingest_without_learning() {
        let mut engine = Engine::new(builder().replay_capacity(4).build().unwrap());
        assert_eq!(engine.ingest_experience(exp(0, 3, 1.0, 1, false), false), 0.0);
        assert_eq!(engine.known_actions(), &[3]);
        assert_eq!(engine.replay_buffer().unwrap().len(), 1);
        assert!(engine.q_table().is_empty());
    }

    #[test]
    fn test_runtime_state_error() {
        let mut engine = Engine::<u8, u8>::new(builder().build().unwrap());
        let err = engine.policy(&0, &[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TabularError>(),
            Some(TabularError::RuntimeState(_))
        ));
        let err = engine.q_value(&0, &0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TabularError>(),
            Some(TabularError::RuntimeState(_))
        ));
        assert!(engine.export_policy().is_empty());
    }

    #[test]
    fn test_policy_prefers_max_and_falls_back_to_known_actions() {
        let mut engine = Engine::new(builder().build().unwrap());
        engine.ingest_experience(exp(0, 0, -1.0, 0, true), true);
        engine.ingest_experience(exp(0, 1, 1.0, 0, true), true);
        engine.ingest_experience(exp(0, 2, 0.5, 0, true), true);
        for _ in 0..10 {
            assert_eq!(engine.policy(&0, &[0, 1, 2]).unwrap(), 1);
            assert_eq!(engine.policy(&0, &[]).unwrap(), 1);
            assert_eq!(engine.policy(&0, &[0, 2]).unwrap(), 2);
        }
    }

    #[test]
    fn test_tie_break_covers_all_maximizers() {
        let mut engine = Engine::<u8, u8>::new(builder().build().unwrap());
        let picked = (0..100)
            .map(|_| engine.policy(&0, &[0, 1, 2]).unwrap())
            .collect::<Vec<_>>();
        for a in 0..3 {
            assert!(picked.contains(&a));
        }
        // entries are materialized by policy()
        assert_eq!(engine.q_table().len(), 3);
    }

    #[test]
    fn test_initializer() {
        let mut engine =
            Engine::<u8, u8>::new(builder().build().unwrap()).with_initializer(|s, a| {
                (*s as f64) * 10.0 + *a as f64
            });
        engine.ingest_experience(exp(5, 5, 0.0, 5, false), false);
        assert_eq!(engine.q_value(&2, &3).unwrap(), 23.0);
        assert_eq!(engine.policy(&1, &[4, 7, 2]).unwrap(), 7);
    }

    #[test]
    fn test_target_table_is_used_for_bootstrapping() {
        let mut engine = Engine::new(builder().target_sync_interval(1).build().unwrap());
        engine.ingest_experience(exp(1, 0, 4.0, 1, true), true);
        assert_eq!(engine.q_value(&1, &0).unwrap(), 2.0);

        // the target table is still empty, so the next value is 0
        let td_err = engine.ingest_experience(exp(0, 0, 0.0, 1, false), true);
        assert_eq!(td_err, 0.0);
        assert!(engine.target_table().unwrap().is_empty());
    }

    #[test]
    fn test_replay() {
        let mut engine = Engine::new(builder().replay_capacity(8).build().unwrap());
        assert_eq!(engine.replay(None).unwrap(), 0.0);

        engine.ingest_experience(exp(0, 0, 1.0, 0, true), false);
        let td_err = engine.replay(None).unwrap();
        assert_eq!(td_err, 1.0);
        assert_eq!(engine.q_value(&0, &0).unwrap(), 0.5);

        let err = engine.replay(Some(0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TabularError>(),
            Some(TabularError::ConfigValidation(_))
        ));
    }

    #[test]
    fn test_replay_batch_override_reports_mean() {
        let mut engine = Engine::new(builder().replay_capacity(8).build().unwrap());
        engine.ingest_experience(exp(0, 0, 1.0, 0, true), false);
        engine.ingest_experience(exp(1, 0, 3.0, 1, true), false);

        // both experiences are sampled, each with TD error equal to its reward
        let td_err = engine.replay(Some(2)).unwrap();
        assert_eq!(td_err, 2.0);
        assert_eq!(engine.config().batch_size(), 1);
        assert_eq!(engine.q_value(&0, &0).unwrap(), 0.5);
        assert_eq!(engine.q_value(&1, &0).unwrap(), 1.5);
    }

    #[test]
    fn test_replay_without_buffer() {
        let mut engine = Engine::new(builder().build().unwrap());
        engine.ingest_experience(exp(0, 0, 1.0, 0, true), false);
        assert_eq!(engine.replay(Some(4)).unwrap(), 0.0);
        assert!(engine.q_table().is_empty());
    }

    #[test]
    fn test_learns_latest_until_min_replay_size() {
        let config = builder()
            .replay_capacity(16)
            .batch_size(2)
            .min_replay_size(4)
            .build()
            .unwrap();
        let mut engine = Engine::new(config);
        engine.ingest_experience(exp(0, 0, 1.0, 0, true), false);
        engine.ingest_experience(exp(1, 0, 1.0, 1, true), false);

        // 3 experiences, enough for a batch of 2 but below min_replay_size
        let td_err = engine.ingest_experience(exp(2, 0, 2.0, 2, true), true);
        assert_eq!(td_err, 2.0);
        assert_eq!(engine.q_table().visits(&0, &0), 0);
        assert_eq!(engine.q_table().visits(&1, &0), 0);
        assert_eq!(engine.q_table().visits(&2, &0), 1);

        // every buffered experience now has a TD error of 1.0
        let td_err = engine.ingest_experience(exp(3, 0, 1.0, 3, true), true);
        assert_eq!(td_err, 1.0);
        let n_updates: usize = engine.q_table().iter_visits().map(|(_, _, n)| n).sum();
        assert_eq!(n_updates, 3);
    }

    #[test]
    fn test_batch_size_one_never_samples() {
        let config = builder()
            .replay_capacity(16)
            .batch_size(1)
            .build()
            .unwrap();
        let mut engine = Engine::new(config);
        for s in 0..6u8 {
            let td_err = engine.ingest_experience(exp(s, 0, s as f64, s, true), true);
            assert_eq!(td_err, s as f64);
        }
        assert_eq!(engine.replay_buffer().unwrap().len(), 6);
        assert!((0..6u8).all(|s| engine.q_table().visits(&s, &0) == 1));
    }

    #[test]
    fn test_huge_replay_capacity() {
        let config = builder().replay_capacity(usize::MAX / 2).build().unwrap();
        let mut engine = Engine::<u8, u8>::new(config);
        let td_err = engine.ingest_experience(exp(0, 0, 1.0, 0, true), true);
        assert_eq!(td_err, 1.0);
        assert_eq!(engine.replay_buffer().unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot() {
        let mut engine = Engine::new(builder().build().unwrap());
        engine.ingest_experience(exp(0, 1, 1.0, 0, true), true);
        engine.ingest_experience(exp(0, 1, 1.0, 0, true), true);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.config.learning_rate, 0.5);
        assert_eq!(snapshot.q_table.len(), 1);
        assert_eq!(snapshot.q_table[0].value, 0.75);
        assert_eq!(snapshot.visit_counts[0].count, 2);
    }
}
