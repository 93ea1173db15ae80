//! Small deterministic environments used in the integration tests.
#![allow(dead_code)]
use anyhow::{bail, Result};
use border_tabular::{Act, ActionSpace, Env, Step};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lever {
    A,
    B,
}

impl Act for Lever {}

/// Two decisions per episode: state 0 moves to state 1, state 1 ends the episode
/// in state 2. Pulling [`Lever::A`] pays 1, [`Lever::B`] pays 0.
pub struct TwoStateMdp {
    state: u8,
}

impl TwoStateMdp {
    pub fn new() -> Self {
        Self { state: 0 }
    }
}

impl Env for TwoStateMdp {
    type State = u8;
    type Act = Lever;

    fn action_space(&self) -> ActionSpace<Lever> {
        ActionSpace::Enumerated(vec![Lever::A, Lever::B])
    }

    fn reset(&mut self) -> Result<u8> {
        self.state = 0;
        Ok(self.state)
    }

    fn step(&mut self, a: &Lever) -> Result<Step<u8>> {
        let reward = match a {
            Lever::A => 1.0,
            Lever::B => 0.0,
        };
        self.state += 1;
        Ok(Step::new(self.state, reward, self.state == 2))
    }
}

/// A single-step episode paying a fixed reward.
pub struct ConstantReward {
    pub reward: f64,
    pub n_actions: usize,
}

impl Env for ConstantReward {
    type State = u8;
    type Act = usize;

    fn action_space(&self) -> ActionSpace<usize> {
        ActionSpace::Discrete(self.n_actions)
    }

    fn reset(&mut self) -> Result<u8> {
        Ok(0)
    }

    fn step(&mut self, _a: &usize) -> Result<Step<u8>> {
        Ok(Step::new(1, self.reward, true))
    }
}

/// A discrete action space for an action type without an index.
pub struct NamedActions;

impl Env for NamedActions {
    type State = u8;
    type Act = String;

    fn action_space(&self) -> ActionSpace<String> {
        ActionSpace::Discrete(2)
    }

    fn reset(&mut self) -> Result<u8> {
        Ok(0)
    }

    fn step(&mut self, _a: &String) -> Result<Step<u8>> {
        Ok(Step::new(0, 0.0, true))
    }
}

/// An environment without actions.
pub struct NoActions;

impl Env for NoActions {
    type State = u8;
    type Act = char;

    fn action_space(&self) -> ActionSpace<char> {
        ActionSpace::Enumerated(vec![])
    }

    fn reset(&mut self) -> Result<u8> {
        Ok(0)
    }

    fn step(&mut self, _a: &char) -> Result<Step<u8>> {
        Ok(Step::new(0, 0.0, true))
    }
}

/// Fails at the `fail_at`-th call of `step`.
pub struct Faulty {
    pub n_steps: usize,
    pub fail_at: usize,
}

impl Env for Faulty {
    type State = usize;
    type Act = u32;

    fn action_space(&self) -> ActionSpace<u32> {
        ActionSpace::Discrete(2)
    }

    fn reset(&mut self) -> Result<usize> {
        Ok(0)
    }

    fn step(&mut self, _a: &u32) -> Result<Step<usize>> {
        self.n_steps += 1;
        if self.n_steps == self.fail_at {
            bail!("connection to the simulator lost");
        }
        Ok(Step::new(self.n_steps % 3, 1.0, false))
    }
}

/// Positions `0..=goal` on a line. `'R'` moves right, `'L'` moves left. Reaching
/// the goal terminates the episode, `limit` steps truncate it.
pub struct Corridor {
    pub goal: i32,
    pub limit: usize,
    pos: i32,
    t: usize,
}

impl Corridor {
    pub fn new(goal: i32, limit: usize) -> Self {
        Self {
            goal,
            limit,
            pos: 0,
            t: 0,
        }
    }
}

impl Env for Corridor {
    type State = i32;
    type Act = char;

    fn action_space(&self) -> ActionSpace<char> {
        ActionSpace::Enumerated(vec!['L', 'R'])
    }

    fn reset(&mut self) -> Result<i32> {
        self.pos = 0;
        self.t = 0;
        Ok(self.pos)
    }

    fn step(&mut self, a: &char) -> Result<Step<i32>> {
        self.t += 1;
        self.pos = match a {
            'R' => self.pos + 1,
            _ => (self.pos - 1).max(0),
        };
        let is_terminated = self.pos == self.goal;
        let reward = if is_terminated { 1.0 } else { -0.1 };
        Ok(Step::with_truncation(
            self.pos,
            reward,
            is_terminated,
            self.t >= self.limit,
        ))
    }
}
