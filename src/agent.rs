use ahash::AHashMap;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::AgentConfig;
use crate::game::Dir;
use crate::state::DiscreteState;

/// Action-values for one state, indexed by [`Dir::index`].
pub type ActionValues = [f32; 4];

/// Tabular action-value store. A state missing from the table has never been
/// visited; [`QTable::entry`] creates it with every action at zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QTable {
    q: AHashMap<DiscreteState, ActionValues>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn get(&self, s: DiscreteState) -> Option<&ActionValues> {
        self.q.get(&s)
    }

    pub fn entry(&mut self, s: DiscreteState) -> &mut ActionValues {
        self.q.entry(s).or_insert([0.0; 4])
    }

    /// Overwrites a whole row. Returns the previous row if there was one.
    pub fn insert(&mut self, s: DiscreteState, values: ActionValues) -> Option<ActionValues> {
        self.q.insert(s, values)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DiscreteState, &ActionValues)> + '_ {
        self.q.iter().map(|(s, v)| (*s, v))
    }

    /// Epsilon-greedy over every direction except the reverse of `current`.
    ///
    /// Explores uniformly with probability `epsilon` or when `s` is unknown.
    /// Greedy ties go to the earliest candidate in [`Dir::ALL`] order.
    pub fn choose_action<R: Rng + ?Sized>(
        &self,
        s: DiscreteState,
        current: Dir,
        epsilon: f32,
        rng: &mut R,
    ) -> Dir {
        let candidates = candidates(current);
        let known = match self.q.get(&s) {
            Some(qs) if rng.r#gen::<f32>() >= epsilon => qs,
            _ => return *candidates.choose(rng).unwrap_or(&current),
        };

        let mut best = candidates[0];
        for &d in &candidates[1..] {
            if known[d.index()] > known[best.index()] {
                best = d;
            }
        }
        best
    }

    /// One-step Q-learning: `Q[s][a] += lr * (r + gamma * max Q[ns] - Q[s][a])`.
    /// Both states are created first if missing. Terminal transitions still bootstrap from `ns`.
    pub fn update(
        &mut self,
        s: DiscreteState,
        a: Dir,
        r: f32,
        ns: DiscreteState,
        params: &AgentConfig,
    ) {
        self.entry(s);
        let next_max = max_value(self.entry(ns));
        let qsa = &mut self.entry(s)[a.index()];
        let td_target = r + params.discount_factor * next_max;
        *qsa += params.learning_rate * (td_target - *qsa);
    }
}

/// Every direction except the one that reverses `current`, in [`Dir::ALL`] order.
pub fn candidates(current: Dir) -> [Dir; 3] {
    let mut out = [current; 3];
    let mut i = 0;
    for d in Dir::ALL {
        if d != current.opposite() {
            out[i] = d;
            i += 1;
        }
    }
    out
}

fn max_value(qs: &ActionValues) -> f32 {
    qs.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}
