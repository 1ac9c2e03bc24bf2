//! Snake on a grid, learned with tabular Q-learning.
//!
//! [`game`] simulates the board, [`state`] reduces it to a 12-bit key,
//! [`agent`] holds the action-value table and [`trainer`] runs episodes.

pub mod agent;
pub mod config;
pub mod error;
pub mod game;
pub mod persist;
pub mod pos;
pub mod state;
pub mod trainer;
pub mod view;
