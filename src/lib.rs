//! Schelling-style segregation dynamics on a bounded grid and on the unit square.

pub mod config;
pub mod engine;
pub mod grid;
pub mod manager;
pub mod model;
pub mod plane;
pub mod stats;
