//! Simulation data types.

use crate::config::Params;
use crate::stats::AccumulatorReport;
use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cell of the discrete grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

/// Point of the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn dist_sq(&self, other: &Point) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }
}

/// Agent of the simulation.
///
/// The group never changes after creation; only the position is updated
/// when the agent relocates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent<P> {
    id: usize,
    group: usize,
    pub(crate) pos: P,
}

impl<P> Agent<P> {
    pub fn new(id: usize, group: usize, pos: P) -> Self {
        Self { id, group, pos }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn pos(&self) -> &P {
        &self.pos
    }
}

/// Group composition around a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighborhood {
    pub n_same: usize,
    pub n_diff: usize,
}

impl Neighborhood {
    /// Count how many neighbor groups match `group`.
    pub fn count<I: IntoIterator<Item = usize>>(group: usize, neighbor_groups: I) -> Self {
        let mut neighborhood = Self::default();
        for neighbor_group in neighbor_groups {
            if neighbor_group == group {
                neighborhood.n_same += 1;
            } else {
                neighborhood.n_diff += 1;
            }
        }
        neighborhood
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_same + self.n_diff
    }

    /// Same-group ratio, or `None` if there are no neighbors.
    pub fn ratio(&self) -> Option<f64> {
        match self.n_neighbors() {
            0 => None,
            n => Some(self.n_same as f64 / n as f64),
        }
    }

    /// Same-group ratio used by the segregation metric (1 without neighbors).
    pub fn similarity(&self) -> f64 {
        self.ratio().unwrap_or(1.0)
    }

    /// An agent without neighbors is never unhappy.
    pub fn is_unhappy(&self, threshold: f64) -> bool {
        self.ratio().is_some_and(|ratio| ratio < threshold)
    }
}

/// Population of agents placed on some topology.
///
/// Implementors define placement, neighbor queries and relocation moves;
/// the relocation dynamics and metrics are shared by the engine.
pub trait Population: Sized {
    type Config: Params;
    type Pos: Clone + Serialize;

    /// Place a fresh population according to `cfg`.
    fn generate<R: Rng>(cfg: &Self::Config, rng: &mut R) -> Result<Self>;

    /// Agents in visitation order.
    fn agents(&self) -> &[Agent<Self::Pos>];

    /// Groups of the current neighbors of agent `i_agt`.
    fn neighbor_groups(&self, i_agt: usize) -> impl Iterator<Item = usize> + '_;

    /// Move agent `i_agt` to a new position.
    ///
    /// Returns `false` if no move was possible.
    fn relocate<R: Rng>(&mut self, i_agt: usize, rng: &mut R) -> bool;

    fn neighborhood(&self, i_agt: usize) -> Neighborhood {
        let group = self.agents()[i_agt].group();
        Neighborhood::count(group, self.neighbor_groups(i_agt))
    }

    fn group_sizes(&self, n_groups: usize) -> Vec<usize> {
        let mut sizes = vec![0; n_groups];
        for agt in self.agents() {
            sizes[agt.group()] += 1;
        }
        sizes
    }
}

/// Read-only view of the population handed to output consumers.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<P> {
    /// Agents with their group and position.
    pub agents: Vec<Agent<P>>,

    /// Number of agents of each group.
    pub group_sizes: Vec<usize>,

    /// Per-agent similarity summary (`None` for an empty population).
    ///
    /// With a single agent `std_dev` is NaN, and it is written as such.
    pub similarity: Option<AccumulatorReport>,

    /// Number of relocation passes executed so far.
    pub n_iter: usize,

    /// Number of moves in each executed pass.
    pub n_moves: Vec<usize>,
}
