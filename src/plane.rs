use crate::config::PlaneConfig;
use crate::model::{Agent, Point, Population};
use anyhow::Result;
use rand::prelude::*;
use rand_distr::Uniform;

/// Agents scattered over the unit square `[0, 1) x [0, 1)`.
///
/// Two agents are neighbors if they are closer than `radius`.
/// Positions may coincide and there is no notion of vacancy.
pub struct PlanePopulation {
    radius_sq: f64,
    agents: Vec<Agent<Point>>,
}

impl PlanePopulation {
    fn random_point<R: Rng>(rng: &mut R) -> Point {
        Point {
            x: rng.random(),
            y: rng.random(),
        }
    }
}

impl Population for PlanePopulation {
    type Config = PlaneConfig;
    type Pos = Point;

    fn generate<R: Rng>(cfg: &PlaneConfig, rng: &mut R) -> Result<Self> {
        let group_dist = Uniform::new(0, cfg.n_groups)?;

        let mut agents = Vec::with_capacity(cfg.n_agents);
        for i_agt in 0..cfg.n_agents {
            let pos = Self::random_point(rng);
            let group = group_dist.sample(rng);
            agents.push(Agent::new(i_agt, group, pos));
        }

        Ok(Self {
            radius_sq: cfg.radius * cfg.radius,
            agents,
        })
    }

    fn agents(&self) -> &[Agent<Point>] {
        &self.agents
    }

    // Brute-force scan over the whole population.
    fn neighbor_groups(&self, i_agt: usize) -> impl Iterator<Item = usize> + '_ {
        let pos = self.agents[i_agt].pos;
        self.agents
            .iter()
            .enumerate()
            .filter(move |&(j_agt, agt)| j_agt != i_agt && agt.pos.dist_sq(&pos) < self.radius_sq)
            .map(|(_, agt)| agt.group())
    }

    fn relocate<R: Rng>(&mut self, i_agt: usize, rng: &mut R) -> bool {
        self.agents[i_agt].pos = Self::random_point(rng);
        true
    }
}
