use crate::config::Params;
use crate::model::{Population, Snapshot};
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;

/// Simulation engine.
///
/// Holds the configuration, the population and the random number generator
/// shared by placement and relocation, and drives the relocation passes.
pub struct Engine<P: Population> {
    cfg: P::Config,
    pop: P,
    rng: ChaCha12Rng,
    n_moves: Vec<usize>,
}

impl<P: Population> Engine<P> {
    /// Create a new `Engine` with the given configuration and a random initial state.
    ///
    /// The generator is seeded with `seed` if given, otherwise from the OS.
    pub fn generate_initial_condition(cfg: P::Config, seed: Option<u64>) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let mut rng = match seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let pop = P::generate(&cfg, &mut rng).context("failed to generate population")?;

        Ok(Self {
            cfg,
            pop,
            rng,
            n_moves: Vec::new(),
        })
    }

    pub fn population(&self) -> &P {
        &self.pop
    }

    /// Number of relocation passes executed so far.
    pub fn n_iter(&self) -> usize {
        self.n_moves.len()
    }

    /// Number of moves of every executed pass.
    pub fn n_moves(&self) -> &[usize] {
        &self.n_moves
    }

    /// Visit every agent once and relocate the unhappy ones.
    ///
    /// Moves take effect immediately, so agents visited later in the pass
    /// see the already relocated ones. Returns the number of moves.
    pub fn perform_pass(&mut self) -> usize {
        let threshold = self.cfg.threshold();
        let mut n_moves = 0;
        let mut n_stuck = 0;

        for i_agt in 0..self.pop.agents().len() {
            if !self.pop.neighborhood(i_agt).is_unhappy(threshold) {
                continue;
            }
            if self.pop.relocate(i_agt, &mut self.rng) {
                n_moves += 1;
            } else {
                n_stuck += 1;
            }
        }

        if n_stuck > 0 {
            log::warn!("{n_stuck} unhappy agents found no place to move");
        }

        self.n_moves.push(n_moves);
        n_moves
    }

    /// Run relocation passes until one makes no moves or `max_iter` passes are done.
    ///
    /// Returns the number of passes executed by this call.
    pub fn perform_simulation(&mut self) -> usize {
        let max_iter = self.cfg.max_iter();
        for i_iter in 0..max_iter {
            let n_moves = self.perform_pass();
            log::debug!("pass {} made {n_moves} moves", i_iter + 1);
            if n_moves == 0 {
                return i_iter + 1;
            }
        }
        max_iter
    }

    /// Mean and standard deviation of the per-agent similarity ratios.
    ///
    /// Agents without neighbors count as fully similar.
    /// Returns `None` for an empty population.
    pub fn similarity_report(&self) -> Option<AccumulatorReport> {
        (0..self.pop.agents().len())
            .map(|i_agt| self.pop.neighborhood(i_agt).similarity())
            .collect::<Accumulator>()
            .report()
    }

    /// Mean per-agent similarity ratio, or `None` for an empty population.
    pub fn similarity(&self) -> Option<f64> {
        self.similarity_report().map(|report| report.mean)
    }

    pub fn snapshot(&self) -> Snapshot<P::Pos> {
        Snapshot {
            agents: self.pop.agents().to_vec(),
            group_sizes: self.pop.group_sizes(self.cfg.n_groups()),
            similarity: self.similarity_report(),
            n_iter: self.n_iter(),
            n_moves: self.n_moves.clone(),
        }
    }
}
