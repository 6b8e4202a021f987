use crate::config::{Config, ModelConfig};
use crate::engine::Engine;
use crate::grid::GridPopulation;
use crate::model::{Population, Snapshot};
use crate::plane::PlanePopulation;
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::encode;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Run a new simulation in the next free run directory.
    pub fn create_run(&self, seed: Option<u64>) -> Result<()> {
        let run_idx = self.next_run_idx().context("failed to find a free run index")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let seed = seed.or(self.cfg.seed);
        let result = match &self.cfg.model {
            ModelConfig::Grid(cfg) => {
                let engine =
                    Engine::<GridPopulation>::generate_initial_condition(cfg.clone(), seed)
                        .context("failed to generate initial condition")?;
                run_engine(engine, &run_dir)
            }
            ModelConfig::Plane(cfg) => {
                let engine =
                    Engine::<PlanePopulation>::generate_initial_condition(cfg.clone(), seed)
                        .context("failed to generate initial condition")?;
                run_engine(engine, &run_dir)
            }
        };
        result.with_context(|| format!("failed to run simulation in {run_dir:?}"))
    }

    /// Remove every run directory.
    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    /// First unused run index, starting from the number of run dirs.
    fn next_run_idx(&self) -> Result<usize> {
        let mut run_idx = self.run_dirs()?.len();
        while self.run_dir(run_idx).exists() {
            run_idx += 1;
        }
        Ok(run_idx)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }
}

fn run_engine<P: Population>(mut engine: Engine<P>, run_dir: &Path) -> Result<()> {
    let initial = engine.snapshot();
    log_snapshot("initial", &initial);
    save_snapshot(&initial, run_dir.join("initial.msgpack"))
        .context("failed to save initial snapshot")?;

    let n_iter = engine.perform_simulation();
    log::info!("stopped after {n_iter} passes");

    let last = engine.snapshot();
    log_snapshot("final", &last);
    save_snapshot(&last, run_dir.join("final.msgpack")).context("failed to save final snapshot")?;

    Ok(())
}

fn log_snapshot<T>(label: &str, snapshot: &Snapshot<T>) {
    let n_agents = snapshot.agents.len();
    match &snapshot.similarity {
        Some(report) => log::info!(
            "{label} state: {n_agents} agents, similarity {:.1}% (std dev {:.3})",
            100.0 * report.mean,
            report.std_dev
        ),
        None => log::info!("{label} state: no agents, similarity has no data"),
    }
}

fn save_snapshot<T: Serialize, P: AsRef<Path>>(snapshot: &Snapshot<T>, file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write_named(&mut writer, snapshot).context("failed to serialize snapshot")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}
