use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    ops::{Bound, RangeBounds},
    path::Path,
};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seed of the random number generator (drawn from the OS if absent).
    #[serde(default)]
    pub seed: Option<u64>,

    /// Model parameters.
    pub model: ModelConfig,
}

/// Topology-specific model parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "topology", rename_all = "snake_case")]
pub enum ModelConfig {
    Grid(GridConfig),
    Plane(PlaneConfig),
}

/// Parameters of the discrete grid model.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Fraction of cells left vacant.
    pub empty_ratio: f64,
    /// Minimum same-group ratio for an agent to be happy.
    pub happiness_threshold: f64,
    /// Number of groups.
    pub n_groups: usize,
    /// Maximum number of relocation passes.
    pub max_iter: usize,
}

/// Parameters of the continuous unit-square model.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PlaneConfig {
    /// Number of agents.
    pub n_agents: usize,
    /// Number of groups.
    pub n_groups: usize,
    /// Maximum number of relocation passes.
    pub max_iter: usize,
    /// Neighborhood radius.
    pub radius: f64,
    /// Minimum same-group ratio for an agent to be satisfied.
    pub threshold: f64,
}

/// Parameters shared by both topologies and needed by the engine.
pub trait Params: Clone + Debug {
    fn n_groups(&self) -> usize;
    fn max_iter(&self) -> usize;
    fn threshold(&self) -> f64;
    fn validate(&self) -> Result<()>;
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match &self.model {
            ModelConfig::Grid(cfg) => cfg.validate(),
            ModelConfig::Plane(cfg) => cfg.validate(),
        }
    }
}

impl Params for GridConfig {
    fn n_groups(&self) -> usize {
        self.n_groups
    }

    fn max_iter(&self) -> usize {
        self.max_iter
    }

    fn threshold(&self) -> f64 {
        self.happiness_threshold
    }

    fn validate(&self) -> Result<()> {
        check_num(self.width, 1..=100_000).context("invalid width")?;
        check_num(self.height, 1..=100_000).context("invalid height")?;
        let n_cells = self
            .width
            .checked_mul(self.height)
            .context("number of cells overflows")?;
        check_num(n_cells, 1..=10_000_000).context("invalid number of cells")?;
        check_num(self.empty_ratio, 0.0..1.0).context("invalid empty ratio")?;
        check_num(self.happiness_threshold, 0.0..=1.0).context("invalid happiness threshold")?;
        check_num(self.n_groups, 1..).context("invalid number of groups")?;
        Ok(())
    }
}

impl Params for PlaneConfig {
    fn n_groups(&self) -> usize {
        self.n_groups
    }

    fn max_iter(&self) -> usize {
        self.max_iter
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn validate(&self) -> Result<()> {
        check_num(self.n_agents, 0..=1_000_000).context("invalid number of agents")?;
        check_num(self.n_groups, 1..).context("invalid number of groups")?;
        let radius_range = (Bound::Excluded(0.0), Bound::Excluded(f64::INFINITY));
        check_num(self.radius, radius_range).context("invalid neighborhood radius")?;
        check_num(self.threshold, 0.0..=1.0).context("invalid satisfaction threshold")?;
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
