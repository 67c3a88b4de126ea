// Configuration loading and parsing (backfill.toml, lookups.toml).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::scoring::estimator::{EstimateSource, MIN_SCORE, NOISE_BOUND};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub run: RunConfig,
    pub estimator: EstimatorConfig,
    pub lookups: Lookups,
}

// ---------------------------------------------------------------------------
// backfill.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire backfill.toml file.
#[derive(Debug, Clone, Default, Deserialize)]
struct BackfillFile {
    #[serde(default)]
    run: RunConfig,
    #[serde(default)]
    estimator: EstimatorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seed for the run's random generator.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig { seed: 42 }
    }
}

/// Tunables of the blended PF/PA estimator. Every field has a default, so a
/// config file only needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Sources tried in order before falling back to the era baseline.
    pub priority: Vec<EstimateSource>,

    pub team_min_records: usize,
    /// Per-season decay of a historical record's weight.
    pub recency_decay: f64,
    /// Sum of a baseline PF/PA pair at the reference era.
    pub era_normalization: f64,

    pub season_min_teams: usize,

    pub division_min_records: usize,
    /// Weight of the division mean against the era baseline.
    pub division_weight: f64,

    pub win_min_games: u32,
    pub win_pf_scale: f64,
    pub win_pa_scale: f64,
    pub rank_pf_scale: f64,
    pub rank_pa_scale: f64,

    /// Last season played with the small league size.
    pub small_league_through: i32,
    pub small_league_size: u32,
    pub league_size: u32,

    pub noise_bound: f64,
    pub min_score: f64,

    pub shootout_ratio: f64,
    pub shootout_damping: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig {
            priority: vec![
                EstimateSource::TeamHistory,
                EstimateSource::SameSeason,
                EstimateSource::Division,
            ],
            team_min_records: 2,
            recency_decay: 0.1,
            era_normalization: 2400.0,
            season_min_teams: 6,
            division_min_records: 10,
            division_weight: 0.6,
            win_min_games: 10,
            win_pf_scale: 150.0,
            win_pa_scale: 100.0,
            rank_pf_scale: 100.0,
            rank_pa_scale: 80.0,
            small_league_through: 2006,
            small_league_size: 10,
            league_size: 12,
            noise_bound: NOISE_BOUND,
            min_score: MIN_SCORE,
            shootout_ratio: 1.1,
            shootout_damping: 0.5,
        }
    }
}

impl EstimatorConfig {
    /// Number of teams in the league for a given season.
    pub fn league_size_for(&self, season: i32) -> u32 {
        if season <= self.small_league_through {
            self.small_league_size
        } else {
            self.league_size
        }
    }
}

// ---------------------------------------------------------------------------
// lookups.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for lookups.toml. Season keys arrive as strings.
#[derive(Debug, Clone, Default, Deserialize)]
struct LookupsFile {
    #[serde(default)]
    owner_locations: HashMap<String, String>,
    #[serde(default)]
    draft_locations: HashMap<String, DraftLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DraftLocation {
    pub draft_party: String,
    pub league_hq: String,
}

/// Static reference tables used by the metadata fill.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    /// owner_code -> "City, ST"
    pub owner_locations: HashMap<String, String>,
    pub draft_locations: BTreeMap<i32, DraftLocation>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/backfill.toml` and
/// `config/lookups.toml` relative to `base_dir`. Both files are optional:
/// a missing backfill.toml yields the built-in estimator defaults and a
/// missing lookups.toml yields empty tables.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- backfill.toml (optional) ---
    let backfill_path = config_dir.join("backfill.toml");
    let backfill: BackfillFile = if backfill_path.exists() {
        let text = read_file(&backfill_path)?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: backfill_path.clone(),
            source: e,
        })?
    } else {
        BackfillFile::default()
    };

    // --- lookups.toml (optional) ---
    let lookups_path = config_dir.join("lookups.toml");
    let lookups_file: LookupsFile = if lookups_path.exists() {
        let text = read_file(&lookups_path)?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: lookups_path.clone(),
            source: e,
        })?
    } else {
        LookupsFile::default()
    };

    let config = Config {
        run: backfill.run,
        estimator: backfill.estimator,
        lookups: build_lookups(lookups_file)?,
    };

    validate(&config)?;

    Ok(config)
}

/// Files read from `config/`, seeded from `defaults/` when absent.
pub const CONFIG_FILES: [&str; 2] = ["backfill.toml", "lookups.toml"];

/// Seed `config/` with any of [`CONFIG_FILES`] it lacks, copying from
/// `defaults/`. Existing files are never overwritten and anything else in
/// `defaults/` is ignored. Returns the files that were written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let source = defaults_dir.join(name);
        let target = config_dir.join(name);
        if !source.is_file() || target.exists() {
            continue;
        }
        std::fs::create_dir_all(&config_dir).map_err(|e| copy_error("create", &config_dir, e))?;
        std::fs::copy(&source, &target).map_err(|e| copy_error("copy", &source, e))?;
        info!("seeded {} from defaults", target.display());
        copied.push(target);
    }
    Ok(copied)
}

fn copy_error(action: &str, path: &Path, err: std::io::Error) -> ConfigError {
    ConfigError::DefaultsCopyError {
        message: format!("failed to {action} {}: {err}", path.display()),
    }
}

/// Copy defaults into place, then load config rooted at `base_dir`.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn build_lookups(file: LookupsFile) -> Result<Lookups, ConfigError> {
    let mut draft_locations = BTreeMap::new();
    for (key, location) in file.draft_locations {
        let season = key
            .trim()
            .parse::<i32>()
            .map_err(|_| ConfigError::ValidationError {
                field: format!("draft_locations.{key}"),
                message: "season key must be an integer year".into(),
            })?;
        draft_locations.insert(season, location);
    }
    Ok(Lookups {
        owner_locations: file.owner_locations,
        draft_locations,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let est = &config.estimator;

    let mut seen = HashSet::new();
    for source in &est.priority {
        if *source == EstimateSource::EraBaseline {
            return Err(ConfigError::ValidationError {
                field: "estimator.priority".into(),
                message: "era_baseline is always the final fallback and cannot be listed".into(),
            });
        }
        if !seen.insert(*source) {
            return Err(ConfigError::ValidationError {
                field: "estimator.priority".into(),
                message: format!("duplicate source {source:?}"),
            });
        }
    }

    let counts: &[(&str, usize)] = &[
        ("estimator.team_min_records", est.team_min_records),
        ("estimator.season_min_teams", est.season_min_teams),
        ("estimator.division_min_records", est.division_min_records),
        ("estimator.small_league_size", est.small_league_size as usize),
        ("estimator.league_size", est.league_size as usize),
    ];
    for (name, val) in counts {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    let positives: &[(&str, f64)] = &[
        ("estimator.era_normalization", est.era_normalization),
        ("estimator.shootout_ratio", est.shootout_ratio),
    ];
    for (name, val) in positives {
        if !(*val > 0.0) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be > 0, got {val}"),
            });
        }
    }

    let non_negatives: &[(&str, f64)] = &[
        ("estimator.recency_decay", est.recency_decay),
        ("estimator.win_pf_scale", est.win_pf_scale),
        ("estimator.win_pa_scale", est.win_pa_scale),
        ("estimator.rank_pf_scale", est.rank_pf_scale),
        ("estimator.rank_pa_scale", est.rank_pa_scale),
        ("estimator.noise_bound", est.noise_bound),
        ("estimator.min_score", est.min_score),
    ];
    for (name, val) in non_negatives {
        if !(*val >= 0.0) || !val.is_finite() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be a finite value >= 0, got {val}"),
            });
        }
    }

    let fractions: &[(&str, f64)] = &[
        ("estimator.division_weight", est.division_weight),
        ("estimator.shootout_damping", est.shootout_damping),
    ];
    for (name, val) in fractions {
        if !(0.0..=1.0).contains(val) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be between 0.0 and 1.0 inclusive, got {val}"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
