// Season row parsing and sentinel classification for score cells.
//
// The table is kept as verbatim strings (see `table`); this module produces a
// typed view of the columns the score estimator reads, leaving every other
// column untouched.

use std::num::ParseIntError;

use thiserror::Error;
use tracing::warn;

use crate::table::Table;

/// Placeholder written by the export process for scores it never fetched.
pub const MISSING_SCORE_TOKEN: &str = "MISSING_TASK_ESPN-MCP";

/// Largest season PF/PA accepted as real data. Anything above is a data-entry
/// error and is treated like an unparseable cell.
pub const MAX_PLAUSIBLE_SCORE: f64 = 100_000.0;

pub const COL_SEASON: &str = "season_year";
pub const COL_TEAM: &str = "team_code";
pub const COL_DIVISION: &str = "division_code";
pub const COL_WINS: &str = "rs_wins";
pub const COL_LOSSES: &str = "rs_losses";
pub const COL_FINAL_RANK: &str = "final_rank";
pub const COL_PF: &str = "rs_pf";
pub const COL_PA: &str = "rs_pa";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("required column `{column}` is missing from the header")]
    MissingColumn { column: String },

    #[error("row {row}: season_year `{value}` is not an integer")]
    InvalidSeason { row: usize, value: String },
}

// ---------------------------------------------------------------------------
// Score cells
// ---------------------------------------------------------------------------

/// Classification of a raw PF/PA cell.
///
/// Empty cells, zeros and the placeholder token all mean "not available".
/// A genuine zero-point season cannot be told apart from the zero placeholder,
/// so any cell that parses to zero is treated as missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreCell {
    Value(f64),
    Empty,
    Zero,
    Placeholder,
    /// Present but not a number in `0..=MAX_PLAUSIBLE_SCORE`.
    Malformed,
}

impl ScoreCell {
    pub fn classify(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return ScoreCell::Empty;
        }
        if s == MISSING_SCORE_TOKEN {
            return ScoreCell::Placeholder;
        }
        match s.parse::<f64>() {
            Ok(v) if !v.is_finite() || v < 0.0 || v > MAX_PLAUSIBLE_SCORE => ScoreCell::Malformed,
            Ok(v) if v == 0.0 => ScoreCell::Zero,
            Ok(v) => ScoreCell::Value(v),
            Err(_) => ScoreCell::Malformed,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            ScoreCell::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_missing(self) -> bool {
        self.value().is_none()
    }
}

/// Parse a win/loss/rank cell. Empty cells count as zero.
fn parse_count(raw: &str) -> Result<u32, ParseIntError> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(0);
    }
    s.parse::<u32>()
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Header positions of the estimator's columns, resolved once per table.
#[derive(Debug, Clone, Copy)]
pub struct RecordColumns {
    season: usize,
    team: usize,
    division: usize,
    wins: usize,
    losses: usize,
    final_rank: usize,
    pub pf: usize,
    pub pa: usize,
}

impl RecordColumns {
    pub fn resolve(table: &Table) -> Result<Self, RecordError> {
        let find = |name: &str| {
            table.column(name).ok_or_else(|| RecordError::MissingColumn {
                column: name.to_string(),
            })
        };
        Ok(RecordColumns {
            season: find(COL_SEASON)?,
            team: find(COL_TEAM)?,
            division: find(COL_DIVISION)?,
            wins: find(COL_WINS)?,
            losses: find(COL_LOSSES)?,
            final_rank: find(COL_FINAL_RANK)?,
            pf: find(COL_PF)?,
            pa: find(COL_PA)?,
        })
    }

    /// Parse every row with already-resolved columns.
    pub fn parse_rows(&self, table: &Table) -> Result<Vec<SeasonRecord>, RecordError> {
        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, fields)| SeasonRecord::from_row(fields, self, i))
            .collect()
    }
}

/// Parse the season column of a single row. `row` is the zero-based data row.
pub fn parse_season(raw: &str, row: usize) -> Result<i32, RecordError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| RecordError::InvalidSeason {
            row: row + 1,
            value: raw.to_string(),
        })
}

// ---------------------------------------------------------------------------
// SeasonRecord
// ---------------------------------------------------------------------------

/// Typed view of one table row, as seen by the score estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRecord {
    /// Zero-based position in the table.
    pub row: usize,
    pub season: i32,
    pub team: String,
    pub division: Option<String>,
    pub wins: u32,
    pub losses: u32,
    pub final_rank: Option<u32>,
    pub pf: ScoreCell,
    pub pa: ScoreCell,
    /// False when wins or losses were present but unparseable.
    pub counts_valid: bool,
}

impl SeasonRecord {
    pub fn from_row(fields: &[String], cols: &RecordColumns, row: usize) -> Result<Self, RecordError> {
        let cell = |idx: usize| fields.get(idx).map(String::as_str).unwrap_or("");

        let season = parse_season(cell(cols.season), row)?;
        let team = cell(cols.team).trim().to_string();
        let division = Some(cell(cols.division).trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let mut counts_valid = true;
        let mut count = |name: &str, raw: &str| match parse_count(raw) {
            Ok(v) => v,
            Err(_) => {
                warn!("row {}: malformed {} `{}`, using 0", row + 1, name, raw.trim());
                counts_valid = false;
                0
            }
        };
        let wins = count(COL_WINS, cell(cols.wins));
        let losses = count(COL_LOSSES, cell(cols.losses));

        let final_rank = match parse_count(cell(cols.final_rank)) {
            Ok(0) => None,
            Ok(rank) => Some(rank),
            Err(_) => {
                warn!(
                    "row {}: malformed final_rank `{}`, ignoring",
                    row + 1,
                    cell(cols.final_rank).trim()
                );
                None
            }
        };

        let pf = ScoreCell::classify(cell(cols.pf));
        let pa = ScoreCell::classify(cell(cols.pa));
        for (name, score, raw) in [(COL_PF, pf, cell(cols.pf)), (COL_PA, pa, cell(cols.pa))] {
            if score == ScoreCell::Malformed {
                warn!("row {}: malformed {} `{}`, treating as missing", row + 1, name, raw.trim());
            }
        }

        Ok(SeasonRecord {
            row,
            season,
            team,
            division,
            wins,
            losses,
            final_rank,
            pf,
            pa,
            counts_valid,
        })
    }

    /// True when either score is a sentinel or malformed.
    pub fn needs_filling(&self) -> bool {
        self.pf.is_missing() || self.pa.is_missing()
    }

    /// Both scores, when the row is usable as historical evidence.
    pub fn complete_scores(&self) -> Option<(f64, f64)> {
        if !self.counts_valid {
            return None;
        }
        Some((self.pf.value()?, self.pa.value()?))
    }
}

/// Parse every row of the table into a `SeasonRecord`.
pub fn parse_records(table: &Table) -> Result<Vec<SeasonRecord>, RecordError> {
    RecordColumns::resolve(table)?.parse_rows(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
