// Single pass over the table: index complete rows, then estimate and write back
// PF/PA for every row that needs it.

use rand::Rng;
use tracing::{debug, info};

use crate::config::EstimatorConfig;
use crate::record::{RecordColumns, RecordError};
use crate::scoring::estimator::{Estimate, Estimator};
use crate::scoring::index::ScoringIndex;
use crate::table::Table;

/// One row whose scores were replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledRow {
    /// Zero-based position in the table.
    pub row: usize,
    pub season: i32,
    pub team: String,
    pub estimate: Estimate,
}

impl FilledRow {
    /// `"{season} {team} → PF: {pf}, PA: {pa}"`
    pub fn log_line(&self) -> String {
        format!(
            "{} {} → PF: {}, PA: {}",
            self.season,
            self.team,
            format_score(self.estimate.pf),
            format_score(self.estimate.pa)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FillReport {
    /// Rows examined (every row in the table).
    pub examined: usize,
    pub filled: Vec<FilledRow>,
    pub indexed_teams: usize,
    pub indexed_seasons: usize,
}

impl FillReport {
    pub fn filled_count(&self) -> usize {
        self.filled.len()
    }

    /// `"Filled {n} out of {m} entries"`
    pub fn summary_line(&self) -> String {
        format!("Filled {} out of {} entries", self.filled_count(), self.examined)
    }
}

/// Scores are written with exactly two fractional digits.
pub fn format_score(value: f64) -> String {
    format!("{value:.2}")
}

/// Estimate and substitute PF/PA for every row that needs it, in table order.
///
/// Rows with both scores present are left byte-for-byte unchanged. The table
/// is untouched if the required columns are missing or a season fails to
/// parse.
pub fn fill_scores<R: Rng + ?Sized>(
    table: &mut Table,
    config: &EstimatorConfig,
    rng: &mut R,
) -> Result<FillReport, RecordError> {
    let cols = RecordColumns::resolve(table)?;
    let records = cols.parse_rows(table)?;

    let index = ScoringIndex::build(&records);
    info!(
        "indexed complete scores for {} teams across {} seasons",
        index.team_count(),
        index.season_count()
    );

    let estimator = Estimator::new(&index, config);
    let mut report = FillReport {
        examined: records.len(),
        filled: Vec::new(),
        indexed_teams: index.team_count(),
        indexed_seasons: index.season_count(),
    };

    for record in records.iter().filter(|r| r.needs_filling()) {
        let estimate = estimator.estimate(record, rng);
        debug!(
            "row {}: {} {} from {} (base {:.1}/{:.1})",
            record.row + 1,
            record.season,
            record.team,
            estimate.source.label(),
            estimate.base_pf,
            estimate.base_pa
        );
        table.set(record.row, cols.pf, format_score(estimate.pf));
        table.set(record.row, cols.pa, format_score(estimate.pa));
        report.filled.push(FilledRow {
            row: record.row,
            season: record.season,
            team: record.team.clone(),
            estimate,
        });
    }

    info!("{}", report.summary_line());
    Ok(report)
}
