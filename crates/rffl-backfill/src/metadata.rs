// Categorical backfill: owner and draft locations, per-season league defaults,
// and cleanup of data-entry placeholder tokens.
//
// Each rule only runs when the columns it touches exist in the table.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Lookups;
use crate::record::{parse_season, RecordError, COL_PA, COL_PF, COL_SEASON, MISSING_SCORE_TOKEN};
use crate::table::Table;

/// Owner location not yet researched.
pub const MISSING_OWNER_TOKEN: &str = "MISSING_TASK_KYLE";
/// Rank not yet researched.
pub const MISSING_AGENT_TOKEN: &str = "MISSING_TASK_AGENT";
/// Short placeholder used in playoff score columns.
pub const AGENT_TOKEN: &str = "AGENT";

const UNKNOWN_LOCATION: &str = "Unknown";
const PLAYOFF_SCORE_COLUMNS: &[&str] = &["qf_pf", "qf_pa", "sf_pf", "sf_pa", "f_pf", "f_pa"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataReport {
    pub rows: usize,
    pub owner_locations: usize,
    pub draft_locations: usize,
    pub season_defaults: usize,
    pub placeholders: usize,
    /// Rows that still contain the owner placeholder anywhere.
    pub remaining_owner_placeholders: usize,
}

impl MetadataReport {
    pub fn changed_cells(&self) -> usize {
        self.owner_locations + self.draft_locations + self.season_defaults + self.placeholders
    }
}

/// Apply every metadata rule to the table in place.
pub fn fill_metadata(table: &mut Table, lookups: &Lookups) -> Result<MetadataReport, RecordError> {
    let season_col = table.column(COL_SEASON).ok_or_else(|| RecordError::MissingColumn {
        column: COL_SEASON.to_string(),
    })?;
    let seasons = (0..table.len())
        .map(|row| parse_season(table.get(row, season_col), row))
        .collect::<Result<Vec<i32>, _>>()?;

    let mut report = MetadataReport {
        rows: table.len(),
        ..MetadataReport::default()
    };
    report.owner_locations = fill_owner_locations(table, lookups);
    report.draft_locations = fill_draft_locations(table, &seasons, lookups);
    report.season_defaults = fill_season_defaults(table, &seasons);
    report.placeholders = replace_placeholders(table);
    report.remaining_owner_placeholders = table
        .rows()
        .iter()
        .filter(|row| row.iter().any(|cell| cell.contains(MISSING_OWNER_TOKEN)))
        .count();

    info!(
        "metadata fill changed {} cells across {} rows",
        report.changed_cells(),
        report.rows
    );
    Ok(report)
}

/// Look up every column, or log and return `None` if any is absent.
fn columns<const N: usize>(table: &Table, rule: &str, names: [&str; N]) -> Option<[usize; N]> {
    let mut out = [0usize; N];
    for (slot, name) in out.iter_mut().zip(names) {
        match table.column(name) {
            Some(idx) => *slot = idx,
            None => {
                debug!("skipping {rule}: column `{name}` not present");
                return None;
            }
        }
    }
    Some(out)
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

pub fn fill_owner_locations(table: &mut Table, lookups: &Lookups) -> usize {
    let Some([location, owner]) = columns(table, "owner locations", ["owner_location", "owner_code"]) else {
        return 0;
    };
    let mut changed = 0;
    for row in 0..table.len() {
        if table.get(row, location) != MISSING_OWNER_TOKEN {
            continue;
        }
        let value = lookups
            .owner_locations
            .get(table.get(row, owner).trim())
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LOCATION)
            .to_string();
        table.set(row, location, value);
        changed += 1;
    }
    changed
}

pub fn fill_draft_locations(table: &mut Table, seasons: &[i32], lookups: &Lookups) -> usize {
    let mut changed = 0;
    if let Some([party]) = columns(table, "draft party locations", ["draft_party_location"]) {
        for (row, season) in seasons.iter().enumerate() {
            if let Some(loc) = lookups.draft_locations.get(season) {
                if is_blank(table.get(row, party)) {
                    table.set(row, party, loc.draft_party.clone());
                    changed += 1;
                }
            }
        }
    }
    if let Some([hq]) = columns(table, "league HQ locations", ["league_hq_location"]) {
        for (row, season) in seasons.iter().enumerate() {
            if let Some(loc) = lookups.draft_locations.get(season) {
                if is_blank(table.get(row, hq)) {
                    table.set(row, hq, loc.league_hq.clone());
                    changed += 1;
                }
            }
        }
    }
    changed
}

/// Regular-season games per team.
pub fn games_for(season: i32) -> &'static str {
    if season <= 2010 {
        "13"
    } else {
        "14"
    }
}

pub fn entry_fee_for(season: i32) -> &'static str {
    if season <= 2004 {
        "$100.00"
    } else if season <= 2010 {
        "$125.00"
    } else if season <= 2018 {
        "$250.00"
    } else {
        "$500.00"
    }
}

/// (korm_active, korm_dues_usd)
pub fn korm_for(season: i32) -> (&'static str, &'static str) {
    if season <= 2010 {
        ("No", "$0.00")
    } else {
        ("Yes", "$100.00")
    }
}

const SEMIFINAL_WEEK: &str = "15";

pub fn fill_season_defaults(table: &mut Table, seasons: &[i32]) -> usize {
    let mut changed = 0;

    if let Some([gp]) = columns(table, "games played", ["rs_gp"]) {
        for (row, &season) in seasons.iter().enumerate() {
            if is_blank(table.get(row, gp)) {
                table.set(row, gp, games_for(season));
                changed += 1;
            }
        }
    }

    if let Some([fee]) = columns(table, "entry fees", ["entry_fee_usd"]) {
        for (row, &season) in seasons.iter().enumerate() {
            let current = table.get(row, fee).trim();
            if current.is_empty() || current == "$0.00" {
                table.set(row, fee, entry_fee_for(season));
                changed += 1;
            }
        }
    }

    if let Some([active]) = columns(table, "KORM participation", ["korm_active"]) {
        let dues = table.column("korm_dues_usd");
        for (row, &season) in seasons.iter().enumerate() {
            if !is_blank(table.get(row, active)) {
                continue;
            }
            let (is_active, amount) = korm_for(season);
            table.set(row, active, is_active);
            changed += 1;
            if let Some(dues) = dues {
                table.set(row, dues, amount);
                changed += 1;
            }
        }
    }

    if let Some([sf]) = columns(table, "semifinal week", ["sf_week"]) {
        for row in 0..seasons.len() {
            if is_blank(table.get(row, sf)) {
                table.set(row, sf, SEMIFINAL_WEEK);
                changed += 1;
            }
        }
    }

    if let Some([co_owned, co_owner]) = columns(table, "co-ownership", ["is_co_owned", "co-owner"]) {
        for row in 0..seasons.len() {
            if !is_blank(table.get(row, co_owned)) {
                continue;
            }
            let value = if is_blank(table.get(row, co_owner)) { "No" } else { "Yes" };
            table.set(row, co_owned, value);
            changed += 1;
        }
    }

    changed
}

/// Replace known placeholder tokens with their neutral values. Score
/// placeholders become `0.00`, which the score fill still treats as missing.
pub fn replace_placeholders(table: &mut Table) -> usize {
    let mut changed = 0;

    let score_cols: Vec<usize> = ["rs_proj_pf", "rs_proj_pa", COL_PF, COL_PA]
        .iter()
        .filter_map(|name| table.column(name))
        .collect();
    let rank_col = table.column("korm_finish_rank");
    let playoff_cols: Vec<usize> = PLAYOFF_SCORE_COLUMNS
        .iter()
        .filter_map(|name| table.column(name))
        .collect();

    for row in 0..table.len() {
        for &col in &score_cols {
            if table.get(row, col) == MISSING_SCORE_TOKEN {
                table.set(row, col, "0.00");
                changed += 1;
            }
        }
        if let Some(col) = rank_col {
            if table.get(row, col) == MISSING_AGENT_TOKEN {
                table.set(row, col, "0");
                changed += 1;
            }
        }
        for &col in &playoff_cols {
            if table.get(row, col) == AGENT_TOKEN {
                table.set(row, col, "");
                changed += 1;
            }
        }
    }
    changed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
