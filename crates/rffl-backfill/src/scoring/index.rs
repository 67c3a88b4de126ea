// Lookup buckets of complete historical rows, keyed by season, team and division.

use std::collections::HashMap;

use crate::record::SeasonRecord;
use crate::scoring::stats::{score_stats, ScoreStats};

/// One row with both scores present and valid.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub season: i32,
    pub team: String,
    pub division: Option<String>,
    pub pf: f64,
    pub pa: f64,
}

impl ScoreEntry {
    pub fn new(season: i32, team: &str, division: Option<&str>, pf: f64, pa: f64) -> Self {
        ScoreEntry {
            season,
            team: team.to_string(),
            division: division.map(str::to_string),
            pf,
            pa,
        }
    }

    /// `None` unless the record is usable as historical evidence.
    pub fn from_record(record: &SeasonRecord) -> Option<Self> {
        let (pf, pa) = record.complete_scores()?;
        Some(ScoreEntry {
            season: record.season,
            team: record.team.clone(),
            division: record.division.clone(),
            pf,
            pa,
        })
    }
}

/// Complete rows bucketed three ways. Each bucket keeps table order.
#[derive(Debug, Clone, Default)]
pub struct ScoringIndex {
    by_season: HashMap<i32, Vec<ScoreEntry>>,
    by_team: HashMap<String, Vec<ScoreEntry>>,
    by_division: HashMap<String, Vec<ScoreEntry>>,
}

impl ScoringIndex {
    pub fn build(records: &[SeasonRecord]) -> Self {
        let mut index = ScoringIndex::default();
        for entry in records.iter().filter_map(ScoreEntry::from_record) {
            index.insert(entry);
        }
        index
    }

    pub fn insert(&mut self, entry: ScoreEntry) {
        if let Some(division) = &entry.division {
            self.by_division
                .entry(division.clone())
                .or_default()
                .push(entry.clone());
        }
        self.by_team
            .entry(entry.team.clone())
            .or_default()
            .push(entry.clone());
        self.by_season.entry(entry.season).or_default().push(entry);
    }

    pub fn season(&self, season: i32) -> &[ScoreEntry] {
        self.by_season.get(&season).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn team(&self, team: &str) -> &[ScoreEntry] {
        self.by_team.get(team).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn division(&self, division: &str) -> &[ScoreEntry] {
        self.by_division
            .get(division)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn season_stats(&self, season: i32) -> Option<ScoreStats> {
        score_stats(self.season(season))
    }

    pub fn team_stats(&self, team: &str) -> Option<ScoreStats> {
        score_stats(self.team(team))
    }

    pub fn division_stats(&self, division: &str) -> Option<ScoreStats> {
        score_stats(self.division(division))
    }

    pub fn season_count(&self) -> usize {
        self.by_season.len()
    }

    pub fn team_count(&self) -> usize {
        self.by_team.len()
    }

    /// Seasons with at least one complete row, ascending.
    pub fn seasons(&self) -> Vec<i32> {
        let mut seasons: Vec<i32> = self.by_season.keys().copied().collect();
        seasons.sort_unstable();
        seasons
    }

    /// Teams with at least one complete row, sorted by code.
    pub fn teams(&self) -> Vec<&str> {
        let mut teams: Vec<&str> = self.by_team.keys().map(String::as_str).collect();
        teams.sort_unstable();
        teams
    }
}
