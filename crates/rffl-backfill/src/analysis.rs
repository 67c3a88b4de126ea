// PF/PA coverage report: which seasons are complete, what the observed league
// averages look like by era, and per-team historical averages.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::record::SeasonRecord;
use crate::scoring::era::Era;
use crate::scoring::index::ScoringIndex;
use crate::scoring::stats::{compute_sample_stats, score_stats, ERA_STDEV_FALLBACK, TEAM_STDEV_FALLBACK};

/// Seasons need this many complete teams to be summarized.
pub const SUMMARY_MIN_TEAMS: usize = 8;
/// A season below this share of complete rows is listed as incomplete.
pub const COMPLETE_SHARE: f64 = 0.8;
/// Teams need this many complete seasons to get a historical line.
pub const TEAM_MIN_SEASONS: usize = 3;

/// Pair reported for an era with no complete rows.
const EMPTY_ERA_MEAN: f64 = 1200.0;
const EMPTY_ERA_STDEV: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonSummary {
    pub season: i32,
    pub teams: usize,
    pub avg_pf: f64,
    pub avg_pa: f64,
    pub min_pf: f64,
    pub max_pf: f64,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteSeason {
    pub season: i32,
    pub complete: usize,
    pub total: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EraSummary {
    pub era: Era,
    /// Summarized seasons that fall in this era.
    pub seasons: usize,
    /// Mean of the summarized seasons' averages, when there are any.
    pub season_avg_pf: Option<f64>,
    pub season_avg_pa: Option<f64>,
    /// Pooled over every complete row in the era.
    pub avg_pf: f64,
    pub avg_pa: f64,
    pub std_pf: f64,
    pub std_pa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub team: String,
    pub seasons: usize,
    pub avg_pf: f64,
    pub avg_pa: f64,
    pub std_pf: f64,
    pub std_pa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub total_rows: usize,
    pub complete_rows: usize,
    pub seasons: Vec<SeasonSummary>,
    pub incomplete: Vec<IncompleteSeason>,
    pub eras: Vec<EraSummary>,
    pub teams: Vec<TeamSummary>,
}

pub fn analyze(records: &[SeasonRecord]) -> AnalysisReport {
    let index = ScoringIndex::build(records);

    let mut totals: BTreeMap<i32, usize> = BTreeMap::new();
    let mut missing: BTreeMap<i32, usize> = BTreeMap::new();
    for record in records {
        *totals.entry(record.season).or_default() += 1;
        if record.complete_scores().is_none() {
            *missing.entry(record.season).or_default() += 1;
        }
    }

    let seasons: Vec<SeasonSummary> = index
        .seasons()
        .into_iter()
        .filter_map(|season| {
            let stats = index.season_stats(season)?;
            if stats.pf.count < SUMMARY_MIN_TEAMS {
                return None;
            }
            let pf_values = index.season(season).iter().map(|e| e.pf);
            Some(SeasonSummary {
                season,
                teams: stats.pf.count,
                avg_pf: stats.pf.mean,
                avg_pa: stats.pa.mean,
                min_pf: pf_values.clone().fold(f64::INFINITY, f64::min),
                max_pf: pf_values.fold(f64::NEG_INFINITY, f64::max),
                missing: missing.get(&season).copied().unwrap_or(0),
            })
        })
        .collect();

    let incomplete = totals
        .iter()
        .filter_map(|(&season, &total)| {
            let complete = index.season(season).len();
            if (complete as f64) < total as f64 * COMPLETE_SHARE {
                Some(IncompleteSeason {
                    season,
                    complete,
                    total,
                    missing: total - complete,
                })
            } else {
                None
            }
        })
        .collect();

    let eras = Era::ALL
        .iter()
        .map(|&era| era_summary(era, &index, &seasons))
        .collect();

    let teams = index
        .teams()
        .into_iter()
        .filter_map(|team| {
            let stats = index.team_stats(team)?;
            if stats.pf.count < TEAM_MIN_SEASONS {
                return None;
            }
            Some(TeamSummary {
                team: team.to_string(),
                seasons: stats.pf.count,
                avg_pf: stats.pf.mean,
                avg_pa: stats.pa.mean,
                std_pf: stats.pf.stdev_or(TEAM_STDEV_FALLBACK),
                std_pa: stats.pa.stdev_or(TEAM_STDEV_FALLBACK),
            })
        })
        .collect();

    AnalysisReport {
        total_rows: records.len(),
        complete_rows: records.iter().filter(|r| r.complete_scores().is_some()).count(),
        seasons,
        incomplete,
        eras,
        teams,
    }
}

fn era_summary(era: Era, index: &ScoringIndex, seasons: &[SeasonSummary]) -> EraSummary {
    let in_era: Vec<&SeasonSummary> = seasons
        .iter()
        .filter(|s| Era::of_season(s.season) == era)
        .collect();
    let season_avg_pf = compute_sample_stats(&in_era.iter().map(|s| s.avg_pf).collect::<Vec<_>>());
    let season_avg_pa = compute_sample_stats(&in_era.iter().map(|s| s.avg_pa).collect::<Vec<_>>());

    let pooled: Vec<_> = index
        .seasons()
        .into_iter()
        .filter(|&s| Era::of_season(s) == era)
        .flat_map(|s| index.season(s).iter().cloned())
        .collect();

    let (avg_pf, avg_pa, std_pf, std_pa) = match score_stats(&pooled) {
        Some(stats) => (
            stats.pf.mean,
            stats.pa.mean,
            stats.pf.stdev_or(ERA_STDEV_FALLBACK),
            stats.pa.stdev_or(ERA_STDEV_FALLBACK),
        ),
        None => (EMPTY_ERA_MEAN, EMPTY_ERA_MEAN, EMPTY_ERA_STDEV, EMPTY_ERA_STDEV),
    };

    EraSummary {
        era,
        seasons: in_era.len(),
        season_avg_pf: season_avg_pf.map(|s| s.mean),
        season_avg_pa: season_avg_pa.map(|s| s.mean),
        avg_pf,
        avg_pa,
        std_pf,
        std_pa,
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== PF/PA Data Analysis by Season ===")?;
        writeln!(f)?;
        for s in &self.seasons {
            writeln!(f, "Season {} - Complete data for {} teams:", s.season, s.teams)?;
            writeln!(f, "  Average PF: {:.2}", s.avg_pf)?;
            writeln!(f, "  Average PA: {:.2}", s.avg_pa)?;
            writeln!(f, "  PF Range: {:.2} - {:.2}", s.min_pf, s.max_pf)?;
            writeln!(f, "  Missing entries: {}", s.missing)?;
            writeln!(f)?;
        }

        writeln!(f, "=== Seasons with Missing PF/PA Data ===")?;
        writeln!(f)?;
        for s in &self.incomplete {
            writeln!(
                f,
                "Season {}: {}/{} complete ({} missing)",
                s.season, s.complete, s.total, s.missing
            )?;
        }

        writeln!(f)?;
        writeln!(f, "=== Historical Trends for Data Filling ===")?;
        writeln!(f)?;
        for e in &self.eras {
            writeln!(f, "{}:", e.era)?;
            if let (Some(pf), Some(pa)) = (e.season_avg_pf, e.season_avg_pa) {
                writeln!(f, "  Average PF: {pf:.2}")?;
                writeln!(f, "  Average PA: {pa:.2}")?;
            }
            writeln!(
                f,
                "  All rows: PF={:.1} (sd {:.1}), PA={:.1} (sd {:.1})",
                e.avg_pf, e.std_pf, e.avg_pa, e.std_pa
            )?;
            writeln!(f)?;
        }

        writeln!(f, "=== Team Historical Averages ===")?;
        writeln!(f)?;
        for t in &self.teams {
            writeln!(
                f,
                "{}: {} seasons - Avg PF: {:.2}, Avg PA: {:.2}",
                t.team, t.seasons, t.avg_pf, t.avg_pa
            )?;
        }

        write!(
            f,
            "\n{} of {} rows have complete PF/PA data",
            self.complete_rows, self.total_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_records;
    use crate::table::Table;

    fn records(body: &str) -> Vec<SeasonRecord> {
        let csv_data = format!(
            "season_year,team_code,division_code,rs_wins,rs_losses,final_rank,rs_pf,rs_pa\n{body}"
        );
        parse_records(&Table::from_reader(csv_data.as_bytes()).unwrap()).unwrap()
    }

    /// `complete` rows with PF 1200, 1210, ... and `missing` rows, all in one season.
    fn season_rows(season: i32, complete: usize, missing: usize) -> String {
        let mut out = String::new();
        for i in 0..complete {
            out.push_str(&format!("{season},T{i},,7,6,3,{}.00,1250.00\n", 1200 + 10 * i));
        }
        for i in 0..missing {
            out.push_str(&format!("{season},M{i},,7,6,3,0.00,0.00\n"));
        }
        out
    }

    #[test]
    fn summarizes_seasons_with_eight_teams() {
        let body = format!("{}{}", season_rows(2012, 8, 2), season_rows(2013, 7, 0));
        let report = analyze(&records(body.trim_end()));

        assert_eq!(report.seasons.len(), 1);
        let s = &report.seasons[0];
        assert_eq!(s.season, 2012);
        assert_eq!(s.teams, 8);
        assert_eq!(s.missing, 2);
        assert!((s.avg_pf - 1235.0).abs() < 1e-9);
        assert_eq!((s.min_pf, s.max_pf), (1200.0, 1270.0));
        assert_eq!(report.total_rows, 17);
        assert_eq!(report.complete_rows, 15);
    }

    #[test]
    fn lists_incomplete_seasons() {
        let body = format!("{}{}", season_rows(2005, 3, 7), season_rows(2006, 8, 2));
        let report = analyze(&records(body.trim_end()));
        assert_eq!(
            report.incomplete,
            vec![IncompleteSeason {
                season: 2005,
                complete: 3,
                total: 10,
                missing: 7,
            }]
        );
    }

    #[test]
    fn empty_era_uses_defaults() {
        let report = analyze(&records(season_rows(2012, 1, 0).trim_end()));
        let early = &report.eras[0];
        assert_eq!(early.era, Era::Early);
        assert_eq!((early.avg_pf, early.std_pf), (1200.0, 100.0));
        assert_eq!(early.season_avg_pf, None);

        let middle = &report.eras[1];
        assert_eq!(middle.avg_pf, 1200.0);
        assert_eq!(middle.std_pf, ERA_STDEV_FALLBACK);
    }

    #[test]
    fn teams_need_three_seasons() {
        let report = analyze(&records(
            "\
2015,A,,7,6,3,1200.00,1100.00
2016,A,,7,6,3,1250.00,1100.00
2017,A,,7,6,3,1300.00,1100.00
2015,B,,7,6,3,1200.00,1100.00
2016,B,,7,6,3,1200.00,1100.00",
        ));
        assert_eq!(report.teams.len(), 1);
        let a = &report.teams[0];
        assert_eq!(a.team, "A");
        assert_eq!(a.seasons, 3);
        assert!((a.avg_pf - 1250.0).abs() < 1e-9);
        assert!((a.std_pf - 50.0).abs() < 1e-9);
        assert!(a.std_pa.abs() < 1e-9);
    }

    #[test]
    fn renders_text_and_json() {
        let report = analyze(&records(season_rows(2019, 8, 0).trim_end()));
        let text = report.to_string();
        assert!(text.contains("Season 2019 - Complete data for 8 teams:"));
        assert!(text.contains("Modern Era (2019+):"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["seasons"][0]["season"], 2019);
        assert_eq!(json["eras"][2]["era"], "modern");
    }
}
