// League scoring eras.

use serde::Serialize;
use std::fmt;

/// Fixed PF/PA baseline for a season, stepped by scoring era.
///
/// | season through | baseline |
/// |---|---|
/// | 2004 | 1100 |
/// | 2010 | 1200 |
/// | 2014 | 1250 |
/// | 2018 | 1300 |
/// | 2021 | 1350 |
/// | later | 1400 |
pub fn era_baseline(season: i32) -> (f64, f64) {
    let baseline = if season <= 2004 {
        1100.0
    } else if season <= 2010 {
        1200.0
    } else if season <= 2014 {
        1250.0
    } else if season <= 2018 {
        1300.0
    } else if season <= 2021 {
        1350.0
    } else {
        1400.0
    };
    (baseline, baseline)
}

/// Coarse eras used when reporting observed league averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Era {
    /// Through 2010.
    Early,
    /// 2011 through 2018.
    Middle,
    /// 2019 onward.
    Modern,
}

impl Era {
    pub const ALL: [Era; 3] = [Era::Early, Era::Middle, Era::Modern];

    pub fn of_season(season: i32) -> Self {
        if season <= 2010 {
            Era::Early
        } else if season <= 2018 {
            Era::Middle
        } else {
            Era::Modern
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Era::Early => "Early Era (2002-2010)",
            Era::Middle => "Middle Era (2011-2018)",
            Era::Modern => "Modern Era (2019+)",
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
