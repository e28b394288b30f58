//! Season derivation.
//!
//! The season is fixed for the lifetime of the master process: it is computed
//! once at startup from the local calendar month (or taken from configuration)
//! and never re-evaluated mid-run.

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Heating season or cooling season.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Season {
    Winter,
    Summer,
}

impl Season {
    /// Season for a calendar month (1 = January). September through February
    /// is winter, everything else is summer.
    pub fn from_month(month: u32) -> Self {
        match month {
            9..=12 | 1 | 2 => Season::Winter,
            _ => Season::Summer,
        }
    }

    /// Season for the current local date.
    pub fn current() -> Self {
        Self::from_month(Local::now().month())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winter_months() {
        for month in [9, 10, 11, 12, 1, 2] {
            assert_eq!(Season::from_month(month), Season::Winter, "month {month}");
        }
    }

    #[test]
    fn test_summer_months() {
        for month in 3..=8 {
            assert_eq!(Season::from_month(month), Season::Summer, "month {month}");
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Winter".parse::<Season>().unwrap(), Season::Winter);
        assert_eq!("summer".parse::<Season>().unwrap(), Season::Summer);
        assert!("autumn".parse::<Season>().is_err());
    }
}
