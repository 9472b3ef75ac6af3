//! Historical wage caps.
//!
//! The insurable daily wage has always been bounded by a multiple of
//! the general minimum wage: 10 times until June 1997, 20 times until
//! June 2007 and 25 times since.  [`WageCapTable`] maps a calendar year
//! to one daily cap, so each year uses the multiple in force on
//! January 1: days from July to December of 1997 and of 2007 are capped
//! with the lower, older multiple.  The table is plain data,
//! so it can be replaced per test or per jurisdiction update by loading
//! a JSON file instead of the built-in values.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// General minimum wage per year (resto del país), in pesos per day.
const MINIMUM_WAGES: &[(i32, f64)] = &[
    (1987, 3.05),
    (1988, 7.77),
    (1989, 8.64),
    (1990, 11.90),
    (1991, 13.33),
    (1992, 13.33),
    (1993, 14.27),
    (1994, 15.27),
    (1995, 16.34),
    (1996, 22.60),
    (1997, 26.45),
    (1998, 30.20),
    (1999, 34.45),
    (2000, 37.90),
    (2001, 40.35),
    (2002, 42.15),
    (2003, 43.65),
    (2004, 45.24),
    (2005, 46.80),
    (2006, 48.67),
    (2007, 50.57),
    (2008, 52.59),
    (2009, 54.80),
    (2010, 57.46),
    (2011, 59.82),
    (2012, 62.33),
    (2013, 64.76),
    (2014, 67.29),
    (2015, 70.10),
    (2016, 73.04),
    (2017, 80.04),
    (2018, 88.36),
    (2019, 102.68),
    (2020, 123.22),
    (2021, 141.70),
    (2022, 172.87),
    (2023, 207.44),
    (2024, 248.93),
    (2025, 278.80),
];

/// Minimum-wage multiple in force on January 1 of `year`.
fn cap_multiple(year: i32) -> f64 {
    match year {
        ..=1997 => 10.0,
        1998..=2007 => 20.0,
        _ => 25.0,
    }
}

/// On-disk shape of a cap table: `{"caps": {"1990": 119.0, ...}}`.
#[derive(Debug, Deserialize)]
struct CapTableFile {
    caps: BTreeMap<i32, f64>,
}

/// Read-only mapping from year to maximum insurable daily wage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WageCapTable {
    caps: BTreeMap<i32, f64>,
}

impl WageCapTable {
    /// Build a table from explicit values.  Every cap must be positive
    /// and the table must not be empty.
    pub fn new(caps: BTreeMap<i32, f64>) -> Result<Self, ConfigError> {
        if caps.is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        if let Some((&year, &value)) = caps.iter().find(|(_, v)| !(v.is_finite() && **v > 0.0)) {
            return Err(ConfigError::InvalidCap { year, value });
        }
        Ok(Self { caps })
    }

    /// The built-in table derived from historical minimum wages.
    pub fn historical() -> Self {
        let caps = MINIMUM_WAGES
            .iter()
            .map(|&(year, wage)| (year, wage * cap_multiple(year)))
            .collect();
        Self { caps }
    }

    /// Parse a table from its JSON representation.
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let file: CapTableFile = serde_json::from_str(data)?;
        Self::new(file.caps)
    }

    /// Load a table from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    /// Daily cap for `year`.  Years missing from the table take the
    /// nearest earlier year; years before the table take its first
    /// entry.
    pub fn cap_for_year(&self, year: i32) -> f64 {
        self.caps
            .range(..=year)
            .next_back()
            .or_else(|| self.caps.iter().next())
            .map_or(f64::INFINITY, |(_, cap)| *cap)
    }

    /// Apply the cap of `year` to `wage`.  Returns the adjusted wage
    /// together with the cap that was consulted.
    pub fn apply(&self, wage: f64, year: i32) -> (f64, f64) {
        let cap = self.cap_for_year(year);
        (wage.min(cap), cap)
    }

    pub fn first_year(&self) -> Option<i32> {
        self.caps.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.caps.keys().next_back().copied()
    }
}

impl Default for WageCapTable {
    fn default() -> Self {
        Self::historical()
    }
}
