//! Identifier normalization
//!
//! Maps between state postal abbreviations, 2-digit state FIPS codes and
//! state names, and cleans free-text county labels so name-keyed sources
//! can be joined against FIPS-keyed ones.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// (postal, fips, name) for the 50 states plus DC
const STATES: [(&str, &str, &str); 51] = [
    ("AL", "01", "Alabama"),
    ("AK", "02", "Alaska"),
    ("AZ", "04", "Arizona"),
    ("AR", "05", "Arkansas"),
    ("CA", "06", "California"),
    ("CO", "08", "Colorado"),
    ("CT", "09", "Connecticut"),
    ("DE", "10", "Delaware"),
    ("DC", "11", "District of Columbia"),
    ("FL", "12", "Florida"),
    ("GA", "13", "Georgia"),
    ("HI", "15", "Hawaii"),
    ("ID", "16", "Idaho"),
    ("IL", "17", "Illinois"),
    ("IN", "18", "Indiana"),
    ("IA", "19", "Iowa"),
    ("KS", "20", "Kansas"),
    ("KY", "21", "Kentucky"),
    ("LA", "22", "Louisiana"),
    ("ME", "23", "Maine"),
    ("MD", "24", "Maryland"),
    ("MA", "25", "Massachusetts"),
    ("MI", "26", "Michigan"),
    ("MN", "27", "Minnesota"),
    ("MS", "28", "Mississippi"),
    ("MO", "29", "Missouri"),
    ("MT", "30", "Montana"),
    ("NE", "31", "Nebraska"),
    ("NV", "32", "Nevada"),
    ("NH", "33", "New Hampshire"),
    ("NJ", "34", "New Jersey"),
    ("NM", "35", "New Mexico"),
    ("NY", "36", "New York"),
    ("NC", "37", "North Carolina"),
    ("ND", "38", "North Dakota"),
    ("OH", "39", "Ohio"),
    ("OK", "40", "Oklahoma"),
    ("OR", "41", "Oregon"),
    ("PA", "42", "Pennsylvania"),
    ("RI", "44", "Rhode Island"),
    ("SC", "45", "South Carolina"),
    ("SD", "46", "South Dakota"),
    ("TN", "47", "Tennessee"),
    ("TX", "48", "Texas"),
    ("UT", "49", "Utah"),
    ("VT", "50", "Vermont"),
    ("VA", "51", "Virginia"),
    ("WA", "53", "Washington"),
    ("WV", "54", "West Virginia"),
    ("WI", "55", "Wisconsin"),
    ("WY", "56", "Wyoming"),
];

/// Puerto Rico is served by the Census API but has no postal entry in the
/// region table; only the raw variable export requests it.
pub const PUERTO_RICO_FIPS: &str = "72";

const COUNTY_SUFFIX: &str = " County";
const COUNTY_QUALIFIER: &str = "(County)";

/// One U.S. state (or DC) processed as a unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// State postal abbreviation (external key)
    pub postal: String,
    /// 2-digit state FIPS code
    pub fips: String,
    /// Full state name
    pub name: String,
}

impl Region {
    /// Resolve a region from its postal abbreviation
    pub fn from_postal(postal: &str) -> Result<Self> {
        STATES
            .iter()
            .find(|(p, _, _)| *p == postal)
            .map(|(p, f, n)| Self {
                postal: p.to_string(),
                fips: f.to_string(),
                name: n.to_string(),
            })
            .ok_or_else(|| Error::UnknownRegion(postal.to_string()))
    }

    /// Every entry of the static table, in FIPS order
    pub fn all() -> Vec<Self> {
        let mut regions: Vec<Self> = STATES
            .iter()
            .map(|(p, f, n)| Self {
                postal: p.to_string(),
                fips: f.to_string(),
                name: n.to_string(),
            })
            .collect();
        regions.sort_by(|a, b| a.fips.cmp(&b.fips));
        regions
    }
}

/// Look up the 2-digit state FIPS code for a postal abbreviation
pub fn postal_to_fips(postal: &str) -> Result<&'static str> {
    STATES
        .iter()
        .find(|(p, _, _)| *p == postal)
        .map(|(_, f, _)| *f)
        .ok_or_else(|| Error::UnknownRegion(postal.to_string()))
}

/// Look up the 2-digit state FIPS code for a full state name
pub fn state_name_to_fips(name: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(_, _, n)| *n == name)
        .map(|(_, f, _)| *f)
}

/// Strip trailing `" County"` and `"(County)"` qualifiers
///
/// Suffixes are removed until none remain, so a doubled suffix collapses
/// in one call. Case and any other whitespace are left alone, so
/// `"Los Angeles county"` does not normalize. Idempotent.
pub fn normalize_county_name(raw: &str) -> String {
    let mut name = raw;
    loop {
        if let Some(stripped) = name.strip_suffix(COUNTY_QUALIFIER) {
            name = stripped.strip_suffix(' ').unwrap_or(stripped);
        } else if let Some(stripped) = name.strip_suffix(COUNTY_SUFFIX) {
            name = stripped;
        } else {
            break;
        }
    }
    name.to_string()
}

/// Split a `"County, State"` label into `(county, state)`
///
/// The county part has its `" County"` suffix removed; the state part is
/// the last comma-separated segment.
pub fn split_combined_name(label: &str) -> (String, String) {
    let first = label.split(", ").next().unwrap_or_default();
    let last = label.rsplit(", ").next().unwrap_or_default();
    (normalize_county_name(first), last.to_string())
}

/// Build the 5-digit county key from state and county codes
///
/// Accepts unpadded numeric strings (`"6"`, `"1"` → `"06001"`). Non-numeric
/// input is padded as text.
pub fn fips_key(state: &str, county: &str) -> String {
    let state = state.trim();
    let county = county.trim();
    format!("{:0>2}{:0>3}", state, county)
}
