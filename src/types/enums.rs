//! Closed catalogs of protocol tokens: climate models, projection scenarios,
//! normals periods, months and weather variables.

use std::fmt;

/// Climate model driving the simulation on the server end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClimateModel {
    /// Hadley climate model.
    Hadley,
    /// RCM 4 climate model, the server default.
    Rcm4,
    /// GCM 4 climate model.
    Gcm4,
}

impl ClimateModel {
    pub(crate) fn token(&self) -> &'static str {
        match self {
            ClimateModel::Hadley => "Hadley",
            ClimateModel::Rcm4 => "RCM4",
            ClimateModel::Gcm4 => "GCM4",
        }
    }
}

impl fmt::Display for ClimateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Representative concentration pathway (climate-projection scenario).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rcp {
    /// RCP 4.5, the server default.
    Rcp45,
    /// RCP 8.5.
    Rcp85,
}

impl Rcp {
    pub(crate) fn token(&self) -> &'static str {
        match self {
            Rcp::Rcp45 => "4_5",
            Rcp::Rcp85 => "8_5",
        }
    }
}

/// A calendar month. February always counts 28 days; the normals tables the
/// server produces are non-leap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    /// All twelve months in calendar order.
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// 1-based month number as it appears in the `Month` column of a reply.
    pub fn number(&self) -> i64 {
        Month::ALL
            .iter()
            .position(|m| m == self)
            .map(|p| p as i64 + 1)
            .unwrap_or(0)
    }

    pub fn from_number(number: i64) -> Option<Month> {
        if (1..=12).contains(&number) {
            Some(Month::ALL[(number - 1) as usize])
        } else {
            None
        }
    }

    /// Days in this month, non-leap.
    pub fn days(&self) -> u32 {
        match self {
            Month::January => 31,
            Month::February => 28,
            Month::March => 31,
            Month::April => 30,
            Month::May => 31,
            Month::June => 30,
            Month::July => 31,
            Month::August => 31,
            Month::September => 30,
            Month::October => 31,
            Month::November => 30,
            Month::December => 31,
        }
    }
}

/// The 30-year period covered by a set of normals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Normals1951_1980,
    Normals1961_1990,
    Normals1971_2000,
    Normals1981_2010,
    Normals1991_2020,
    Normals2001_2030,
    Normals2011_2040,
    Normals2021_2050,
    Normals2031_2060,
    Normals2041_2070,
    Normals2051_2080,
    Normals2061_2090,
    Normals2071_2100,
}

impl Period {
    pub(crate) fn token(&self) -> &'static str {
        match self {
            Period::Normals1951_1980 => "1951_1980",
            Period::Normals1961_1990 => "1961_1990",
            Period::Normals1971_2000 => "1971_2000",
            Period::Normals1981_2010 => "1981_2010",
            Period::Normals1991_2020 => "1991_2020",
            Period::Normals2001_2030 => "2001_2030",
            Period::Normals2011_2040 => "2011_2040",
            Period::Normals2021_2050 => "2021_2050",
            Period::Normals2031_2060 => "2031_2060",
            Period::Normals2041_2070 => "2041_2070",
            Period::Normals2051_2080 => "2051_2080",
            Period::Normals2061_2090 => "2061_2090",
            Period::Normals2071_2100 => "2071_2100",
        }
    }
}

/// A weather variable the service can report. Each variable maps to a
/// protocol field name (absent for variables the normals endpoint never
/// returns) and carries an additive flag: additive quantities are summed
/// over time while the others are day-weighted averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Minimum air temperature.
    Tn,
    /// Air temperature.
    T,
    /// Maximum air temperature.
    Tx,
    /// Precipitation.
    P,
    /// Dew point temperature.
    Td,
    /// Humidity.
    H,
    /// Wind speed.
    Ws,
    /// Wind direction.
    Wd,
    /// Solar radiation.
    R,
    /// Atmospheric pressure.
    Z,
    /// Snow precipitation.
    S,
    /// Snow depth accumulation.
    Sd,
    /// Snow water equivalent.
    Swe,
    /// Wind speed at 2 m.
    Ws2,
}

impl Variable {
    pub const ALL: [Variable; 14] = [
        Variable::Tn,
        Variable::T,
        Variable::Tx,
        Variable::P,
        Variable::Td,
        Variable::H,
        Variable::Ws,
        Variable::Wd,
        Variable::R,
        Variable::Z,
        Variable::S,
        Variable::Sd,
        Variable::Swe,
        Variable::Ws2,
    ];

    /// The three variables present in every normals reply.
    pub const NORMALS: [Variable; 3] = [Variable::Tn, Variable::Tx, Variable::P];

    /// Short protocol name, used as the column name of aggregated tables.
    pub fn name(&self) -> &'static str {
        match self {
            Variable::Tn => "TN",
            Variable::T => "T",
            Variable::Tx => "TX",
            Variable::P => "P",
            Variable::Td => "TD",
            Variable::H => "H",
            Variable::Ws => "WS",
            Variable::Wd => "WD",
            Variable::R => "R",
            Variable::Z => "Z",
            Variable::S => "S",
            Variable::Sd => "SD",
            Variable::Swe => "SWE",
            Variable::Ws2 => "WS2",
        }
    }

    /// Field name in the wire format, when the variable has one.
    pub fn field_name(&self) -> Option<&'static str> {
        match self {
            Variable::Tn => Some("TMIN_MN"),
            Variable::Tx => Some("TMAX_MN"),
            Variable::P => Some("PRCP_TT"),
            Variable::Td => Some("TDEX_MN"),
            _ => None,
        }
    }

    /// True if the variable is summed over time (e.g. precipitation) rather
    /// than averaged.
    pub fn is_additive(&self) -> bool {
        matches!(self, Variable::P | Variable::R | Variable::S | Variable::Swe)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Variable::Tn => "min air temperature",
            Variable::T => "air temperature",
            Variable::Tx => "max air temperature",
            Variable::P => "precipitation",
            Variable::Td => "temperature dew point",
            Variable::H => "humidity",
            Variable::Ws => "wind speed",
            Variable::Wd => "wind direction",
            Variable::R => "solar radiation",
            Variable::Z => "atmospheric pressure",
            Variable::S => "snow precipitation",
            Variable::Sd => "snow depth accumulation",
            Variable::Swe => "snow water equivalent",
            Variable::Ws2 => "wind speed at 2 m",
        }
    }

    /// Wire field names of the normals variables, in catalog order.
    pub(crate) fn normals_field_names() -> Vec<&'static str> {
        Variable::NORMALS
            .iter()
            .filter_map(|v| v.field_name())
            .collect()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_numbers_round_trip() {
        for m in Month::ALL {
            assert_eq!(Month::from_number(m.number()), Some(m));
        }
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
    }

    #[test]
    fn days_sum_to_non_leap_year() {
        let total: u32 = Month::ALL.iter().map(|m| m.days()).sum();
        assert_eq!(total, 365);
    }

    #[test]
    fn normals_variables_have_field_names() {
        assert_eq!(
            Variable::normals_field_names(),
            vec!["TMIN_MN", "TMAX_MN", "PRCP_TT"]
        );
    }

    #[test]
    fn additive_flags() {
        assert!(Variable::P.is_additive());
        assert!(!Variable::Tn.is_additive());
        assert!(!Variable::Tx.is_additive());
    }

    #[test]
    fn tokens() {
        assert_eq!(Rcp::Rcp45.token(), "4_5");
        assert_eq!(Rcp::Rcp85.token(), "8_5");
        assert_eq!(Period::Normals1981_2010.token(), "1981_2010");
        assert_eq!(ClimateModel::Rcm4.token(), "RCM4");
    }
}
