use crate::constants::{FORECAST_FIRST_YEAR, HINDCAST_FIRST_YEAR, HINDCAST_LAST_YEAR};
use crate::error::{Result, Seas5Error};
use std::ops::RangeInclusive;

/// Working range of initialisation years given a requested range and which
/// archives (hindcast 1981-2016, forecast 2017-present) are wanted.
///
/// `range = None` selects everything from 1981 to `this_year`. The result
/// spans the lowest to the highest available year.
pub fn resolve_years(
    range: Option<(i32, i32)>,
    hindcast: bool,
    forecast: bool,
    this_year: i32,
) -> Result<RangeInclusive<i32>> {
    let (start, end) = range.unwrap_or((HINDCAST_FIRST_YEAR, this_year));

    let mut lo = i32::MAX;
    let mut hi = i32::MIN;
    let mut include = |first: i32, last: i32| {
        let a = start.max(first);
        let b = end.min(last);
        if a <= b {
            lo = lo.min(a);
            hi = hi.max(b);
        }
    };
    if hindcast {
        include(HINDCAST_FIRST_YEAR, HINDCAST_LAST_YEAR);
    }
    if forecast {
        include(FORECAST_FIRST_YEAR, this_year);
    }

    if lo > hi {
        return Err(Seas5Error::EmptyYearRange {
            start: range.map(|r| r.0),
            end: range.map(|r| r.1),
            hindcast,
            forecast,
        });
    }
    Ok(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_forecast_only() {
        let years = resolve_years(None, false, true, 2024).unwrap();
        assert_eq!(years, 2017..=2024);
    }

    #[test]
    fn test_default_hindcast_only() {
        let years = resolve_years(None, true, false, 2024).unwrap();
        assert_eq!(years, 1981..=2016);
    }

    #[test]
    fn test_both_archives_span_full_record() {
        let years = resolve_years(Some((2010, 2020)), true, true, 2024).unwrap();
        assert_eq!(years, 2010..=2020);
    }

    #[test]
    fn test_range_clipped_to_availability() {
        let years = resolve_years(Some((2010, 2030)), false, true, 2024).unwrap();
        assert_eq!(years, 2017..=2024);
        let years = resolve_years(Some((1970, 1990)), true, true, 2024).unwrap();
        assert_eq!(years, 1981..=1990);
    }

    #[test]
    fn test_single_year() {
        let years = resolve_years(Some((2023, 2023)), false, true, 2024).unwrap();
        assert_eq!(years, 2023..=2023);
    }

    #[test]
    fn test_empty_selection_is_an_error() {
        assert!(matches!(
            resolve_years(Some((2000, 2005)), false, true, 2024),
            Err(Seas5Error::EmptyYearRange { .. })
        ));
        assert!(resolve_years(None, false, false, 2024).is_err());
    }
}
