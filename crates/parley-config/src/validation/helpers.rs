//! Shared range-validation helpers used by all section validators.

use std::ops::RangeInclusive;

/// Push an error if `value` is outside `range`. NaN is always out of range.
pub(crate) fn validate_range<T>(
    errors: &mut Vec<String>,
    name: &str,
    value: T,
    range: RangeInclusive<T>,
) where
    T: PartialOrd + std::fmt::Display,
{
    if !range.contains(&value) {
        errors.push(format!(
            "{name} = {value} is out of range [{}, {}]",
            range.start(),
            range.end()
        ));
    }
}
