use super::domain::{Charity, CharityFlags};

/// Number of missing data points on a record, 0 (complete) to 5.
pub fn deficiency_count(flags: &CharityFlags) -> u8 {
    flags.as_array().iter().filter(|missing| **missing).count() as u8
}

/// Most complete records first. `sort_by_key` is stable, so ties keep their incoming order.
pub fn rank_by_completeness(charities: &mut [Charity]) {
    charities.sort_by_key(|charity| deficiency_count(&charity.flags));
}
