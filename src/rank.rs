//! Score normalization and ranking.

use crate::config::SortOrder;
use crate::record::Record;

/// Reduce a raw keyword match count to a single decimal digit.
pub fn normalize_score(raw_match_count: usize) -> u8 {
    (raw_match_count % 10) as u8
}

/// Stable sort by priority score. Records with equal scores keep their
/// provider order.
pub fn rank(mut records: Vec<Record>, order: SortOrder) -> Vec<Record> {
    match order {
        SortOrder::Descending => records.sort_by(|a, b| b.priority_score.cmp(&a.priority_score)),
        SortOrder::Ascending => records.sort_by_key(|r| r.priority_score),
    }
    records
}
