use std::cmp::Ordering;

use crate::entry::{Entry, FileResult};

/// The three progressively more expensive comparison keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Size,
    PartialChecksum,
    FullChecksum,
}

/// Result of comparing two records: the total order between them, plus the
/// tier (if any) each side still needs resolved before the order between
/// them stops depending on paths alone.
///
/// The comparison itself is pure. Whether the `needs` flags turn into
/// scheduled work is the caller's decision — only the insertion path acts
/// on them; lookups and removals evaluate the same order with no side
/// effects.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryOrdering {
    pub ordering: Ordering,
    pub lhs_needs: Option<Tier>,
    pub rhs_needs: Option<Tier>,
}

/// Compare two records tier by tier: size, partial checksum, full
/// checksum, then path ascending as the final tie-breaker.
pub(crate) fn compare_entries(lhs: &Entry, rhs: &Entry) -> EntryOrdering {
    let (ordering, l, r) = compare_tier(&lhs.size, &rhs.size, &lhs.path, &rhs.path);
    if ordering != Ordering::Equal {
        return decisive(ordering, l, r, Tier::Size);
    }

    let (ordering, l, r) = compare_tier(
        &lhs.partial_checksum,
        &rhs.partial_checksum,
        &lhs.path,
        &rhs.path,
    );
    if ordering != Ordering::Equal {
        return decisive(ordering, l, r, Tier::PartialChecksum);
    }

    let (ordering, l, r) = compare_tier(
        &lhs.full_checksum,
        &rhs.full_checksum,
        &lhs.path,
        &rhs.path,
    );
    if ordering != Ordering::Equal {
        return decisive(ordering, l, r, Tier::FullChecksum);
    }

    EntryOrdering {
        ordering: lhs.path.cmp(&rhs.path),
        lhs_needs: None,
        rhs_needs: None,
    }
}

fn decisive(ordering: Ordering, lhs_needs: bool, rhs_needs: bool, tier: Tier) -> EntryOrdering {
    EntryOrdering {
        ordering,
        lhs_needs: lhs_needs.then_some(tier),
        rhs_needs: rhs_needs.then_some(tier),
    }
}

/// One tier of the cascade. Within a tier: resolved values sort first
/// (larger values before smaller), then unresolved/in-progress by path,
/// then failed by path. `Equal` is only returned for two resolved equal
/// values, which sends the cascade to the next tier.
fn compare_tier<T: Ord>(
    lhs: &FileResult<T>,
    rhs: &FileResult<T>,
    lhs_path: &str,
    rhs_path: &str,
) -> (Ordering, bool, bool) {
    use FileResult::*;
    match (lhs, rhs) {
        (Failed(_), Failed(_)) => (lhs_path.cmp(rhs_path), false, false),
        (Failed(_), _) => (Ordering::Greater, false, false),
        (_, Failed(_)) => (Ordering::Less, false, false),
        (Resolved(a), Resolved(b)) => (b.cmp(a), false, false),
        (Resolved(_), _) => (Ordering::Less, false, true),
        (_, Resolved(_)) => (Ordering::Greater, true, false),
        _ => (lhs_path.cmp(rhs_path), true, true),
    }
}
