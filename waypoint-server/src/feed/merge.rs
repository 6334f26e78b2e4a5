use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use waypoint_types::ActivityItem;

/// Heap entry keyed by (created_at, source rank, position within
/// source). The heap is a max-heap on recency; ties break toward the
/// lower source rank, preserving the stable order of the contributing
/// sources.
struct HeapEntry {
    created_at: DateTime<Utc>,
    source: usize,
    pos: usize,
    item: ActivityItem,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.created_at == other.created_at
            && self.source == other.source
            && self.pos == other.pos
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Newest first; on equal timestamps the lower source rank and
        // then the earlier position within that source win the pop.
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| other.source.cmp(&self.source))
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

/// K-way merge of per-source sequences (each already sorted by
/// `created_at` descending), returning the window `[skip, skip+limit)`
/// of the combined reverse-chronological stream.
///
/// Every source must contribute at least its newest `skip + limit`
/// items (or all it has) for the window to be a correct cross-source
/// cut; the feed service fetches exactly that.
pub fn merge_page(
    sources: Vec<Vec<ActivityItem>>,
    skip: usize,
    limit: usize,
) -> Vec<ActivityItem> {
    let mut cursors: Vec<std::vec::IntoIter<ActivityItem>> =
        sources.into_iter().map(|s| s.into_iter()).collect();
    let mut positions = vec![0usize; cursors.len()];

    let mut heap = BinaryHeap::new();
    for (rank, cursor) in cursors.iter_mut().enumerate() {
        if let Some(item) = cursor.next() {
            heap.push(HeapEntry {
                created_at: item.created_at,
                source: rank,
                pos: positions[rank],
                item,
            });
        }
    }

    let mut page = Vec::with_capacity(limit.min(64));
    let mut skipped = 0usize;

    while let Some(entry) = heap.pop() {
        let rank = entry.source;

        if skipped < skip {
            skipped += 1;
        } else {
            page.push(entry.item);
            if page.len() == limit {
                break;
            }
        }

        if let Some(next) = cursors[rank].next() {
            positions[rank] += 1;
            heap.push(HeapEntry {
                created_at: next.created_at,
                source: rank,
                pos: positions[rank],
                item: next,
            });
        }
    }

    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;
    use waypoint_types::ActivityPayload;

    fn item(seconds: i64) -> ActivityItem {
        ActivityItem {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_username: "someone".to_string(),
            created_at: DateTime::from_timestamp(seconds, 0).unwrap(),
            payload: ActivityPayload::LocationCreated {
                name: format!("at {seconds}"),
                description: None,
            },
            social: None,
        }
    }

    fn timestamps(items: &[ActivityItem]) -> Vec<i64> {
        items.iter().map(|i| i.created_at.timestamp()).collect()
    }

    #[test]
    fn test_merges_interleaved_sources_newest_first() {
        let a = vec![item(50), item(30), item(10)];
        let b = vec![item(40), item(20)];
        let c = vec![item(60)];

        let merged = merge_page(vec![a, b, c], 0, 10);
        assert_eq!(timestamps(&merged), vec![60, 50, 40, 30, 20, 10]);
    }

    #[test]
    fn test_equal_timestamps_break_by_source_rank() {
        let a = vec![item(10)];
        let b = vec![item(10)];
        let a_id = a[0].id;
        let b_id = b[0].id;

        let merged = merge_page(vec![a, b], 0, 10);
        assert_eq!(merged[0].id, a_id);
        assert_eq!(merged[1].id, b_id);
    }

    #[test]
    fn test_skip_crosses_source_boundaries() {
        let a = vec![item(50), item(30)];
        let b = vec![item(40), item(20)];

        // Page 2 of size 2 is [30, 20] regardless of which source
        // contributed what to page 1.
        let merged = merge_page(vec![a, b], 2, 2);
        assert_eq!(timestamps(&merged), vec![30, 20]);
    }

    #[test]
    fn test_limit_truncates() {
        let a = vec![item(5), item(4), item(3)];
        let merged = merge_page(vec![a, vec![item(2)]], 0, 2);
        assert_eq!(timestamps(&merged), vec![5, 4]);
    }

    #[test]
    fn test_empty_sources_yield_empty_page() {
        let merged = merge_page(vec![Vec::new(), Vec::new(), Vec::new()], 0, 10);
        assert!(merged.is_empty());
    }

    proptest! {
        #[test]
        fn merged_output_is_time_descending(
            mut a in prop::collection::vec(0i64..1000, 0..20),
            mut b in prop::collection::vec(0i64..1000, 0..20),
            mut c in prop::collection::vec(0i64..1000, 0..20),
            skip in 0usize..10,
            limit in 1usize..15,
        ) {
            a.sort_unstable_by(|x, y| y.cmp(x));
            b.sort_unstable_by(|x, y| y.cmp(x));
            c.sort_unstable_by(|x, y| y.cmp(x));

            let sources = [a, b, c]
                .into_iter()
                .map(|ts| ts.into_iter().map(item).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            let total: usize = sources.iter().map(|s| s.len()).sum();

            let merged = merge_page(sources, skip, limit);

            prop_assert_eq!(merged.len(), limit.min(total.saturating_sub(skip)));
            for pair in merged.windows(2) {
                prop_assert!(pair[0].created_at >= pair[1].created_at);
            }
        }
    }
}
