// src/plan/chunk.rs

/// Split `items` into contiguous groups of at most `target_chunk_size`.
///
/// The number of groups is `ceil(n / target)`; each group then gets
/// `ceil(n / groups)` items so sizes come out as even as contiguous slicing
/// allows, with the remainder in the last group. Order is preserved and an
/// empty input gives no groups. A target of 0 is treated as 1.
pub fn partition<T: Clone>(items: &[T], target_chunk_size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let target = target_chunk_size.max(1);
    let num_chunks = items.len().div_ceil(target);
    let size_per_chunk = items.len().div_ceil(num_chunks);

    items.chunks(size_per_chunk).map(<[T]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("id{:04}", i)).collect()
    }

    #[test]
    fn seven_by_three() {
        let items: Vec<&str> = vec!["a", "b", "c", "d", "e", "f", "g"];
        let groups = partition(&items, 3);
        assert_eq!(groups, vec![vec!["a", "b", "c"], vec!["d", "e", "f"], vec!["g"]]);
    }

    #[test]
    fn empty_gives_no_groups() {
        let items: Vec<String> = Vec::new();
        assert!(partition(&items, 500).is_empty());
    }

    #[test]
    fn evens_out_instead_of_fixed_slices() {
        // fixed slices of 500 would give [500, 500, 1]
        let groups = partition(&letters(1001), 500);
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, [334, 334, 333]);
    }

    #[test]
    fn smaller_than_target_is_one_group() {
        let items = letters(3);
        assert_eq!(partition(&items, 500), vec![items.clone()]);
        assert_eq!(partition(&items, 3), vec![items]);
    }

    #[test]
    fn zero_target_behaves_like_one() {
        let groups = partition(&letters(3), 0);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.len() == 1));
    }

    #[test]
    fn completeness_count_and_balance() {
        for n in 1..=120 {
            let items = letters(n);
            for k in 1..=40 {
                let groups = partition(&items, k);

                assert_eq!(groups.len(), n.div_ceil(k), "count n={} k={}", n, k);

                let flat: Vec<String> = groups.concat();
                assert_eq!(flat, items, "concat n={} k={}", n, k);

                let size = n.div_ceil(groups.len());
                assert!(size <= k);
                let (last, rest) = groups.split_last().unwrap();
                assert!(rest.iter().all(|g| g.len() == size), "balance n={} k={}", n, k);
                assert!(!last.is_empty() && last.len() <= size);
            }
        }
    }
}
