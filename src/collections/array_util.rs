//! Search helpers for sorted `i64` arrays backing huge array lookups.

/// Utility for optimized array operations on sorted `i64` slices.
pub struct ArrayUtil;

impl ArrayUtil {
    const LINEAR_SEARCH_LIMIT: usize = 64;

    /// Binary search with exact index return, falling back to a linear scan
    /// once the range shrinks below [`Self::LINEAR_SEARCH_LIMIT`].
    ///
    /// Returns the index of `key` if found, otherwise `-(insertion_point + 1)`.
    pub fn binary_search_index(arr: &[i64], length: usize, key: i64) -> isize {
        let mut low = 0;
        let mut high = length.wrapping_sub(1);

        while high.wrapping_sub(low) > Self::LINEAR_SEARCH_LIMIT {
            let mid = (low + high) / 2;
            let mid_val = arr[mid];

            if mid_val < key {
                low = mid + 1;
            } else if mid_val > key {
                high = mid.wrapping_sub(1);
            } else {
                return mid as isize;
            }
        }

        Self::linear_search_index(arr, low, high, key)
    }

    fn linear_search_index(arr: &[i64], low: usize, high: usize, key: i64) -> isize {
        if low >= arr.len() || high >= arr.len() {
            return -((high.wrapping_add(1)) as isize) - 1;
        }

        for (offset, &value) in arr.iter().skip(low).take(high - low + 1).enumerate() {
            let i = low + offset;
            if value == key {
                return i as isize;
            }
            if value > key {
                return -((i as isize) + 1);
            }
        }
        -((high as isize) + 1) - 1
    }

    /// Binary search for an insertion point in a sorted array, returning the
    /// index where `ids[idx] <= id < ids[idx + 1]`, or `-1` if `id` is
    /// smaller than every element.
    pub fn binary_lookup(id: i64, ids: &[i64]) -> isize {
        let length = ids.len();
        let mut low = 0isize;
        let mut high = length as isize - 1;

        while low <= high {
            let mid = ((low + high) / 2) as usize;
            let mid_val = ids[mid];

            if mid_val < id {
                low = mid as isize + 1;
            } else if mid_val > id {
                high = mid as isize - 1;
            } else {
                return mid as isize;
            }
        }
        low - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_search_index_finds_exact_match() {
        let arr = vec![1, 3, 5, 7, 9];
        assert_eq!(ArrayUtil::binary_search_index(&arr, arr.len(), 5), 2);
    }

    #[test]
    fn binary_search_index_reports_insertion_point_when_missing() {
        let arr = vec![1, 3, 5, 7, 9];
        let idx = ArrayUtil::binary_search_index(&arr, arr.len(), 6);
        assert!(idx < 0);
    }

    #[test]
    fn binary_lookup_finds_bucket() {
        let buckets = vec![0, 10, 20, 30, 40];
        assert_eq!(ArrayUtil::binary_lookup(15, &buckets), 1);
        assert_eq!(ArrayUtil::binary_lookup(30, &buckets), 3);
        assert_eq!(ArrayUtil::binary_lookup(-5, &buckets), -1);
    }
}
