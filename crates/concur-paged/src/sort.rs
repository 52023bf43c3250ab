//! Single-threaded bottom-up indirect merge sort over a huge paged array.

use crate::paged_array::HugePagedArray;

/// Sorts the permutation array `a` in place so that `(value_fn(a.get(0)),
/// …, value_fn(a.get(size - 1)))` is non-decreasing.
///
/// Bottom-up: each pass merges adjacent internally-sorted runs of length
/// `run` into runs of length `2 * run`, using an auxiliary paged array as
/// scratch space. Ties break by taking the left element first, so equal
/// keys keep their relative input order (stability).
///
/// Deliberately single-threaded: the algorithm is memory-bound and
/// parallelising merges over overlapping paged buffers was found not to
/// pay for its own complexity.
pub fn indirect_merge_sort<F>(a: &mut HugePagedArray, value_fn: F)
where
    F: Fn(i64) -> i64,
{
    let size = a.size();
    if size < 2 {
        return;
    }

    let mut aux = HugePagedArray::new(size, a.page_shift());
    let mut run: u64 = 1;

    while run < size {
        let mut start = 0;
        while start < size {
            let mid = (start + run).min(size);
            let end = (start + 2 * run).min(size);

            if mid >= end {
                // No right run for this block; already sorted from the
                // previous pass, leave it untouched.
                start += 2 * run;
                continue;
            }

            merge(a, &mut aux, &value_fn, start, mid, end);
            for i in start..end {
                a.set(i, aux.get(i));
            }
            start += 2 * run;
        }
        run *= 2;
    }
}

fn merge<F>(a: &HugePagedArray, aux: &mut HugePagedArray, value_fn: &F, start: u64, mid: u64, end: u64)
where
    F: Fn(i64) -> i64,
{
    let mut left = start;
    let mut right = mid;
    let mut out = start;

    while left < mid && right < end {
        let left_value = a.get(left);
        let right_value = a.get(right);
        if value_fn(left_value) <= value_fn(right_value) {
            aux.set(out, left_value);
            left += 1;
        } else {
            aux.set(out, right_value);
            right += 1;
        }
        out += 1;
    }
    while left < mid {
        aux.set(out, a.get(left));
        left += 1;
        out += 1;
    }
    while right < end {
        aux.set(out, a.get(right));
        right += 1;
        out += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_array(values: &[i64]) -> HugePagedArray {
        let mut array = HugePagedArray::new(values.len() as u64, 2);
        for (i, value) in values.iter().enumerate() {
            array.set(i as u64, *value);
        }
        array
    }

    fn to_vec(array: &HugePagedArray) -> Vec<i64> {
        (0..array.size()).map(|i| array.get(i)).collect()
    }

    #[test]
    fn sorts_an_unordered_array() {
        let mut array = identity_array(&[5, 3, 8, 1, 9, 2, 7, 4, 6, 0]);
        indirect_merge_sort(&mut array, |v| v);
        assert_eq!(to_vec(&array), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn handles_sizes_not_a_power_of_two() {
        let mut array = identity_array(&[9, 8, 7, 6, 5, 4, 3]);
        indirect_merge_sort(&mut array, |v| v);
        assert_eq!(to_vec(&array), vec![3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn sorts_by_an_indirect_value_function() {
        // Permutation array holding indices into an external key table.
        let keys = [30, 10, 20];
        let mut array = identity_array(&[0, 1, 2]);
        indirect_merge_sort(&mut array, |i| keys[i as usize]);
        assert_eq!(to_vec(&array), vec![1, 2, 0]); // keys 10, 20, 30
    }

    #[test]
    fn ties_keep_their_original_relative_order() {
        // Indices 0 and 2 share a key; index 0 must stay before index 2.
        let keys = [1, 0, 1];
        let mut array = identity_array(&[0, 1, 2]);
        indirect_merge_sort(&mut array, |i| keys[i as usize]);
        assert_eq!(to_vec(&array), vec![1, 0, 2]);
    }

    #[test]
    fn already_sorted_array_is_left_alone() {
        let mut array = identity_array(&[0, 1, 2, 3, 4]);
        indirect_merge_sort(&mut array, |v| v);
        assert_eq!(to_vec(&array), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn single_and_empty_arrays_are_no_ops() {
        let mut single = identity_array(&[42]);
        indirect_merge_sort(&mut single, |v| v);
        assert_eq!(to_vec(&single), vec![42]);

        let mut empty = identity_array(&[]);
        indirect_merge_sort(&mut empty, |v| v);
        assert_eq!(to_vec(&empty), Vec::<i64>::new());
    }
}
