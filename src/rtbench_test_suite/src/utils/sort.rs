/// Sort `v` in place. Insertion sort keeps the code size small, and the inputs
/// are short.
pub(crate) fn insertion_sort<T: Ord + Copy>(v: &mut [T]) {
    for i in 1..v.len() {
        let x = v[i];
        let mut j = i;
        while j > 0 && v[j - 1] > x {
            v[j] = v[j - 1];
            j -= 1;
        }
        v[j] = x;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn qc_insertion_sort(mut v: Vec<u32>) {
        let mut expected = v.clone();
        expected.sort();
        insertion_sort(&mut v);
        assert_eq!(v, expected);
    }
}
