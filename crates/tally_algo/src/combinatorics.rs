//! Combinatorial search utilities used to enumerate lot decision options.
//!
//! Both iterators yield in lexicographic order, so option numbering is stable
//! across runs for the same input.

/// Binomial coefficient `n choose k`; `None` on overflow.
pub fn binomial(n: u64, k: u64) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * (n - i) as u128 / (i + 1) as u128;
        if acc > u64::MAX as u128 {
            return None;
        }
    }
    Some(acc as u64)
}

/// All `k`-element index subsets of `0..n`, each sorted ascending.
#[derive(Clone, Debug)]
pub struct Combinations {
    n: usize,
    current: Option<Vec<usize>>,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        let current = (k <= n).then(|| (0..k).collect());
        Self { n, current }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let out = self.current.take()?;
        let k = out.len();
        let mut next = out.clone();
        // Rightmost index that can still move right.
        let mut i = k;
        while i > 0 {
            i -= 1;
            if next[i] != i + self.n - k {
                next[i] += 1;
                for j in i + 1..k {
                    next[j] = next[j - 1] + 1;
                }
                self.current = Some(next);
                return Some(out);
            }
        }
        Some(out)
    }
}

/// Distinct permutations of a multiset, starting from its sorted order.
#[derive(Clone, Debug)]
pub struct UniquePermutations<T> {
    current: Option<Vec<T>>,
}

impl<T: Ord + Clone> UniquePermutations<T> {
    pub fn new(mut items: Vec<T>) -> Self {
        items.sort();
        Self { current: Some(items) }
    }
}

impl<T: Ord + Clone> Iterator for UniquePermutations<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        let out = self.current.take()?;
        let mut next = out.clone();
        if next_permutation(&mut next) {
            self.current = Some(next);
        }
        Some(out)
    }
}

fn next_permutation<T: Ord>(xs: &mut [T]) -> bool {
    if xs.len() < 2 {
        return false;
    }
    let mut i = xs.len() - 1;
    while i > 0 && xs[i - 1] >= xs[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = xs.len() - 1;
    while xs[j] <= xs[i - 1] {
        j -= 1;
    }
    xs.swap(i - 1, j);
    xs[i..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_in_lexicographic_order() {
        let all: Vec<_> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![vec![0, 1], vec![0, 2], vec![0, 3], vec![1, 2], vec![1, 3], vec![2, 3]]
        );
        assert_eq!(Combinations::new(3, 0).collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
        assert_eq!(Combinations::new(2, 3).count(), 0);
    }

    #[test]
    fn combination_count_matches_binomial() {
        for n in 0..8u64 {
            for k in 0..=n {
                assert_eq!(
                    Combinations::new(n as usize, k as usize).count() as u64,
                    binomial(n, k).unwrap()
                );
            }
        }
        assert_eq!(binomial(3, 5), Some(0));
        assert_eq!(binomial(200, 100), None);
    }

    #[test]
    fn unique_permutations_skip_duplicates() {
        let all: Vec<_> = UniquePermutations::new(vec![1, 0, 1]).collect();
        assert_eq!(all, vec![vec![0, 1, 1], vec![1, 0, 1], vec![1, 1, 0]]);
        assert_eq!(UniquePermutations::new(Vec::<u8>::new()).count(), 1);
        assert_eq!(UniquePermutations::new(vec![0, 0, 1, 1]).count(), 6);
    }
}
