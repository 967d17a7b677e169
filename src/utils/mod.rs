//! Combinatorics and naming helpers shared by the generators and the analysis.

/// All `k`-element index subsets of `0..n` in lexicographic order.
///
/// # Examples
///
/// ```
/// use expdesign::utils::combinations;
///
/// assert_eq!(combinations(3, 2), vec![vec![0, 1], vec![0, 2], vec![1, 2]]);
/// assert!(combinations(2, 3).is_empty());
/// ```
#[must_use]
pub fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        result.push(current.clone());

        // rightmost index that can still move
        let Some(i) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            return result;
        };
        current[i] += 1;
        for j in i + 1..k {
            current[j] = current[j - 1] + 1;
        }
    }
}

/// Exponent `m` such that `n == 2^m`, if `n` is a power of two.
#[must_use]
pub fn log2_exact(n: usize) -> Option<u32> {
    n.is_power_of_two().then(|| n.trailing_zeros())
}

/// Default factor name for column `index`: `A`, `B`, ..., `Z`.
#[must_use]
pub fn factor_letter(index: usize) -> Option<String> {
    u8::try_from(index)
        .ok()
        .filter(|&i| i < 26)
        .map(|i| char::from(b'A' + i).to_string())
}

/// Default factor names `x1, x2, ...` for response-surface designs.
#[must_use]
pub fn coded_names(k: usize) -> Vec<String> {
    (1..=k).map(|i| format!("x{i}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinations_count() {
        // (n, k, C(n, k))
        for (n, k, expected) in [(0, 0, 1), (4, 2, 6), (5, 3, 10), (6, 2, 15), (7, 3, 35), (7, 7, 1)] {
            let combos = combinations(n, k);
            assert_eq!(combos.len(), expected);
            assert!(combos.iter().all(|c| c.windows(2).all(|w| w[0] < w[1])));
        }
        assert_eq!(combinations(4, 0), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn test_log2_exact() {
        assert_eq!(log2_exact(1), Some(0));
        assert_eq!(log2_exact(16), Some(4));
        assert_eq!(log2_exact(12), None);
        assert_eq!(log2_exact(0), None);
    }

    #[test]
    fn test_factor_letter() {
        assert_eq!(factor_letter(0).as_deref(), Some("A"));
        assert_eq!(factor_letter(25).as_deref(), Some("Z"));
        assert_eq!(factor_letter(26), None);
        assert_eq!(coded_names(2), vec!["x1", "x2"]);
    }
}
