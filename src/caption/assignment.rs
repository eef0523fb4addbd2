//! Minimum-cost bipartite assignment (Hungarian method with potentials).

/// Cost substituted for non-finite entries so the solver always terminates.
const UNREACHABLE: f64 = 1e12;

/// Assign rows to columns minimizing the summed cost.
///
/// `cost` is a rectangular row-major matrix. Exactly `min(rows, cols)`
/// pairs `(row, col)` are returned, sorted by row.
pub fn min_cost_assignment(cost: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let rows = cost.len();
    let cols = cost.iter().map(Vec::len).min().unwrap_or(0);
    if rows == 0 || cols == 0 {
        return Vec::new();
    }
    if rows > cols {
        let transposed: Vec<Vec<f64>> = (0..cols)
            .map(|c| (0..rows).map(|r| cost[r][c]).collect())
            .collect();
        let mut pairs: Vec<(usize, usize)> = min_cost_assignment(&transposed)
            .into_iter()
            .map(|(c, r)| (r, c))
            .collect();
        pairs.sort_unstable();
        return pairs;
    }

    let at = |r: usize, c: usize| {
        let v = cost[r][c];
        if v.is_finite() {
            v
        } else {
            UNREACHABLE
        }
    };

    // 1-based potentials; column 0 is the virtual start.
    let mut u = vec![0.0f64; rows + 1];
    let mut v = vec![0.0f64; cols + 1];
    let mut owner = vec![0usize; cols + 1];
    let mut way = vec![0usize; cols + 1];

    for row in 1..=rows {
        owner[0] = row;
        let mut j0 = 0;
        let mut min_slack = vec![f64::INFINITY; cols + 1];
        let mut used = vec![false; cols + 1];
        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=cols {
                if used[j] {
                    continue;
                }
                let slack = at(i0 - 1, j - 1) - u[i0] - v[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }
            if j1 == 0 {
                break;
            }
            for j in 0..=cols {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }
            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }
        while j0 != 0 {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
        }
    }

    let mut pairs: Vec<(usize, usize)> = (1..=cols)
        .filter(|j| owner[*j] != 0)
        .map(|j| (owner[j] - 1, j - 1))
        .collect();
    pairs.sort_unstable();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(cost: &[Vec<f64>], pairs: &[(usize, usize)]) -> f64 {
        pairs.iter().map(|(r, c)| cost[*r][*c]).sum()
    }

    #[test]
    fn test_square_assignment() {
        let cost = vec![
            vec![4.0, 1.0, 3.0],
            vec![2.0, 0.0, 5.0],
            vec![3.0, 2.0, 2.0],
        ];
        let pairs = min_cost_assignment(&cost);
        assert_eq!(pairs, vec![(0, 1), (1, 0), (2, 2)]);
        assert_eq!(total(&cost, &pairs), 5.0);
    }

    #[test]
    fn test_more_columns_than_rows() {
        let cost = vec![vec![10.0, 1.0, 7.0], vec![1.0, 9.0, 8.0]];
        assert_eq!(min_cost_assignment(&cost), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_more_rows_than_columns() {
        let cost = vec![vec![5.0], vec![1.0], vec![3.0]];
        assert_eq!(min_cost_assignment(&cost), vec![(1, 0)]);
    }

    #[test]
    fn test_empty_and_non_finite() {
        assert!(min_cost_assignment(&[]).is_empty());
        let cost = vec![vec![f64::NAN, 2.0], vec![1.0, f64::INFINITY]];
        assert_eq!(min_cost_assignment(&cost), vec![(0, 1), (1, 0)]);
    }
}
