//! Adjacency graphs of matrix sparsity patterns and overlap growth.
//! See Saad §13.3 for overlapping partitions in Schwarz methods.

/// Symmetrized adjacency of a sparsity pattern: adj[i] = { j ≠ i | A[i,j] ≠ 0 or A[j,i] ≠ 0 },
/// each list sorted ascending.
pub fn extract_adjacency<F>(n: usize, row_pattern: F) -> Vec<Vec<usize>>
where
    F: Fn(usize) -> Vec<usize>,
{
    let mut adj = vec![Vec::new(); n];
    for i in 0..n {
        for j in row_pattern(i) {
            if i != j && j < n {
                adj[i].push(j);
                adj[j].push(i);
            }
        }
    }
    for list in adj.iter_mut() {
        list.sort_unstable();
        list.dedup();
    }
    adj
}

/// Grow `seed` by `layers` rings of graph neighbours. Returns the sorted index set.
pub fn grow_by_layers(seed: &[usize], adj: &[Vec<usize>], layers: usize) -> Vec<usize> {
    let mut member = vec![false; adj.len()];
    let mut frontier: Vec<usize> = Vec::with_capacity(seed.len());
    for &i in seed {
        if !member[i] {
            member[i] = true;
            frontier.push(i);
        }
    }
    for _ in 0..layers {
        let mut next = Vec::new();
        for &i in &frontier {
            for &j in &adj[i] {
                if !member[j] {
                    member[j] = true;
                    next.push(j);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    (0..adj.len()).filter(|&i| member[i]).collect()
}

/// Split `0..n` into `blocks` contiguous ranges whose sizes differ by at most one.
pub fn contiguous_blocks(n: usize, blocks: usize) -> Vec<Vec<usize>> {
    let blocks = blocks.clamp(1, n.max(1));
    let base = n / blocks;
    let extra = n % blocks;
    let mut start = 0;
    (0..blocks)
        .map(|b| {
            let len = base + usize::from(b < extra);
            let block = (start..start + len).collect();
            start += len;
            block
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_pattern(n: usize) -> impl Fn(usize) -> Vec<usize> {
        move |i| (i.saturating_sub(1)..(i + 2).min(n)).collect()
    }

    #[test]
    fn adjacency_of_a_path() {
        let adj = extract_adjacency(4, path_pattern(4));
        assert_eq!(adj, vec![vec![1], vec![0, 2], vec![1, 3], vec![2]]);
    }

    #[test]
    fn overlap_layers() {
        let adj = extract_adjacency(6, path_pattern(6));
        assert_eq!(grow_by_layers(&[2, 3], &adj, 0), vec![2, 3]);
        assert_eq!(grow_by_layers(&[2, 3], &adj, 1), vec![1, 2, 3, 4]);
        assert_eq!(grow_by_layers(&[0], &adj, 10), (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn contiguous_split() {
        assert_eq!(contiguous_blocks(5, 2), vec![vec![0, 1, 2], vec![3, 4]]);
        assert_eq!(contiguous_blocks(2, 5), vec![vec![0], vec![1]]);
    }
}
