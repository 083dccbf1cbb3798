//! Graph traversals over string identifiers

use std::collections::{BTreeSet, HashMap, VecDeque};

/// Depth-first reachability from `start`, `start` included
pub fn dfs<F, I>(start: &str, mut neighbours: F) -> BTreeSet<String>
where
    F: FnMut(&str) -> I,
    I: IntoIterator<Item = String>,
{
    let mut result = BTreeSet::new();
    let mut stack = vec![start.to_string()];

    while let Some(node) = stack.pop() {
        if !result.insert(node.clone()) {
            continue;
        }
        for next in neighbours(&node) {
            if !result.contains(&next) {
                stack.push(next);
            }
        }
    }

    result
}

/// Breadth-first search from `start`
///
/// Returns every reached node with its distance, in visitation order.
pub fn bfs<F, I>(start: &str, mut neighbours: F) -> Vec<(String, usize)>
where
    F: FnMut(&str) -> I,
    I: IntoIterator<Item = String>,
{
    let mut order = vec![(start.to_string(), 0)];
    let mut distances = HashMap::from([(start.to_string(), 0usize)]);
    let mut queue = VecDeque::from([start.to_string()]);

    while let Some(node) = queue.pop_front() {
        let distance = distances[&node];
        for next in neighbours(&node) {
            if distances.contains_key(&next) {
                continue;
            }
            distances.insert(next.clone(), distance + 1);
            order.push((next.clone(), distance + 1));
            queue.push_back(next);
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(node: &str) -> Vec<String> {
        let targets: &[&str] = match node {
            "a" => &["b", "c"],
            "b" => &["d"],
            "c" => &["d", "a"],
            "d" => &[],
            _ => &[],
        };
        targets.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_dfs_handles_cycles() {
        let reached = dfs("a", edges);
        let expected: BTreeSet<String> =
            ["a", "b", "c", "d"].iter().map(|s| (*s).to_string()).collect();
        assert_eq!(reached, expected);
    }

    #[test]
    fn test_dfs_leaf() {
        let reached = dfs("d", edges);
        assert_eq!(reached.len(), 1);
        assert!(reached.contains("d"));
    }

    #[test]
    fn test_bfs_order_and_distances() {
        let visited = bfs("a", edges);
        assert_eq!(
            visited,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 1),
                ("d".to_string(), 2),
            ]
        );
    }
}
