//! Topological sort with cycle reporting.
//!
//! [`topological_sort`] runs Kahn's algorithm over an [`Adjacency`] map. When
//! the sort cannot place every node, a depth-first search over the same map
//! extracts one closed walk that proves a cycle exists.
//!
//! Nodes are visited in insertion order everywhere, so the same input always
//! yields the same order and the same witness.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// Insertion-ordered mapping from a node to its successors.
///
/// Only nodes inserted as keys belong to the graph. Successors that were
/// never inserted as keys are ignored by the sort.
#[derive(Debug, Clone)]
pub struct Adjacency<N> {
    order: Vec<N>,
    successors: HashMap<N, Vec<N>>,
}

impl<N> Default for Adjacency<N> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            successors: HashMap::new(),
        }
    }
}

impl<N: Clone + Eq + Hash> Adjacency<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` with no successors. Re-adding an existing node is a no-op.
    pub fn add_node(&mut self, node: N) {
        if !self.successors.contains_key(&node) {
            self.order.push(node.clone());
            self.successors.insert(node, Vec::new());
        }
    }

    /// Adds the edge `from -> to`, registering `from` if needed.
    pub fn add_edge(&mut self, from: N, to: N) {
        self.add_node(from.clone());
        if let Some(list) = self.successors.get_mut(&from) {
            list.push(to);
        }
    }

    /// Number of nodes (keys) in the graph.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.order.iter()
    }

    /// Successors of `node` that are themselves part of the graph.
    pub fn successors<'a>(&'a self, node: &N) -> impl Iterator<Item = &'a N> {
        self.successors
            .get(node)
            .into_iter()
            .flatten()
            .filter(move |s| self.successors.contains_key(*s))
    }
}

impl<N: Clone + Eq + Hash> FromIterator<(N, Vec<N>)> for Adjacency<N> {
    fn from_iter<I: IntoIterator<Item = (N, Vec<N>)>>(iter: I) -> Self {
        let mut graph = Adjacency::new();
        for (node, successors) in iter {
            graph.add_node(node.clone());
            if let Some(list) = graph.successors.get_mut(&node) {
                list.extend(successors);
            }
        }
        graph
    }
}

/// A dependency cycle found by [`topological_sort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<N> {
    /// Closed walk through the graph: the first and last entries are the same node.
    pub witness: Vec<N>,
    /// Nodes that could be ordered before the sort stalled.
    pub partial: Vec<N>,
}

/// Order every node so that each edge's source precedes its target.
///
/// # Errors
/// Returns a [`Cycle`] carrying a witness walk when the graph is not acyclic.
pub fn topological_sort<N: Clone + Eq + Hash>(graph: &Adjacency<N>) -> Result<Vec<N>, Cycle<N>> {
    // Build the in-degree map.
    let mut in_degree: HashMap<&N, usize> = graph.nodes().map(|n| (n, 0)).collect();
    for node in graph.nodes() {
        for succ in graph.successors(node) {
            if let Some(deg) = in_degree.get_mut(succ) {
                *deg += 1;
            }
        }
    }

    // Seed the queue with nodes that have no incoming edges.
    let mut queue: VecDeque<&N> = graph
        .nodes()
        .filter(|n| in_degree.get(n) == Some(&0))
        .collect();

    let mut sorted: Vec<N> = Vec::with_capacity(graph.len());

    while let Some(node) = queue.pop_front() {
        sorted.push(node.clone());

        for succ in graph.successors(node) {
            if let Some(deg) = in_degree.get_mut(succ) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(succ);
                }
            }
        }
    }

    // If we didn't visit every node the graph contains a cycle.
    if sorted.len() != graph.len() {
        return Err(Cycle {
            witness: find_cycle(graph).unwrap_or_default(),
            partial: sorted,
        });
    }

    Ok(sorted)
}

/// Depth-first search for the first back edge; returns the closed walk it closes.
pub fn find_cycle<N: Clone + Eq + Hash>(graph: &Adjacency<N>) -> Option<Vec<N>> {
    let mut visited: HashSet<&N> = HashSet::new();
    let mut on_stack: HashSet<&N> = HashSet::new();

    for node in graph.nodes() {
        if visited.contains(node) {
            continue;
        }
        if let Some(cycle) = dfs(graph, node, &mut visited, &mut on_stack) {
            return Some(cycle);
        }
    }
    None
}

/// Iterative DFS from `root`. Each frame holds a node on the current path and
/// its unexplored successors.
fn dfs<'a, N: Clone + Eq + Hash>(
    graph: &'a Adjacency<N>,
    root: &'a N,
    visited: &mut HashSet<&'a N>,
    on_stack: &mut HashSet<&'a N>,
) -> Option<Vec<N>> {
    visited.insert(root);
    on_stack.insert(root);
    let mut stack = vec![(root, graph.successors(root))];

    while let Some((node, successors)) = stack.last_mut() {
        let node: &'a N = *node;
        match successors.next() {
            Some(succ) if on_stack.contains(succ) => {
                // Back edge: the cycle is the path from `succ` to the top, closed on `succ`.
                let start = stack.iter().position(|(n, _)| *n == succ)?;
                let mut cycle: Vec<N> = stack[start..].iter().map(|(n, _)| (*n).clone()).collect();
                cycle.push(succ.clone());
                return Some(cycle);
            }
            Some(succ) => {
                if visited.insert(succ) {
                    on_stack.insert(succ);
                    stack.push((succ, graph.successors(succ)));
                }
            }
            None => {
                on_stack.remove(node);
                stack.pop();
            }
        }
    }
    None
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: Vec<(u32, Vec<u32>)>) -> Adjacency<u32> {
        edges.into_iter().collect()
    }

    fn assert_topological(graph: &Adjacency<u32>, order: &[u32]) {
        assert_eq!(order.len(), graph.len());
        let pos: HashMap<u32, usize> = order.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        for node in graph.nodes() {
            for succ in graph.successors(node) {
                assert!(pos[node] < pos[succ], "{node} must come before {succ}");
            }
        }
    }

    fn assert_closed_walk(graph: &Adjacency<u32>, witness: &[u32]) {
        assert!(witness.len() >= 2);
        assert_eq!(witness.first(), witness.last());
        for pair in witness.windows(2) {
            assert!(
                graph.successors(&pair[0]).any(|s| *s == pair[1]),
                "edge {} -> {} not in graph",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn layered_graph_is_sorted() {
        let g = graph(vec![
            (1, vec![2, 3]),
            (2, vec![4, 5]),
            (3, vec![5]),
            (4, vec![6]),
            (5, vec![6]),
            (6, vec![]),
        ]);
        let order = topological_sort(&g).expect("acyclic");
        assert_topological(&g, &order);
        assert_eq!(order.first(), Some(&1));
        assert_eq!(order.last(), Some(&6));
    }

    #[test]
    fn ties_follow_insertion_order() {
        let g = graph(vec![(3, vec![]), (1, vec![]), (2, vec![])]);
        assert_eq!(topological_sort(&g).unwrap(), vec![3, 1, 2]);
        assert_eq!(topological_sort(&g).unwrap(), topological_sort(&g.clone()).unwrap());
    }

    #[test]
    fn cycle_yields_witness_walk() {
        // 0 -> 1 -> 2 -> 3 -> 1
        let g = graph(vec![(0, vec![1]), (1, vec![2]), (2, vec![3]), (3, vec![1])]);
        let cycle = topological_sort(&g).unwrap_err();
        assert_eq!(cycle.witness, vec![1, 2, 3, 1]);
        assert_closed_walk(&g, &cycle.witness);
        assert_eq!(cycle.partial, vec![0]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph(vec![(7, vec![7])]);
        let cycle = topological_sort(&g).unwrap_err();
        assert_eq!(cycle.witness, vec![7, 7]);
    }

    #[test]
    fn cycle_found_from_later_root() {
        // 1 is acyclic on its own; the cycle sits behind 5.
        let g = graph(vec![(1, vec![2]), (2, vec![]), (5, vec![6]), (6, vec![5])]);
        let cycle = topological_sort(&g).unwrap_err();
        assert_closed_walk(&g, &cycle.witness);
        assert!(cycle.witness.contains(&5) && cycle.witness.contains(&6));
    }

    #[test]
    fn successors_outside_the_key_set_are_ignored() {
        let g = graph(vec![(1, vec![2, 99]), (2, vec![])]);
        assert_eq!(topological_sort(&g).unwrap(), vec![1, 2]);
    }

    #[test]
    fn empty_graph_sorts_to_nothing() {
        let g: Adjacency<u32> = Adjacency::new();
        assert!(topological_sort(&g).unwrap().is_empty());
        assert_eq!(find_cycle(&g), None);
    }

    #[test]
    fn add_edge_registers_source_once() {
        let mut g = Adjacency::new();
        g.add_node("b");
        g.add_edge("a", "b");
        g.add_edge("a", "c");
        g.add_node("a");
        assert_eq!(g.nodes().copied().collect::<Vec<_>>(), vec!["b", "a"]);
        // "c" is not a key, so only "b" is reported as a successor.
        assert_eq!(g.successors(&"a").copied().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn long_chain_into_cycle_reports_witness() {
        // 0 -> 1 -> ... -> n-1 -> n-2
        let n: u32 = 200_000;
        let mut g = Adjacency::new();
        for i in 0..n - 1 {
            g.add_edge(i, i + 1);
        }
        g.add_edge(n - 1, n - 2);

        let cycle = topological_sort(&g).unwrap_err();
        assert_eq!(cycle.witness, vec![n - 2, n - 1, n - 2]);
        assert_eq!(cycle.partial.len(), (n - 2) as usize);
    }

    #[test]
    fn long_acyclic_chain_sorts_in_order() {
        let n: u32 = 200_000;
        let mut g = Adjacency::new();
        for i in 0..n - 1 {
            g.add_edge(i, i + 1);
        }
        g.add_node(n - 1);
        let order = topological_sort(&g).unwrap();
        assert_eq!(order.len(), n as usize);
        assert_eq!(order.last(), Some(&(n - 1)));
        assert_eq!(find_cycle(&g), None);
    }
}
