//! Edge reciprocation and the reciprocated vertex-pair ratio.
//!
//! Both metrics reduce the graph's directed edges to a set of ordered
//! (source, target) vertex-pair keys and then probe that set for
//! reversed pairs. Self-loops are never reciprocated and undirected
//! edges carry no direction to reverse, so both always test `false`.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::{EdgeIndex, Graph, VertexIndex};

use super::{Control, Outcome, Progress, PROGRESS_INTERVAL};

type PairSet = FxHashSet<(VertexIndex, VertexIndex)>;

/// Determines, per edge, whether it is reciprocated: a directed edge
/// A→B for which a directed B→A also exists.
///
/// Undirected edges and self-loops are recorded as `false`, so the
/// result covers every edge of the graph; an entirely undirected graph
/// yields all-false. Duplicate edges are tolerated — the pair set
/// de-duplicates identical pairs and each edge still receives its own
/// boolean based on presence, not count.
///
/// # Example
///
/// ```
/// use sociograph::algo::{edge_reciprocation, run_to_completion};
/// use sociograph::{Directedness, Graph, Vertex};
///
/// let mut graph = Graph::new(Directedness::Directed);
/// let a = graph.add_vertex(Vertex::new());
/// let b = graph.add_vertex(Vertex::new());
/// let c = graph.add_vertex(Vertex::new());
/// let ab = graph.add_edge(a, b, true).unwrap();
/// let ba = graph.add_edge(b, a, true).unwrap();
/// let ac = graph.add_edge(a, c, true).unwrap();
///
/// let reciprocated = edge_reciprocation(&graph, run_to_completion)
///     .completed()
///     .unwrap();
///
/// assert_eq!(reciprocated[&ab], true);
/// assert_eq!(reciprocated[&ba], true);
/// assert_eq!(reciprocated[&ac], false);
/// ```
pub fn edge_reciprocation<F>(graph: &Graph, mut progress: F) -> Outcome<FxHashMap<EdgeIndex, bool>>
where
    F: FnMut(Progress) -> Control,
{
    debug!(edges = graph.edge_count(), "starting edge reciprocation");

    let Some(pairs) = directed_pair_set(graph, &mut progress) else {
        return Outcome::Cancelled;
    };

    let total = graph.edge_count();
    let mut reciprocated = FxHashMap::default();

    for (completed, index) in graph.edge_indices().enumerate() {
        if completed % PROGRESS_INTERVAL == 0 {
            let answer = progress(Progress {
                completed,
                total,
                phase: "testing reversed vertex pairs",
            });
            if answer == Control::Cancel {
                return Outcome::Cancelled;
            }
        }

        let edge = graph.edge(index).expect("iterating live edges");
        let value = edge.is_directed()
            && !edge.is_self_loop()
            && pairs.contains(&(edge.vertex2(), edge.vertex1()));

        reciprocated.insert(index, value);
    }

    Outcome::Completed(reciprocated)
}

/// Computes, per vertex, the fraction of its distinct adjacent vertices
/// (itself excluded) connected by directed edges in both directions.
///
/// The result is `None` for a vertex with no qualifying adjacent
/// vertices. Correctness requires the graph to have no duplicate edges
/// (run [`Graph::remove_duplicate_edges`] first if in doubt); this is a
/// precondition, not something the calculation checks.
///
/// # Example
///
/// ```
/// use sociograph::algo::{reciprocated_vertex_pair_ratio, run_to_completion};
/// use sociograph::{Directedness, Graph, Vertex};
///
/// let mut graph = Graph::new(Directedness::Directed);
/// let a = graph.add_vertex(Vertex::new());
/// let b = graph.add_vertex(Vertex::new());
/// let c = graph.add_vertex(Vertex::new());
/// graph.add_edge(a, b, true).unwrap();
/// graph.add_edge(b, a, true).unwrap();
/// graph.add_edge(a, c, true).unwrap();
///
/// let ratios = reciprocated_vertex_pair_ratio(&graph, run_to_completion)
///     .completed()
///     .unwrap();
///
/// assert_eq!(ratios[&a], Some(0.5));
/// assert_eq!(ratios[&b], Some(1.0));
/// assert_eq!(ratios[&c], Some(0.0));
/// ```
pub fn reciprocated_vertex_pair_ratio<F>(
    graph: &Graph,
    mut progress: F,
) -> Outcome<FxHashMap<VertexIndex, Option<f64>>>
where
    F: FnMut(Progress) -> Control,
{
    debug!(
        vertices = graph.vertex_count(),
        "starting reciprocated vertex-pair ratio"
    );

    let Some(pairs) = directed_pair_set(graph, &mut progress) else {
        return Outcome::Cancelled;
    };

    let total = graph.vertex_count();
    let mut ratios = FxHashMap::default();

    for (completed, vertex) in graph.vertex_indices().enumerate() {
        if completed % PROGRESS_INTERVAL == 0 {
            let answer = progress(Progress {
                completed,
                total,
                phase: "computing reciprocated pair ratios",
            });
            if answer == Control::Cancel {
                return Outcome::Cancelled;
            }
        }

        let mut adjacent_count = 0usize;
        let mut both_ways = 0usize;

        for other in graph.adjacent_vertices(vertex, true, true) {
            if other == vertex {
                continue;
            }

            adjacent_count += 1;
            if pairs.contains(&(vertex, other)) && pairs.contains(&(other, vertex)) {
                both_ways += 1;
            }
        }

        let ratio = if adjacent_count == 0 {
            None
        } else {
            Some(both_ways as f64 / adjacent_count as f64)
        };

        ratios.insert(vertex, ratio);
    }

    Outcome::Completed(ratios)
}

/// Collects the (source, target) pair keys of the graph's directed
/// non-loop edges. `None` if the progress callback cancelled.
fn directed_pair_set<F>(graph: &Graph, progress: &mut F) -> Option<PairSet>
where
    F: FnMut(Progress) -> Control,
{
    let total = graph.edge_count();
    let mut pairs = PairSet::default();

    for (completed, index) in graph.edge_indices().enumerate() {
        if completed % PROGRESS_INTERVAL == 0 {
            let answer = progress(Progress {
                completed,
                total,
                phase: "collecting vertex pairs",
            });
            if answer == Control::Cancel {
                return None;
            }
        }

        let edge = graph.edge(index).expect("iterating live edges");
        if edge.is_directed() && !edge.is_self_loop() {
            pairs.insert((edge.vertex1(), edge.vertex2()));
        }
    }

    Some(pairs)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::algo::run_to_completion;
    use crate::{Directedness, Vertex};

    #[test]
    fn self_loop_is_never_reciprocated() {
        let mut graph = Graph::new(Directedness::Directed);
        let a = graph.add_vertex(Vertex::new());
        let aa = graph.add_edge(a, a, true).unwrap();

        let reciprocated = edge_reciprocation(&graph, run_to_completion)
            .completed()
            .unwrap();
        assert_eq!(reciprocated[&aa], false);
    }

    #[test]
    fn undirected_graph_is_all_false() {
        let mut graph = Graph::new(Directedness::Undirected);
        let a = graph.add_vertex(Vertex::new());
        let b = graph.add_vertex(Vertex::new());
        let ab = graph.add_edge(a, b, false).unwrap();
        let ba = graph.add_edge(b, a, false).unwrap();

        let reciprocated = edge_reciprocation(&graph, run_to_completion)
            .completed()
            .unwrap();
        assert_eq!(reciprocated[&ab], false);
        assert_eq!(reciprocated[&ba], false);
    }

    #[test]
    fn duplicate_edges_are_tolerated() {
        let mut graph = Graph::new(Directedness::Directed);
        let a = graph.add_vertex(Vertex::new());
        let b = graph.add_vertex(Vertex::new());
        let first = graph.add_edge(a, b, true).unwrap();
        let second = graph.add_edge(a, b, true).unwrap();
        let back = graph.add_edge(b, a, true).unwrap();

        let reciprocated = edge_reciprocation(&graph, run_to_completion)
            .completed()
            .unwrap();
        assert_eq!(reciprocated[&first], true);
        assert_eq!(reciprocated[&second], true);
        assert_eq!(reciprocated[&back], true);
        assert_eq!(reciprocated.len(), 3);
    }

    #[test]
    fn isolated_vertex_has_no_ratio() {
        let mut graph = Graph::new(Directedness::Directed);
        let a = graph.add_vertex(Vertex::new());

        let ratios = reciprocated_vertex_pair_ratio(&graph, run_to_completion)
            .completed()
            .unwrap();
        assert_eq!(ratios[&a], None);
    }

    #[test]
    fn vertex_with_only_a_self_loop_has_no_ratio() {
        let mut graph = Graph::new(Directedness::Directed);
        let a = graph.add_vertex(Vertex::new());
        graph.add_edge(a, a, true).unwrap();

        let ratios = reciprocated_vertex_pair_ratio(&graph, run_to_completion)
            .completed()
            .unwrap();
        assert_eq!(ratios[&a], None);
    }

    #[test]
    fn cancellation_during_pair_collection() {
        let mut graph = Graph::new(Directedness::Directed);
        let a = graph.add_vertex(Vertex::new());
        let b = graph.add_vertex(Vertex::new());
        graph.add_edge(a, b, true).unwrap();

        let outcome = edge_reciprocation(&graph, |_| Control::Cancel);
        assert!(outcome.is_cancelled());
    }
}
