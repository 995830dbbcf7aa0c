//! Strongly connected component decomposition.
//!
//! Tarjan's algorithm with an explicit work stack instead of recursion,
//! so component depth is bounded by heap rather than call-stack size.
//! Discovery indices and low-links are held in a per-call
//! [`SecondaryMap`], on-stack membership in a bit vector; the graph's
//! own vertices are never touched, so no scratch can leak into later
//! runs regardless of how this call exits.

use bitvec::bitvec;
use tracing::debug;

use crate::attr::LAYOUT_ORDER_KEY;
use crate::graph::IncidentEdges;
use crate::memory::{EntityIndex, SecondaryMap};
use crate::{Graph, VertexIndex};

use super::{Control, Outcome, Progress, PROGRESS_INTERVAL};

const PHASE: &str = "finding strongly connected components";

/// Ordering of the returned components by vertex count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Tarjan bookkeeping for one discovered vertex.
#[derive(Debug, Clone, Copy)]
struct TarjanMeta {
    index: u64,
    low_link: u64,
}

/// One suspended traversal frame: a vertex and its remaining incident
/// edges.
struct Frame<'a> {
    vertex: VertexIndex,
    edges: IncidentEdges<'a>,
}

/// Decomposes the graph into strongly connected components.
///
/// The traversal follows directed edges from source to target and
/// undirected edges both ways, so on an entirely undirected graph this
/// degenerates to ordinary connected components. Reachability is
/// graph-wide, never limited to any input subset: a component contains
/// every vertex strongly connected to its members. Each vertex appears
/// in exactly one component and the components partition the vertex
/// set.
///
/// Components are sorted by vertex count in the requested order; equal
/// sizes tie-break on the smallest `"layout-order"` metadata value found
/// among each component's vertices, smallest first whichever the size
/// order (vertices lacking the value are ignored, a component wholly
/// lacking it compares as `0.0`). Two runs over the same graph with the
/// same order return identical output.
///
/// The progress callback is invoked once at the start of the phase and
/// then once per [`PROGRESS_INTERVAL`] discovered vertices, wherever
/// the discovery happens; answering [`Control::Cancel`] aborts the
/// decomposition with [`Outcome::Cancelled`] and no effect on the graph.
///
/// # Example
///
/// ```
/// use sociograph::algo::{run_to_completion, strongly_connected_components, SortOrder};
/// use sociograph::{Directedness, Graph, Vertex};
///
/// let mut graph = Graph::new(Directedness::Directed);
/// let a = graph.add_vertex(Vertex::new());
/// let b = graph.add_vertex(Vertex::new());
/// let c = graph.add_vertex(Vertex::new());
/// graph.add_edge(a, b, true).unwrap();
/// graph.add_edge(b, a, true).unwrap();
/// graph.add_edge(b, c, true).unwrap();
///
/// let components =
///     strongly_connected_components(&graph, SortOrder::Ascending, run_to_completion)
///         .completed()
///         .unwrap();
///
/// let sizes: Vec<usize> = components.iter().map(Vec::len).collect();
/// assert_eq!(sizes, vec![1, 2]);
/// ```
pub fn strongly_connected_components<F>(
    graph: &Graph,
    order: SortOrder,
    mut progress: F,
) -> Outcome<Vec<Vec<VertexIndex>>>
where
    F: FnMut(Progress) -> Control,
{
    let total = graph.vertex_count();
    debug!(vertices = total, edges = graph.edge_count(), "starting scc");

    let mut meta: SecondaryMap<VertexIndex, Option<TarjanMeta>> =
        SecondaryMap::with_capacity(graph.vertex_upper_bound());
    let mut on_stack = bitvec![0; graph.vertex_upper_bound()];
    let mut component_stack: Vec<VertexIndex> = Vec::new();
    let mut frames: Vec<Frame<'_>> = Vec::new();
    let mut components: Vec<Vec<VertexIndex>> = Vec::new();

    let mut next_index: u64 = 0;
    let mut discovered: usize = 0;

    let mut checkpoint = move |completed: usize| {
        progress(Progress {
            completed,
            total,
            phase: PHASE,
        })
    };

    if checkpoint(0) == Control::Cancel {
        debug!("scc cancelled before traversal");
        return Outcome::Cancelled;
    }

    for root in graph.vertex_indices() {
        if meta[root].is_some() {
            continue;
        }

        discover(
            root,
            &mut meta,
            &mut on_stack,
            &mut component_stack,
            &mut next_index,
        );
        discovered += 1;
        if discovered % PROGRESS_INTERVAL == 0 && checkpoint(discovered) == Control::Cancel {
            debug!(discovered, "scc cancelled");
            return Outcome::Cancelled;
        }
        frames.push(Frame {
            vertex: root,
            edges: graph.incident_edges(root),
        });

        while let Some(frame) = frames.last_mut() {
            let vertex = frame.vertex;

            if let Some(edge) = frame.edges.next() {
                let data = graph.edge(edge).expect("incidence run yields live edges");

                // A directed edge is only traversable out of its
                // source; undirected edges go both ways.
                if data.is_directed() && data.vertex1() != vertex {
                    continue;
                }

                let neighbour = data
                    .other_endpoint(vertex)
                    .expect("incident edge has the vertex as an endpoint");

                match meta[neighbour] {
                    None => {
                        discover(
                            neighbour,
                            &mut meta,
                            &mut on_stack,
                            &mut component_stack,
                            &mut next_index,
                        );
                        discovered += 1;
                        if discovered % PROGRESS_INTERVAL == 0
                            && checkpoint(discovered) == Control::Cancel
                        {
                            debug!(discovered, "scc cancelled");
                            return Outcome::Cancelled;
                        }
                        frames.push(Frame {
                            vertex: neighbour,
                            edges: graph.incident_edges(neighbour),
                        });
                    }
                    Some(seen) if on_stack[neighbour.index()] => {
                        // Back edge to the current spanning path: the
                        // neighbour's discovery index bounds our
                        // low-link, not its own low-link.
                        let own = meta[vertex].expect("framed vertex is discovered");
                        if seen.index < own.low_link {
                            meta[vertex] = Some(TarjanMeta {
                                index: own.index,
                                low_link: seen.index,
                            });
                        }
                    }
                    Some(_) => {}
                }
            } else {
                frames.pop();
                let own = meta[vertex].expect("framed vertex is discovered");

                if own.low_link == own.index {
                    // This vertex roots a component: pop the component
                    // stack down to and including it.
                    let mut component = Vec::new();
                    loop {
                        let member = component_stack
                            .pop()
                            .expect("component stack holds the root");
                        on_stack.set(member.index(), false);
                        component.push(member);
                        if member == vertex {
                            break;
                        }
                    }
                    components.push(component);
                }

                if let Some(parent) = frames.last() {
                    let parent_meta = meta[parent.vertex].expect("framed vertex is discovered");
                    if own.low_link < parent_meta.low_link {
                        meta[parent.vertex] = Some(TarjanMeta {
                            index: parent_meta.index,
                            low_link: own.low_link,
                        });
                    }
                }
            }
        }
    }

    sort_components(graph, &mut components, order);

    debug!(components = components.len(), "scc finished");
    Outcome::Completed(components)
}

fn discover(
    vertex: VertexIndex,
    meta: &mut SecondaryMap<VertexIndex, Option<TarjanMeta>>,
    on_stack: &mut bitvec::vec::BitVec,
    component_stack: &mut Vec<VertexIndex>,
    next_index: &mut u64,
) {
    meta[vertex] = Some(TarjanMeta {
        index: *next_index,
        low_link: *next_index,
    });
    *next_index += 1;
    on_stack.set(vertex.index(), true);
    component_stack.push(vertex);
}

fn sort_components(graph: &Graph, components: &mut [Vec<VertexIndex>], order: SortOrder) {
    let layout_key = |component: &[VertexIndex]| -> f64 {
        component
            .iter()
            .filter_map(|&vertex| {
                graph
                    .vertex(vertex)
                    .and_then(|v| v.metadata().get(LAYOUT_ORDER_KEY))
                    .and_then(|value| value.as_float())
            })
            .fold(None, |smallest: Option<f64>, value| {
                Some(smallest.map_or(value, |s| s.min(value)))
            })
            .unwrap_or(0.0)
    };

    // Only the size comparison flips with the order; the layout-order
    // tie-break stays smallest-first either way.
    components.sort_by(|a, b| {
        let by_size = match order {
            SortOrder::Ascending => a.len().cmp(&b.len()),
            SortOrder::Descending => b.len().cmp(&a.len()),
        };
        by_size.then_with(|| layout_key(a).total_cmp(&layout_key(b)))
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::algo::run_to_completion;
    use crate::{AttrValue, Directedness, Vertex};

    fn directed_graph(vertices: usize) -> (Graph, Vec<VertexIndex>) {
        let mut graph = Graph::new(Directedness::Directed);
        let indices = (0..vertices)
            .map(|_| graph.add_vertex(Vertex::new()))
            .collect();
        (graph, indices)
    }

    fn run(graph: &Graph, order: SortOrder) -> Vec<Vec<VertexIndex>> {
        strongly_connected_components(graph, order, run_to_completion)
            .completed()
            .unwrap()
    }

    #[test]
    fn directed_cycle_is_one_component() {
        let (mut graph, v) = directed_graph(5);
        for i in 0..5 {
            graph.add_edge(v[i], v[(i + 1) % 5], true).unwrap();
        }

        let components = run(&graph, SortOrder::Ascending);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 5);
    }

    #[test]
    fn dag_yields_singletons() {
        let (mut graph, v) = directed_graph(4);
        graph.add_edge(v[0], v[1], true).unwrap();
        graph.add_edge(v[0], v[2], true).unwrap();
        graph.add_edge(v[1], v[3], true).unwrap();
        graph.add_edge(v[2], v[3], true).unwrap();

        let components = run(&graph, SortOrder::Ascending);
        assert_eq!(components.len(), 4);
        assert!(components.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn undirected_graph_degenerates_to_connected_components() {
        let mut graph = Graph::new(Directedness::Undirected);
        let v: Vec<_> = (0..4).map(|_| graph.add_vertex(Vertex::new())).collect();
        graph.add_edge(v[0], v[1], false).unwrap();
        graph.add_edge(v[1], v[2], false).unwrap();

        let components = run(&graph, SortOrder::Descending);
        let sizes: Vec<usize> = components.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 1]);
    }

    #[test]
    fn components_partition_the_vertex_set() {
        let (mut graph, v) = directed_graph(7);
        // Two 2-cycles plus three stragglers.
        graph.add_edge(v[0], v[1], true).unwrap();
        graph.add_edge(v[1], v[0], true).unwrap();
        graph.add_edge(v[2], v[3], true).unwrap();
        graph.add_edge(v[3], v[2], true).unwrap();
        graph.add_edge(v[4], v[5], true).unwrap();

        let components = run(&graph, SortOrder::Descending);
        let total: usize = components.iter().map(Vec::len).sum();
        assert_eq!(total, 7);

        let mut all: Vec<VertexIndex> = components.into_iter().flatten().collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 7);
    }

    #[test]
    fn determinism_across_runs() {
        let (mut graph, v) = directed_graph(6);
        graph.add_edge(v[0], v[1], true).unwrap();
        graph.add_edge(v[1], v[2], true).unwrap();
        graph.add_edge(v[2], v[0], true).unwrap();
        graph.add_edge(v[3], v[4], true).unwrap();

        let first = run(&graph, SortOrder::Ascending);
        let second = run(&graph, SortOrder::Ascending);
        assert_eq!(first, second);
    }

    #[test]
    fn sort_orders_are_reverses() {
        let (mut graph, v) = directed_graph(5);
        graph.add_edge(v[0], v[1], true).unwrap();
        graph.add_edge(v[1], v[0], true).unwrap();

        let ascending = run(&graph, SortOrder::Ascending);
        let sizes: Vec<usize> = ascending.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1, 1, 1, 2]);

        let descending = run(&graph, SortOrder::Descending);
        let sizes: Vec<usize> = descending.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1, 1, 1]);
    }

    #[test]
    fn equal_sizes_tie_break_on_layout_order() {
        let (mut graph, v) = directed_graph(3);
        graph
            .vertex_mut(v[2])
            .unwrap()
            .metadata_mut()
            .set(crate::LAYOUT_ORDER_KEY, AttrValue::Float(-1.0));

        // Three singletons; v[2] carries the smallest layout order and
        // the others compare as 0.0.
        let components = run(&graph, SortOrder::Ascending);
        assert_eq!(components[0], vec![v[2]]);
    }

    #[test]
    fn reachability_is_graph_wide() {
        let (mut graph, v) = directed_graph(4);
        // v0 → v1 → v2 → v0 cycle, v3 hanging off it.
        graph.add_edge(v[0], v[1], true).unwrap();
        graph.add_edge(v[1], v[2], true).unwrap();
        graph.add_edge(v[2], v[0], true).unwrap();
        graph.add_edge(v[2], v[3], true).unwrap();

        let components = run(&graph, SortOrder::Descending);
        assert_eq!(components[0].len(), 3);
        assert!(components[0].contains(&v[0]));
        assert!(components[0].contains(&v[1]));
        assert!(components[0].contains(&v[2]));
    }

    #[test]
    fn cancellation_reports_not_completed() {
        let (mut graph, v) = directed_graph(350);
        for window in v.windows(2) {
            graph.add_edge(window[0], window[1], true).unwrap();
        }

        let outcome = strongly_connected_components(&graph, SortOrder::Ascending, |_| {
            Control::Cancel
        });
        assert!(outcome.is_cancelled());

        // No scratch leaked onto the vertices: a rerun is unaffected.
        let components = run(&graph, SortOrder::Ascending);
        assert_eq!(components.len(), 350);
        for index in graph.vertex_indices() {
            assert!(graph.vertex(index).unwrap().metadata().is_empty());
        }
    }

    #[test]
    fn cancellation_applies_to_isolated_vertices() {
        // No edges at all: every discovery happens at a root.
        let (graph, _) = directed_graph(1_000);

        let mut calls = 0;
        let outcome = strongly_connected_components(&graph, SortOrder::Ascending, |_| {
            calls += 1;
            Control::Cancel
        });

        assert!(outcome.is_cancelled());
        assert_eq!(calls, 1);
    }

    #[test]
    fn progress_reports_phase_start_then_intervals() {
        let (graph, _) = directed_graph(250);

        let mut reports = Vec::new();
        let outcome = strongly_connected_components(&graph, SortOrder::Ascending, |progress| {
            reports.push(progress.completed);
            Control::Continue
        });

        assert!(!outcome.is_cancelled());
        assert_eq!(reports, vec![0, 100, 200]);
    }

    #[test]
    fn descending_order_keeps_layout_tie_break_smallest_first() {
        let (mut graph, v) = directed_graph(4);
        // Two 2-cycles of equal size.
        graph.add_edge(v[0], v[1], true).unwrap();
        graph.add_edge(v[1], v[0], true).unwrap();
        graph.add_edge(v[2], v[3], true).unwrap();
        graph.add_edge(v[3], v[2], true).unwrap();

        graph
            .vertex_mut(v[0])
            .unwrap()
            .metadata_mut()
            .set(crate::LAYOUT_ORDER_KEY, AttrValue::Float(5.0));
        graph
            .vertex_mut(v[2])
            .unwrap()
            .metadata_mut()
            .set(crate::LAYOUT_ORDER_KEY, AttrValue::Float(1.0));

        let components = run(&graph, SortOrder::Descending);
        assert!(components[0].contains(&v[2]));
        assert!(components[1].contains(&v[0]));
    }

    #[test]
    fn self_loop_is_a_singleton_component() {
        let (mut graph, v) = directed_graph(1);
        graph.add_edge(v[0], v[0], true).unwrap();

        let components = run(&graph, SortOrder::Ascending);
        assert_eq!(components, vec![vec![v[0]]]);
    }
}
