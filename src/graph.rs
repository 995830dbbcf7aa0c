//! The mutable graph container and its incidence index.
//!
//! Vertices, edges and incidence slots live in three free-list arenas
//! and refer to each other by index. Each vertex's incident edges form a
//! linked run of slots inside one arena shared by the whole graph,
//! terminated by a sentinel slot that holds no edge; a vertex with no
//! incident edges has no run and no sentinel. A non-self-loop edge owns
//! one slot in each endpoint's run, a self-loop owns a single slot.
//!
//! This layout gives O(1) edge insertion (new slots are pushed at the
//! head of a run) and O(degree) removal (a linear scan of the endpoint's
//! run), with no pointer aliasing and no cyclic ownership.

use std::iter::FusedIterator;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::attr::Metadata;
use crate::memory::Arena;
use crate::{EdgeIndex, SlotIndex, VertexIndex};

/// Graph-level policy constraining which edge kinds may be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directedness {
    /// Only directed edges.
    Directed,
    /// Only undirected edges.
    Undirected,
    /// Either kind.
    Mixed,
}

impl Directedness {
    /// Whether an edge with the given directedness may be added under
    /// this policy.
    pub fn allows(self, directed: bool) -> bool {
        match self {
            Directedness::Directed => directed,
            Directedness::Undirected => !directed,
            Directedness::Mixed => true,
        }
    }
}

/// Error returned by [`Graph::add_edge`] and the other fallible graph
/// operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("unknown vertex")]
    UnknownVertex,
    #[error("unknown edge")]
    UnknownEdge,
    #[error("an edge with directed = {directed} cannot be added to a {policy:?} graph")]
    DirectednessMismatch {
        policy: Directedness,
        directed: bool,
    },
}

/// A vertex: an optional display name, a metadata map, and the head of
/// its incidence run.
#[derive(Debug, Clone, Default)]
pub struct Vertex {
    name: Option<String>,
    metadata: Metadata,
    first_slot: Option<SlotIndex>,
}

impl Vertex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// The vertex name. Names are not required to be unique.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// An edge between two vertices.
///
/// For a directed edge, [`Edge::vertex1`] is the source (back) endpoint
/// and [`Edge::vertex2`] the target (front) endpoint.
#[derive(Debug, Clone)]
pub struct Edge {
    name: Option<String>,
    metadata: Metadata,
    vertex1: VertexIndex,
    vertex2: VertexIndex,
    directed: bool,
}

impl Edge {
    pub fn new(vertex1: VertexIndex, vertex2: VertexIndex, directed: bool) -> Self {
        Self {
            name: None,
            metadata: Metadata::new(),
            vertex1,
            vertex2,
            directed,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn vertex1(&self) -> VertexIndex {
        self.vertex1
    }

    pub fn vertex2(&self) -> VertexIndex {
        self.vertex2
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn is_self_loop(&self) -> bool {
        self.vertex1 == self.vertex2
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// The endpoint opposite to `vertex` (which is `vertex` itself for a
    /// self-loop). `None` if `vertex` is not an endpoint.
    pub fn other_endpoint(&self, vertex: VertexIndex) -> Option<VertexIndex> {
        if vertex == self.vertex1 {
            Some(self.vertex2)
        } else if vertex == self.vertex2 {
            Some(self.vertex1)
        } else {
            None
        }
    }
}

/// One entry in the shared incidence arena.
///
/// `edge == None` marks the sentinel terminating a vertex's run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    edge: Option<EdgeIndex>,
    next: Option<SlotIndex>,
}

/// An in-memory mutable graph.
///
/// # Example
///
/// ```
/// use sociograph::{Directedness, Graph, Vertex};
///
/// let mut graph = Graph::new(Directedness::Mixed);
/// let a = graph.add_vertex(Vertex::new());
/// let b = graph.add_vertex(Vertex::new());
///
/// let e1 = graph.add_edge(a, b, true).unwrap();
/// let e2 = graph.add_edge(b, a, false).unwrap();
///
/// assert_eq!(graph.degree(a), 2);
/// graph.remove_edge(e1);
/// assert!(graph.connecting_edges(a, b).eq([e2]));
/// ```
#[derive(Debug, Clone)]
pub struct Graph {
    directedness: Directedness,
    vertices: Arena<VertexIndex, Vertex>,
    edges: Arena<EdgeIndex, Edge>,
    slots: Arena<SlotIndex, Slot>,
}

impl Graph {
    /// Create a new empty graph with the given directedness policy.
    pub fn new(directedness: Directedness) -> Self {
        Self::with_capacity(directedness, 0, 0)
    }

    /// Create a new empty graph with preallocated capacities for
    /// vertices and edges.
    pub fn with_capacity(directedness: Directedness, vertices: usize, edges: usize) -> Self {
        Self {
            directedness,
            vertices: Arena::with_capacity(vertices),
            edges: Arena::with_capacity(edges),
            slots: Arena::with_capacity(edges * 2),
        }
    }

    /// The directedness policy, fixed at construction.
    pub fn directedness(&self) -> Directedness {
        self.directedness
    }

    /// Add a vertex to the graph.
    pub fn add_vertex(&mut self, mut vertex: Vertex) -> VertexIndex {
        vertex.first_slot = None;
        self.vertices.insert(vertex)
    }

    /// Add an edge between two vertices of this graph.
    ///
    /// Fails if either endpoint is unknown or if `directed` is
    /// incompatible with the graph's directedness policy.
    ///
    /// # Example
    ///
    /// ```
    /// use sociograph::{Directedness, Graph, GraphError, Vertex};
    ///
    /// let mut graph = Graph::new(Directedness::Directed);
    /// let a = graph.add_vertex(Vertex::new());
    /// let b = graph.add_vertex(Vertex::new());
    ///
    /// assert!(graph.add_edge(a, b, true).is_ok());
    /// assert_eq!(
    ///     graph.add_edge(a, b, false),
    ///     Err(GraphError::DirectednessMismatch {
    ///         policy: Directedness::Directed,
    ///         directed: false,
    ///     })
    /// );
    /// ```
    pub fn add_edge(
        &mut self,
        vertex1: VertexIndex,
        vertex2: VertexIndex,
        directed: bool,
    ) -> Result<EdgeIndex, GraphError> {
        self.add_edge_with(Edge::new(vertex1, vertex2, directed))
    }

    /// Add a pre-built edge, carrying a name or metadata, to the graph.
    pub fn add_edge_with(&mut self, edge: Edge) -> Result<EdgeIndex, GraphError> {
        if !self.vertices.contains(edge.vertex1) || !self.vertices.contains(edge.vertex2) {
            return Err(GraphError::UnknownVertex);
        }

        if !self.directedness.allows(edge.directed) {
            return Err(GraphError::DirectednessMismatch {
                policy: self.directedness,
                directed: edge.directed,
            });
        }

        let (vertex1, vertex2) = (edge.vertex1, edge.vertex2);
        let index = self.edges.insert(edge);

        self.attach(vertex1, index);
        if vertex2 != vertex1 {
            self.attach(vertex2, index);
        }

        Ok(index)
    }

    /// Remove an edge from the graph, excising its slot from both
    /// endpoints' incidence runs (one run for self-loops).
    ///
    /// Returns the edge if it existed, `None` otherwise.
    pub fn remove_edge(&mut self, edge: EdgeIndex) -> Option<Edge> {
        let (vertex1, vertex2) = {
            let data = self.edges.get(edge)?;
            (data.vertex1, data.vertex2)
        };

        self.detach(vertex1, edge);
        if vertex2 != vertex1 {
            self.detach(vertex2, edge);
        }

        self.edges.remove(edge)
    }

    /// Remove a vertex and, as a side effect, every edge incident to it.
    ///
    /// Returns the vertex if it existed, `None` otherwise.
    pub fn remove_vertex(&mut self, vertex: VertexIndex) -> Option<Vertex> {
        if !self.vertices.contains(vertex) {
            return None;
        }

        let incident: Vec<EdgeIndex> = self.incident_edges(vertex).collect();
        for edge in incident {
            self.remove_edge(edge);
        }

        self.vertices.remove(vertex)
    }

    /// Remove duplicate edges, returning the number removed.
    ///
    /// Two edges are duplicates when they connect the same endpoint pair
    /// with the same directedness, using directed-sensitive pair
    /// ordering: a directed A→B duplicates another directed A→B but not
    /// a directed B→A, while undirected A—B and B—A duplicate each
    /// other. The first edge of each pair survives.
    pub fn remove_duplicate_edges(&mut self) -> usize {
        let vertices: Vec<VertexIndex> = self.vertex_indices().collect();
        let mut removed = 0;

        for vertex in vertices {
            let incident: Vec<EdgeIndex> = self.incident_edges(vertex).collect();
            let mut seen: FxHashSet<(VertexIndex, VertexIndex, bool)> = FxHashSet::default();

            for edge in incident {
                let data = &self.edges[edge];
                let key = if data.directed {
                    (data.vertex1, data.vertex2, true)
                } else {
                    let (lo, hi) = if data.vertex1 <= data.vertex2 {
                        (data.vertex1, data.vertex2)
                    } else {
                        (data.vertex2, data.vertex1)
                    };
                    (lo, hi, false)
                };

                if !seen.insert(key) {
                    self.remove_edge(edge);
                    removed += 1;
                }
            }
        }

        removed
    }

    /// Returns whether the graph has a vertex with a given index.
    #[inline]
    pub fn has_vertex(&self, vertex: VertexIndex) -> bool {
        self.vertices.contains(vertex)
    }

    /// Returns whether the graph has an edge with a given index.
    #[inline]
    pub fn has_edge(&self, edge: EdgeIndex) -> bool {
        self.edges.contains(edge)
    }

    pub fn vertex(&self, vertex: VertexIndex) -> Option<&Vertex> {
        self.vertices.get(vertex)
    }

    pub fn vertex_mut(&mut self, vertex: VertexIndex) -> Option<&mut Vertex> {
        self.vertices.get_mut(vertex)
    }

    pub fn edge(&self, edge: EdgeIndex) -> Option<&Edge> {
        self.edges.get(edge)
    }

    pub fn edge_mut(&mut self, edge: EdgeIndex) -> Option<&mut Edge> {
        self.edges.get_mut(edge)
    }

    /// Number of vertices in the graph.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges in the graph. A self-loop counts once.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has neither vertices nor edges.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    /// Exclusive upper bound on live vertex indices, for sizing side
    /// tables.
    pub fn vertex_upper_bound(&self) -> usize {
        self.vertices.upper_bound()
    }

    /// Iterator over the vertex indices of the graph, in index order.
    pub fn vertex_indices(&self) -> impl Iterator<Item = VertexIndex> + '_ {
        self.vertices.iter().map(|(index, _)| index)
    }

    /// Iterator over the edge indices of the graph, in index order.
    ///
    /// Each edge is yielded exactly once, regardless of how many
    /// incidence slots it occupies.
    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.edges.iter().map(|(index, _)| index)
    }

    /// Iterator over the edges of the graph with their indices, in
    /// index order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIndex, &Edge)> + '_ {
        self.edges.iter()
    }

    /// Iterator over the edges incident to a vertex.
    ///
    /// A self-loop is yielded once. Yields nothing for an unknown
    /// vertex.
    pub fn incident_edges(&self, vertex: VertexIndex) -> IncidentEdges<'_> {
        IncidentEdges {
            slots: &self.slots,
            next: self.vertices.get(vertex).and_then(|v| v.first_slot),
        }
    }

    /// The degree of a vertex. A self-loop contributes one.
    pub fn degree(&self, vertex: VertexIndex) -> usize {
        self.incident_edges(vertex).count()
    }

    /// Iterator over the edges connecting `vertex1` and `vertex2`, in
    /// O(deg(vertex1)). Self-loops are included only when
    /// `vertex1 == vertex2`.
    pub fn connecting_edges(
        &self,
        vertex1: VertexIndex,
        vertex2: VertexIndex,
    ) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.incident_edges(vertex1).filter(move |&edge| {
            let data = &self.edges[edge];
            if data.is_self_loop() {
                vertex1 == vertex2
            } else {
                data.other_endpoint(vertex1) == Some(vertex2)
            }
        })
    }

    /// Iterator over a vertex's incoming and/or outgoing edges.
    ///
    /// A directed edge is incoming at its target and outgoing at its
    /// source; an undirected edge counts as both. A directed self-loop
    /// is both incoming and outgoing at its vertex.
    pub fn edges_in_direction(
        &self,
        vertex: VertexIndex,
        include_incoming: bool,
        include_outgoing: bool,
    ) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.incident_edges(vertex).filter(move |&edge| {
            let data = &self.edges[edge];
            if !data.directed {
                include_incoming || include_outgoing
            } else {
                (include_incoming && data.vertex2 == vertex)
                    || (include_outgoing && data.vertex1 == vertex)
            }
        })
    }

    /// The distinct predecessor and/or successor vertices of a vertex.
    ///
    /// Parallel edges to the same neighbour yield that neighbour once; a
    /// self-loop contributes the vertex itself. Order follows the
    /// incidence run.
    pub fn adjacent_vertices(
        &self,
        vertex: VertexIndex,
        include_predecessors: bool,
        include_successors: bool,
    ) -> Vec<VertexIndex> {
        let mut seen = FxHashSet::default();
        let mut adjacent = Vec::new();

        for edge in self.edges_in_direction(vertex, include_predecessors, include_successors) {
            let other = self.edges[edge]
                .other_endpoint(vertex)
                .expect("incident edge has the vertex as an endpoint");

            if seen.insert(other) {
                adjacent.push(other);
            }
        }

        adjacent
    }

    /// Push a slot for `edge` at the head of `vertex`'s incidence run,
    /// creating the run and its sentinel if the vertex had none. O(1).
    fn attach(&mut self, vertex: VertexIndex, edge: EdgeIndex) {
        let head = match self.vertices[vertex].first_slot {
            Some(first) => self.slots.insert(Slot {
                edge: Some(edge),
                next: Some(first),
            }),
            None => {
                let sentinel = self.slots.insert(Slot {
                    edge: None,
                    next: None,
                });
                self.slots.insert(Slot {
                    edge: Some(edge),
                    next: Some(sentinel),
                })
            }
        };

        self.vertices[vertex].first_slot = Some(head);
    }

    /// Excise `edge`'s slot from `vertex`'s incidence run. O(degree).
    ///
    /// Removing the first slot promotes the next one; removing the last
    /// real slot also removes the sentinel and clears the run head.
    ///
    /// # Panics
    ///
    /// Panics if the edge is not present in the run: the edge arena said
    /// it was incident to this vertex, so its absence means the
    /// incidence index itself is corrupted.
    fn detach(&mut self, vertex: VertexIndex, edge: EdgeIndex) {
        let mut prev: Option<SlotIndex> = None;
        let mut cursor = self.vertices[vertex].first_slot;

        while let Some(slot_index) = cursor {
            let slot = &self.slots[slot_index];

            match slot.edge {
                Some(e) if e == edge => {
                    let next = slot.next;
                    self.slots.remove(slot_index);

                    match prev {
                        Some(prev) => self.slots[prev].next = next,
                        None => {
                            self.vertices[vertex].first_slot = next;

                            // Only the sentinel left: the run is empty.
                            let head = next.expect("a real slot is always followed by another");
                            if self.slots[head].edge.is_none() {
                                self.slots.remove(head);
                                self.vertices[vertex].first_slot = None;
                            }
                        }
                    }

                    return;
                }
                Some(_) => {
                    prev = Some(slot_index);
                    cursor = slot.next;
                }
                None => break,
            }
        }

        panic!("incidence index corrupted: edge {edge} not found in the run of vertex {vertex}");
    }
}

/// Iterator created by [`Graph::incident_edges`].
#[derive(Clone)]
pub struct IncidentEdges<'a> {
    slots: &'a Arena<SlotIndex, Slot>,
    next: Option<SlotIndex>,
}

impl<'a> Iterator for IncidentEdges<'a> {
    type Item = EdgeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = &self.slots[self.next?];

        let Some(edge) = slot.edge else {
            // Sentinel: end of the run.
            self.next = None;
            return None;
        };

        self.next = slot.next;
        Some(edge)
    }
}

impl<'a> FusedIterator for IncidentEdges<'a> {}

#[cfg(test)]
mod test {
    use super::*;

    fn mixed_pair() -> (Graph, VertexIndex, VertexIndex) {
        let mut graph = Graph::new(Directedness::Mixed);
        let a = graph.add_vertex(Vertex::new());
        let b = graph.add_vertex(Vertex::new());
        (graph, a, b)
    }

    #[test]
    fn add_edge_rejects_unknown_vertex() {
        let (mut graph, a, b) = mixed_pair();
        let stale = graph.add_vertex(Vertex::new());
        graph.remove_vertex(stale);

        assert_eq!(graph.add_edge(a, stale, true), Err(GraphError::UnknownVertex));
        assert!(graph.add_edge(a, b, true).is_ok());
    }

    #[test]
    fn incident_run_promotes_and_collapses() {
        let (mut graph, a, b) = mixed_pair();
        let c = graph.add_vertex(Vertex::new());

        let e1 = graph.add_edge(a, b, true).unwrap();
        let e2 = graph.add_edge(a, c, true).unwrap();

        // Head insertion: most recent edge first.
        assert!(graph.incident_edges(a).eq([e2, e1]));

        // Removing the head promotes the next slot.
        graph.remove_edge(e2);
        assert!(graph.incident_edges(a).eq([e1]));

        // Removing the last real slot clears the run entirely.
        graph.remove_edge(e1);
        assert_eq!(graph.degree(a), 0);
        assert!(graph.incident_edges(a).next().is_none());
    }

    #[test]
    fn self_loop_occupies_one_slot() {
        let (mut graph, a, _) = mixed_pair();
        let loop_edge = graph.add_edge(a, a, false).unwrap();

        assert_eq!(graph.degree(a), 1);
        assert!(graph.connecting_edges(a, a).eq([loop_edge]));

        graph.remove_edge(loop_edge);
        assert_eq!(graph.degree(a), 0);
    }

    #[test]
    fn remove_vertex_removes_incident_edges() {
        let (mut graph, a, b) = mixed_pair();
        let c = graph.add_vertex(Vertex::new());

        let ab = graph.add_edge(a, b, true).unwrap();
        let bc = graph.add_edge(b, c, true).unwrap();
        let aa = graph.add_edge(a, a, true).unwrap();

        graph.remove_vertex(a);

        assert!(!graph.has_edge(ab));
        assert!(!graph.has_edge(aa));
        assert!(graph.has_edge(bc));
        assert_eq!(graph.degree(b), 1);
    }

    #[test]
    fn edges_in_direction_classifies_endpoints() {
        let (mut graph, a, b) = mixed_pair();

        let incoming = graph.add_edge(b, a, true).unwrap();
        let outgoing = graph.add_edge(a, b, true).unwrap();
        let undirected = graph.add_edge(a, b, false).unwrap();

        let incoming_at_a: Vec<_> = graph.edges_in_direction(a, true, false).collect();
        let outgoing_at_a: Vec<_> = graph.edges_in_direction(a, false, true).collect();

        assert!(incoming_at_a.contains(&incoming));
        assert!(incoming_at_a.contains(&undirected));
        assert!(!incoming_at_a.contains(&outgoing));

        assert!(outgoing_at_a.contains(&outgoing));
        assert!(outgoing_at_a.contains(&undirected));
        assert!(!outgoing_at_a.contains(&incoming));
    }

    #[test]
    fn adjacent_vertices_deduplicates() {
        let (mut graph, a, b) = mixed_pair();

        graph.add_edge(a, b, true).unwrap();
        graph.add_edge(a, b, true).unwrap();
        graph.add_edge(a, a, true).unwrap();

        let adjacent = graph.adjacent_vertices(a, true, true);
        assert_eq!(adjacent.len(), 2);
        assert!(adjacent.contains(&a));
        assert!(adjacent.contains(&b));
    }

    #[test]
    fn duplicate_removal_is_direction_sensitive() {
        let mut graph = Graph::new(Directedness::Directed);
        let a = graph.add_vertex(Vertex::new());
        let b = graph.add_vertex(Vertex::new());

        graph.add_edge(a, b, true).unwrap();
        graph.add_edge(a, b, true).unwrap();
        graph.add_edge(b, a, true).unwrap();

        // A→B duplicated once; B→A is a different directed pair.
        assert_eq!(graph.remove_duplicate_edges(), 1);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn duplicate_removal_ignores_order_for_undirected() {
        let mut graph = Graph::new(Directedness::Undirected);
        let a = graph.add_vertex(Vertex::new());
        let b = graph.add_vertex(Vertex::new());

        graph.add_edge(a, b, false).unwrap();
        graph.add_edge(b, a, false).unwrap();

        assert_eq!(graph.remove_duplicate_edges(), 1);
        assert_eq!(graph.edge_count(), 1);
    }
}
