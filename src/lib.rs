//! An in-memory mutable graph core for social-network analysis.
//!
//! The centrepiece is [`Graph`]: an arena-backed container of vertices
//! and edges whose incidence index is a single shared arena of linked
//! slots, giving O(1) edge insertion and O(degree) removal without any
//! pointer aliasing. On top of it sit the analysis algorithms —
//! strongly connected components ([`algo::scc`]), edge reciprocation and
//! the reciprocated vertex-pair ratio ([`algo::reciprocation`]) — and a
//! file-protocol bridge to an external metrics calculator
//! ([`external`]).
//!
//! # Example
//!
//! ```
//! use sociograph::{Directedness, Graph, Vertex};
//!
//! let mut graph = Graph::new(Directedness::Directed);
//! let a = graph.add_vertex(Vertex::with_name("alice"));
//! let b = graph.add_vertex(Vertex::with_name("bob"));
//!
//! let e = graph.add_edge(a, b, true).unwrap();
//! assert_eq!(graph.degree(a), 1);
//! assert!(graph.connecting_edges(a, b).eq([e]));
//! ```

pub mod algo;
pub mod attr;
pub mod external;
pub mod graph;
pub mod group;
pub mod memory;


pub use attr::{AttrValue, Metadata, LAYOUT_ORDER_KEY};
pub use graph::{Directedness, Edge, Graph, GraphError, Vertex};
pub use group::GroupInfo;

crate::make_entity! {
    /// Index of a vertex within a [`Graph`].
    pub struct VertexIndex(u32);

    /// Index of an edge within a [`Graph`].
    pub struct EdgeIndex(u32);

    /// Index of an incidence slot within a [`Graph`]'s shared slot arena.
    pub struct SlotIndex(u32);
}
