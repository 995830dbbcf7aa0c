//! Index-based storage primitives shared by the graph container and the
//! algorithms' per-call scratch tables.
//!
//! Entities (vertices, edges, incidence slots) are addressed by small
//! `u32`-backed index newtypes instead of references, so the graph never
//! holds cyclic ownership and side tables can be addressed by plain
//! array indexing.

pub mod arena;
pub mod map;

pub use arena::Arena;
pub use map::SecondaryMap;

/// A copyable index type addressing one kind of entity.
pub trait EntityIndex: Copy + Eq + Default {
    fn new(index: usize) -> Self {
        Self::try_new(index).unwrap()
    }

    fn try_new(index: usize) -> Option<Self>;
    fn index(self) -> usize;
}

/// Mints a `u32`-backed entity index newtype.
#[macro_export]
macro_rules! make_entity {
    ($($(#[$doc:meta])* pub struct $entity:ident(u32);)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $entity(u32);

            impl $crate::memory::EntityIndex for $entity {
                #[inline(always)]
                fn try_new(index: usize) -> Option<Self> {
                    if index <= u32::MAX as usize {
                        Some($entity(index as u32))
                    } else {
                        None
                    }
                }

                #[inline(always)]
                fn index(self) -> usize {
                    self.0 as usize
                }
            }

            impl std::fmt::Display for $entity {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}
