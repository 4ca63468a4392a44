//! Typed indices for models and activities.
//!
//! Both are dense `u32` positions into arena `Vec`s and are never reused
//! within a run, so ordering two ids orders the things they name.

use std::fmt;

macro_rules! arena_id {
    ($(#[$attr:meta])* $name:ident, $label:literal) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u32);

        impl $name {
            /// Id of the `i`-th arena slot.  Arenas never exceed `u32::MAX` entries.
            #[inline]
            pub fn from_index(i: usize) -> Self {
                $name(i as u32)
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

arena_id! {
    /// Position of an atomic model in the flattened hierarchy.
    ///
    /// Ids are assigned depth-first in declaration order, so comparing two
    /// `ModelId`s compares the models' structural positions.  The coordinator
    /// relies on this to order simultaneous events.
    ModelId, "model"
}

arena_id! {
    /// Index of an activity in a plan's arena.  Activities are only ever
    /// appended, so an id stays valid for the plan's lifetime.
    ActivityId, "activity"
}
