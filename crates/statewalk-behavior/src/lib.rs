pub mod behavior;
pub mod cases;
pub mod serialize;

pub use behavior::{Behavior, BehaviorError, EventTagged};
pub use cases::{CaseLookup, CaseSource, CasedBehavior};
pub use serialize::{CanonicalSerializer, StateKey, StateSerializer};
