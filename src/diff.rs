//! Delta computation between consecutive successful results

use serde::Serialize;

/// Change between two consecutive successful results of the same shape
///
/// Implementations are pure per-domain functions; the runner only calls
/// [`Diff::diff`] when a previous successful value of the same kind exists,
/// so implementations never see mixed shapes.
pub trait Diff {
    type Delta: Serialize;

    fn diff(&self, previous: &Self) -> Self::Delta;
}

/// Delta with no fields; serializes as `{}`
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EmptyDelta {}

/// Sequences resize between polls and carry no alignment rule, so
/// element-wise comparison is not meaningful; histories diff to nothing.
impl<T> Diff for Vec<T> {
    type Delta = EmptyDelta;

    fn diff(&self, _previous: &Self) -> EmptyDelta {
        EmptyDelta {}
    }
}
