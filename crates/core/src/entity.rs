//! Entity trait: records with a stable identity.

/// A stored record with a strongly-typed identifier.
///
/// `KIND` is the lowercase resource name used in logs, error messages and
/// authorization explanations (e.g. `"activity"`).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
