//! Domain event trait.

use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event name.
    ///
    /// This is the `name` column of the stored record and the tag used to
    /// pick a payload decoder when reading it back.
    fn name(&self) -> &'static str;
}
