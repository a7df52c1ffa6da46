//! Track metadata: canonical tags, containers, and embedding

pub mod container;
pub mod cover;
pub mod embed;
pub mod flac;
pub mod tags;

pub use container::ContainerKind;
pub use embed::{embed, EmbedError};
pub use tags::CanonicalTags;
