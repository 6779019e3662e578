//! # Endpoint discovery and binding.
//!
//! - [`Registry`]: query/bind contract with the external registry ([`AlsaRegistry`])
//! - [`find_endpoint`]: id extraction from a textual listing
//! - [`EndpointResolver`]: the retrying connection protocol

mod listing;
mod protocol;
mod registry;

#[cfg(test)]
pub(crate) mod mock;

pub use listing::find_endpoint;
pub use protocol::{Binding, EndpointResolver};
pub use registry::{AlsaRegistry, Registry};
