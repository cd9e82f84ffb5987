//! Publisher/client license protocol.
//!
//! A single call carries a [`PublishRequest`] from client to publisher and
//! an encrypted response string back. The response is either a signed
//! license or an `Error:`-prefixed message, encrypted under the client's
//! license key.

pub mod client;
pub mod models;
pub mod publisher;

pub use client::{LicenseClient, PublisherTransport};
pub use models::{LicenseRequest, Licensee, PublishRequest, PublisherResponse};
pub use publisher::{LicenseIssuer, LicensePublisher};
