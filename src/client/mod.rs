//! HTTP clients for the publisher and the release feed.

pub mod http;

pub use http::{build_user_agent, HttpFeed, HttpTransport};
