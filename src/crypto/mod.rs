//! Cryptographic primitives: bignum RSA, strong-name blobs, the transport
//! cipher and the signed text envelope.

pub mod bigint;
pub mod digest;
pub mod rsa;
pub mod signing;
pub mod snk;
pub mod symmetric;
