//! Basic smoke test to verify the public API surface.

#[test]
fn crate_compiles() {
    // If this test runs, the public re-exports resolve.
    let _ = std::any::type_name::<licentia::LicenseManager>();
    let _ = std::any::type_name::<licentia::LicentiaError>();
    let _ = std::any::type_name::<licentia::ClientConfig>();
    let _ = std::any::type_name::<licentia::LicenseClient<licentia::client::HttpTransport>>();
}

#[test]
fn error_messages_are_readable() {
    let error = licentia::LicentiaError::PlaintextTooLong { len: 120, max: 117 };
    assert_eq!(error.to_string(), "Input too long for RSA block (120 bytes, max 117)");
}
