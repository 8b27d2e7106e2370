use rand::Rng;

/// Random lowercase hex string made of `bytes` random bytes.
pub(crate) fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..bytes)
        .map(|_| format!("{:02x}", rng.gen::<u8>()))
        .collect()
}

/// Reference handed out by the mock payment provider, `pi_mock_` + 24 hex chars.
pub(crate) fn mock_provider_ref() -> String {
    format!("pi_mock_{}", random_hex(12))
}

/// Token printed into a freshly created table's QR code.
pub(crate) fn table_token() -> String {
    random_hex(16)
}
