/// Current UTC timestamp in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a client-side order ID: `order-<epoch_ms>-<random_suffix>`.
///
/// The ID doubles as the idempotency key: a retried submission reuses the
/// same ID, so the server can detect duplicates without coordination.
/// The 6-character alphanumeric suffix keeps concurrent terminals from
/// colliding within the same millisecond.
pub fn generate_order_id() -> String {
    use rand::Rng;
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("order-{}-{}", now_millis(), suffix)
}
