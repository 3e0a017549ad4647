use uuid::Uuid;

/// Returns a fresh process-unique token.
///
/// Records are assigned one of these at construction and use it as their
/// identity until the server supplies a real id.
pub fn unique_id() -> String {
    Uuid::new_v4().to_string()
}
