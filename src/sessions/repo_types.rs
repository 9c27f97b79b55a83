use time::OffsetDateTime;

/// A freshly issued session. `token` is the only copy of the plaintext token;
/// the store keeps its digest.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}
