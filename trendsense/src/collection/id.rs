use rand::distributions::Alphanumeric;
use rand::Rng;

const AUTO_ID_LENGTH: usize = 20;

/// Generates a key for a new document in the in-memory store.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generates a Firestore-style auto id: 20 random alphanumeric characters.
pub fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LENGTH)
        .map(char::from)
        .collect()
}
