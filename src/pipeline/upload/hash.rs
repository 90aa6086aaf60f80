use sha2::{Digest, Sha256};

/// SHA-256 of the uploaded bytes, lowercase hex. Recorded in the report so
/// an exported artifact can be matched back to the exact file analyzed.
pub fn content_sha256(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
