use rand::distributions::Uniform;
use rand::prelude::*;
use sha1::{Digest, Sha1};

const SESSION_ID_LEN: usize = 32;
const SESSION_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Fills `out` with cryptographically secure random bytes
/// (`flux::crypto::random_bytes`, re-grounded on `rand` now that the
/// workspace carries no `libsodium_sys` dependency).
pub fn random_bytes(out: &mut [u8]) {
    thread_rng().fill_bytes(out);
}

/// A session id: 32 lowercase letters drawn from a CSPRNG (§4.10).
pub fn generate_session_id() -> String {
    let mut rng = thread_rng();
    let distribution = Uniform::new(0, SESSION_ID_ALPHABET.len());
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_ALPHABET[rng.sample(distribution)] as char)
        .collect()
}

/// `UPPER(SHA1(data))` as hex, the digest format the service-protocol
/// handshake and legacy password hashes both use (§4.9, §4.10).
pub fn sha1_hex_upper(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().iter().map(|byte| format!("{:02X}", byte)).collect()
}

/// Hashes a plaintext password with bcrypt for storage in the
/// service-locator's account table.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// Verifies `password` against `stored_hash`, accepting either a
/// bcrypt hash or the legacy plain-SHA1 format recognised by a stored
/// hash that does not begin with `$` (§4.10).
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    if stored_hash.starts_with('$') {
        bcrypt::verify(password, stored_hash).unwrap_or(false)
    } else {
        sha1_hex_upper(password.as_bytes()).eq_ignore_ascii_case(stored_hash)
    }
}
