use rand::distributions::Alphanumeric;
use rand::Rng;

const TOKEN_LENGTH: usize = 32;

/// Generate an opaque confirmation token for unauthenticated
/// confirm/cancel links.
pub fn confirmation_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
