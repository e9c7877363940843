use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Builds the anti-forgery state token minted into install links.
///
/// The token is `"{timestamp}.{hex(HMAC-SHA256(client_secret, timestamp))}"`
/// — a pure function of timestamp and secret, so a callback can be verified
/// statelessly without server-side session storage.
pub fn generate_state(client_secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(client_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    format!("{timestamp}.{}", hex::encode(mac.finalize().into_bytes()))
}

/// Re-derives the expected token from the embedded timestamp and compares.
/// Malformed tokens verify false rather than erroring.
pub fn verify_state(client_secret: &str, state: &str) -> bool {
    let Some((timestamp, given)) = state.split_once('.') else {
        return false;
    };
    let Ok(timestamp) = timestamp.parse::<i64>() else {
        return false;
    };
    let expected = generate_state(client_secret, timestamp);
    expected
        .split_once('.')
        .is_some_and(|(_, digest)| digest == given)
}
