//! Authenticator computation and User-Password obfuscation (RFC 2865 Sections
//! 3 and 5.2, RFC 2866 Section 3)
//!
//! The authenticator helpers work on an encoded packet: the header and the
//! attribute bytes are taken from `raw`, while its 16-byte authenticator field
//! is replaced by the value the construction calls for.

use md5::Context;
use rand::Rng;
use thiserror::Error;

/// Length of the Authenticator field
pub const AUTHENTICATOR_LENGTH: usize = 16;
/// Maximum length of a User-Password value (RFC 2865 Section 5.2)
pub const MAX_PASSWORD_LENGTH: usize = 128;

const HEADER_LENGTH: usize = 4;
const BLOCK_SIZE: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Invalid encrypted password length: {0} (must be a non-zero multiple of 16)")]
    InvalidLength(usize),
    #[error("Password too long: {0} bytes (max {MAX_PASSWORD_LENGTH})")]
    TooLong(usize),
}

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; AUTHENTICATOR_LENGTH] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; AUTHENTICATOR_LENGTH];
    rng.fill(&mut authenticator);
    authenticator
}

/// MD5(Code + ID + Length + `authenticator` + Attributes + Secret)
fn digest_with(raw: &[u8], authenticator: &[u8; AUTHENTICATOR_LENGTH], secret: &[u8]) -> [u8; 16] {
    let header = &raw[..raw.len().min(HEADER_LENGTH)];
    let attributes = raw.get(HEADER_LENGTH + AUTHENTICATOR_LENGTH..).unwrap_or(&[]);

    let mut ctx = Context::new();
    ctx.consume(header);
    ctx.consume(authenticator);
    ctx.consume(attributes);
    ctx.consume(secret);
    ctx.compute().0
}

/// Calculate Response Authenticator per RFC 2865 Section 3
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
///
/// Used for Access-Accept, Access-Reject, Access-Challenge and
/// Accounting-Response. `raw` must already carry its final length field.
pub fn calculate_response_authenticator(
    raw: &[u8],
    request_authenticator: &[u8; AUTHENTICATOR_LENGTH],
    secret: &[u8],
) -> [u8; AUTHENTICATOR_LENGTH] {
    digest_with(raw, request_authenticator, secret)
}

/// Calculate the Accounting-Request Authenticator per RFC 2866 Section 3
///
/// Same construction as the Response Authenticator with sixteen zero octets
/// in place of the Request Authenticator.
pub fn calculate_accounting_request_authenticator(
    raw: &[u8],
    secret: &[u8],
) -> [u8; AUTHENTICATOR_LENGTH] {
    digest_with(raw, &[0u8; AUTHENTICATOR_LENGTH], secret)
}

/// Verify the Response Authenticator of a received reply
///
/// Client-side check that `raw` answers the request sent with
/// `request_authenticator` and was produced by a peer knowing `secret`.
pub fn verify_response_authenticator(
    raw: &[u8],
    request_authenticator: &[u8; AUTHENTICATOR_LENGTH],
    secret: &[u8],
) -> bool {
    match raw.get(HEADER_LENGTH..HEADER_LENGTH + AUTHENTICATOR_LENGTH) {
        Some(received) => {
            received == calculate_response_authenticator(raw, request_authenticator, secret)
        }
        None => false,
    }
}

/// XOR each 16-byte block with MD5(secret + previous), where previous is the
/// authenticator for the first block and the previous ciphertext block after
fn password_stream(
    input: &[u8],
    secret: &[u8],
    authenticator: &[u8; AUTHENTICATOR_LENGTH],
    decrypt: bool,
) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());
    let mut previous = authenticator.to_vec();

    for chunk in input.chunks(BLOCK_SIZE) {
        let mut ctx = Context::new();
        ctx.consume(secret);
        ctx.consume(&previous);
        let hash = ctx.compute();

        let block: Vec<u8> = chunk.iter().zip(hash.0.iter()).map(|(c, h)| c ^ h).collect();
        previous = if decrypt { chunk.to_vec() } else { block.clone() };
        output.extend_from_slice(&block);
    }

    output
}

/// Encrypt User-Password attribute per RFC 2865 Section 5.2
///
/// The password is NUL-padded to a multiple of 16 bytes (at least one block)
/// before it is XORed with the MD5 stream.
pub fn encrypt_user_password(
    password: impl AsRef<[u8]>,
    secret: &[u8],
    authenticator: &[u8; AUTHENTICATOR_LENGTH],
) -> Result<Vec<u8>, PasswordError> {
    let password = password.as_ref();
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong(password.len()));
    }

    let padded_len = password.len().div_ceil(BLOCK_SIZE).max(1) * BLOCK_SIZE;
    let mut padded = password.to_vec();
    padded.resize(padded_len, 0);

    Ok(password_stream(&padded, secret, authenticator, false))
}

/// Decrypt User-Password attribute per RFC 2865 Section 5.2
///
/// Trailing NUL padding is removed from the result.
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; AUTHENTICATOR_LENGTH],
) -> Result<Vec<u8>, PasswordError> {
    if encrypted.is_empty() || encrypted.len() % BLOCK_SIZE != 0 {
        return Err(PasswordError::InvalidLength(encrypted.len()));
    }
    if encrypted.len() > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong(encrypted.len()));
    }

    let mut result = password_stream(encrypted, secret, authenticator, true);
    while result.last() == Some(&0) {
        result.pop();
    }
    Ok(result)
}
