//! Authenticator and password hiding per RFC 2865 Section 3 and 5.2

use crate::packet::PacketError;
use rand::Rng;

/// Longest User-Password accepted by RFC 2865 Section 5.2
pub const MAX_PASSWORD_LENGTH: usize = 128;

const BLOCK: usize = 16;

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// MD5(Code + ID + Length + Authenticator + Attributes + Secret)
fn packet_digest(header: &[u8], authenticator: &[u8; 16], attributes: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut context = md5::Context::new();
    context.consume(header);
    context.consume(authenticator);
    context.consume(attributes);
    context.consume(secret);
    context.compute().0
}

/// Calculate Response Authenticator per RFC 2865 Section 3
///
/// `header` is the first four bytes of the encoded response and
/// `attributes` everything after the authenticator field.
pub fn calculate_response_authenticator(
    header: &[u8],
    request_authenticator: &[u8; 16],
    attributes: &[u8],
    secret: &[u8],
) -> [u8; 16] {
    packet_digest(header, request_authenticator, attributes, secret)
}

/// Calculate the Accounting-Request Authenticator per RFC 2866 Section 3
///
/// Same digest as the response authenticator with sixteen zero bytes in
/// place of the request authenticator.
pub fn calculate_accounting_request_authenticator(
    header: &[u8],
    attributes: &[u8],
    secret: &[u8],
) -> [u8; 16] {
    packet_digest(header, &[0u8; 16], attributes, secret)
}

/// Constant-time authenticator comparison
pub fn authenticators_match(expected: &[u8; 16], received: &[u8]) -> bool {
    received.len() == expected.len()
        && expected
            .iter()
            .zip(received)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Verify the authenticator of an encoded response against its request
pub fn verify_response_authenticator(
    response: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    if response.len() < 20 {
        return false;
    }
    let expected =
        calculate_response_authenticator(&response[..4], request_authenticator, &response[20..], secret);
    authenticators_match(&expected, &response[4..20])
}

/// Verify the authenticator of an encoded Accounting-Request
pub fn verify_accounting_request_authenticator(request: &[u8], secret: &[u8]) -> bool {
    if request.len() < 20 {
        return false;
    }
    let expected = calculate_accounting_request_authenticator(&request[..4], &request[20..], secret);
    authenticators_match(&expected, &request[4..20])
}

/// XOR `input` block by block with MD5(secret + previous), chaining on `chain(out, in)`
fn hide<F>(input: &[u8], secret: &[u8], authenticator: &[u8; 16], chain: F) -> Vec<u8>
where
    F: Fn(&[u8], &[u8]) -> [u8; 16],
{
    let mut result = Vec::with_capacity(input.len());
    let mut previous = *authenticator;

    for chunk in input.chunks(BLOCK) {
        let mut context = md5::Context::new();
        context.consume(secret);
        context.consume(previous);
        let hash = context.compute();

        let block: Vec<u8> = chunk.iter().zip(hash.0).map(|(c, h)| c ^ h).collect();
        previous = chain(&block, chunk);
        result.extend_from_slice(&block);
    }

    result
}

fn to_block(bytes: &[u8]) -> [u8; 16] {
    let mut block = [0u8; 16];
    block.copy_from_slice(bytes);
    block
}

/// Encrypt User-Password attribute per RFC 2865 Section 5.2
///
/// The password is zero padded to a multiple of 16 bytes (at least one
/// block) before hiding.
pub fn encrypt_user_password(
    password: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(PacketError::PasswordTooLong(password.len()));
    }

    let padded_length = password.len().div_ceil(BLOCK).max(1) * BLOCK;
    let mut padded = password.to_vec();
    padded.resize(padded_length, 0);

    Ok(hide(&padded, secret, authenticator, |encrypted, _| to_block(encrypted)))
}

/// Decrypt User-Password attribute per RFC 2865 Section 5.2
///
/// The result is raw bytes with the zero padding removed. A wrong secret
/// yields garbage rather than an error.
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    if encrypted.is_empty() || encrypted.len() % BLOCK != 0 || encrypted.len() > MAX_PASSWORD_LENGTH {
        return Err(PacketError::InvalidPassword(format!(
            "Invalid encrypted password length: {}",
            encrypted.len()
        )));
    }

    let mut result = hide(encrypted, secret, authenticator, |_, ciphertext| to_block(ciphertext));
    while result.last() == Some(&0) {
        result.pop();
    }

    Ok(result)
}

/// CHAP response per RFC 1994: MD5(Identifier + Password + Challenge)
pub fn compute_chap_response(ident: u8, password: &[u8], challenge: &[u8]) -> [u8; 16] {
    let mut context = md5::Context::new();
    context.consume([ident]);
    context.consume(password);
    context.consume(challenge);
    context.compute().0
}
