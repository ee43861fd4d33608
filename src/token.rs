use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
#[error("while signing JWT token: {0}")]
pub struct SigningError(#[from] jsonwebtoken::errors::Error);

#[derive(Serialize)]
struct Claims<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    iat: u64,
}

/// Session token for direct registry access, HS256 signed with `secret`.
pub fn issue(user_id: &str, secret: &str) -> Result<String, SigningError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    issue_at(user_id, secret, now)
}

fn issue_at(user_id: &str, secret: &str, iat: u64) -> Result<String, SigningError> {
    let claims = Claims { user_id, iat };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    log::debug!("issued session token for user {}", user_id);
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
    use serde_json::{Value, json};

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation
    }

    #[test]
    fn token_carries_exactly_user_and_issued_at() {
        let token = issue_at("user-1", "s3cret", 1_700_000_000).unwrap();
        let key = DecodingKey::from_secret(b"s3cret");
        let data = decode::<Value>(&token, &key, &validation()).unwrap();
        assert_eq!(data.header.alg, Algorithm::HS256);
        assert_eq!(
            data.claims,
            json!({"userId": "user-1", "iat": 1_700_000_000u64})
        );
    }

    #[test]
    fn wrong_secret_does_not_verify() {
        let token = issue("user-1", "s3cret").unwrap();
        assert_eq!(token.split('.').count(), 3);
        let key = DecodingKey::from_secret(b"other");
        assert!(decode::<Value>(&token, &key, &validation()).is_err());
    }
}
