use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
};

/// Signs and verifies session tokens. The principal is embedded at issuance
/// and trusted until expiry.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, user: &AuthUser) -> AppResult<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user.user_id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            restaurant_id: user.restaurant_id,
            iat: now.timestamp() as usize,
            exp: expiration.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    pub fn verify(&self, token: &str) -> AppResult<AuthUser> {
        let decoded = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
        let claims = decoded.claims;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            name: claims.name,
            role: claims.role,
            restaurant_id: claims.restaurant_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Role;

    fn manager() -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "chef@example.com".into(),
            name: "Chef".into(),
            role: Role::RestaurantManager,
            restaurant_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn issued_token_carries_the_principal() {
        let keys = TokenKeys::new(b"secret", Duration::hours(1));
        let user = manager();
        let token = keys.issue(&user).unwrap();
        let back = keys.verify(&token).unwrap();
        assert_eq!(back.user_id, user.user_id);
        assert_eq!(back.role, Role::RestaurantManager);
        assert_eq!(back.restaurant_id, user.restaurant_id);
        assert_eq!(back.email, user.email);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = TokenKeys::new(b"one", Duration::hours(1))
            .issue(&manager())
            .unwrap();
        let err = TokenKeys::new(b"two", Duration::hours(1))
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new(b"secret", Duration::hours(-2));
        let token = keys.issue(&manager()).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized(_))));
    }
}
