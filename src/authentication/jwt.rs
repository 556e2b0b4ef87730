use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, User};
use crate::error::Error;
use crate::schema::UserRole;

use super::permissions::ActionType;

/// Signing key and token lifetime for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], lifetime_hours: i64) -> Result<Self, Error> {
        let key: Hmac<Sha256> = Hmac::new_from_slice(secret)
            .map_err(|e| Error::Config(format!("invalid session secret: {e}")))?;

        Ok(Self {
            key,
            lifetime: Duration::hours(lifetime_hours),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(user: &User, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: user.id,
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            role: user.role,
            iat,
            exp,
        }
    }
}

/// The authenticated identity threaded through every write.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Forbidden(
                "You don't have permission to perform this action".to_string(),
            ));
        }
        Ok(())
    }

    /// Authors manage their own objects with `own`, admins everybody's with `all`.
    pub fn authenticate_owner(
        &self,
        owner_id: Id,
        own: ActionType,
        all: ActionType,
    ) -> Result<(), Error> {
        self.authenticate(own)?;
        if owner_id == self.user_id || all.authenticate(self) {
            return Ok(());
        }
        Err(Error::Forbidden(
            "You don't have permission to perform this action".to_string(),
        ))
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            email: value.email,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

pub fn generate_jwt_session(user: &User, keys: &SessionKeys) -> Result<String, Error> {
    let claims = JwtSessionData::new(user, keys.lifetime);

    claims
        .sign_with_key(&keys.key)
        .map_err(|e| Error::Internal(format!("failed to sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, keys: &SessionKeys) -> Result<JwtSessionData, Error> {
    let session: JwtSessionData = token
        .verify_with_key(&keys.key)
        .map_err(|_| Error::Unauthorized("Invalid session; Invalid token".to_string()))?;

    let now = Utc::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(Error::Unauthorized(
            "Invalid session; Token expired".to_string(),
        ));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 42,
            email: "cook@example.com".into(),
            username: "cook".into(),
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            password: String::new(),
            role: UserRole::User,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_verify() {
        let keys = SessionKeys::new(b"secret", 1).unwrap();
        let token = generate_jwt_session(&user(), &keys).unwrap();

        let session: SessionData = verify_jwt_session(&token, &keys).unwrap().into();
        assert_eq!(session.user_id, 42);
        assert_eq!(session.email, "cook@example.com");
        assert!(!session.is_admin);
    }

    #[test]
    fn tokens_from_another_key_are_rejected() {
        let keys = SessionKeys::new(b"secret", 1).unwrap();
        let other = SessionKeys::new(b"another secret", 1).unwrap();
        let token = generate_jwt_session(&user(), &other).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, &keys),
            Err(Error::Unauthorized(_))
        ));
        assert!(verify_jwt_session("garbage", &keys).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let keys = SessionKeys::new(b"secret", -1).unwrap();
        let token = generate_jwt_session(&user(), &keys).unwrap();

        let error = verify_jwt_session(&token, &keys).unwrap_err();
        assert_eq!(error.to_string(), "Invalid session; Token expired");
    }

    #[test]
    fn owners_and_admins_manage_objects() {
        let session: SessionData = JwtSessionData::new(&user(), Duration::hours(1)).into();
        let own = ActionType::ManageOwnRecipes;
        let all = ActionType::ManageAllRecipes;

        assert!(session.authenticate_owner(42, own, all).is_ok());
        assert!(matches!(
            session.authenticate_owner(7, own, all),
            Err(Error::Forbidden(_))
        ));

        let admin = SessionData {
            role: UserRole::Admin,
            is_admin: true,
            ..session
        };
        assert!(admin.authenticate_owner(7, own, all).is_ok());
    }
}
