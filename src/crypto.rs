use std::time;

use jsonwebtoken as jwt;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::models::{User, UserId};
use crate::{Error, Result};

pub fn encode_password(pass : &[u8]) -> Result<String> {
    let mut salt = [0u8; 32];

    tokio::task::block_in_place(|| -> Result<String> {
        thread_rng().fill(&mut salt);

        Ok(argon2::hash_encoded(pass, &salt, &Default::default())?)
    })
}

pub fn verify_password(encoded : &str, pass : &[u8]) -> Result<bool> {
    tokio::task::block_in_place(|| -> Result<bool> {
        Ok(argon2::verify_encoded(encoded, pass)?)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub iss :     String,
    pub aud :     String,
    pub sub :     String,
    pub version : u32,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    iss :     String,
    aud :     String,
    sub :     String,
    version : u32,
    iat :     u64,
    exp :     u64,
}

impl Token {
    pub fn issue(
        &self,
        secret : &[u8],
        exp_duration : time::Duration,
    ) -> Result<String> {
        let now = time::SystemTime::now();

        let iat = now.duration_since(time::UNIX_EPOCH)?.as_secs();

        let exp = now
            .checked_add(exp_duration)
            .ok_or(Error::TokenDurationTooBig)?
            .duration_since(time::UNIX_EPOCH)?
            .as_secs();

        let claims = Claims {
            iss : self.iss.clone(),
            aud : self.aud.clone(),
            sub : self.sub.clone(),
            version : self.version,
            iat,
            exp,
        };

        Ok(jwt::encode(
            &jwt::Header::default(),
            &claims,
            &jwt::EncodingKey::from_secret(secret),
        )?)
    }

    /// Checks signature, expiry, and that both issuer and audience are `iss`.
    pub fn validate(token : &str, secret : &[u8], iss : &str) -> Result<Self> {
        let mut validation = jwt::Validation::new(jwt::Algorithm::HS256);
        validation.set_issuer(&[iss]);
        validation.set_audience(&[iss]);

        let claims = jwt::decode::<Claims>(
            token,
            &jwt::DecodingKey::from_secret(secret),
            &validation,
        )?
        .claims;

        Ok(Self {
            iss :     claims.iss,
            aud :     claims.aud,
            sub :     claims.sub,
            version : claims.version,
        })
    }
}

/// Token settings shared by everything that hands out or checks tokens.
#[derive(Clone)]
pub struct Issuer {
    pub server_name : String,
    pub secret :      Vec<u8>,
    pub ttl :         time::Duration,
}

impl Issuer {
    pub fn issue(&self, user : &User) -> Result<String> {
        Token {
            iss :     self.server_name.clone(),
            aud :     self.server_name.clone(),
            sub :     user.id.to_string(),
            version : user.token_version,
        }
        .issue(&self.secret, self.ttl)
    }

    /// Returns the user id and token version a valid token was issued for.
    pub fn verify(&self, token : &str) -> Result<(UserId, u32)> {
        let tok = Token::validate(token, &self.secret, &self.server_name)?;

        let user_id = tok.sub.parse().map_err(|_| Error::Unauthorized)?;

        Ok((user_id, tok.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET : &[u8] = b"test-secret";

    fn token() -> Token {
        Token {
            iss :     "links.test".to_string(),
            aud :     "links.test".to_string(),
            sub :     "7".to_string(),
            version : 0,
        }
    }

    #[test]
    fn issued_tokens_validate() {
        let tok = token()
            .issue(SECRET, time::Duration::from_secs(60))
            .unwrap();

        let back = Token::validate(&tok, SECRET, "links.test").unwrap();
        assert_eq!(back, token());
    }

    #[test]
    fn wrong_secret_or_issuer_is_rejected() {
        let tok = token()
            .issue(SECRET, time::Duration::from_secs(60))
            .unwrap();

        assert!(Token::validate(&tok, b"other", "links.test").is_err());
        assert!(Token::validate(&tok, SECRET, "elsewhere").is_err());
    }

    #[test]
    fn absurd_durations_fail() {
        let err = token()
            .issue(SECRET, time::Duration::MAX)
            .unwrap_err();

        assert!(matches!(err, Error::TokenDurationTooBig));
    }

    #[test]
    fn issuer_round_trips_user_ids() {
        let issuer = Issuer {
            server_name : "links.test".to_string(),
            secret :      SECRET.to_vec(),
            ttl :         time::Duration::from_secs(60),
        };

        let user = User {
            id :            12,
            name :          "ada".to_string(),
            password :      String::new(),
            token_version : 3,
            created :       ::time::OffsetDateTime::UNIX_EPOCH.into(),
        };

        let tok = issuer.issue(&user).unwrap();
        assert_eq!(issuer.verify(&tok).unwrap(), (12, 3));
        assert!(issuer.verify("not.a.token").is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn passwords_verify() {
        let enc = encode_password(b"hunter2").unwrap();

        assert!(verify_password(&enc, b"hunter2").unwrap());
        assert!(!verify_password(&enc, b"hunter3").unwrap());
    }
}
