//! Turns the `Authorization` header into the acting member's id.
//!
//! Tokens are issued by the identity service and look like
//! `<member id>.<hex hmac-sha256(key, member id)>`, where the key is the
//! SHA-256 of the shared secret.
use crate::error::LedgerError;
use crate::schemas::MemberId;
use actix_web::{dev::Payload, http::header::HeaderValue, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::num::ParseIntError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct TokenKey {
    key: Vec<u8>,
}

impl TokenKey {
    pub fn new(secret: &str) -> Self {
        let mut sha256_hasher = Sha256::new();
        sha256_hasher.update(secret.as_bytes());
        Self {
            key: sha256_hasher.finalize().to_vec(),
        }
    }

    fn mac_for(&self, member_id: &str) -> Option<HmacSha256> {
        let mut hmac_hasher = HmacSha256::new_from_slice(&self.key).ok()?;
        hmac_hasher.update(member_id.as_bytes());
        Some(hmac_hasher)
    }

    /// Issues the token the identity service hands to `member_id`.
    pub fn issue(&self, member_id: &str) -> Option<String> {
        let signature = self
            .mac_for(member_id)?
            .finalize()
            .into_bytes()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>();
        Some(format!("{}.{}", member_id, signature))
    }

    /// Returns the member the token was issued to, if the signature holds.
    pub fn verify(&self, token: &str) -> Option<MemberId> {
        let (member_id, signature) = token.rsplit_once('.')?;
        if member_id.is_empty() || signature.len() % 2 != 0 {
            return None;
        }
        let signature = signature
            .chars()
            .collect::<Vec<_>>()
            .chunks(2)
            .map(|n| u8::from_str_radix(&String::from_iter(n), 16))
            .collect::<Result<Vec<u8>, ParseIntError>>()
            .ok()?;
        self.mac_for(member_id)?.verify_slice(&signature).ok()?;
        Some(member_id.to_string())
    }
}

/// The authenticated member performing the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor(pub MemberId);

fn check_authorization(request: &HttpRequest) -> Option<Actor> {
    let key = request.app_data::<web::Data<TokenKey>>()?;
    let authorization = request
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .map(HeaderValue::to_str)?
        .ok()?;
    let token = authorization.strip_prefix("Bearer ")?;
    key.verify(token.trim()).map(Actor)
}

impl FromRequest for Actor {
    type Error = LedgerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(check_authorization(req).ok_or(LedgerError::Unauthorized))
    }
}
