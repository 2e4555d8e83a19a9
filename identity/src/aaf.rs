//! AAF Rapid Connect federated sign-in.
//!
//! Rapid Connect authenticates the user at their home institution and then POSTs a
//! signed JWT (HS256, shared secret) to the portal's callback URL. The user's
//! attributes travel in the `https://aaf.edu.au/attributes` claim.

use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use jsonwebtoken::{decode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, Validation};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{aaf_error, AafErrorKind, Error};
use crate::Attributes;

#[derive(Debug, Clone, Deserialize)]
struct AssertionClaims {
    jti: String,
    exp: i64,
    #[serde(default)]
    sub: Option<String>,
    #[serde(rename = "https://aaf.edu.au/attributes")]
    attributes: Attributes,
}

/// Verifies Rapid Connect assertions and rejects any assertion presented twice.
pub struct AafVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    // jti -> last instant (exp plus leeway) at which decode would still accept it
    seen: DashMap<String, i64>,
}

impl AafVerifier {
    /// `audience` is the portal's public URL; `issuer` is the Rapid Connect service.
    pub fn new(secret: SecretString, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_nbf = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
            seen: DashMap::new(),
        }
    }

    /// Checks signature, issuer, audience and lifetime, then returns the attribute
    /// mapping. The subject is copied into the mapping when the attributes lack it.
    pub fn verify(&self, assertion: &str) -> Result<Attributes, Error> {
        let token = decode::<AssertionClaims>(assertion, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    JwtErrorKind::ExpiredSignature => "assertion has expired",
                    JwtErrorKind::InvalidIssuer => "assertion was not issued by Rapid Connect",
                    JwtErrorKind::InvalidAudience => "assertion is addressed to another service",
                    JwtErrorKind::InvalidSignature => "assertion signature does not verify",
                    _ => "assertion is malformed",
                };
                warn!("Rejected AAF assertion: {reason} ({e})");
                aaf_error(AafErrorKind::InvalidAssertion, reason)
            })?;

        let claims = token.claims;
        self.remember(&claims.jti, claims.exp)?;

        let mut attributes = claims.attributes;
        if let Some(sub) = claims.sub {
            attributes
                .entry("sub")
                .or_insert(serde_json::Value::String(sub));
        }

        debug!("Accepted AAF assertion {}", claims.jti);
        Ok(attributes)
    }

    fn remember(&self, jti: &str, exp: i64) -> Result<(), Error> {
        let now = Utc::now().timestamp();
        let accepted_until = exp.saturating_add(self.validation.leeway as i64);
        self.seen.retain(|_, until| *until >= now);

        match self.seen.entry(jti.to_string()) {
            Entry::Occupied(_) => {
                warn!("Rejected replayed AAF assertion {jti}");
                Err(aaf_error(
                    AafErrorKind::ReplayedAssertion,
                    "assertion has already been used",
                ))
            }
            Entry::Vacant(slot) => {
                slot.insert(accepted_until);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    const SECRET: &str = "rapid-connect-shared-secret";
    const ISSUER: &str = "https://rapid.aaf.edu.au";
    const AUDIENCE: &str = "https://portal.example.org";

    fn verifier() -> AafVerifier {
        AafVerifier::new(SecretString::new(SECRET.to_string()), ISSUER, AUDIENCE)
    }

    fn assertion(claims: Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(jti: &str) -> Value {
        let now = Utc::now().timestamp();
        json!({
            "iss": ISSUER,
            "aud": AUDIENCE,
            "nbf": now - 10,
            "exp": now + 120,
            "jti": jti,
            "sub": "https://rapid.aaf.edu.au!https://portal.example.org!abc123",
            "https://aaf.edu.au/attributes": {
                "edupersontargetedid": "https://rapid.aaf.edu.au!https://portal.example.org!abc123",
                "displayname": "Grace Hopper",
                "cn": "Grace Hopper",
                "mail": "grace@uni.edu.au"
            }
        })
    }

    #[test]
    fn valid_assertion_yields_attributes() {
        let attributes = verifier().verify(&assertion(claims("jti-1"), SECRET)).unwrap();

        assert_eq!(attributes["mail"], json!("grace@uni.edu.au"));
        assert_eq!(attributes["displayname"], json!("Grace Hopper"));
        assert!(attributes.contains_key("sub"));
    }

    #[test]
    fn assertion_signed_with_another_secret_is_rejected() {
        let err = verifier()
            .verify(&assertion(claims("jti-2"), "not-the-secret"))
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Aaf(AafErrorKind::InvalidAssertion));
    }

    #[test]
    fn assertion_for_another_audience_is_rejected() {
        let mut other = claims("jti-3");
        other["aud"] = json!("https://elsewhere.example.org");

        let err = verifier().verify(&assertion(other, SECRET)).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Aaf(AafErrorKind::InvalidAssertion));
    }

    #[test]
    fn expired_assertion_is_rejected() {
        let mut expired = claims("jti-4");
        let now = Utc::now().timestamp();
        expired["nbf"] = json!(now - 600);
        expired["exp"] = json!(now - 300);

        let err = verifier().verify(&assertion(expired, SECRET)).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Aaf(AafErrorKind::InvalidAssertion));
    }

    #[test]
    fn replayed_assertion_is_rejected() {
        let verifier = verifier();
        let token = assertion(claims("jti-5"), SECRET);

        assert!(verifier.verify(&token).is_ok());
        let err = verifier.verify(&token).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Aaf(AafErrorKind::ReplayedAssertion));
    }

    #[test]
    fn assertion_within_the_expiry_leeway_cannot_be_replayed() {
        let verifier = verifier();
        let mut lapsed = claims("jti-6");
        let now = Utc::now().timestamp();
        lapsed["nbf"] = json!(now - 120);
        lapsed["exp"] = json!(now - 10);
        let token = assertion(lapsed, SECRET);

        assert!(verifier.verify(&token).is_ok());
        let err = verifier.verify(&token).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Aaf(AafErrorKind::ReplayedAssertion));
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let err = verifier().verify("not.a.jwt").unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Aaf(AafErrorKind::InvalidAssertion));
    }
}
