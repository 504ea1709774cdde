//! Credentials for talking to a hosting service.

use async_trait::async_trait;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::error::{ErrorKind, Result};

/// A bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);
impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}
impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Credential(..)")
    }
}

/// Supplies a valid credential on demand.
///
/// The upload pipeline only ever asks; obtaining and refreshing tokens is up
/// to the implementation.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ErrorKind::Auth`] when no usable credential is available.
    async fn credential(&self) -> Result<Credential>;
}

/// A pre-issued access token, e.g. from configuration.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    credential: Option<Credential>,
}
impl StaticCredential {
    /// A blank token counts as no token.
    pub fn new(token: Option<String>) -> Self {
        let credential = token.filter(|t| !t.trim().is_empty()).map(Credential::new);
        Self { credential }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> Result<Credential> {
        match &self.credential {
            Some(credential) => Ok(credential.clone()),
            None => exn::bail!(ErrorKind::Auth),
        }
    }
}
