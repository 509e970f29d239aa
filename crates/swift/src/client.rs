//! Wiring from a configured [`Account`] to a ready [`StorageService`]

use std::sync::Arc;

use selstore_core::model::encode_object_path;
use selstore_core::{Account, Container, Result, Session, StorageService};

use crate::auth::CredentialsAuthenticator;
use crate::transport::ReqwestTransport;

/// Build a service for `account`
///
/// No request is made here; the first operation authenticates.
pub fn connect(account: &Account) -> Result<StorageService> {
    let transport = Arc::new(ReqwestTransport::for_account(account)?);
    let authenticator = CredentialsAuthenticator::new(
        transport.clone(),
        &account.auth_url,
        &account.user,
        &account.key,
    )?;
    let session = Arc::new(Session::new(Arc::new(authenticator)));

    tracing::debug!(account = %account.name, "storage service ready");
    Ok(StorageService::new(session, transport))
}

/// Container handle whose public URL is derived from the account's, if any
pub fn container(account: &Account, name: &str) -> Result<Container> {
    let container = Container::new(name);
    match &account.public_url {
        Some(base) => container.with_public_url(&format!(
            "{}/{}",
            base.trim_end_matches('/'),
            encode_object_path(name)
        )),
        None => Ok(container),
    }
}
