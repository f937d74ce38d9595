use crate::{
    common::error::ProxyError,
    io::{RequestRead, ResponseWrite},
    proto::socks5::{
        consts,
        response::HandshakeResponse,
        userpass::{UserPasswordRequest, UserPasswordResponse},
    },
};
use anyhow::Result;
use std::sync::Arc;

pub mod store;

pub use store::{CredentialStore, InMemoryCredentialStore};

/// The negotiated authentication scheme for a connection. `NoAuth` always
/// negotiates successfully; `UserPassword` runs one RFC 1929 exchange
/// against the shared credential store.
#[derive(Clone)]
pub enum AuthHandler {
    NoAuth,
    UserPassword(Arc<dyn CredentialStore>),
}

impl AuthHandler {
    pub fn method_id(&self) -> u8 {
        match self {
            AuthHandler::NoAuth => consts::auth::METHOD_NONE,
            AuthHandler::UserPassword(_) => consts::auth::METHOD_PASSWORD,
        }
    }

    /// Picks the first method, in the *client's* offered order, that this
    /// server is configured to handle. Duplicates in `offered` don't change
    /// the outcome; order does.
    pub fn select<'a>(offered: &[u8], available: &'a [AuthHandler]) -> Option<&'a AuthHandler> {
        offered
            .iter()
            .find_map(|method| available.iter().find(|handler| handler.method_id() == *method))
    }

    pub async fn negotiate<S>(&self, stream: &mut S) -> Result<()>
    where
        S: RequestRead + ResponseWrite + Unpin,
    {
        match self {
            AuthHandler::NoAuth => Ok(()),
            AuthHandler::UserPassword(store) => {
                let request: UserPasswordRequest = stream.read_request().await?;
                let ok = store.verify(request.username(), request.password()).await;

                let response = if ok {
                    UserPasswordResponse::success()
                } else {
                    UserPasswordResponse::failure()
                };
                stream.write_response(response).await?;

                if ok {
                    Ok(())
                } else {
                    Err(ProxyError::AuthenticationFailed.into())
                }
            }
        }
    }
}

/// Builds the `HandshakeResponse` for a successfully (or unsuccessfully)
/// negotiated method.
pub fn handshake_response(selected: Option<&AuthHandler>) -> HandshakeResponse {
    match selected {
        Some(handler) => HandshakeResponse::with_method(handler.method_id()),
        None => HandshakeResponse::with_no_acceptable_method(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn select_prefers_client_order_over_registration_order() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let available = vec![AuthHandler::UserPassword(store), AuthHandler::NoAuth];

        // Client offers password (0x02) before none (0x00); client order wins.
        let offered = vec![0x02, 0x00];
        let selected = AuthHandler::select(&offered, &available).unwrap();
        assert_eq!(consts::auth::METHOD_PASSWORD, selected.method_id());

        // Client only offers none.
        let offered = vec![0x00];
        let selected = AuthHandler::select(&offered, &available).unwrap();
        assert_eq!(consts::auth::METHOD_NONE, selected.method_id());
    }

    #[test]
    fn select_returns_none_when_no_overlap() {
        let available = vec![AuthHandler::NoAuth];
        let offered = vec![0x02, 0x01];
        assert!(AuthHandler::select(&offered, &available).is_none());
    }
}
