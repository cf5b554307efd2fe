//! Identity provider backed by a locally configured account.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

use vibes_shared::Identity;

use crate::error::RemoteError;
use crate::remote::{IdentityProvider, RemoteResult};

/// Holds one account and publishes sign-in state on a watch channel.
pub struct LocalSession {
    account: Mutex<Option<Identity>>,
    tx: watch::Sender<Option<Identity>>,
}

impl LocalSession {
    /// Start signed in as `identity`.
    pub fn signed_in(identity: Identity) -> Self {
        let (tx, _rx) = watch::channel(Some(identity.clone()));
        Self {
            account: Mutex::new(Some(identity)),
            tx,
        }
    }

    /// Start signed out. `sign_in` will use `account` when given.
    pub fn signed_out(account: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            account: Mutex::new(account),
            tx,
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalSession {
    fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    async fn sign_in(&self) -> RemoteResult<Identity> {
        let account = self
            .account
            .lock()
            .map_err(|e| RemoteError::Protocol(format!("Lock poisoned: {e}")))?
            .clone()
            .ok_or_else(|| RemoteError::PermissionDenied("no account configured".into()))?;
        info!(uid = %account.uid, "Signed in");
        self.tx.send_replace(Some(account.clone()));
        Ok(account)
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        self.tx.send_replace(None);
        info!("Signed out");
        Ok(())
    }

    async fn set_display_name(&self, name: &str) -> RemoteResult<()> {
        {
            let mut account = self
                .account
                .lock()
                .map_err(|e| RemoteError::Protocol(format!("Lock poisoned: {e}")))?;
            if let Some(ref mut identity) = *account {
                identity.display_name = Some(name.to_string());
            }
        }
        self.tx.send_if_modified(|current| match current {
            Some(identity) => {
                identity.display_name = Some(name.to_string());
                true
            }
            None => false,
        });
        Ok(())
    }
}
