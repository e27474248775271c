//! Credential presence signal.
//!
//! Authentication is owned elsewhere; the cart only needs to know whether a
//! bearer credential is present right now and when that changes. The auth
//! collaborator holds a [`Credentials`] and publishes login/logout through
//! it. Everything else holds a cheap [`CredentialWatch`].

use secrecy::SecretString;
use tokio::sync::watch;

/// Writer side of the credential signal, owned by the auth collaborator.
#[derive(Debug)]
pub struct Credentials {
    tx: watch::Sender<Option<SecretString>>,
}

impl Credentials {
    /// Create a signal with no credential present.
    #[must_use]
    pub fn signed_out() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Create a signal with a credential already present.
    #[must_use]
    pub fn signed_in(token: SecretString) -> Self {
        let (tx, _rx) = watch::channel(Some(token));
        Self { tx }
    }

    /// Publish a new credential.
    pub fn sign_in(&self, token: SecretString) {
        self.tx.send_replace(Some(token));
    }

    /// Withdraw the credential.
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    /// Create a reader for this signal.
    #[must_use]
    pub fn watch(&self) -> CredentialWatch {
        CredentialWatch {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::signed_out()
    }
}

/// Reader side of the credential signal.
#[derive(Debug, Clone)]
pub struct CredentialWatch {
    rx: watch::Receiver<Option<SecretString>>,
}

impl CredentialWatch {
    /// Returns `true` if a credential is currently present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Returns the current bearer credential, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<SecretString> {
        self.rx.borrow().clone()
    }

    /// Wait for the next login/logout and return the new presence state.
    ///
    /// Returns `None` once the writer has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_signed_out_by_default() {
        let credentials = Credentials::default();
        let watch = credentials.watch();
        assert!(!watch.is_authenticated());
        assert!(watch.bearer().is_none());
    }

    #[test]
    fn test_sign_in_and_out() {
        let credentials = Credentials::signed_out();
        let watch = credentials.watch();

        credentials.sign_in(SecretString::from("tok_1"));
        assert!(watch.is_authenticated());
        assert_eq!(watch.bearer().unwrap().expose_secret(), "tok_1");

        credentials.sign_out();
        assert!(!watch.is_authenticated());
    }

    #[tokio::test]
    async fn test_changed_reports_transitions() {
        let credentials = Credentials::signed_out();
        let mut watch = credentials.watch();

        credentials.sign_in(SecretString::from("tok_1"));
        assert_eq!(watch.changed().await, Some(true));

        credentials.sign_out();
        assert_eq!(watch.changed().await, Some(false));

        drop(credentials);
        assert_eq!(watch.changed().await, None);
    }
}
