use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::models::UserContext;

/// Credential of the current session, published once sign-in completes.
///
/// Callers that need a token await [`SessionCredentials::wait_for_credential`],
/// which resolves as soon as one is available or fails once when the
/// timeout elapses.
pub struct SessionCredentials {
    tx: watch::Sender<Option<UserContext>>,
}

impl Default for SessionCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCredentials {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn sign_in(&self, context: UserContext) {
        info!(email = %context.email_id, "credential available");
        self.tx.send_replace(Some(context));
    }

    pub fn sign_out(&self) {
        debug!("credential cleared");
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<UserContext> {
        self.tx.borrow().clone()
    }

    pub async fn wait_for_credential(&self, timeout: Duration) -> Result<UserContext> {
        let mut rx = self.tx.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(Option::is_some))
            .await
            .map(|changed| changed.map(|current| current.clone()));
        match waited {
            Ok(Ok(Some(context))) => Ok(context),
            Ok(Ok(None)) | Ok(Err(_)) => Err(CacheError::Credential(
                "credential source closed".to_string(),
            )),
            Err(_) => Err(CacheError::Credential(format!(
                "no credential after {}s",
                timeout.as_secs_f32()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn resolves_immediately_when_signed_in() {
        let credentials = SessionCredentials::new();
        credentials.sign_in(UserContext::new("a@example.com", "t"));
        let ctx = credentials
            .wait_for_credential(Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(ctx.email_id, "a@example.com");
    }

    #[tokio::test]
    async fn resolves_when_credential_arrives_later() {
        let credentials = Arc::new(SessionCredentials::new());
        let publisher = Arc::clone(&credentials);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.sign_in(UserContext::new("late@example.com", "t"));
        });

        let ctx = credentials
            .wait_for_credential(Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(ctx.email_id, "late@example.com");
    }

    #[tokio::test]
    async fn fails_once_after_timeout() {
        let credentials = SessionCredentials::new();
        let err = credentials
            .wait_for_credential(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Credential(_)));
    }

    #[tokio::test]
    async fn sign_out_clears() {
        let credentials = SessionCredentials::new();
        credentials.sign_in(UserContext::new("a@example.com", "t"));
        credentials.sign_out();
        assert!(credentials.current().is_none());
    }
}
