//! Outgoing mail for the password reset flow.
//!
//! [`Mailer`] is the seam the services talk to. [`LogMailer`] is always
//! available and only writes the would-be mail to the log, which keeps the
//! reset flow usable in development and in builds without the `mailer`
//! feature. The SMTP implementation lives in [`smtp`] behind that feature.

use async_trait::async_trait;
use tracing::info;

use crate::shared::types::DomainResult;

#[cfg(feature = "mailer")]
pub mod smtp;
#[cfg(feature = "mailer")]
pub mod templates;

#[cfg(feature = "mailer")]
pub use smtp::SmtpMailer;
#[cfg(feature = "mailer")]
pub use templates::MailTemplates;

/// Mail operations the account flows need.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Password reset request with the tokenized reset link.
    async fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        reset_url: &str,
    ) -> DomainResult<()>;

    /// Confirmation after a password was changed through the reset flow.
    async fn send_password_changed(&self, to: &str, username: &str) -> DomainResult<()>;
}

/// Mailer that logs instead of delivering.
///
/// The reset link lands in the application log, so local setups work
/// without an SMTP server.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        reset_url: &str,
    ) -> DomainResult<()> {
        info!(
            to = %to,
            username = %username,
            reset_url = %reset_url,
            "Password reset mail (log only, SMTP not configured)"
        );
        Ok(())
    }

    async fn send_password_changed(&self, to: &str, username: &str) -> DomainResult<()> {
        info!(
            to = %to,
            username = %username,
            "Password changed confirmation mail (log only, SMTP not configured)"
        );
        Ok(())
    }
}
