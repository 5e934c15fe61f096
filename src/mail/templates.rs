//! Embedded mail templates.

use tera::Tera;

use crate::shared::types::{DomainError, DomainResult};

const PASSWORD_RESET_HTML: &str = r#"<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <p>Hello {{ username }},</p>
  <p>You have requested to reset your password for Core Application.</p>
  <p>Please click the link below to reset your password:</p>
  <p><a href="{{ reset_url }}">{{ reset_url }}</a></p>
  <p>This link will expire in 24 hours.</p>
  <p>If you did not request this password reset, please ignore this email.</p>
  <p>Best regards,<br>Core Application Team</p>
</body>
</html>
"#;

const PASSWORD_RESET_TEXT: &str = "Hello {{ username }},

You have requested to reset your password for Core Application.

Please click the link below to reset your password:
{{ reset_url }}

This link will expire in 24 hours.

If you did not request this password reset, please ignore this email.

Best regards,
Core Application Team
";

const PASSWORD_CHANGED_HTML: &str = r#"<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <p>Hello {{ username }},</p>
  <p>Your password has been successfully changed for Core Application.</p>
  <p>If you did not make this change, please contact our support team immediately.</p>
  <p>Best regards,<br>Core Application Team</p>
</body>
</html>
"#;

const PASSWORD_CHANGED_TEXT: &str = "Hello {{ username }},

Your password has been successfully changed for Core Application.

If you did not make this change, please contact our support team immediately.

Best regards,
Core Application Team
";

/// Template registry with the mails baked into the binary.
pub struct MailTemplates {
    tera: Tera,
}

impl MailTemplates {
    pub fn new() -> DomainResult<Self> {
        let mut tera = Tera::default();

        let templates = [
            ("password_reset.html", PASSWORD_RESET_HTML),
            ("password_reset.txt", PASSWORD_RESET_TEXT),
            ("password_changed.html", PASSWORD_CHANGED_HTML),
            ("password_changed.txt", PASSWORD_CHANGED_TEXT),
        ];

        for (name, content) in templates {
            tera.add_raw_template(name, content).map_err(|e| {
                DomainError::Mail(format!("Failed to register template {}: {}", name, e))
            })?;
        }

        Ok(Self { tera })
    }

    /// Renders the reset mail, returning (html, text).
    pub fn render_password_reset(
        &self,
        username: &str,
        reset_url: &str,
    ) -> DomainResult<(String, String)> {
        let mut context = tera::Context::new();
        context.insert("username", username);
        context.insert("reset_url", reset_url);

        let html = self
            .tera
            .render("password_reset.html", &context)
            .map_err(|e| DomainError::Mail(format!("Failed to render HTML template: {}", e)))?;

        let text = self
            .tera
            .render("password_reset.txt", &context)
            .map_err(|e| DomainError::Mail(format!("Failed to render text template: {}", e)))?;

        Ok((html, text))
    }

    /// Renders the change confirmation, returning (html, text).
    pub fn render_password_changed(&self, username: &str) -> DomainResult<(String, String)> {
        let mut context = tera::Context::new();
        context.insert("username", username);

        let html = self
            .tera
            .render("password_changed.html", &context)
            .map_err(|e| DomainError::Mail(format!("Failed to render HTML template: {}", e)))?;

        let text = self
            .tera
            .render("password_changed.txt", &context)
            .map_err(|e| DomainError::Mail(format!("Failed to render text template: {}", e)))?;

        Ok((html, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_password_reset() {
        let templates = MailTemplates::new().unwrap();

        let (html, text) = templates
            .render_password_reset("alice", "http://localhost:8080/reset-password?token=abc")
            .unwrap();

        assert!(html.contains("alice"));
        assert!(html.contains("http://localhost:8080/reset-password?token=abc"));
        assert!(text.contains("This link will expire in 24 hours."));
    }

    #[test]
    fn test_render_password_changed() {
        let templates = MailTemplates::new().unwrap();

        let (html, text) = templates.render_password_changed("bob").unwrap();

        assert!(html.contains("bob"));
        assert!(text.contains("successfully changed"));
    }
}
