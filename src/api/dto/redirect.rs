//! Form posted by the password prompt page.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub password: String,
}
