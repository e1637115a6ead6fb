//! Request bodies and their validation.
//!
//! Field-ordered: the first failing rule produces the message, so clients
//! get one actionable error at a time.

use serde::Deserialize;

/// Characters accepted as the "special" password class.
const PASSWORD_SPECIALS: &str = "@$!%*?&";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), String> {
        let name = self.full_name.trim();
        if name.is_empty() {
            return Err("Full name is required".to_string());
        }
        if name.chars().count() < 2 || name.chars().count() > 100 {
            return Err("Full name must be between 2 and 100 characters".to_string());
        }
        if !is_valid_email(&self.email) {
            return Err("Please provide a valid email address".to_string());
        }
        validate_password(&self.password)?;
        if self.confirm_password != self.password {
            return Err("Passwords do not match".to_string());
        }
        Ok(())
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_email(&self.email) {
            return Err("Please provide a valid email address".to_string());
        }
        if self.password.is_empty() {
            return Err("Password is required".to_string());
        }
        Ok(())
    }
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if !(has_lower && has_upper && has_digit && has_special) {
        return Err(
            "Password must contain at least one lowercase letter, one uppercase letter, \
             one number, and one special character"
                .to_string(),
        );
    }
    Ok(())
}

/// Minimal structural email check: one `@`, non-empty local part, domain
/// with at least one dot and no empty labels, no whitespace.
fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(full_name: &str, email: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let req = register("Alice A", "alice@example.com", "Str0ng!pass", "Str0ng!pass");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_first_failing_field_wins() {
        let req = register("", "not-an-email", "weak", "other");
        assert_eq!(req.validate().unwrap_err(), "Full name is required");

        let req = register("Alice", "not-an-email", "weak", "other");
        assert_eq!(
            req.validate().unwrap_err(),
            "Please provide a valid email address"
        );

        let req = register("Alice", "alice@example.com", "weak", "weak");
        assert_eq!(
            req.validate().unwrap_err(),
            "Password must be at least 8 characters long"
        );
    }

    #[test]
    fn test_password_complexity() {
        for weak in ["alllowercase1!", "ALLUPPERCASE1!", "NoDigitsHere!", "NoSpecials1a"] {
            let req = register("Alice", "alice@example.com", weak, weak);
            assert!(
                req.validate().unwrap_err().starts_with("Password must contain"),
                "{weak} should fail complexity"
            );
        }
    }

    #[test]
    fn test_confirm_password_must_match() {
        let req = register("Alice", "alice@example.com", "Str0ng!pass", "Str0ng!pasS");
        assert_eq!(req.validate().unwrap_err(), "Passwords do not match");
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.example.com"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plain"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@b..com"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn test_login_validation() {
        let req = LoginRequest {
            email: "alice@example.com".to_string(),
            password: "anything".to_string(),
            remember_me: false,
        };
        assert!(req.validate().is_ok());

        let req = LoginRequest {
            email: "alice@example.com".to_string(),
            password: String::new(),
            remember_me: false,
        };
        assert_eq!(req.validate().unwrap_err(), "Password is required");
    }
}
