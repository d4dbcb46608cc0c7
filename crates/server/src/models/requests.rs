//! Request bodies accepted by the API.
//!
//! Every field is optional at the wire level so that a missing field is
//! reported as a validation failure naming that field rather than as a
//! generic JSON error. Validation checks fields in declaration order and
//! stops at the first failure.
//!
//! None of these types derive `Debug`; they carry plaintext passwords.

use serde::Deserialize;

use accounts_core::{DisplayName, Email, FieldError, Password};

use crate::models::AccountChanges;

/// Body of `POST /auth/register`.
#[derive(Deserialize, Default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of `POST /auth/login`.
#[derive(Deserialize, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of `PATCH /users/{id}`.
#[derive(Deserialize, Default)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A validated registration.
#[derive(Debug)]
pub struct Registration {
    pub name: DisplayName,
    pub email: Email,
    pub password: Password,
}

/// A validated email and password pair.
#[derive(Debug)]
pub struct Credentials {
    pub email: Email,
    pub password: Password,
}

impl RegisterRequest {
    /// Validate into a [`Registration`].
    ///
    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn validate(self) -> Result<Registration, FieldError> {
        let name = DisplayName::parse(&required("name", self.name)?)
            .map_err(|e| FieldError::new("name", e))?;
        let email = parse_email(required("email", self.email)?)?;
        let password = parse_password(required("password", self.password)?)?;
        Ok(Registration {
            name,
            email,
            password,
        })
    }
}

impl LoginRequest {
    /// Validate into [`Credentials`].
    ///
    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn validate(self) -> Result<Credentials, FieldError> {
        let email = parse_email(required("email", self.email)?)?;
        let password = parse_password(required("password", self.password)?)?;
        Ok(Credentials { email, password })
    }
}

impl UpdateAccountRequest {
    /// Validate the present fields into [`AccountChanges`].
    ///
    /// Absent and empty fields are both treated as "leave unchanged".
    ///
    /// # Errors
    ///
    /// Returns the first present field that fails validation.
    pub fn validate(self) -> Result<AccountChanges, FieldError> {
        let name = present(self.name)
            .map(|n| DisplayName::parse(&n).map_err(|e| FieldError::new("name", e)))
            .transpose()?;
        let email = present(self.email).map(parse_email).transpose()?;
        Ok(AccountChanges { name, email })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required(field: &'static str, value: Option<String>) -> Result<String, FieldError> {
    present(value).ok_or_else(|| FieldError::required(field))
}

fn parse_email(raw: String) -> Result<Email, FieldError> {
    Email::parse(&raw).map_err(|e| FieldError::new("email", e))
}

fn parse_password(raw: String) -> Result<Password, FieldError> {
    Password::parse(&raw).map_err(|e| FieldError::new("password", e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn register(name: Option<&str>, email: Option<&str>, password: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: name.map(String::from),
            email: email.map(String::from),
            password: password.map(String::from),
        }
    }

    #[test]
    fn test_register_valid() {
        let reg = register(Some("Tee"), Some("tee@email.com"), Some("123456"))
            .validate()
            .unwrap();
        assert_eq!(reg.name.as_str(), "Tee");
        assert_eq!(reg.email.as_str(), "tee@email.com");
        assert_eq!(reg.password.expose(), "123456");
    }

    #[test]
    fn test_register_stops_at_first_failing_field() {
        // name and email are both bad; only name is reported
        let err = register(None, Some("bad"), None).validate().unwrap_err();
        assert_eq!(err.field, "name");

        let err = register(Some("Tee"), Some("bad"), None).validate().unwrap_err();
        assert_eq!(err.field, "email");

        let err = register(Some("Tee"), Some("tee@email.com"), Some(""))
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "password: is required");
    }

    #[test]
    fn test_login_requires_both_fields() {
        let err = LoginRequest {
            email: Some("tee@email.com".into()),
            password: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.field, "password");
    }

    #[test]
    fn test_update_empty_fields_are_absent() {
        let changes = UpdateAccountRequest {
            name: Some(String::new()),
            email: None,
        }
        .validate()
        .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_update_validates_present_email() {
        let err = UpdateAccountRequest {
            name: None,
            email: Some("nope".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.field, "email");
    }

    #[test]
    fn test_update_only_email() {
        let changes = UpdateAccountRequest {
            name: None,
            email: Some("new@email.com".into()),
        }
        .validate()
        .unwrap();
        assert!(changes.name.is_none());
        assert_eq!(changes.email.unwrap().as_str(), "new@email.com");
    }
}
