use derive_more::derive::Display;
use inquire::Text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Regex for email addresses, deliberately loose: one @, no spaces,
// a dot somewhere in the domain.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Failed to compile email regex")
});

#[derive(Debug, Clone, Copy, Display, Error)]
pub struct InvalidInput;

/// Wrapper type for an email address that has been validated
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct EmailAddress(String);

impl TryFrom<String> for EmailAddress {
    type Error = InvalidInput;

    fn try_from(email: String) -> Result<Self, Self::Error> {
        email_validation(&email)?;
        Ok(Self(email))
    }
}

impl TryFrom<&str> for EmailAddress {
    type Error = InvalidInput;

    fn try_from(email: &str) -> Result<Self, Self::Error> {
        email_validation(email)?;
        Ok(Self(email.to_owned()))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn email_validation(email: &str) -> Result<(), InvalidInput> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(InvalidInput)
    }
}

/// Interactively prompts for an email address until a valid one is
/// entered.
pub fn email_input_validation(message: &str) -> anyhow::Result<EmailAddress> {
    loop {
        let input = Text::new(message).prompt()?;
        match EmailAddress::try_from(input) {
            Ok(email) => return Ok(email),
            Err(_) => println!("Please enter a valid email address (name@domain.tld)"),
        }
    }
}

/// Interactively prompts for a required form field until a non-empty
/// value is entered.
pub fn required_text_input(message: &str) -> anyhow::Result<String> {
    loop {
        let input = Text::new(message).prompt()?;
        let trimmed = input.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_owned());
        }
        println!("This field is required");
    }
}
