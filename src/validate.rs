use lazy_static::lazy_static;
use regex::Regex;

use crate::handlers::{Error, Result};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 50;
pub const BIO_MAX: usize = 500;
pub const LOCATION_MAX: usize = 100;
pub const PROFESSION_MAX: usize = 100;
pub const POST_MAX: usize = 280;

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"^[A-Za-z ]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref URL_RE: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
}

pub fn name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    let len = trimmed.chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&len) {
        return Err(Error::Validation(format!(
            "name must be between {} and {} characters",
            NAME_MIN, NAME_MAX
        )));
    }
    if !NAME_RE.is_match(trimmed) {
        return Err(Error::Validation(
            "name can only contain letters and spaces".to_owned(),
        ));
    }

    Ok(trimmed.to_owned())
}

pub fn email(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    match EMAIL_RE.is_match(trimmed) {
        true => Ok(trimmed.to_owned()),
        false => Err(Error::Validation("invalid email format".to_owned())),
    }
}

pub fn url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    match URL_RE.is_match(trimmed) {
        true => Ok(trimmed.to_owned()),
        false => Err(Error::Validation("invalid resource url".to_owned())),
    }
}

pub fn strong_password(raw: &str) -> Result<()> {
    if raw.chars().count() < 8 {
        return Err(Error::Validation(
            "password must be at least 8 characters long".to_owned(),
        ));
    }
    if !raw.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(Error::Validation(
            "password must include an uppercase letter".to_owned(),
        ));
    }
    if !raw.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(Error::Validation(
            "password must include a lowercase letter".to_owned(),
        ));
    }
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(
            "password must include a number".to_owned(),
        ));
    }
    if raw.chars().all(|c| c.is_alphanumeric()) {
        return Err(Error::Validation(
            "password must include a symbol".to_owned(),
        ));
    }

    Ok(())
}

pub fn non_empty(raw: &str, what: &str) -> Result<String> {
    let trimmed = raw.trim();

    match trimmed.is_empty() {
        false => Ok(trimmed.to_owned()),
        true => Err(Error::Validation(format!("{} is required", what))),
    }
}

pub fn capped(raw: &str, max: usize, what: &str) -> Result<String> {
    match raw.chars().count() <= max {
        true => Ok(raw.to_owned()),
        false => Err(Error::Validation(format!(
            "{} is limited to {} characters",
            what, max
        ))),
    }
}
