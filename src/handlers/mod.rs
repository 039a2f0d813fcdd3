use anyhow::anyhow;

use crate::entities::UserId;
use crate::repositories::RepositoryError;

pub mod catalog;
pub mod course;
pub mod post;
pub mod user;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Validation(String),
    NotFound(&'static str),
    Unauthorized,
    Forbidden,
    AlreadyDone(&'static str),
    NotDone(&'static str),
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for Error {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "{}", msg),
            Error::NotFound(what) => write!(f, "cannot find {}.", what),
            Error::Unauthorized => write!(f, "invalid credentials."),
            Error::Forbidden => write!(f, "access denied. admins only."),
            Error::AlreadyDone(what) => write!(f, "{}.", what),
            Error::NotDone(what) => write!(f, "{}.", what),
            Error::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for Error {}

/// Authenticated caller, already verified by the transport layer. Core
/// operations trust `user_id` and check `admin` themselves.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub user_id: UserId,
    pub admin: bool,
}

impl Context {
    pub fn require_admin(&self) -> Result<()> {
        match self.admin {
            true => Ok(()),
            false => Err(Error::Forbidden),
        }
    }
}

fn user_err(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => Error::NotFound("user"),
        e => Error::Internal(anyhow!(e)),
    }
}

fn course_err(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => Error::NotFound("course"),
        e => Error::Internal(anyhow!(e)),
    }
}

fn resource_err(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => Error::NotFound("resource"),
        e => Error::Internal(anyhow!(e)),
    }
}

fn category_err(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => Error::NotFound("category"),
        e => Error::Internal(anyhow!(e)),
    }
}

fn university_err(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => Error::NotFound("university"),
        e => Error::Internal(anyhow!(e)),
    }
}

fn semester_err(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => Error::NotFound("semester"),
        e => Error::Internal(anyhow!(e)),
    }
}

fn post_err(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => Error::NotFound("post"),
        e => Error::Internal(anyhow!(e)),
    }
}
