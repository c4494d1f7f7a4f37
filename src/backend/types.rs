//! # Domain Types
//!
//! Data carried across the backend actor boundary. These are plain DTOs: the backend owns
//! their storage and validation, the client only moves them around and caches them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier the backend assigns to a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(pub String);

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Marketplace role chosen during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    JobSeeker,
    Recruiter,
}

/// A postal location. Applicant search matches on all four fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub district: String,
    pub state: String,
    pub country: String,
}

impl Location {
    pub fn new(
        city: impl Into<String>,
        district: impl Into<String>,
        state: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            city: city.into(),
            district: district.into(),
            state: state.into(),
            country: country.into(),
        }
    }

    /// Stable string form used to scope cache keys.
    pub fn cache_scope(&self) -> String {
        format!("{}/{}/{}/{}", self.country, self.state, self.district, self.city)
    }
}

/// Profile of the calling user.
///
/// `role` and `location` stay `None` until the matching onboarding step has been completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: Gender,
    pub role: Option<UserRole>,
    pub location: Option<Location>,
    pub onboarding_completed: bool,
}

impl UserProfile {
    /// A freshly registered profile with no onboarding done yet.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        gender: Gender,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            gender,
            role: None,
            location: None,
            onboarding_completed: false,
        }
    }
}

/// Photo attached to a job application.
///
/// Either inline bytes (fresh upload) or a URL the backend already serves.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhotoBlob {
    Bytes(Vec<u8>),
    Url(String),
}

impl PhotoBlob {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        PhotoBlob::Bytes(bytes.into())
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        PhotoBlob::Url(url.into())
    }
}

// Photo bytes are large; keep them out of debug logs.
impl fmt::Debug for PhotoBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoBlob::Bytes(bytes) => write!(f, "PhotoBlob::Bytes({} bytes)", bytes.len()),
            PhotoBlob::Url(url) => write!(f, "PhotoBlob::Url({url})"),
        }
    }
}

/// A submitted job application as seen by recruiters and by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplicantProfile {
    pub user_id: Principal,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: Gender,
    pub photo: Option<PhotoBlob>,
    pub location: Location,
}
