//! Connection-dependent reads.
//!
//! One gate per resource, all sharing [`QueryGate::load`]:
//!
//! - [`ProfileQuery`] - the caller's profile, 3 transport attempts
//! - [`MyApplicationQuery`] - the caller's job application, 2 transport attempts
//! - [`ApplicantsQuery`] - applicants at a location, 2 transport attempts

pub mod applicants;
pub mod error;
pub mod gate;
pub mod my_application;
pub mod profile;

pub use applicants::ApplicantsQuery;
pub use error::QueryError;
pub use gate::{QueryGate, QueryView};
pub use my_application::MyApplicationQuery;
pub use profile::ProfileQuery;
