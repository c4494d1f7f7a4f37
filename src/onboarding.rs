//! Onboarding redirects for guarded pages.

use crate::backend::{UserProfile, UserRole};
use std::fmt;

/// Which onboarding stage a page requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    /// The role-selection page.
    Role,
    /// The location form.
    Location,
    /// Any page behind onboarding.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    OnboardingRole,
    OnboardingLocation,
    JobSeekerApply,
    RecruiterBrowse,
}

impl Route {
    pub const fn path(self) -> &'static str {
        match self {
            Route::OnboardingRole => "/onboarding/role",
            Route::OnboardingLocation => "/onboarding/location",
            Route::JobSeekerApply => "/job-seeker/apply",
            Route::RecruiterBrowse => "/recruiter/browse",
        }
    }

    /// Landing page once onboarding is done.
    pub const fn home_for(role: UserRole) -> Self {
        match role {
            UserRole::JobSeeker => Route::JobSeekerApply,
            UserRole::Recruiter => Route::RecruiterBrowse,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

fn is_complete(profile: &UserProfile) -> bool {
    profile.location.is_some() && profile.onboarding_completed
}

/// Where a page guarded at `step` sends `profile`, or `None` to stay.
///
/// Only meaningful for a fetched profile; callers keep showing their loading state until then.
pub fn onboarding_redirect(step: OnboardingStep, profile: &UserProfile) -> Option<Route> {
    match (step, profile.role) {
        (OnboardingStep::Role, Some(_)) => Some(Route::OnboardingLocation),
        (OnboardingStep::Role, None) => None,
        (OnboardingStep::Location | OnboardingStep::Complete, None) => Some(Route::OnboardingRole),
        (OnboardingStep::Location, Some(role)) if is_complete(profile) => Some(Route::home_for(role)),
        (OnboardingStep::Location, Some(_)) => None,
        (OnboardingStep::Complete, Some(_)) if !is_complete(profile) => {
            Some(Route::OnboardingLocation)
        }
        (OnboardingStep::Complete, Some(_)) => None,
    }
}
