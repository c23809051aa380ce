pub(crate) mod backend;
pub(crate) mod classroom;
pub(crate) mod google_auth;
pub(crate) mod notifier;
pub(crate) mod schedule;
