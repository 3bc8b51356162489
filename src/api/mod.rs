//! Typed wrappers over the domain endpoints. Each call goes through the
//! authenticated path in `crate::client`; the records returned are
//! request-scoped copies the backend owns.

pub mod enrollments;
pub mod meetings;
pub mod payments;
pub mod progress;
pub mod rooms;
