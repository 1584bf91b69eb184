//! Protection for the service-to-service endpoints.
//!
//! Browser-facing routes are authenticated upstream and identified through the
//! `AuthenticatedUser` extractor. Publish and introspection routes are called
//! by other backends, so they are guarded by a shared secret instead.

pub(crate) mod webhooks;
