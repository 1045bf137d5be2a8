/// Actor extraction from gateway-supplied identity headers
pub mod auth;
/// Mapping of domain errors onto HTTP responses
pub mod error_handling;
/// Body, path and query extractors with JSON rejections
pub mod extract;
