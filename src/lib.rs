//! HTTP-triggered CRUD functions over the `plantilla` and
//! `tipo_plantilla` document collections.
//!
//! The interesting part is the request-to-query translation: the
//! `query=k:v,k:v` mini-language is parsed into a typed filter with
//! per-resource value coercion, paired with `sortby`/`order`, `fields`,
//! `limit` and `offset` into a [`query::FindOptions`] descriptor. Both
//! resources share one generic CRUD engine ([`handler::handle`])
//! parameterized by a [`resource::ResourceDescriptor`]; every path
//! answers with the uniform `{Success, Status, Message, Data}` envelope.

pub mod config;
pub mod errors;
pub mod handler;
pub mod logger;
pub mod model;
pub mod query;
pub mod resource;
pub mod response;
pub mod store;

pub use config::Config;
pub use errors::ApiError;
pub use handler::{Event, handle, handle_plantilla, handle_tipo_plantilla, health};
pub use response::{Envelope, HttpResponse};

/// Initializes the service: sets up the logger.
///
/// Call once before handling any request.
///
/// # Errors
/// Returns an error if the logging system cannot be initialized.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()?;
    Ok(())
}
