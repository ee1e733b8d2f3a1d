//! XML layer for the S3 multipart upload protocol.
//!
//! Converts between the `s3push-model` documents and their XML wire format.
//!
//! # Key components
//!
//! - [`S3Serialize`] trait and [`to_xml`] for request bodies (the completion document)
//! - [`S3Deserialize`] trait and [`from_xml`] for response bodies
//! - [`root_element`] to tell an `<Error>` body apart from a result body
//!
//! Request bodies are written without an XML declaration or namespace, indented
//! with two spaces. Response parsing tolerates both, and ignores elements it does
//! not know.

pub mod deserialize;
pub mod error;
pub mod serialize;

pub use deserialize::{S3Deserialize, from_xml, root_element};
pub use error::XmlError;
pub use serialize::{S3Serialize, to_xml};
