//! Serializing request documents to XML.
//!
//! The only request body the uploader sends is the completion document:
//!
//! ```xml
//! <CompleteMultipartUpload>
//!   <Part>
//!     <PartNumber>1</PartNumber>
//!     <ETag>"etag1"</ETag>
//!   </Part>
//! </CompleteMultipartUpload>
//! ```
//!
//! Text content is escaped, so a quoted ETag is written as `&quot;etag1&quot;`.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::BytesText;
use s3push_model::types::{CompleteMultipartUpload, CompletedPart};

use crate::error::XmlError;

/// Trait for serializing types to XML.
///
/// Implementors write their content as child elements inside the current XML context.
/// The root element is written by [`to_xml`].
///
/// Uses `io::Result` because `quick_xml::Writer` closures require `io::Result<()>`.
pub trait S3Serialize {
    /// Serialize this value as XML child elements into the given writer.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if writing to the underlying writer fails.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize a value as an indented XML document under `root_element`.
///
/// No declaration and no namespace are emitted. Output is stable: the same
/// value always produces the same bytes.
///
/// # Errors
///
/// Returns `XmlError` if serialization fails.
///
/// # Examples
///
/// ```
/// use s3push_model::types::{CompleteMultipartUpload, CompletedPart};
/// use s3push_xml::to_xml;
///
/// let doc = CompleteMultipartUpload {
///     parts: vec![CompletedPart { part_number: 1, e_tag: "etag1".to_owned() }],
/// };
/// let xml = to_xml("CompleteMultipartUpload", &doc).unwrap();
/// assert!(String::from_utf8(xml).unwrap().starts_with("<CompleteMultipartUpload>\n  <Part>"));
/// ```
pub fn to_xml<T: S3Serialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new_with_indent(&mut buf, b' ', 2);

    writer
        .create_element(root_element)
        .write_inner_content(|w| value.serialize_xml(w))?;

    Ok(buf)
}

/// Write a simple `<tag>text</tag>` element.
fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

impl S3Serialize for CompletedPart {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "PartNumber", &self.part_number.to_string())?;
        write_text_element(writer, "ETag", &self.e_tag)
    }
}

impl S3Serialize for CompleteMultipartUpload {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        for part in &self.parts {
            writer
                .create_element("Part")
                .write_inner_content(|w| part.serialize_xml(w))?;
        }
        Ok(())
    }
}
