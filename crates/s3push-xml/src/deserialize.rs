//! Parsing response documents from XML.
//!
//! Decoders accept an optional XML declaration and namespace, skip unknown
//! elements, and resolve both predefined entities (`&quot;`) and character
//! references (`&#34;`) in text content.

use quick_xml::Reader;
use quick_xml::events::Event;
use s3push_model::types::{
    CompleteMultipartUpload, CompleteMultipartUploadResult, CompletedPart,
    InitiateMultipartUploadResult, S3ErrorResponse,
};

use tracing::trace;

use crate::error::XmlError;

/// Trait for deserializing types from XML.
///
/// The root element has already been consumed by the caller; the implementation
/// reads child elements until the matching end tag.
pub trait S3Deserialize: Sized {
    /// Deserialize an instance from the given XML reader.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the XML is malformed or required fields are missing.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;
}

/// Deserialize an XML document into a typed value.
///
/// The root element name is not checked; use [`root_element`] first when the
/// body may be an `<Error>` document.
///
/// # Errors
///
/// Returns `XmlError` if the XML is malformed or deserialization fails.
///
/// # Examples
///
/// ```
/// use s3push_model::types::InitiateMultipartUploadResult;
/// use s3push_xml::from_xml;
///
/// let xml = b"<InitiateMultipartUploadResult><UploadId>abc</UploadId></InitiateMultipartUploadResult>";
/// let result: InitiateMultipartUploadResult = from_xml(xml).unwrap();
/// assert_eq!(result.upload_id.as_deref(), Some("abc"));
/// ```
pub fn from_xml<T: S3Deserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);

    loop {
        match reader.read_event()? {
            Event::Start(_) => {
                return T::deserialize_xml(&mut reader);
            }
            Event::Eof => {
                return Err(XmlError::MissingElement("root element".to_string()));
            }
            // Skip declaration, comments, processing instructions, whitespace.
            _ => {}
        }
    }
}

/// Return the local name of the document's root element.
///
/// # Errors
///
/// Returns [`XmlError::MissingElement`] if the document has no element at all.
///
/// # Examples
///
/// ```
/// use s3push_xml::root_element;
///
/// let xml = br#"<?xml version="1.0"?><Error><Code>NoSuchUpload</Code></Error>"#;
/// assert_eq!(root_element(xml).unwrap(), "Error");
/// ```
pub fn root_element(xml: &[u8]) -> Result<String, XmlError> {
    let mut reader = Reader::from_reader(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let local_name = e.local_name();
                let name = std::str::from_utf8(local_name.as_ref())
                    .map_err(|e| XmlError::ParseError(e.to_string()))?;
                return Ok(name.to_owned());
            }
            Event::Eof => {
                return Err(XmlError::MissingElement("root element".to_string()));
            }
            _ => {}
        }
    }
}

/// Read the text content of the current element and consume its end tag.
///
/// Surrounding whitespace is trimmed.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(e) => {
                let raw = std::str::from_utf8(&e)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(raw);
            }
            Event::GeneralRef(e) => {
                if let Some(ch) = e
                    .resolve_char_ref()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?
                {
                    text.push(ch);
                } else {
                    let name = e
                        .decode()
                        .map_err(|err| XmlError::ParseError(err.to_string()))?;
                    let resolved = quick_xml::escape::resolve_predefined_entity(&name)
                        .ok_or_else(|| XmlError::ParseError(format!("unknown entity &{name};")))?;
                    text.push_str(resolved);
                }
            }
            Event::End(_) => {
                return Ok(text.trim().to_owned());
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>, name: &str) -> Result<(), XmlError> {
    trace!(element = name, "skipping unrecognized element");
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Walk the children of the current element, calling `on_child` for each
/// start tag with its name. Returns once the element's end tag is consumed.
fn read_children<F>(
    reader: &mut Reader<&[u8]>,
    context: &str,
    mut on_child: F,
) -> Result<(), XmlError>
where
    F: FnMut(&str, &mut Reader<&[u8]>) -> Result<(), XmlError>,
{
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                let tag_name = std::str::from_utf8(name.as_ref())
                    .map_err(|e| XmlError::ParseError(e.to_string()))?;
                on_child(tag_name, reader)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(format!(
                    "unexpected EOF in {context}"
                )));
            }
            _ => {}
        }
    }
}

fn parse_u32(s: &str) -> Result<u32, XmlError> {
    s.parse::<u32>()
        .map_err(|e| XmlError::ParseError(format!("invalid u32 '{s}': {e}")))
}

impl S3Deserialize for InitiateMultipartUploadResult {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut result = InitiateMultipartUploadResult::default();
        read_children(reader, "InitiateMultipartUploadResult", |tag, reader| {
            match tag {
                "Bucket" => result.bucket = Some(read_text_content(reader)?),
                "Key" => result.key = Some(read_text_content(reader)?),
                "UploadId" => result.upload_id = Some(read_text_content(reader)?),
                _ => skip_element(reader, tag)?,
            }
            Ok(())
        })?;
        Ok(result)
    }
}

impl S3Deserialize for CompleteMultipartUploadResult {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut result = CompleteMultipartUploadResult::default();
        read_children(reader, "CompleteMultipartUploadResult", |tag, reader| {
            match tag {
                "Location" => result.location = Some(read_text_content(reader)?),
                "Bucket" => result.bucket = Some(read_text_content(reader)?),
                "Key" => result.key = Some(read_text_content(reader)?),
                "ETag" => result.e_tag = Some(read_text_content(reader)?),
                _ => skip_element(reader, tag)?,
            }
            Ok(())
        })?;
        Ok(result)
    }
}

impl S3Deserialize for S3ErrorResponse {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut error = S3ErrorResponse::default();
        read_children(reader, "Error", |tag, reader| {
            match tag {
                "Code" => error.code = Some(read_text_content(reader)?),
                "Message" => error.message = Some(read_text_content(reader)?),
                "Resource" => error.resource = Some(read_text_content(reader)?),
                "RequestId" => error.request_id = Some(read_text_content(reader)?),
                _ => skip_element(reader, tag)?,
            }
            Ok(())
        })?;
        Ok(error)
    }
}

impl S3Deserialize for CompletedPart {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut part_number = None;
        let mut e_tag = None;
        read_children(reader, "Part", |tag, reader| {
            match tag {
                "PartNumber" => part_number = Some(parse_u32(&read_text_content(reader)?)?),
                "ETag" => e_tag = Some(read_text_content(reader)?),
                _ => skip_element(reader, tag)?,
            }
            Ok(())
        })?;

        Ok(CompletedPart {
            part_number: part_number
                .ok_or_else(|| XmlError::MissingElement("PartNumber".to_string()))?,
            e_tag: e_tag.ok_or_else(|| XmlError::MissingElement("ETag".to_string()))?,
        })
    }
}

impl S3Deserialize for CompleteMultipartUpload {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut parts = Vec::new();
        read_children(reader, "CompleteMultipartUpload", |tag, reader| {
            if tag == "Part" {
                parts.push(CompletedPart::deserialize_xml(reader)?);
            } else {
                skip_element(reader, tag)?;
            }
            Ok(())
        })?;
        Ok(CompleteMultipartUpload { parts })
    }
}
