//! Thin wrapper over `quick_xml::Writer` for building request documents.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{HarvesterError, Result};
use crate::namespaces::nsmap;

/// Streaming XML writer producing a UTF-8 string.
///
/// Text and attribute values are escaped by quick-xml.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Create a writer that starts with an XML declaration.
    pub fn new() -> Result<Self> {
        let mut writer = Self::fragment();
        writer.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(writer)
    }

    /// Create a writer without XML declaration, for document fragments.
    #[must_use]
    pub fn fragment() -> Self {
        Self {
            inner: Writer::new(Vec::new()),
        }
    }

    /// Open an element with the given attributes.
    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut element = BytesStart::new(name);
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.write(Event::Start(element))
    }

    /// Close an element.
    pub fn end(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Open an element that declares the registered namespaces of
    /// `prefixes` before its other attributes.
    pub fn start_with_namespaces(
        &mut self,
        name: &str,
        prefixes: &[&str],
        attributes: &[(&str, &str)],
    ) -> Result<()> {
        let mut element = BytesStart::new(name);
        for (prefix, uri) in nsmap(prefixes)? {
            element.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
        }
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.write(Event::Start(element))
    }

    /// Write `<name>text</name>`.
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name, &[])?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    /// Finish and return the document.
    pub fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner())
            .map_err(|e| HarvesterError::XmlWrite(e.to_string()))
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.inner
            .write_event(event)
            .map_err(|e| HarvesterError::XmlWrite(e.to_string()))
    }
}
