//! Tree-structured feed enumerator
//!
//! Walks an XML element stream with `quick-xml` and yields the trimmed text
//! content of every recognized URL element, in document order. The stream is
//! never buffered whole; one event at a time is pulled from the reader.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::{SourceError, URL_TAGS};

/// Lazy URL enumerator over an XML export file
pub struct XmlUrlSource {
    reader: Reader<BufReader<File>>,
    buf: Vec<u8>,
    in_url_element: bool,
    finished: bool,
}

impl XmlUrlSource {
    /// Open an XML export file for enumeration
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let reader = Reader::from_file(path)?;
        Ok(Self {
            reader,
            buf: Vec::new(),
            in_url_element: false,
            finished: false,
        })
    }
}

impl Iterator for XmlUrlSource {
    type Item = Result<String, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(ref e)) => {
                    self.in_url_element = URL_TAGS
                        .iter()
                        .any(|tag| e.name().as_ref() == tag.as_bytes());
                }
                Ok(Event::End(_)) => {
                    self.in_url_element = false;
                }
                Ok(Event::Text(ref e)) if self.in_url_element => {
                    let text = match e.unescape() {
                        Ok(text) => text,
                        Err(e) => {
                            self.finished = true;
                            return Some(Err(e.into()));
                        }
                    };
                    let url = text.trim();
                    if !url.is_empty() {
                        return Some(Ok(url.to_string()));
                    }
                }
                Ok(Event::Eof) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}
