use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;

use crate::render::PNG_SIGNATURE;

/// Inline image attachment handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageElement {
    data: Bytes,
    mime: &'static str,
}

impl ImageElement {
    #[must_use]
    pub fn new(data: impl Into<Bytes>, mime: &'static str) -> Self {
        Self {
            data: data.into(),
            mime,
        }
    }

    /// Element type name used by message hosts.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        "image"
    }

    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[must_use]
    pub fn mime(&self) -> &'static str {
        self.mime
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn is_png(&self) -> bool {
        self.mime == "image/png" && self.data.starts_with(&PNG_SIGNATURE)
    }

    /// `data:` URL form for hosts that inline attachments as text.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }

    #[must_use]
    pub fn into_parts(self) -> (Bytes, &'static str) {
        (self.data, self.mime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_carries_mime_and_payload() {
        let element = ImageElement::new(vec![1u8, 2, 3], "image/png");
        assert_eq!(element.to_data_url(), "data:image/png;base64,AQID");
        assert_eq!(element.kind(), "image");
        assert!(!element.is_png());
    }
}
