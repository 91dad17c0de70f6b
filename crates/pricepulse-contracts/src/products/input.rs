use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InputKind {
    Url,
    Text,
    Image,
}

impl InputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "URL",
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputKind {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "URL" => Ok(Self::Url),
            "TEXT" => Ok(Self::Text),
            "IMAGE" => Ok(Self::Image),
            _ => Err(PipelineError::InvalidInputKind(raw.trim().to_string())),
        }
    }
}

/// A product reference as submitted by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub value: String,
}

/// MIME type and base64 body of an IMAGE input's data URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePayload<'a> {
    pub mime_type: &'a str,
    pub data: &'a str,
}

impl ProductInput {
    pub fn new(kind: InputKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn url(value: impl Into<String>) -> Self {
        Self::new(InputKind::Url, value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(InputKind::Text, value)
    }

    pub fn image(data_uri: impl Into<String>) -> Self {
        Self::new(InputKind::Image, data_uri)
    }

    /// Builds an input from an untyped kind label, rejecting unknown kinds.
    pub fn parse(kind: &str, value: impl Into<String>) -> Result<Self, PipelineError> {
        Ok(Self::new(kind.parse()?, value))
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Splits `data:<mime>;base64,<data>` into its MIME type and payload.
    pub fn image_payload(&self) -> Result<ImagePayload<'_>, PipelineError> {
        split_data_uri(&self.value)
    }
}

pub fn split_data_uri(value: &str) -> Result<ImagePayload<'_>, PipelineError> {
    let (head, data) = value
        .trim()
        .split_once(";base64,")
        .ok_or(PipelineError::MalformedImageInput)?;
    let mime_type = head.strip_prefix("data:").unwrap_or(head).trim();
    let data = data.trim();
    if mime_type.is_empty() || data.is_empty() {
        return Err(PipelineError::MalformedImageInput);
    }
    if BASE64.decode(data.as_bytes()).is_err() {
        return Err(PipelineError::MalformedImageInput);
    }
    Ok(ImagePayload { mime_type, data })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{split_data_uri, InputKind, ProductInput};
    use crate::errors::PipelineError;

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!("url".parse::<InputKind>().unwrap(), InputKind::Url);
        assert_eq!(" Text ".parse::<InputKind>().unwrap(), InputKind::Text);
        assert_eq!("IMAGE".parse::<InputKind>().unwrap(), InputKind::Image);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = ProductInput::parse("barcode", "7891234567890").unwrap_err();
        assert_eq!(err, PipelineError::InvalidInputKind("barcode".to_string()));
    }

    #[test]
    fn input_serializes_with_type_tag() {
        let input = ProductInput::text("Sony WH-1000XM5");
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({"type": "TEXT", "value": "Sony WH-1000XM5"})
        );
        let parsed: ProductInput =
            serde_json::from_value(json!({"type": "URL", "value": "https://a.example/p"}))
                .unwrap();
        assert_eq!(parsed.kind, InputKind::Url);
    }

    #[test]
    fn blank_detection_ignores_whitespace() {
        assert!(ProductInput::text("   \n").is_blank());
        assert!(!ProductInput::text(" x ").is_blank());
    }

    #[test]
    fn data_uri_splits_mime_and_payload() {
        let input = ProductInput::image("data:image/jpeg;base64,aGVsbG8=");
        let payload = input.image_payload().unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.data, "aGVsbG8=");
    }

    #[test]
    fn malformed_data_uris_are_rejected() {
        for value in [
            "https://example.com/photo.jpg",
            "data:image/png;base64,",
            "data:;base64,aGVsbG8=",
            "data:image/png;base64,not base64!!",
        ] {
            assert_eq!(
                split_data_uri(value).unwrap_err(),
                PipelineError::MalformedImageInput,
                "{value}"
            );
        }
    }
}
