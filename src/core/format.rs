//! Format descriptor structures

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Resolved formats keyed by their final URL
pub type BatchResult = HashMap<String, ResolvedFormat>;

/// Format descriptor as delivered by the player response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    /// Format ID (itag)
    #[serde(default)]
    pub itag: u32,
    /// MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Direct URL (unciphered formats)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Signature cipher payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_cipher: Option<String>,
    /// Legacy cipher payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    /// Remaining fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormatDescriptor {
    /// Create a new FormatDescriptor without any URL representation
    pub fn new(itag: u32, mime_type: &str) -> Self {
        Self {
            itag,
            mime_type: Some(mime_type.to_string()),
            url: None,
            signature_cipher: None,
            cipher: None,
            extra: Map::new(),
        }
    }

    /// Set a direct URL
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Set a signature cipher payload
    pub fn with_signature_cipher(mut self, payload: &str) -> Self {
        self.signature_cipher = Some(payload.to_string());
        self
    }

    /// Direct URL, if present and non-empty
    pub fn direct_url(&self) -> Option<&str> {
        non_empty(self.url.as_deref())
    }

    /// Cipher payload, preferring a non-empty `signatureCipher` over `cipher`
    pub fn cipher_payload(&self) -> Option<&str> {
        non_empty(self.signature_cipher.as_deref()).or(non_empty(self.cipher.as_deref()))
    }

    /// Drop the cipher fields and attach the final URL
    pub fn into_resolved(self, url: String) -> ResolvedFormat {
        ResolvedFormat {
            itag: self.itag,
            mime_type: self.mime_type,
            url,
            extra: self.extra,
        }
    }
}

/// Format carrying exactly one resolved URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFormat {
    /// Format ID (itag)
    pub itag: u32,
    /// MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Playable URL
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_player_format() {
        let json = r#"{
            "itag": 251,
            "mimeType": "audio/webm; codecs=\"opus\"",
            "bitrate": 135000,
            "signatureCipher": "s=abc&sp=sig&url=https%3A%2F%2Fx.test%2Fv"
        }"#;
        let format: FormatDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(format.itag, 251);
        assert!(format.direct_url().is_none());
        assert_eq!(
            format.cipher_payload(),
            Some("s=abc&sp=sig&url=https%3A%2F%2Fx.test%2Fv")
        );
        assert_eq!(format.extra.get("bitrate"), Some(&Value::from(135000)));
    }

    #[test]
    fn test_cipher_payload_prefers_signature_cipher() {
        let mut format = FormatDescriptor::new(18, "video/mp4");
        format.cipher = Some("s=old".to_string());
        format.signature_cipher = Some("s=new".to_string());
        assert_eq!(format.cipher_payload(), Some("s=new"));

        format.signature_cipher = None;
        assert_eq!(format.cipher_payload(), Some("s=old"));
    }

    #[test]
    fn test_empty_fields_count_as_absent() {
        let mut format = FormatDescriptor::new(18, "video/mp4").with_url("");
        assert!(format.direct_url().is_none());
        assert!(format.cipher_payload().is_none());

        format.signature_cipher = Some(String::new());
        format.cipher = Some("s=old".to_string());
        assert_eq!(format.cipher_payload(), Some("s=old"));

        format.cipher = Some(String::new());
        assert!(format.cipher_payload().is_none());
    }

    #[test]
    fn test_into_resolved_drops_cipher_fields() {
        let mut format = FormatDescriptor::new(140, "audio/mp4")
            .with_signature_cipher("s=abc&url=https%3A%2F%2Fx.test%2Fv");
        format
            .extra
            .insert("quality".to_string(), Value::from("tiny"));

        let resolved = format.into_resolved("https://x.test/v?sig=cba".to_string());
        let json = serde_json::to_value(&resolved).unwrap();

        assert_eq!(json["url"], "https://x.test/v?sig=cba");
        assert_eq!(json["quality"], "tiny");
        assert!(json.get("signatureCipher").is_none());
        assert!(json.get("cipher").is_none());
        assert_eq!(resolved.mime_type.as_deref(), Some("audio/mp4"));
    }
}
