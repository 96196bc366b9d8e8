use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;

use crate::error::CaptureError;

/// Content type assumed for base64 uploads that do not name one.
pub const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

/// An uploaded photo that passed capture checks.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub body: Bytes,
    pub content_type: String,
}

impl CapturedImage {
    pub fn from_upload(body: Bytes, content_type: &str) -> Result<Self, CaptureError> {
        if body.is_empty() {
            return Err(CaptureError::Empty);
        }
        let content_type = normalize_mime(content_type)
            .ok_or_else(|| CaptureError::UnsupportedType(content_type.to_string()))?;
        Ok(Self { body, content_type })
    }

    /// Accepts either bare base64 or a full `data:<type>;base64,<payload>` URI.
    pub fn from_base64(payload: &str, content_type: Option<&str>) -> Result<Self, CaptureError> {
        let payload = payload.trim();
        let (declared, encoded) = match split_data_uri(payload) {
            Some((ct, data)) => (Some(ct), data),
            None => (None, payload),
        };
        let ct = content_type.or(declared).unwrap_or(DEFAULT_IMAGE_TYPE);
        let body = STANDARD
            .decode(encoded)
            .map_err(|_| CaptureError::InvalidBase64)?;
        Self::from_upload(Bytes::from(body), ct)
    }

    /// Image reference stored in the ledger.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.body))
    }
}

/// Lowercased `image/*` type without parameters, or `None` for anything else.
fn normalize_mime(ct: &str) -> Option<String> {
    let essence = ct.split(';').next()?.trim().to_ascii_lowercase();
    match essence.strip_prefix("image/") {
        Some(sub) if !sub.is_empty() => Some(essence),
        _ => None,
    }
}

fn split_data_uri(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let ct = meta.strip_suffix(";base64")?;
    Some((ct, data))
}

#[cfg(test)]
mod image_tests {
    use super::*;

    #[test]
    fn test_normalize_mime() {
        assert_eq!(normalize_mime("image/jpeg").as_deref(), Some("image/jpeg"));
        assert_eq!(normalize_mime("IMAGE/PNG").as_deref(), Some("image/png"));
        assert_eq!(normalize_mime("image/webp; q=1").as_deref(), Some("image/webp"));
        assert_eq!(normalize_mime("image/"), None);
        assert_eq!(normalize_mime("application/octet-stream"), None);
        assert_eq!(normalize_mime("text/plain"), None);
    }

    #[test]
    fn rejects_empty_and_non_images() {
        assert!(matches!(
            CapturedImage::from_upload(Bytes::new(), "image/png"),
            Err(CaptureError::Empty)
        ));
        assert!(matches!(
            CapturedImage::from_upload(Bytes::from_static(b"%PDF"), "application/pdf"),
            Err(CaptureError::UnsupportedType(ct)) if ct == "application/pdf"
        ));
    }

    #[test]
    fn data_uri_round_trip() {
        let img = CapturedImage::from_upload(Bytes::from_static(&[0xff, 0xd8, 0xff]), "image/jpeg")
            .unwrap();
        let uri = img.to_data_uri();
        assert_eq!(uri, "data:image/jpeg;base64,/9j/");
        let back = CapturedImage::from_base64(&uri, None).unwrap();
        assert_eq!(back.body, img.body);
        assert_eq!(back.content_type, "image/jpeg");
    }

    #[test]
    fn base64_content_type_resolution() {
        let bare = CapturedImage::from_base64("iVBORw==", None).unwrap();
        assert_eq!(bare.content_type, DEFAULT_IMAGE_TYPE);
        let explicit = CapturedImage::from_base64("iVBORw==", Some("image/png")).unwrap();
        assert_eq!(explicit.content_type, "image/png");
        let uri = CapturedImage::from_base64("data:image/gif;base64,R0lG", None).unwrap();
        assert_eq!(uri.content_type, "image/gif");
    }

    #[test]
    fn base64_errors() {
        assert!(matches!(
            CapturedImage::from_base64("not base64!!", None),
            Err(CaptureError::InvalidBase64)
        ));
        assert!(matches!(
            CapturedImage::from_base64("", None),
            Err(CaptureError::Empty)
        ));
        assert!(matches!(
            CapturedImage::from_base64("data:text/plain;base64,aGk=", None),
            Err(CaptureError::UnsupportedType(_))
        ));
    }
}
