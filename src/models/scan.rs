use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Browsers and mobile clients disagree about padding, so accept both forms.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The four body regions photographed for a scan.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum BodyRegion {
    Lips,
    Tongue,
    Eyes,
    Nails,
}

/// JSON submission body: one base64 image per region.
#[derive(Debug, Deserialize, Validate)]
pub struct UploadRequest {
    #[garde(required, length(min = 1))]
    pub lips: Option<String>,

    #[garde(required, length(min = 1))]
    pub tongue: Option<String>,

    #[garde(required, length(min = 1))]
    pub eyes: Option<String>,

    #[garde(required, length(min = 1))]
    pub nails: Option<String>,
}

impl UploadRequest {
    /// Validate presence of all four images and decode them.
    pub fn decode(self) -> Result<ScanImages, InputError> {
        self.validate().map_err(|_| InputError::Missing)?;

        let mut builder = ScanImagesBuilder::default();
        for (region, encoded) in [
            (BodyRegion::Lips, self.lips),
            (BodyRegion::Tongue, self.tongue),
            (BodyRegion::Eyes, self.eyes),
            (BodyRegion::Nails, self.nails),
        ] {
            let encoded = encoded.ok_or(InputError::Missing)?;
            builder.set(region, decode_image(region, &encoded)?);
        }
        builder.build()
    }
}

/// Decode a base64 image, tolerating a `data:<mime>;base64,` prefix.
pub fn decode_image(region: BodyRegion, encoded: &str) -> Result<Vec<u8>, InputError> {
    let encoded = encoded.trim();
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };

    LENIENT_BASE64
        .decode(payload)
        .map_err(|_| InputError::InvalidEncoding(region))
}

/// A complete, non-empty input set.
#[derive(Debug, Clone)]
pub struct ScanImages {
    lips: Vec<u8>,
    tongue: Vec<u8>,
    eyes: Vec<u8>,
    nails: Vec<u8>,
}

impl ScanImages {
    pub fn get(&self, region: BodyRegion) -> &[u8] {
        match region {
            BodyRegion::Lips => &self.lips,
            BodyRegion::Tongue => &self.tongue,
            BodyRegion::Eyes => &self.eyes,
            BodyRegion::Nails => &self.nails,
        }
    }
}

/// Collects images one region at a time (JSON fields or multipart parts).
#[derive(Debug, Default)]
pub struct ScanImagesBuilder {
    lips: Option<Vec<u8>>,
    tongue: Option<Vec<u8>>,
    eyes: Option<Vec<u8>>,
    nails: Option<Vec<u8>>,
}

impl ScanImagesBuilder {
    pub fn set(&mut self, region: BodyRegion, bytes: Vec<u8>) {
        let slot = match region {
            BodyRegion::Lips => &mut self.lips,
            BodyRegion::Tongue => &mut self.tongue,
            BodyRegion::Eyes => &mut self.eyes,
            BodyRegion::Nails => &mut self.nails,
        };
        *slot = Some(bytes);
    }

    pub fn build(self) -> Result<ScanImages, InputError> {
        fn present(bytes: Option<Vec<u8>>) -> Result<Vec<u8>, InputError> {
            bytes.filter(|b| !b.is_empty()).ok_or(InputError::Missing)
        }

        Ok(ScanImages {
            lips: present(self.lips)?,
            tongue: present(self.tongue)?,
            eyes: present(self.eyes)?,
            nails: present(self.nails)?,
        })
    }
}

/// Client-side input problems. None of these create a job.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Missing one or more images.")]
    Missing,

    #[error("Image '{0}' is not valid base64.")]
    InvalidEncoding(BodyRegion),

    #[error("Malformed upload: {0}")]
    Malformed(String),
}

/// Response to an accepted submission (HTTP 202).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: Uuid,
}

/// Generic `{"message": ...}` body used for error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(bytes: &[u8]) -> Option<String> {
        Some(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    fn full_request() -> UploadRequest {
        UploadRequest {
            lips: encoded(b"lips"),
            tongue: encoded(b"tongue"),
            eyes: encoded(b"eyes"),
            nails: encoded(b"nails"),
        }
    }

    #[test]
    fn test_decode_full_request() {
        let images = full_request().decode().unwrap();
        assert_eq!(images.get(BodyRegion::Lips), b"lips");
        assert_eq!(images.get(BodyRegion::Tongue), b"tongue");
        assert_eq!(images.get(BodyRegion::Eyes), b"eyes");
        assert_eq!(images.get(BodyRegion::Nails), b"nails");
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut request = full_request();
        request.eyes = None;
        assert_eq!(request.decode().unwrap_err(), InputError::Missing);
    }

    #[test]
    fn test_empty_field_is_rejected() {
        let mut request = full_request();
        request.tongue = Some(String::new());
        assert_eq!(request.decode().unwrap_err(), InputError::Missing);
    }

    #[test]
    fn test_data_url_prefix_is_stripped() {
        let bytes = decode_image(BodyRegion::Lips, "data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_unpadded_base64_is_accepted() {
        let bytes = decode_image(BodyRegion::Eyes, "aGVsbG8").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_invalid_base64_names_region() {
        let err = decode_image(BodyRegion::Nails, "not base64!!").unwrap_err();
        assert_eq!(err, InputError::InvalidEncoding(BodyRegion::Nails));
        assert_eq!(err.to_string(), "Image 'nails' is not valid base64.");
    }

    #[test]
    fn test_prefix_without_payload_counts_as_missing() {
        let mut request = full_request();
        request.lips = Some("data:image/png;base64,".to_string());
        assert_eq!(request.decode().unwrap_err(), InputError::Missing);
    }

    #[test]
    fn test_region_names_round_trip_through_strum() {
        assert_eq!("tongue".parse::<BodyRegion>().unwrap(), BodyRegion::Tongue);
        assert_eq!(BodyRegion::Eyes.as_ref(), "eyes");
        assert!("elbow".parse::<BodyRegion>().is_err());
    }
}
