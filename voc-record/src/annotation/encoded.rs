use crate::common::*;
use imagesize::ImageType;
use sha2::{Digest, Sha256};

/// The raw bytes of a JPEG image with its digest and header size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub encoded: Vec<u8>,
    /// Lowercase hex SHA-256 digest of `encoded`.
    pub key_sha256: String,
    pub size: PixelSize,
}

impl EncodedImage {
    /// Inspect image bytes. Fails unless the bytes carry a JPEG header.
    pub fn from_bytes(encoded: Vec<u8>) -> Result<Self> {
        let image_type = imagesize::image_type(&encoded)?;
        ensure!(
            matches!(image_type, ImageType::Jpeg),
            "image format is {:?}, but JPEG is expected",
            image_type
        );

        let imagesize::ImageSize { width, height } = imagesize::blob_size(&encoded)?;
        let size = HW::try_from_hw([height, width])?;
        let key_sha256 = hex::encode(Sha256::digest(&encoded));

        Ok(Self {
            encoded,
            key_sha256,
            size,
        })
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let encoded = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read image file '{}'", path.display()))?;

        tokio::task::spawn_blocking(move || {
            Self::from_bytes(encoded)
                .with_context(|| format!("invalid image file '{}'", path.display()))
        })
        .await?
    }
}
