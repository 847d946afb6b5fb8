//! Decoding and I/O helpers for grayscale radiographs, masks and JSON.
//!
//! - `decode_grayscale`: PNG/JPEG/… bytes into an owned 8-bit gray buffer.
//! - `load_grayscale_image`: same, reading from disk.
//! - `save_grayscale_u8` / `save_mask_png`: write buffers back as PNG.
//! - `write_json_file` / `read_json_file`: pretty JSON to and from disk.
use super::{BinaryMask, ImageU8};
use image::{GrayImage, ImageBuffer, Luma};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Owned 8-bit grayscale buffer with stride and borrowed view conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImageU8 {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u8>,
}

impl GrayImageU8 {
    /// Construct an owned grayscale buffer given raw bytes.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height, "buffer size mismatch");
        let stride = width;
        Self {
            width,
            height,
            stride,
            data,
        }
    }

    /// Zero-filled buffer of the given size.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self::new(width, height, vec![0; width * height])
    }

    /// Image width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixel data (`stride == width`).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }

    /// Borrow as a read-only `ImageU8` view
    pub fn as_view(&self) -> ImageU8<'_> {
        ImageU8 {
            w: self.width,
            h: self.height,
            stride: self.stride,
            data: &self.data,
        }
    }

    /// Copy into an `image::GrayImage`.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .unwrap_or_else(|| GrayImage::new(self.width as u32, self.height as u32))
    }
}

impl From<GrayImage> for GrayImageU8 {
    fn from(img: GrayImage) -> Self {
        let width = img.width() as usize;
        let height = img.height() as usize;
        GrayImageU8::new(width, height, img.into_raw())
    }
}

/// Reasons an encoded image could not be turned into a pixel buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// No bytes were supplied.
    Empty,
    /// The codec rejected the bytes.
    Unreadable { reason: String },
    /// The image decoded but has a zero dimension.
    ZeroSized,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "image payload is empty"),
            DecodeError::Unreadable { reason } => write!(f, "failed to decode image: {reason}"),
            DecodeError::ZeroSized => write!(f, "decoded image has a zero dimension"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode encoded image bytes (PNG, JPEG, …) into an 8-bit grayscale buffer.
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImageU8, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let img = image::load_from_memory(bytes)
        .map_err(|e| DecodeError::Unreadable {
            reason: e.to_string(),
        })?
        .into_luma8();
    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::ZeroSized);
    }
    Ok(GrayImageU8::from(img))
}

/// Load an image from disk and convert to 8-bit grayscale.
pub fn load_grayscale_image(path: &Path) -> Result<GrayImageU8, String> {
    let bytes =
        fs::read(path).map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
    decode_grayscale(&bytes).map_err(|e| format!("Failed to decode {}: {e}", path.display()))
}

/// Save an 8-bit grayscale buffer to a PNG.
pub fn save_grayscale_u8(buffer: &GrayImageU8, path: &Path) -> Result<(), String> {
    save_raw_gray(buffer.width(), buffer.height(), buffer.data().to_vec(), path)
}

/// Save a binary mask to a PNG (on = white).
pub fn save_mask_png(mask: &BinaryMask, path: &Path) -> Result<(), String> {
    save_raw_gray(mask.width(), mask.height(), mask.as_bytes().to_vec(), path)
}

fn save_raw_gray(width: usize, height: usize, data: Vec<u8>, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let image: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width as u32, height as u32, data)
            .ok_or_else(|| "Failed to create image buffer".to_string())?;
    image
        .save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

/// Read and deserialize a JSON file.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&data).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
