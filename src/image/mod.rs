//! Grayscale image buffers, binary masks and decoding helpers.
//!
//! - [`ImageU8`]: borrowed 8-bit view with stride, the input type of every stage.
//! - [`ImageF32`]: owned float copy used by the Gabor stage.
//! - [`BinaryMask`]: owned 0/255 mask (lung mask, zone masks, opacity masks).
//! - [`io`]: decoding bytes/files into [`GrayImageU8`] and writing PNG/JSON.
pub mod f32;
pub mod io;
pub mod mask;
pub mod traits;
pub mod u8;

pub use self::f32::ImageF32;
pub use self::io::{decode_grayscale, load_grayscale_image, DecodeError, GrayImageU8};
pub use self::mask::BinaryMask;
pub use self::traits::ImageView;
pub use self::u8::ImageU8;
