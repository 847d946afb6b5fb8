use cxr_coach::image::GrayImageU8;
use image::{GrayImage, ImageFormat};
use std::io::Cursor;

pub const SIZE: usize = 512;
pub const BACKGROUND: u8 = 200;
pub const LUNG: u8 = 60;
pub const OPACITY: u8 = 230;

/// Image-left (anatomical right) and image-right lung centres.
pub const RIGHT_LUNG_CENTRE: (f32, f32) = (162.0, 256.0);
pub const LEFT_LUNG_CENTRE: (f32, f32) = (350.0, 256.0);
pub const LUNG_SEMI_AXES: (f32, f32) = (60.0, 120.0);

/// Opacity disc placed in the lower third of the image-left lung.
pub const OPACITY_CENTRE: (f32, f32) = (162.0, 330.0);
pub const OPACITY_RADIUS: f32 = 24.0;

/// Rows at the top of the frame left black, like a collimator edge.
pub const DARK_BORDER_ROWS: usize = 8;

fn in_ellipse(x: usize, y: usize, centre: (f32, f32), axes: (f32, f32)) -> bool {
    let dx = (x as f32 - centre.0) / axes.0;
    let dy = (y as f32 - centre.1) / axes.1;
    dx * dx + dy * dy <= 1.0
}

/// Synthetic frontal radiograph: two dark elliptical lung fields on a bright
/// body, an optional bright disc opacity in the image-left lower field.
pub fn radiograph_u8(with_opacity: bool) -> Vec<u8> {
    let mut img = vec![BACKGROUND; SIZE * SIZE];
    for y in 0..SIZE {
        for x in 0..SIZE {
            let v = if y < DARK_BORDER_ROWS {
                0
            } else if in_ellipse(x, y, RIGHT_LUNG_CENTRE, LUNG_SEMI_AXES)
                || in_ellipse(x, y, LEFT_LUNG_CENTRE, LUNG_SEMI_AXES)
            {
                let r = (OPACITY_RADIUS, OPACITY_RADIUS);
                if with_opacity && in_ellipse(x, y, OPACITY_CENTRE, r) {
                    OPACITY
                } else {
                    LUNG
                }
            } else {
                BACKGROUND
            };
            img[y * SIZE + x] = v;
        }
    }
    img
}

pub fn radiograph(with_opacity: bool) -> GrayImageU8 {
    GrayImageU8::new(SIZE, SIZE, radiograph_u8(with_opacity))
}

/// Constant image with no anatomy at all.
pub fn blank(value: u8, width: usize, height: usize) -> GrayImageU8 {
    GrayImageU8::new(width, height, vec![value; width * height])
}

/// Encode a grayscale buffer as PNG bytes.
pub fn encode_png(img: &GrayImageU8) -> Vec<u8> {
    let gray = GrayImage::from_raw(img.width() as u32, img.height() as u32, img.data().to_vec())
        .expect("buffer size matches dimensions");
    let mut out = Cursor::new(Vec::new());
    gray.write_to(&mut out, ImageFormat::Png)
        .expect("png encoding succeeds");
    out.into_inner()
}
