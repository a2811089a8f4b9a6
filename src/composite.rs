use image::{DynamicImage, Rgba, RgbaImage};
use ndarray::Array2;

#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("mask is {mask_w}x{mask_h} but image is {image_w}x{image_h}")]
    SizeMismatch {
        mask_w: usize,
        mask_h: usize,
        image_w: u32,
        image_h: u32,
    },
}

/// Paint `color` over every masked pixel of `source`. The mask is indexed
/// `[row, column]`, i.e. shape `(height, width)`. Source alpha is dropped, so
/// unmasked pixels come out opaque.
pub fn composite(
    source: &DynamicImage,
    mask: &Array2<bool>,
    color: Rgba<u8>,
) -> Result<RgbaImage, CompositeError> {
    let rgb = source.to_rgb8();
    let (width, height) = rgb.dimensions();
    let (mask_h, mask_w) = mask.dim();
    if (mask_w, mask_h) != (width as usize, height as usize) {
        return Err(CompositeError::SizeMismatch {
            mask_w,
            mask_h,
            image_w: width,
            image_h: height,
        });
    }

    Ok(RgbaImage::from_fn(width, height, |x, y| {
        if mask[[y as usize, x as usize]] {
            color
        } else {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            Rgba([r, g, b, 255])
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> DynamicImage {
        let img = image::RgbImage::from_fn(w, h, |x, y| image::Rgb([x as u8 * 10, y as u8 * 10, 7]));
        DynamicImage::ImageRgb8(img)
    }

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn empty_mask_is_identity() {
        let src = gradient(5, 3);
        let out = composite(&src, &Array2::from_elem((3, 5), false), BLACK).unwrap();
        assert_eq!(out, src.to_rgba8());
    }

    #[test]
    fn transparent_source_comes_out_opaque() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0])));
        let out = composite(&src, &Array2::from_elem((2, 2), false), BLACK).unwrap();
        assert!(out.pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn full_mask_is_solid_color() {
        let src = gradient(5, 3);
        let out = composite(&src, &Array2::from_elem((3, 5), true), BLACK).unwrap();
        assert!(out.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn partial_mask_touches_only_masked_pixels() {
        let src = gradient(4, 2);
        let mut mask = Array2::from_elem((2, 4), false);
        mask[[1, 3]] = true;
        let red = Rgba([255, 0, 0, 255]);
        let out = composite(&src, &mask, red).unwrap();

        assert_eq!(*out.get_pixel(3, 1), red);
        assert_eq!(*out.get_pixel(1, 1), Rgba([10, 10, 7, 255]));
        assert_eq!(*out.get_pixel(3, 0), Rgba([30, 0, 7, 255]));
    }

    #[test]
    fn transposed_mask_is_rejected() {
        let src = gradient(4, 2);
        let err = composite(&src, &Array2::from_elem((4, 2), true), BLACK).unwrap_err();
        assert!(err.to_string().contains("2x4"));
    }
}
