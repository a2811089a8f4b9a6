use std::path::Path;

use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use ndarray::Array2;
use serde::Serialize;

use crate::canvas::Rectangle;

#[derive(Debug, Serialize)]
struct AnnotationRecord<'a> {
    image: &'a Path,
    class: &'a str,
    width: usize,
    height: usize,
    mask: String,
    rectangles: &'a [Rectangle],
}

/// Write `<stem>.mask.png` and `<stem>.json` for one confirmed image.
pub fn export_annotation(
    out_dir: &Path,
    image_path: &Path,
    class: &str,
    mask: &Array2<bool>,
    rectangles: &[Rectangle],
) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating export folder {}", out_dir.display()))?;

    let stem = image_path
        .file_stem()
        .unwrap_or_default()
        .to_str()
        .unwrap_or("image");
    let (height, width) = mask.dim();

    let mask_name = format!("{stem}.mask.png");
    let mask_img = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([if mask[[y as usize, x as usize]] { 255 } else { 0 }])
    });
    let mask_path = out_dir.join(&mask_name);
    mask_img
        .save(&mask_path)
        .with_context(|| format!("writing {}", mask_path.display()))?;

    let record = AnnotationRecord {
        image: image_path,
        class,
        width,
        height,
        mask: mask_name,
        rectangles,
    };
    let json_path = out_dir.join(format!("{stem}.json"));
    let data = serde_json::to_string_pretty(&record)?;
    std::fs::write(&json_path, data)
        .with_context(|| format!("writing {}", json_path.display()))?;
    log::info!("exported {} as '{class}'", json_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_mask_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("labels");
        let mut mask = Array2::from_elem((2, 3), false);
        mask[[1, 2]] = true;
        let rects = [Rectangle { x0: 1.0, y0: 2.0, x1: 3.0, y1: 4.0, handle: 9 }];

        export_annotation(&out, Path::new("/data/cat.jpg"), "class2", &mask, &rects).unwrap();
        let json_path = out.join("cat.json");

        let mask_img = image::open(out.join("cat.mask.png")).unwrap().to_luma8();
        assert_eq!(mask_img.dimensions(), (3, 2));
        assert_eq!(mask_img.get_pixel(2, 1)[0], 255);
        assert_eq!(mask_img.get_pixel(0, 0)[0], 0);

        let record: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(record["class"], "class2");
        assert_eq!(record["mask"], "cat.mask.png");
        assert_eq!(record["width"], 3);
        assert_eq!(record["rectangles"][0]["x1"], 3.0);
        assert!(record["rectangles"][0].get("handle").is_none());
    }
}
