use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];
const CONFIRMED_MARKER: &str = " (ok)";

#[derive(Clone, Debug, PartialEq)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub display_name: String,
    pub confirmed: bool,
}

impl ImageEntry {
    fn new(path: PathBuf) -> Self {
        let display_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        Self {
            path,
            display_name,
            confirmed: false,
        }
    }

    /// List label, carrying the confirmation marker at most once.
    pub fn label(&self) -> String {
        if self.confirmed {
            format!("{}{}", self.display_name, CONFIRMED_MARKER)
        } else {
            self.display_name.clone()
        }
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Image files directly under `dir`, in the order the directory yields them.
pub fn scan_folder(dir: &Path) -> Vec<ImageEntry> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            log::warn!("cannot read folder {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for item in read_dir {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                log::warn!("skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        let path = item.path();
        if path.is_file() && is_image_file(&path) {
            entries.push(ImageEntry::new(path));
        }
    }
    log::info!("found {} images in {}", entries.len(), dir.display());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(entries: &[ImageEntry]) -> Vec<String> {
        entries.iter().map(|e| e.display_name.clone()).collect()
    }

    /// The expected listing, taken from the filesystem's own enumeration order.
    fn enumerated(dir: &Path, keep: &[&str]) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| keep.contains(&n.as_str()))
            .collect()
    }

    #[test]
    fn filters_by_extension_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.txt", "c.JPG"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let entries = scan_folder(dir.path());
        assert_eq!(names(&entries), enumerated(dir.path(), &["a.png", "c.JPG"]));
        assert!(entries.iter().all(|e| !e.confirmed));
    }

    #[test]
    fn accepts_every_supported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let all = ["one.png", "two.Jpeg", "three.jpg", "four.BMP", "five.gif", "six"];
        for name in all {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let entries = scan_folder(dir.path());
        let expected = enumerated(dir.path(), &["one.png", "two.Jpeg", "three.jpg", "four.BMP"]);
        assert_eq!(names(&entries), expected);
    }

    #[test]
    fn does_not_descend_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();
        fs::write(dir.path().join("nested.png").join("inner.png"), b"x").unwrap();
        fs::write(dir.path().join("top.bmp"), b"x").unwrap();

        assert_eq!(names(&scan_folder(dir.path())), vec!["top.bmp".to_string()]);
    }

    #[test]
    fn missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_folder(&dir.path().join("gone")).is_empty());
    }

    #[test]
    fn label_carries_marker_once() {
        let mut entry = ImageEntry::new(PathBuf::from("/tmp/a.png"));
        assert_eq!(entry.label(), "a.png");
        entry.confirmed = true;
        entry.confirmed = true;
        assert_eq!(entry.label(), "a.png (ok)");
    }
}
