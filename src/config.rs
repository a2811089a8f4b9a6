use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_ENV: &str = "SAM_ANNOTATE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "sam-annotate.json";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub encoder_path: PathBuf,
    pub decoder_path: PathBuf,
    pub classes: Vec<String>,
    /// Larger images are shrunk to fit before display; smaller ones are left as is.
    pub max_display_size: [u32; 2],
    pub overlay_color: [u8; 4],
    pub window_size: [f32; 2],
    /// Confirmations are exported here when set.
    pub export_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            encoder_path: PathBuf::from("models/sam_vit_h_encoder.onnx"),
            decoder_path: PathBuf::from("models/sam_vit_h_decoder.onnx"),
            classes: vec!["class1".into(), "class2".into(), "class3".into()],
            max_display_size: [800, 600],
            overlay_color: [0, 0, 0, 255],
            window_size: [1200.0, 700.0],
            export_dir: None,
        }
    }
}

impl AppConfig {
    /// Config named by `SAM_ANNOTATE_CONFIG`, else `sam-annotate.json` in the
    /// working directory, else defaults.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    log::info!("no {DEFAULT_CONFIG_FILE}, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}
