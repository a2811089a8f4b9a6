use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::{Array1, Array2, Array3, Array4, ArrayViewD, Axis, Ix2};
use ort::execution_providers::{
    CUDAExecutionProvider, ExecutionProvider, ExecutionProviderDispatch,
};
use ort::session::Session;
use ort::value::TensorRef;

/// Side length the encoder expects; inputs are resized and padded to it.
const ENCODER_SIZE: u32 = 1024;
const LOW_RES_MASK_SIZE: usize = 256;
const PIXEL_MEAN: [f32; 3] = [123.675, 116.28, 103.53];
const PIXEL_STD: [f32; 3] = [58.395, 57.12, 57.375];
const MASK_THRESHOLD: f32 = 0.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointPrompt {
    pub x: f32,
    pub y: f32,
    pub foreground: bool,
}

impl PointPrompt {
    /// Foreground point at the geometric centre of a `width` x `height` image.
    pub fn center(width: u32, height: u32) -> Self {
        Self {
            x: (width / 2) as f32,
            y: (height / 2) as f32,
            foreground: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),
    #[error("model output `{name}` has unexpected shape {shape:?}")]
    UnexpectedOutput { name: &'static str, shape: Vec<usize> },
    #[error("at least one point prompt is required")]
    NoPrompt,
}

/// A point-prompted segmentation model producing one mask per call.
pub trait Segmenter {
    /// Returns a mask shaped `(height, width)` of `image`.
    fn segment(
        &mut self,
        image: &RgbImage,
        points: &[PointPrompt],
    ) -> Result<Array2<bool>, SegmentError>;
}

/// Segment Anything, exported to ONNX as a separate image encoder and
/// prompt decoder.
pub struct SamSegmenter {
    encoder: Session,
    decoder: Session,
}

impl SamSegmenter {
    pub fn load(encoder_path: &Path, decoder_path: &Path) -> Result<Self> {
        let accelerated = CUDAExecutionProvider::default()
            .is_available()
            .unwrap_or(false);
        log::info!(
            "loading SAM on {}",
            if accelerated { "CUDA" } else { "CPU" }
        );

        let encoder = load_session(encoder_path, accelerated)?;
        let decoder = load_session(decoder_path, accelerated)?;
        Ok(Self { encoder, decoder })
    }
}

/// Providers to register; none means the default CPU provider.
fn execution_providers(accelerated: bool) -> Vec<ExecutionProviderDispatch> {
    if accelerated {
        vec![CUDAExecutionProvider::default().build()]
    } else {
        Vec::new()
    }
}

fn load_session(path: &Path, accelerated: bool) -> Result<Session> {
    let session = Session::builder()?
        .with_execution_providers(execution_providers(accelerated))?
        .commit_from_file(path)
        .with_context(|| format!("loading model {}", path.display()))?;
    Ok(session)
}

impl Segmenter for SamSegmenter {
    fn segment(
        &mut self,
        image: &RgbImage,
        points: &[PointPrompt],
    ) -> Result<Array2<bool>, SegmentError> {
        if points.is_empty() {
            return Err(SegmentError::NoPrompt);
        }
        let (width, height) = image.dimensions();

        let input = encoder_input(image);
        let outputs = self
            .encoder
            .run(ort::inputs!["image" => TensorRef::from_array_view(&input)?])?;
        let embeddings = outputs["image_embeddings"]
            .try_extract_array::<f32>()?
            .to_owned();
        drop(outputs);

        let (coords, labels) = prompt_arrays(points, width, height);
        let mask_input = Array4::<f32>::zeros((1, 1, LOW_RES_MASK_SIZE, LOW_RES_MASK_SIZE));
        let has_mask_input = Array1::<f32>::zeros(1);
        let orig_im_size = Array1::from(vec![height as f32, width as f32]);

        let outputs = self.decoder.run(ort::inputs![
            "image_embeddings" => TensorRef::from_array_view(&embeddings)?,
            "point_coords" => TensorRef::from_array_view(&coords)?,
            "point_labels" => TensorRef::from_array_view(&labels)?,
            "mask_input" => TensorRef::from_array_view(&mask_input)?,
            "has_mask_input" => TensorRef::from_array_view(&has_mask_input)?,
            "orig_im_size" => TensorRef::from_array_view(&orig_im_size)?,
        ])?;
        let masks = outputs["masks"].try_extract_array::<f32>()?;
        first_mask(masks, height, width)
    }
}

/// Threshold the first mask of a `[batch, masks, height, width]` logit
/// tensor. Any further masks are ignored.
fn first_mask(
    masks: ArrayViewD<'_, f32>,
    height: u32,
    width: u32,
) -> Result<Array2<bool>, SegmentError> {
    let unexpected = || SegmentError::UnexpectedOutput {
        name: "masks",
        shape: masks.shape().to_vec(),
    };
    if masks.ndim() != 4 || masks.shape()[0] == 0 || masks.shape()[1] == 0 {
        return Err(unexpected());
    }
    let first = masks
        .index_axis(Axis(0), 0)
        .index_axis_move(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|_| unexpected())?;
    if first.dim() != (height as usize, width as usize) {
        return Err(unexpected());
    }
    Ok(first.mapv(|logit| logit > MASK_THRESHOLD))
}

/// Target size when the longer side is scaled to the encoder size.
fn resized_dims(width: u32, height: u32) -> (u32, u32) {
    let scale = ENCODER_SIZE as f32 / width.max(height) as f32;
    let w = (width as f32 * scale + 0.5) as u32;
    let h = (height as f32 * scale + 0.5) as u32;
    (w.max(1), h.max(1))
}

/// Normalized, zero-padded `[1, 3, 1024, 1024]` encoder input.
fn encoder_input(image: &RgbImage) -> Array4<f32> {
    let (w, h) = resized_dims(image.width(), image.height());
    let resized = image::imageops::resize(image, w, h, image::imageops::FilterType::Triangle);

    let side = ENCODER_SIZE as usize;
    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 - PIXEL_MEAN[c]) / PIXEL_STD[c];
        }
    }
    input
}

/// Point coordinates in encoder space plus labels, with the padding point the
/// decoder expects when no box prompt is given.
fn prompt_arrays(points: &[PointPrompt], width: u32, height: u32) -> (Array3<f32>, Array2<f32>) {
    let (rw, rh) = resized_dims(width, height);
    let sx = rw as f32 / width as f32;
    let sy = rh as f32 / height as f32;

    let n = points.len() + 1;
    let mut coords = Array3::<f32>::zeros((1, n, 2));
    let mut labels = Array2::<f32>::zeros((1, n));
    for (i, p) in points.iter().enumerate() {
        coords[[0, i, 0]] = p.x * sx;
        coords[[0, i, 1]] = p.y * sy;
        labels[[0, i]] = if p.foreground { 1.0 } else { 0.0 };
    }
    labels[[0, n - 1]] = -1.0;
    (coords, labels)
}
