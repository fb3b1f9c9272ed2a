//! Image dataset collaborator: supplies normalized image batches and labels.
//!
//! - [`ImageDataset`]: random-access sample source
//! - [`IdxDataset`]: MNIST-style IDX files (`*-images-idx3-ubyte` + `*-labels-idx1-ubyte`)
//! - [`InMemoryDataset`]: caller-supplied vectors
//! - [`BatchLoader`]: fixed-size batches in dataset order

use std::fs;
use std::path::{Path, PathBuf};

use spike_core::{ImageBatch, Label};
use tracing::{debug, warn};

use crate::error::{BridgeResult, DatasetError};

const IDX_IMAGES_MAGIC: u32 = 0x0000_0803;
const IDX_LABELS_MAGIC: u32 = 0x0000_0801;

/// One flattened image with pixel intensities in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSample {
    pub pixels: Vec<f32>,
    pub label: Label,
}

pub trait ImageDataset {
    fn len(&self) -> usize;

    /// Flattened pixel count of every sample.
    fn features(&self) -> usize;

    fn get(&self, idx: usize) -> Result<ImageSample, DatasetError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn name(&self) -> &str;
}

/// Samples held in memory, mainly for tests and synthetic runs.
pub struct InMemoryDataset {
    features: usize,
    samples: Vec<ImageSample>,
}

impl InMemoryDataset {
    pub fn new(samples: Vec<ImageSample>) -> Self {
        let features = samples.first().map_or(0, |s| s.pixels.len());
        Self { features, samples }
    }
}

impl ImageDataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn features(&self) -> usize {
        self.features
    }

    fn get(&self, idx: usize) -> Result<ImageSample, DatasetError> {
        self.samples
            .get(idx)
            .cloned()
            .ok_or(DatasetError::IndexOutOfBounds { index: idx, len: self.samples.len() })
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Images and labels decoded from a pair of IDX files.
pub struct IdxDataset {
    name: String,
    rows: usize,
    cols: usize,
    pixels: Vec<u8>,
    labels: Vec<Label>,
}

fn be_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_idx(path: &Path, magic: u32, dims: usize) -> Result<(Vec<usize>, Vec<u8>), DatasetError> {
    let bytes = fs::read(path).map_err(|source| DatasetError::Io { path: path.to_path_buf(), source })?;
    let invalid = |reason: String| DatasetError::Idx { path: path.to_path_buf(), reason };

    let header_len = 4 + 4 * dims;
    if bytes.len() < header_len {
        return Err(invalid(format!("file is {} bytes, header needs {}", bytes.len(), header_len)));
    }
    let found = be_u32(&bytes, 0);
    if found != magic {
        return Err(invalid(format!("magic {:#010x}, expected {:#010x}", found, magic)));
    }

    let shape: Vec<usize> = (0..dims).map(|d| be_u32(&bytes, 4 + 4 * d) as usize).collect();
    let expected = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| invalid(format!("shape {:?} overflows the address space", shape)))?;
    let body = &bytes[header_len..];
    if body.len() != expected {
        return Err(invalid(format!("shape {:?} needs {} bytes, found {}", shape, expected, body.len())));
    }
    Ok((shape, body.to_vec()))
}

impl IdxDataset {
    pub fn open(images: &Path, labels: &Path) -> Result<Self, DatasetError> {
        let (image_shape, pixels) = read_idx(images, IDX_IMAGES_MAGIC, 3)?;
        let (label_shape, raw_labels) = read_idx(labels, IDX_LABELS_MAGIC, 1)?;
        if image_shape[0] != label_shape[0] {
            return Err(DatasetError::LengthMismatch { images: image_shape[0], labels: label_shape[0] });
        }

        let name = images
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "idx".to_string());
        debug!(%name, count = image_shape[0], rows = image_shape[1], cols = image_shape[2], "opened IDX dataset");

        Ok(Self {
            name,
            rows: image_shape[1],
            cols: image_shape[2],
            pixels,
            labels: raw_labels.into_iter().map(Label::from).collect(),
        })
    }

    /// Conventional MNIST test split file names inside `dir`.
    pub fn mnist_test_split(dir: &Path) -> (PathBuf, PathBuf) {
        (
            dir.join("t10k-images-idx3-ubyte"),
            dir.join("t10k-labels-idx1-ubyte"),
        )
    }
}

impl ImageDataset for IdxDataset {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn features(&self) -> usize {
        self.rows * self.cols
    }

    fn get(&self, idx: usize) -> Result<ImageSample, DatasetError> {
        let label = *self
            .labels
            .get(idx)
            .ok_or(DatasetError::IndexOutOfBounds { index: idx, len: self.labels.len() })?;
        let f = self.features();
        let pixels = self.pixels[idx * f..(idx + 1) * f]
            .iter()
            .map(|&p| p as f32 / 255.0)
            .collect();
        Ok(ImageSample { pixels, label })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Consecutive batches of exactly `batch_size` samples.
///
/// A trailing partial batch is dropped because the simulator is built for a
/// fixed batch size.
pub struct BatchLoader<'a> {
    dataset: &'a dyn ImageDataset,
    batch_size: usize,
}

impl<'a> BatchLoader<'a> {
    pub fn new(dataset: &'a dyn ImageDataset, batch_size: usize) -> Result<Self, DatasetError> {
        if batch_size == 0 || dataset.len() < batch_size {
            return Err(DatasetError::TooSmall { available: dataset.len(), batch_size });
        }
        let leftover = dataset.len() % batch_size;
        if leftover != 0 {
            warn!(dataset = dataset.name(), leftover, batch_size, "dropping trailing partial batch");
        }
        Ok(Self { dataset, batch_size })
    }

    pub fn num_batches(&self) -> usize {
        self.dataset.len() / self.batch_size
    }

    /// Batch `index` as an image batch plus its aligned label vector.
    pub fn batch(&self, index: usize) -> BridgeResult<(ImageBatch, Vec<Label>)> {
        let start = index * self.batch_size;
        let features = self.dataset.features();
        let mut pixels = Vec::with_capacity(self.batch_size * features);
        let mut labels = Vec::with_capacity(self.batch_size);
        for idx in start..start + self.batch_size {
            let sample = self.dataset.get(idx)?;
            pixels.extend(sample.pixels);
            labels.push(sample.label);
        }
        Ok((ImageBatch::new(self.batch_size, features, pixels)?, labels))
    }

    pub fn iter(&self) -> impl Iterator<Item = BridgeResult<(ImageBatch, Vec<Label>)>> + '_ {
        (0..self.num_batches()).map(move |i| self.batch(i))
    }
}
