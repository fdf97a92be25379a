//! CIFAR-10 binary format reader.
//!
//! Reads the `cifar-10-binary` distribution: five training batch files
//! and one test batch file, each holding 10,000 records of one label
//! byte followed by 3,072 pixel bytes stored channel-planar
//! (1,024 red, 1,024 green, 1,024 blue).

use std::fs;
use std::path::Path;

use tracing::info;

use cifar_core::{Error, Result};

use crate::IMAGE_LEN;

/// CIFAR-10 class names, indexed by label.
pub const CLASS_NAMES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

const RECORD_LEN: usize = 1 + IMAGE_LEN;
const RECORDS_PER_FILE: usize = 10_000;

/// Dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test => write!(f, "test"),
        }
    }
}

/// One raw CIFAR-10 image with its label.
#[derive(Debug, Clone)]
pub struct Cifar10Image {
    /// Pixel bytes in channel-planar CHW order, as stored on disk
    pub pixels: Vec<u8>,
    /// Class label (0-9)
    pub label: usize,
}

impl Cifar10Image {
    /// Class name for this image's label.
    pub fn class_name(&self) -> &'static str {
        CLASS_NAMES[self.label]
    }
}

/// All images of one CIFAR-10 split.
#[derive(Debug, Clone)]
pub struct Cifar10Data {
    pub images: Vec<Cifar10Image>,
    pub split: Split,
}

impl Cifar10Data {
    /// Loads a split from a directory holding the binary batch files.
    pub fn load(data_dir: impl AsRef<Path>, split: Split) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let mut images = Vec::new();

        match split {
            Split::Train => {
                for i in 1..=5 {
                    let path = data_dir.join(format!("data_batch_{i}.bin"));
                    images.extend(read_batch_file(&path)?);
                }
            }
            Split::Test => {
                let path = data_dir.join("test_batch.bin");
                images = read_batch_file(&path)?;
            }
        }

        info!("loaded {} {split} images from {}", images.len(), data_dir.display());
        Ok(Self { images, split })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Number of images per class label.
    pub fn class_distribution(&self) -> [usize; 10] {
        let mut counts = [0; 10];
        for image in &self.images {
            counts[image.label] += 1;
        }
        counts
    }
}

/// Reads one binary batch file.
fn read_batch_file(path: &Path) -> Result<Vec<Cifar10Image>> {
    let buffer = fs::read(path)
        .map_err(|e| Error::Dataset(format!("failed to read {}: {e}", path.display())))?;

    if buffer.len() % RECORD_LEN != 0 {
        return Err(Error::Dataset(format!(
            "{}: size {} is not a multiple of the {}-byte record",
            path.display(),
            buffer.len(),
            RECORD_LEN
        )));
    }

    let records = buffer.len() / RECORD_LEN;
    if records != RECORDS_PER_FILE {
        return Err(Error::Dataset(format!(
            "{}: expected {RECORDS_PER_FILE} records, found {records}",
            path.display()
        )));
    }

    parse_records(&buffer)
}

fn parse_records(buffer: &[u8]) -> Result<Vec<Cifar10Image>> {
    let mut images = Vec::with_capacity(buffer.len() / RECORD_LEN);

    for record in buffer.chunks_exact(RECORD_LEN) {
        let label = record[0] as usize;
        if label >= CLASS_NAMES.len() {
            return Err(Error::Dataset(format!("label {label} out of range")));
        }
        images.push(Cifar10Image {
            pixels: record[1..].to_vec(),
            label,
        });
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a buffer of `n` records with label `i % 10` and a first
    /// red pixel equal to the record index.
    fn synthetic_batch(n: usize) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(n * RECORD_LEN);
        for i in 0..n {
            buffer.push((i % 10) as u8);
            let mut pixels = vec![0u8; IMAGE_LEN];
            pixels[0] = i as u8;
            buffer.extend_from_slice(&pixels);
        }
        buffer
    }

    #[test]
    fn test_parse_records() {
        let buffer = synthetic_batch(20);
        let images = parse_records(&buffer).unwrap();

        assert_eq!(images.len(), 20);
        assert_eq!(images[0].label, 0);
        assert_eq!(images[13].label, 3);
        assert_eq!(images[13].pixels[0], 13);
        assert_eq!(images[0].pixels.len(), IMAGE_LEN);
    }

    #[test]
    fn test_parse_rejects_bad_label() {
        let mut buffer = synthetic_batch(1);
        buffer[0] = 11;
        assert!(parse_records(&buffer).is_err());
    }

    #[test]
    fn test_read_batch_file_rejects_truncated_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("data_batch_1.bin");
        std::fs::write(&path, synthetic_batch(5)).unwrap();

        let err = read_batch_file(&path).unwrap_err();
        assert!(err.to_string().contains("expected 10000 records"));
    }

    #[test]
    fn test_load_test_split() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("test_batch.bin");
        std::fs::write(&path, synthetic_batch(RECORDS_PER_FILE)).unwrap();

        let data = Cifar10Data::load(temp_dir.path(), Split::Test).unwrap();
        assert_eq!(data.len(), RECORDS_PER_FILE);
        assert_eq!(data.class_distribution(), [1000; 10]);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(CLASS_NAMES[0], "airplane");
        assert_eq!(CLASS_NAMES[9], "truck");
        let image = Cifar10Image {
            pixels: vec![0; IMAGE_LEN],
            label: 5,
        };
        assert_eq!(image.class_name(), "dog");
    }
}
