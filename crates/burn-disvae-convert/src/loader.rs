//! Load tensors from .safetensors files

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use burn::prelude::*;
use half::{bf16, f16};
use memmap2::{Mmap, MmapOptions};
use safetensors::{Dtype, SafeTensors};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Safetensors error: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),

    #[error("Tensor not found: {0}")]
    TensorNotFound(String),

    #[error("Unsupported dtype for {tensor}: {dtype:?}")]
    UnsupportedDtype { tensor: String, dtype: Dtype },

    #[error("Rank mismatch for {tensor}: expected {expected} dims, got shape {actual:?}")]
    RankMismatch {
        tensor: String,
        expected: usize,
        actual: Vec<usize>,
    },

    #[error("Shape mismatch for {tensor}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        tensor: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

struct TensorInfo {
    dtype: Dtype,
    shape: Vec<usize>,
    start: usize,
    end: usize,
}

/// A memory-mapped safetensors file
///
/// Only the header is parsed on open; tensor data is converted to f32 on
/// demand.
pub struct SafeTensorFile {
    mmap: Mmap,
    tensors: HashMap<String, TensorInfo>,
}

impl SafeTensorFile {
    /// Open a safetensors file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // Safety: the map is read-only and the file is not modified while open
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        let tensors = {
            let st = SafeTensors::deserialize(&mmap)?;
            let base = mmap.as_ptr() as usize;
            st.tensors()
                .into_iter()
                .map(|(name, view)| {
                    let start = view.data().as_ptr() as usize - base;
                    let info = TensorInfo {
                        dtype: view.dtype(),
                        shape: view.shape().to_vec(),
                        start,
                        end: start + view.data().len(),
                    };
                    (name, info)
                })
                .collect::<HashMap<_, _>>()
        };

        log::debug!("opened {} ({} tensors)", path.display(), tensors.len());

        Ok(Self { mmap, tensors })
    }

    /// All tensor names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Check if a tensor exists
    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    /// Get tensor shape
    pub fn shape(&self, name: &str) -> Option<&[usize]> {
        self.tensors.get(name).map(|t| t.shape.as_slice())
    }

    /// Get tensor dtype
    pub fn dtype(&self, name: &str) -> Option<Dtype> {
        self.tensors.get(name).map(|t| t.dtype)
    }

    fn info(&self, name: &str) -> Result<&TensorInfo, LoadError> {
        self.tensors
            .get(name)
            .ok_or_else(|| LoadError::TensorNotFound(name.to_string()))
    }

    /// Load a tensor as f32, converting from fp16/bf16 if needed
    pub fn load_f32<B: Backend, const D: usize>(
        &self,
        name: &str,
        device: &B::Device,
    ) -> Result<Tensor<B, D>, LoadError> {
        let info = self.info(name)?;

        let shape: [usize; D] =
            info.shape
                .clone()
                .try_into()
                .map_err(|actual| LoadError::RankMismatch {
                    tensor: name.to_string(),
                    expected: D,
                    actual,
                })?;

        let data = &self.mmap[info.start..info.end];

        // Mapped data may be unaligned, so decode from bytes
        let floats: Vec<f32> = match info.dtype {
            Dtype::F32 => data
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            Dtype::F16 => data
                .chunks_exact(2)
                .map(|c| f16::from_bits(u16::from_le_bytes([c[0], c[1]])).to_f32())
                .collect(),
            Dtype::BF16 => data
                .chunks_exact(2)
                .map(|c| bf16::from_bits(u16::from_le_bytes([c[0], c[1]])).to_f32())
                .collect(),
            dtype => {
                return Err(LoadError::UnsupportedDtype {
                    tensor: name.to_string(),
                    dtype,
                });
            }
        };

        Ok(Tensor::from_data(TensorData::new(floats, shape), device))
    }

    /// Load a tensor with expected shape, converting to f32
    pub fn load_f32_checked<B: Backend, const D: usize>(
        &self,
        name: &str,
        expected_shape: [usize; D],
        device: &B::Device,
    ) -> Result<Tensor<B, D>, LoadError> {
        let info = self.info(name)?;

        if info.shape.as_slice() != expected_shape.as_slice() {
            return Err(LoadError::ShapeMismatch {
                tensor: name.to_string(),
                expected: expected_shape.to_vec(),
                actual: info.shape.clone(),
            });
        }

        self.load_f32::<B, D>(name, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use safetensors::tensor::TensorView;

    type TestBackend = NdArray<f32>;

    fn write_file(dir: &Path, tensors: Vec<(&str, Dtype, Vec<usize>, Vec<u8>)>) -> std::path::PathBuf {
        let views: Vec<(String, TensorView<'_>)> = tensors
            .iter()
            .map(|(name, dtype, shape, bytes)| {
                (
                    name.to_string(),
                    TensorView::new(*dtype, shape.clone(), bytes).unwrap(),
                )
            })
            .collect();
        let bytes = safetensors::serialize(views, &None).unwrap();
        let path = dir.join("weights.safetensors");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_load_error_display() {
        let err = LoadError::TensorNotFound("missing".to_string());
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_load_f32_f16_and_bf16() {
        let dir = tempfile::tempdir().unwrap();
        let half_bytes: Vec<u8> = [1.5f32, -2.0]
            .iter()
            .flat_map(|v| f16::from_f32(*v).to_bits().to_le_bytes())
            .collect();
        let bf16_bytes: Vec<u8> = [0.25f32, 3.0, -8.0]
            .iter()
            .flat_map(|v| bf16::from_f32(*v).to_bits().to_le_bytes())
            .collect();
        let path = write_file(
            dir.path(),
            vec![
                ("a", Dtype::F32, vec![2, 2], f32_bytes(&[1.0, 2.0, 3.0, 4.0])),
                ("b", Dtype::F16, vec![2], half_bytes),
                ("c", Dtype::BF16, vec![3], bf16_bytes),
            ],
        );

        let file = SafeTensorFile::open(&path).unwrap();
        assert_eq!(file.names(), vec!["a", "b", "c"]);
        assert_eq!(file.dtype("c"), Some(Dtype::BF16));
        assert_eq!(file.shape("a"), Some(&[2, 2][..]));
        assert_eq!(file.dtype("b"), Some(Dtype::F16));

        let device = Default::default();
        let a: Tensor<TestBackend, 2> = file.load_f32("a", &device).unwrap();
        assert_eq!(a.into_data().to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);

        let b: Tensor<TestBackend, 1> = file.load_f32("b", &device).unwrap();
        assert_eq!(b.into_data().to_vec::<f32>().unwrap(), vec![1.5, -2.0]);

        // Exactly representable in bf16
        let c: Tensor<TestBackend, 1> = file.load_f32("c", &device).unwrap();
        assert_eq!(c.into_data().to_vec::<f32>().unwrap(), vec![0.25, 3.0, -8.0]);
    }

    #[test]
    fn test_rank_and_shape_checks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            vec![("w", Dtype::F32, vec![3], f32_bytes(&[0.0, 0.0, 0.0]))],
        );
        let file = SafeTensorFile::open(&path).unwrap();
        let device = Default::default();

        let rank = file.load_f32::<TestBackend, 2>("w", &device);
        assert!(matches!(rank, Err(LoadError::RankMismatch { .. })));

        let shape = file.load_f32_checked::<TestBackend, 1>("w", [4], &device);
        assert!(matches!(shape, Err(LoadError::ShapeMismatch { .. })));

        let missing = file.load_f32::<TestBackend, 1>("nope", &device);
        assert!(matches!(missing, Err(LoadError::TensorNotFound(_))));
    }
}
