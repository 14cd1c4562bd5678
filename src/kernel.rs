use crate::error::{KernelFormatError, Result};
use log::debug;
use ndarray::{Array2, ArrayView2};
use std::fs;
use std::path::Path;

/// Square matrix of convolution weights, row-major in file order.
///
/// Weights are kept exactly as authored; nothing is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Array2<f64>,
}

impl Kernel {
    /// Read a kernel from a text file of comma and/or whitespace separated numbers
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| KernelFormatError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let kernel = Self::parse(&content)?;
        debug!("Read {}x{} kernel from {}", kernel.size(), kernel.size(), path.display());
        Ok(kernel)
    }

    /// Tokenize kernel text; row boundaries come from the square count alone
    pub fn parse(content: &str) -> Result<Self> {
        let values = content
            .replace(',', " ")
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|source| KernelFormatError::InvalidValue {
                        token: token.to_string(),
                        source,
                    })
            })
            .collect::<std::result::Result<Vec<f64>, _>>()?;

        Self::from_values(values)
    }

    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(KernelFormatError::Empty.into());
        }

        let count = values.len();
        let side = (count as f64).sqrt().round() as usize;
        if side.checked_mul(side) != Some(count) {
            return Err(KernelFormatError::NotSquare(count).into());
        }

        let weights = Array2::from_shape_vec((side, side), values)?;
        Ok(Self { weights })
    }

    /// Side length N of the N x N kernel
    pub fn size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    /// Offset of the anchor cell from the top-left corner (floor(N/2))
    pub fn anchor(&self) -> usize {
        self.size() / 2
    }

    pub fn sum(&self) -> f64 {
        self.weights.sum()
    }
}
