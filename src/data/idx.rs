//! IDX binary files, as used by MNIST and Fashion-MNIST.
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x03        (number of dimensions)
//! bytes  4-15:  N, rows, cols (big-endian u32)
//! bytes 16..:   N * rows * cols pixels, row-major
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-3:   0x00 0x00 0x08 0x01
//! bytes  4-7:   N (big-endian u32)
//! bytes  8..:   N class indices
//! ```

use std::path::Path;

use crate::data::dataset::{one_hot, Dataset};
use crate::error::DataError;
use crate::network::spec::InputShape;

fn idx_err(msg: String) -> DataError {
    DataError::Idx(msg)
}

fn read_u32(bytes: &[u8], offset: usize) -> usize {
    u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]) as usize
}

/// Checks the 4-byte magic and returns the dimension sizes.
fn parse_header(bytes: &[u8], dims: u8, what: &str) -> Result<Vec<usize>, DataError> {
    let header_len = 4 + 4 * dims as usize;
    if bytes.len() < header_len {
        return Err(idx_err(format!(
            "{what} file too short: expected at least {header_len} header bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(idx_err(format!(
            "{what} file: bytes 0-1 must be 0x00 0x00, got 0x{:02X} 0x{:02X}",
            bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(idx_err(format!("{what} file: dtype must be 0x08 (uint8), got 0x{:02X}", bytes[2])));
    }
    if bytes[3] != dims {
        return Err(idx_err(format!("{what} file: expected {dims} dimensions, got {}", bytes[3])));
    }
    Ok((0..dims as usize).map(|d| read_u32(bytes, 4 + 4 * d)).collect())
}

/// Parses an IDX3 image file and its IDX1 label file into a [`Dataset`].
///
/// Pixels are divided by 255 and labels are one-hot encoded to `n_classes`
/// columns.
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8], n_classes: usize) -> Result<Dataset, DataError> {
    let dims = parse_header(image_bytes, 3, "image")?;
    let (n_items, rows, cols) = (dims[0], dims[1], dims[2]);
    let n_pixels = rows
        .checked_mul(cols)
        .ok_or_else(|| idx_err(format!("rows * cols overflows (rows={rows}, cols={cols})")))?;
    let data_len = n_items
        .checked_mul(n_pixels)
        .ok_or_else(|| idx_err(format!("{n_items} items of {n_pixels} pixels overflows")))?;
    if image_bytes.len() < 16 + data_len {
        return Err(idx_err(format!(
            "image file declares {n_items} items of {rows}x{cols} pixels but is only {} bytes",
            image_bytes.len()
        )));
    }

    let label_count = parse_header(label_bytes, 1, "label")?[0];
    if label_count != n_items {
        return Err(idx_err(format!(
            "image file declares {n_items} items but label file declares {label_count}"
        )));
    }
    if label_bytes.len() < 8 + n_items {
        return Err(idx_err(format!(
            "label file declares {n_items} labels but is only {} bytes",
            label_bytes.len()
        )));
    }
    if n_classes < 2 {
        return Err(idx_err(format!("n_classes must be at least 2, got {n_classes}")));
    }

    let inputs: Vec<Vec<f64>> = if n_pixels == 0 {
        vec![Vec::new(); n_items]
    } else {
        image_bytes[16..16 + data_len]
            .chunks_exact(n_pixels)
            .map(|chunk| chunk.iter().map(|&px| px as f64 / 255.0).collect())
            .collect()
    };

    let labels = label_bytes[8..8 + n_items]
        .iter()
        .enumerate()
        .map(|(i, &class)| {
            let class = class as usize;
            if class >= n_classes {
                return Err(idx_err(format!(
                    "label {i}: class {class} is out of range for n_classes={n_classes}"
                )));
            }
            Ok(one_hot(class, n_classes))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Dataset::new(inputs, labels, InputShape::new(rows, cols, 1), n_classes)
}

/// Reads and parses an image/label IDX file pair from disk.
pub fn load_idx_pair(images: &Path, labels: &Path, n_classes: usize) -> Result<Dataset, DataError> {
    let image_bytes = std::fs::read(images)?;
    let label_bytes = std::fs::read(labels)?;
    parse_idx_pair(&image_bytes, &label_bytes, n_classes)
}

#[cfg(test)]
pub(crate) fn encode_idx_pair(images: &[Vec<u8>], rows: usize, cols: usize, labels: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut img = vec![0, 0, 8, 3];
    for v in [images.len(), rows, cols] {
        img.extend_from_slice(&(v as u32).to_be_bytes());
    }
    images.iter().for_each(|i| img.extend_from_slice(i));

    let mut lbl = vec![0, 0, 8, 1];
    lbl.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    lbl.extend_from_slice(labels);
    (img, lbl)
}
