//! Label decoder: encoded class index → crop name

use super::{read_json, ModelError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDecoder {
    classes: Vec<String>,
}

impl LabelDecoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let decoder: LabelDecoder = read_json(path)?;
        if decoder.classes.is_empty() {
            anyhow::bail!("Label decoder {} has no classes", path.display());
        }
        Ok(decoder)
    }

    pub fn inverse_transform(&self, code: usize) -> Result<&str, ModelError> {
        self.classes
            .get(code)
            .map(|s| s.as_str())
            .ok_or(ModelError::UnknownClass(code))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_transform() {
        let decoder: LabelDecoder =
            serde_json::from_str(r#"{"classes": ["apple", "banana"]}"#).unwrap();
        assert_eq!(decoder.inverse_transform(1).unwrap(), "banana");
        assert!(matches!(decoder.inverse_transform(2), Err(ModelError::UnknownClass(2))));
    }
}
