use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result, positive};
use crate::types::Size;

/// Sheet size used when a request names none.
pub const DEFAULT_SHEET: Size = Size {
    width: 1220.0,
    length: 2440.0,
};

/// Standard stock-sheet sizes offered when comparing alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetCatalog {
    pub sizes: Vec<Size>,
}

impl Default for SheetCatalog {
    /// Common mill sizes, mm.
    fn default() -> Self {
        Self {
            sizes: vec![
                Size::new(1000.0, 2000.0),
                Size::new(1220.0, 2440.0),
                Size::new(1250.0, 2500.0),
                Size::new(1500.0, 3000.0),
                Size::new(1524.0, 3048.0),
                Size::new(2000.0, 4000.0),
            ],
        }
    }
}

impl SheetCatalog {
    pub fn new(sizes: Vec<Size>) -> Result<Self> {
        if sizes.is_empty() {
            return Err(EngineError::Catalog("catalog has no sheet sizes".to_string()));
        }
        for s in &sizes {
            positive("catalog sheet width", s.width)?;
            positive("catalog sheet length", s.length)?;
        }
        Ok(Self { sizes })
    }

    /// Parses `{"sizes": [{"width": .., "length": ..}, ..]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: SheetCatalog =
            serde_json::from_str(json).map_err(|e| EngineError::Catalog(e.to_string()))?;
        Self::new(raw.sizes)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Catalog(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}
