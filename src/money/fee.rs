use serde::{Deserialize, Serialize};
use std::fmt;

/// Fee tier selected for a transaction. Ordinal, not numeric: each engine
/// resolves a level to an actual fee. `Custom` needs an explicit fee rate
/// supplied alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeLevel {
    None,
    Regular,
    Priority,
    Custom,
}

impl FeeLevel {
    pub fn requires_explicit_fee(&self) -> bool {
        matches!(self, FeeLevel::Custom)
    }
}

impl fmt::Display for FeeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeeLevel::None => "none",
            FeeLevel::Regular => "regular",
            FeeLevel::Priority => "priority",
            FeeLevel::Custom => "custom",
        };
        f.write_str(name)
    }
}
