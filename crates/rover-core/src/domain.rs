use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Sales department a product belongs to. Fixed two-category split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Pets,
    Food,
}

impl Department {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Department::Pets => "pets",
            Department::Food => "food",
        }
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Department {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pets" => Ok(Department::Pets),
            "food" => Ok(Department::Food),
            other => Err(ConfigError::Validation(format!(
                "unknown department '{other}'; expected 'pets' or 'food'"
            ))),
        }
    }
}

/// How a sellable item is sold: a plain item, a display unit, or a
/// multi-product palette priced by its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Standard,
    Display,
    Palette,
}

impl ProductType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::Standard => "standard",
            ProductType::Display => "display",
            ProductType::Palette => "palette",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ProductType::Standard),
            "display" => Ok(ProductType::Display),
            "palette" => Ok(ProductType::Palette),
            other => Err(ConfigError::Validation(format!(
                "unknown product type '{other}'; expected 'standard', 'display' or 'palette'"
            ))),
        }
    }
}

/// Account role: a field rep (gebietsleiter) or an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Gl,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Gl => "gl",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gl" => Ok(Role::Gl),
            "admin" => Ok(Role::Admin),
            other => Err(ConfigError::Validation(format!(
                "unknown role '{other}'; expected 'gl' or 'admin'"
            ))),
        }
    }
}

/// Bug report triage state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugStatus {
    New,
    Reviewed,
    Fixed,
    WontFix,
}

impl BugStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BugStatus::New => "new",
            BugStatus::Reviewed => "reviewed",
            BugStatus::Fixed => "fixed",
            BugStatus::WontFix => "wont_fix",
        }
    }
}

impl std::fmt::Display for BugStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BugStatus {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(BugStatus::New),
            "reviewed" => Ok(BugStatus::Reviewed),
            "fixed" => Ok(BugStatus::Fixed),
            "wont_fix" => Ok(BugStatus::WontFix),
            other => Err(ConfigError::Validation(format!(
                "unknown bug status '{other}'; expected 'new', 'reviewed', 'fixed' or 'wont_fix'"
            ))),
        }
    }
}

/// What a wave counts: display placements or carton goods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveItemType {
    Display,
    Kartonware,
}

impl WaveItemType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WaveItemType::Display => "display",
            WaveItemType::Kartonware => "kartonware",
        }
    }
}

impl std::fmt::Display for WaveItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WaveItemType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "display" => Ok(WaveItemType::Display),
            "kartonware" => Ok(WaveItemType::Kartonware),
            other => Err(ConfigError::Validation(format!(
                "unknown wave item type '{other}'; expected 'display' or 'kartonware'"
            ))),
        }
    }
}

/// Normalize a retail chain name against the known Austrian chains.
///
/// Empty input maps to `Sonstige`; known variants are canonicalized;
/// anything else passes through unchanged.
#[must_use]
pub fn normalize_chain(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Sonstige".to_string();
    }

    match trimmed.to_lowercase().as_str() {
        "adeg" => "Adeg",
        "billa+" | "billa plus" => "Billa+",
        "billa+ privat" => "BILLA+ Privat",
        "billa privat" => "BILLA Privat",
        "eurospar" => "Eurospar",
        "futterhaus" => "Futterhaus",
        "hagebau" => "Hagebau",
        "interspar" => "Interspar",
        "spar" => "Spar",
        "spar gourmet" => "Spar Gourmet",
        "zoofachhandel" => "Zoofachhandel",
        "hofer" => "Hofer",
        "merkur" => "Merkur",
        _ => return trimmed.to_string(),
    }
    .to_string()
}
