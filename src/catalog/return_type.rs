use std::fmt;

use serde::{Deserialize, Serialize};

use crate::QueryError;

/// The tool object a result row is meant to be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    Cube,
    Spaxel,
    Maps,
    Rss,
    ModelCube,
}

impl ReturnType {
    pub const ALL: [ReturnType; 5] = [
        ReturnType::Cube,
        ReturnType::Spaxel,
        ReturnType::Maps,
        ReturnType::Rss,
        ReturnType::ModelCube,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Cube => "cube",
            ReturnType::Spaxel => "spaxel",
            ReturnType::Maps => "maps",
            ReturnType::Rss => "rss",
            ReturnType::ModelCube => "modelcube",
        }
    }
}

impl TryFrom<&str> for ReturnType {
    type Error = QueryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cube" => Ok(ReturnType::Cube),
            "spaxel" => Ok(ReturnType::Spaxel),
            "maps" => Ok(ReturnType::Maps),
            "rss" => Ok(ReturnType::Rss),
            "modelcube" => Ok(ReturnType::ModelCube),
            _ => Err(QueryError::usage(format!(
                "return type must be either cube, spaxel, maps, modelcube, rss; got '{value}'"
            ))),
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
