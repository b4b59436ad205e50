//! Address positions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{errors::DomainError, geometry::GeoPoint};

/// What a position points at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionType {
    #[default]
    #[serde(rename = "entrée")]
    Entree,
    #[serde(rename = "bâtiment")]
    Batiment,
    #[serde(rename = "cage d’escalier")]
    CageEscalier,
    #[serde(rename = "logement")]
    Logement,
    #[serde(rename = "service technique")]
    ServiceTechnique,
    #[serde(rename = "délivrance postale")]
    DelivrancePostale,
    #[serde(rename = "parcelle")]
    Parcelle,
    #[serde(rename = "segment")]
    Segment,
    #[serde(rename = "inconnue")]
    Inconnue,
}

impl PositionType {
    /// Label used in storage and in the BAL export
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionType::Entree => "entrée",
            PositionType::Batiment => "bâtiment",
            PositionType::CageEscalier => "cage d’escalier",
            PositionType::Logement => "logement",
            PositionType::ServiceTechnique => "service technique",
            PositionType::DelivrancePostale => "délivrance postale",
            PositionType::Parcelle => "parcelle",
            PositionType::Segment => "segment",
            PositionType::Inconnue => "inconnue",
        }
    }
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrée" => Ok(PositionType::Entree),
            "bâtiment" => Ok(PositionType::Batiment),
            // Both apostrophes show up in imported files
            "cage d’escalier" | "cage d'escalier" => Ok(PositionType::CageEscalier),
            "logement" => Ok(PositionType::Logement),
            "service technique" => Ok(PositionType::ServiceTechnique),
            "délivrance postale" => Ok(PositionType::DelivrancePostale),
            "parcelle" => Ok(PositionType::Parcelle),
            "segment" => Ok(PositionType::Segment),
            "inconnue" => Ok(PositionType::Inconnue),
            other => Err(DomainError::UnknownValue {
                kind: "position type",
                value: other.to_string(),
            }),
        }
    }
}

/// A typed point attached to a numero or a toponyme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "type")]
    pub kind: PositionType,
    pub source: Option<String>,
    pub point: GeoPoint,
}

impl Position {
    /// A position of the given type without source
    pub fn new(kind: PositionType, point: GeoPoint) -> Self {
        Self {
            kind,
            source: None,
            point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_entree() {
        assert_eq!(PositionType::default().as_str(), "entrée");
    }

    #[test]
    fn test_parse_ascii_apostrophe() {
        assert_eq!(
            "cage d'escalier".parse::<PositionType>().unwrap(),
            PositionType::CageEscalier
        );
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&PositionType::DelivrancePostale).unwrap();
        assert_eq!(json, "\"délivrance postale\"");
    }
}
