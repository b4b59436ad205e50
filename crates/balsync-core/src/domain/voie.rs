//! Voie (street) entity

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    geometry::{GeoPoint, LineTrace},
    newtypes::{BaseLocaleId, VoieId},
};

/// Alternative names keyed by regional language code (`"bre"`, `"eus"`...)
pub type NomAlt = BTreeMap<String, String>;

/// How house numbers are assigned along a voie
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeNumerotation {
    /// Sequential numbers
    #[default]
    Numerique,
    /// Numbers are distances in meters from the start of the trace
    Metrique,
}

impl TypeNumerotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeNumerotation::Numerique => "numerique",
            TypeNumerotation::Metrique => "metrique",
        }
    }
}

impl fmt::Display for TypeNumerotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeNumerotation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numerique" => Ok(TypeNumerotation::Numerique),
            "metrique" => Ok(TypeNumerotation::Metrique),
            other => Err(DomainError::UnknownValue {
                kind: "type numerotation",
                value: other.to_string(),
            }),
        }
    }
}

/// Trims a name and collapses inner whitespace
pub fn clean_nom(nom: &str) -> String {
    nom.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleans alternative names, dropping blank entries
pub fn clean_nom_alt(nom_alt: NomAlt) -> NomAlt {
    nom_alt
        .into_iter()
        .map(|(lang, nom)| (lang, clean_nom(&nom)))
        .filter(|(_, nom)| !nom.is_empty())
        .collect()
}

/// A street (or lieu-dit carrying numbers) of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voie {
    id: VoieId,
    bal_id: BaseLocaleId,
    nom: String,
    nom_alt: NomAlt,
    type_numerotation: TypeNumerotation,
    trace: Option<LineTrace>,
    /// Derived: trace centroid (metric numbering) or numeros centroid
    centroid: Option<GeoPoint>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Voie {
    /// Creates a new voie
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the cleaned name is empty
    pub fn new(bal_id: BaseLocaleId, nom: &str) -> Result<Self, DomainError> {
        let now = Utc::now();
        Self::with_id(VoieId::new(), bal_id, nom, now, now)
    }

    /// Creates a Voie with a specific ID (for reconstitution from storage)
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the cleaned name is empty
    pub fn with_id(
        id: VoieId,
        bal_id: BaseLocaleId,
        nom: &str,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let nom = clean_nom(nom);
        if nom.is_empty() {
            return Err(DomainError::ValidationFailed(
                "Voie name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            bal_id,
            nom,
            nom_alt: NomAlt::new(),
            type_numerotation: TypeNumerotation::Numerique,
            trace: None,
            centroid: None,
            created_at,
            updated_at,
            deleted_at: None,
        })
    }

    // --- Getters ---

    pub fn id(&self) -> &VoieId {
        &self.id
    }

    pub fn bal_id(&self) -> &BaseLocaleId {
        &self.bal_id
    }

    pub fn nom(&self) -> &str {
        &self.nom
    }

    pub fn nom_alt(&self) -> &NomAlt {
        &self.nom_alt
    }

    pub fn type_numerotation(&self) -> TypeNumerotation {
        self.type_numerotation
    }

    pub fn trace(&self) -> Option<&LineTrace> {
        self.trace.as_ref()
    }

    pub fn centroid(&self) -> Option<GeoPoint> {
        self.centroid
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the centroid must be derived from the trace
    pub fn has_metric_trace(&self) -> bool {
        self.trace.is_some() && self.type_numerotation == TypeNumerotation::Metrique
    }

    // --- Mutators ---

    /// Renames the voie
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the cleaned name is empty
    pub fn set_nom(&mut self, nom: &str) -> Result<(), DomainError> {
        let nom = clean_nom(nom);
        if nom.is_empty() {
            return Err(DomainError::ValidationFailed(
                "Voie name cannot be empty".to_string(),
            ));
        }
        self.nom = nom;
        Ok(())
    }

    pub fn set_nom_alt(&mut self, nom_alt: NomAlt) {
        self.nom_alt = clean_nom_alt(nom_alt);
    }

    pub fn set_type_numerotation(&mut self, type_numerotation: TypeNumerotation) {
        self.type_numerotation = type_numerotation;
    }

    pub fn set_trace(&mut self, trace: Option<LineTrace>) {
        self.trace = trace;
    }

    pub fn set_centroid(&mut self, centroid: Option<GeoPoint>) {
        self.centroid = centroid;
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    pub fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lon: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lon, lat).unwrap()
    }

    #[test]
    fn test_clean_nom() {
        assert_eq!(clean_nom("  rue   de la  Paix "), "rue de la Paix");
    }

    #[test]
    fn test_new_rejects_blank_name() {
        assert!(Voie::new(BaseLocaleId::new(), "   ").is_err());
    }

    #[test]
    fn test_metric_trace_detection() {
        let mut voie = Voie::new(BaseLocaleId::new(), "Chemin").unwrap();
        assert!(!voie.has_metric_trace());

        voie.set_trace(Some(
            LineTrace::new(vec![point(1.0, 1.0), point(2.0, 2.0)]).unwrap(),
        ));
        assert!(!voie.has_metric_trace());

        voie.set_type_numerotation(TypeNumerotation::Metrique);
        assert!(voie.has_metric_trace());
    }

    #[test]
    fn test_nom_alt_drops_blank_entries() {
        let mut voie = Voie::new(BaseLocaleId::new(), "Rue").unwrap();
        let mut alt = NomAlt::new();
        alt.insert("bre".to_string(), " Straed  ".to_string());
        alt.insert("eus".to_string(), "  ".to_string());
        voie.set_nom_alt(alt);

        assert_eq!(voie.nom_alt().len(), 1);
        assert_eq!(voie.nom_alt()["bre"], "Straed");
    }
}
