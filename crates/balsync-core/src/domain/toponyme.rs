//! Toponyme (named place) entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::{BaseLocaleId, ToponymeId},
    position::Position,
    voie::{clean_nom, clean_nom_alt, NomAlt},
};

/// A named place (lieu-dit) of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toponyme {
    id: ToponymeId,
    bal_id: BaseLocaleId,
    nom: String,
    nom_alt: NomAlt,
    positions: Vec<Position>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Toponyme {
    /// Creates a new toponyme
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the cleaned name is empty
    pub fn new(bal_id: BaseLocaleId, nom: &str) -> Result<Self, DomainError> {
        let now = Utc::now();
        Self::with_id(ToponymeId::new(), bal_id, nom, now, now)
    }

    /// Creates a Toponyme with a specific ID (for reconstitution from storage)
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the cleaned name is empty
    pub fn with_id(
        id: ToponymeId,
        bal_id: BaseLocaleId,
        nom: &str,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let nom = clean_nom(nom);
        if nom.is_empty() {
            return Err(DomainError::ValidationFailed(
                "Toponyme name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            bal_id,
            nom,
            nom_alt: NomAlt::new(),
            positions: Vec::new(),
            created_at,
            updated_at,
            deleted_at: None,
        })
    }

    pub fn id(&self) -> &ToponymeId {
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

    pub fn positions(&self) -> &[Position] {
        &self.positions
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

    /// Renames the toponyme
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the cleaned name is empty
    pub fn set_nom(&mut self, nom: &str) -> Result<(), DomainError> {
        let nom = clean_nom(nom);
        if nom.is_empty() {
            return Err(DomainError::ValidationFailed(
                "Toponyme name cannot be empty".to_string(),
            ));
        }
        self.nom = nom;
        Ok(())
    }

    pub fn set_nom_alt(&mut self, nom_alt: NomAlt) {
        self.nom_alt = clean_nom_alt(nom_alt);
    }

    pub fn set_positions(&mut self, positions: Vec<Position>) {
        self.positions = positions;
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    pub fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }
}
