//! Numero (house number) entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    geometry::GeoPoint,
    newtypes::{BaseLocaleId, NumeroId, ToponymeId, VoieId},
    position::Position,
};

/// Highest house number accepted in a BAL file
pub const NUMERO_MAX: u32 = 99_999;

/// Lowercases and trims a suffix; blank suffixes become `None`
pub fn normalize_suffixe(suffixe: Option<&str>) -> Option<String> {
    suffixe
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

/// A house number on a voie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Numero {
    id: NumeroId,
    bal_id: BaseLocaleId,
    voie_id: VoieId,
    toponyme_id: Option<ToponymeId>,
    numero: u32,
    suffixe: Option<String>,
    positions: Vec<Position>,
    certifie: bool,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Numero {
    /// Creates a new numero on a voie
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the number is above [`NUMERO_MAX`]
    pub fn new(
        bal_id: BaseLocaleId,
        voie_id: VoieId,
        numero: u32,
        suffixe: Option<&str>,
    ) -> Result<Self, DomainError> {
        let now = Utc::now();
        Self::with_id(NumeroId::new(), bal_id, voie_id, numero, suffixe, now, now)
    }

    /// Creates a Numero with a specific ID (for reconstitution from storage)
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the number is above [`NUMERO_MAX`]
    pub fn with_id(
        id: NumeroId,
        bal_id: BaseLocaleId,
        voie_id: VoieId,
        numero: u32,
        suffixe: Option<&str>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if numero > NUMERO_MAX {
            return Err(DomainError::ValidationFailed(format!(
                "Numero must be between 0 and {NUMERO_MAX}, got {numero}"
            )));
        }
        Ok(Self {
            id,
            bal_id,
            voie_id,
            toponyme_id: None,
            numero,
            suffixe: normalize_suffixe(suffixe),
            positions: Vec::new(),
            certifie: false,
            comment: None,
            created_at,
            updated_at,
            deleted_at: None,
        })
    }

    // --- Getters ---

    pub fn id(&self) -> &NumeroId {
        &self.id
    }

    pub fn bal_id(&self) -> &BaseLocaleId {
        &self.bal_id
    }

    pub fn voie_id(&self) -> &VoieId {
        &self.voie_id
    }

    pub fn toponyme_id(&self) -> Option<&ToponymeId> {
        self.toponyme_id.as_ref()
    }

    pub fn numero(&self) -> u32 {
        self.numero
    }

    pub fn suffixe(&self) -> Option<&str> {
        self.suffixe.as_deref()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn certifie(&self) -> bool {
        self.certifie
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
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

    /// Points of every position, in order
    pub fn points(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.positions.iter().map(|p| p.point)
    }

    /// Suffix as displayed after the number
    ///
    /// Suffixes starting with a digit are separated by a dash (`12-2`),
    /// others are glued (`12bis`).
    pub fn display_suffix(&self) -> String {
        match self.suffixe.as_deref() {
            Some(s) if s.starts_with(|c: char| c.is_ascii_digit()) => format!("-{s}"),
            Some(s) => s.to_string(),
            None => String::new(),
        }
    }

    /// Number and suffix, as printed on a plate
    pub fn numero_complet(&self) -> String {
        format!("{}{}", self.numero, self.display_suffix())
    }

    // --- Mutators ---

    pub fn set_voie(&mut self, voie_id: VoieId) {
        self.voie_id = voie_id;
    }

    pub fn set_toponyme(&mut self, toponyme_id: Option<ToponymeId>) {
        self.toponyme_id = toponyme_id;
    }

    /// Changes the number
    ///
    /// # Errors
    /// Returns `ValidationFailed` if the number is above [`NUMERO_MAX`]
    pub fn set_numero(&mut self, numero: u32) -> Result<(), DomainError> {
        if numero > NUMERO_MAX {
            return Err(DomainError::ValidationFailed(format!(
                "Numero must be between 0 and {NUMERO_MAX}, got {numero}"
            )));
        }
        self.numero = numero;
        Ok(())
    }

    pub fn set_suffixe(&mut self, suffixe: Option<&str>) {
        self.suffixe = normalize_suffixe(suffixe);
    }

    pub fn set_positions(&mut self, positions: Vec<Position>) {
        self.positions = positions;
    }

    pub fn set_certifie(&mut self, certifie: bool) {
        self.certifie = certifie;
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment.filter(|c| !c.trim().is_empty());
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    pub fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }
}
