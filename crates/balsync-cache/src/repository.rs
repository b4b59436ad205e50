//! SQLite implementation of IAddressRepository
//!
//! This module provides the concrete SQLite-based implementation of the
//! address repository port defined in balsync-core. It handles all domain
//! type serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type                  | SQL Type | Strategy                                   |
//! |------------------------------|----------|--------------------------------------------|
//! | BaseLocaleId, VoieId, ...    | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | CodeCommune                  | TEXT     | String via `.as_str()` / `FromStr`         |
//! | HabilitationId, RevisionId   | TEXT     | String via `.as_str()` / `::new()`         |
//! | DateTime<Utc>                | TEXT     | RFC 3339 with nanoseconds                  |
//! | BaseLocaleStatus, SyncStatus | TEXT     | Lowercase name via `.as_str()` / `FromStr` |
//! | TypeNumerotation             | TEXT     | Lowercase name via `.as_str()` / `FromStr` |
//! | SyncRecord                   | 4 cols   | `sync_*` columns, all NULL when absent     |
//! | Email[]                      | TEXT     | serde_json array                           |
//! | NomAlt                       | TEXT     | serde_json object                          |
//! | LineTrace, GeoPoint          | TEXT     | serde_json                                 |
//! | Position[]                   | TEXT     | serde_json array                           |
//! | bool                         | INTEGER  | 0 / 1                                      |

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, SqlitePool};

use balsync_core::domain::{
    newtypes::{BaseLocaleId, HabilitationId, NumeroId, RevisionId, ToponymeId, VoieId},
    BaseLocale, BaseLocaleStatus, Numero, Position, SyncRecord, SyncStatus, Toponyme, Voie,
};
use balsync_core::ports::{
    BaseLocaleFilter, IAddressRepository, NumeroChanges, NumeroFilter, SyncGuard,
};

use crate::CacheError;

/// SQLite-based implementation of the address repository port
///
/// Multi-row operations (voie cascades, conversion, numero batches) run
/// inside a single transaction.
pub struct SqliteAddressRepository {
    pool: SqlitePool,
}

impl SqliteAddressRepository {
    /// Creates a new repository instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

type SqliteQuery = Query<'static, Sqlite, SqliteArguments<'static>>;

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Formats a timestamp for storage
///
/// Nanosecond precision keeps `updated_at` and `sync_current_updated`
/// comparable for equality after a round trip.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a DateTime<Utc> from an RFC 3339 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

/// Parse a column value through its `FromStr` implementation
fn parse_field<T>(value: &str, column: &str) -> Result<T, CacheError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e| {
        CacheError::SerializationError(format!("Invalid {} '{}': {}", column, value, e))
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String, CacheError> {
    serde_json::to_string(value)
        .map_err(|e| CacheError::SerializationError(format!("Failed to serialize {}: {}", what, e)))
}

fn from_json<T: DeserializeOwned>(value: &str, what: &str) -> Result<T, CacheError> {
    serde_json::from_str(value)
        .map_err(|e| CacheError::SerializationError(format!("Invalid {} JSON: {}", what, e)))
}

fn optional_json<T: Serialize>(value: Option<&T>, what: &str) -> Result<Option<String>, CacheError> {
    value.map(|v| to_json(v, what)).transpose()
}

/// Comma-separated `?` list for an `IN (...)` clause
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct a BaseLocale from a database row
fn base_locale_from_row(row: &SqliteRow) -> Result<BaseLocale, CacheError> {
    let id: String = row.get("id");
    let nom: String = row.get("nom");
    let commune: String = row.get("commune");
    let emails: String = row.get("emails");
    let status: String = row.get("status");
    let habilitation_id: Option<String> = row.get("habilitation_id");
    let sync_status: Option<String> = row.get("sync_status");
    let sync_is_paused: Option<bool> = row.get("sync_is_paused");
    let sync_current_updated: Option<String> = row.get("sync_current_updated");
    let sync_revision: Option<String> = row.get("sync_last_uploaded_revision_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let deleted_at: Option<String> = row.get("deleted_at");

    let mut bal = BaseLocale::with_id(
        parse_field::<BaseLocaleId>(&id, "id")?,
        nom,
        parse_field(&commune, "commune")?,
        parse_field(&status, "status")?,
        parse_datetime(&created_at)?,
        parse_datetime(&updated_at)?,
    );
    bal.set_emails(from_json(&emails, "emails")?);

    if let Some(habilitation_id) = habilitation_id {
        bal.set_habilitation(Some(HabilitationId::new(habilitation_id).map_err(|e| {
            CacheError::SerializationError(format!("Invalid habilitation_id: {}", e))
        })?));
    }

    if let Some(sync_status) = sync_status {
        let (Some(current_updated), Some(revision)) = (sync_current_updated, sync_revision) else {
            return Err(CacheError::SerializationError(format!(
                "Incomplete sync record for base locale {}",
                id
            )));
        };
        let revision = RevisionId::new(revision).map_err(|e| {
            CacheError::SerializationError(format!("Invalid revision id: {}", e))
        })?;
        bal.set_sync(Some(SyncRecord::from_parts(
            parse_field::<SyncStatus>(&sync_status, "sync_status")?,
            sync_is_paused.unwrap_or(false),
            parse_datetime(&current_updated)?,
            revision,
        )));
    }

    bal.set_deleted_at(parse_optional_datetime(deleted_at)?);
    Ok(bal)
}

/// Reconstruct a Voie from a database row
fn voie_from_row(row: &SqliteRow) -> Result<Voie, CacheError> {
    let id: String = row.get("id");
    let bal_id: String = row.get("bal_id");
    let nom: String = row.get("nom");
    let nom_alt: String = row.get("nom_alt");
    let type_numerotation: String = row.get("type_numerotation");
    let trace: Option<String> = row.get("trace");
    let centroid: Option<String> = row.get("centroid");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let deleted_at: Option<String> = row.get("deleted_at");

    let mut voie = Voie::with_id(
        parse_field(&id, "id")?,
        parse_field(&bal_id, "bal_id")?,
        &nom,
        parse_datetime(&created_at)?,
        parse_datetime(&updated_at)?,
    )
    .map_err(|e| CacheError::SerializationError(format!("Invalid voie {}: {}", id, e)))?;

    voie.set_nom_alt(from_json(&nom_alt, "nom_alt")?);
    voie.set_type_numerotation(parse_field(&type_numerotation, "type_numerotation")?);
    voie.set_trace(trace.as_deref().map(|t| from_json(t, "trace")).transpose()?);
    voie.set_centroid(centroid.as_deref().map(|c| from_json(c, "centroid")).transpose()?);
    voie.set_deleted_at(parse_optional_datetime(deleted_at)?);
    Ok(voie)
}

/// Reconstruct a Numero from a database row
fn numero_from_row(row: &SqliteRow) -> Result<Numero, CacheError> {
    let id: String = row.get("id");
    let bal_id: String = row.get("bal_id");
    let voie_id: String = row.get("voie_id");
    let toponyme_id: Option<String> = row.get("toponyme_id");
    let numero: i64 = row.get("numero");
    let suffixe: Option<String> = row.get("suffixe");
    let positions: String = row.get("positions");
    let certifie: bool = row.get("certifie");
    let comment: Option<String> = row.get("comment");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let deleted_at: Option<String> = row.get("deleted_at");

    let numero = u32::try_from(numero)
        .map_err(|_| CacheError::SerializationError(format!("Invalid numero: {}", numero)))?;

    let mut n = Numero::with_id(
        parse_field(&id, "id")?,
        parse_field(&bal_id, "bal_id")?,
        parse_field(&voie_id, "voie_id")?,
        numero,
        suffixe.as_deref(),
        parse_datetime(&created_at)?,
        parse_datetime(&updated_at)?,
    )
    .map_err(|e| CacheError::SerializationError(format!("Invalid numero {}: {}", id, e)))?;

    n.set_toponyme(
        toponyme_id
            .as_deref()
            .map(|t| parse_field::<ToponymeId>(t, "toponyme_id"))
            .transpose()?,
    );
    n.set_positions(from_json(&positions, "positions")?);
    n.set_certifie(certifie);
    n.set_comment(comment);
    n.set_deleted_at(parse_optional_datetime(deleted_at)?);
    Ok(n)
}

/// Reconstruct a Toponyme from a database row
fn toponyme_from_row(row: &SqliteRow) -> Result<Toponyme, CacheError> {
    let id: String = row.get("id");
    let bal_id: String = row.get("bal_id");
    let nom: String = row.get("nom");
    let nom_alt: String = row.get("nom_alt");
    let positions: String = row.get("positions");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let deleted_at: Option<String> = row.get("deleted_at");

    let mut toponyme = Toponyme::with_id(
        parse_field(&id, "id")?,
        parse_field(&bal_id, "bal_id")?,
        &nom,
        parse_datetime(&created_at)?,
        parse_datetime(&updated_at)?,
    )
    .map_err(|e| CacheError::SerializationError(format!("Invalid toponyme {}: {}", id, e)))?;

    toponyme.set_nom_alt(from_json(&nom_alt, "nom_alt")?);
    toponyme.set_positions(from_json::<Vec<Position>>(&positions, "positions")?);
    toponyme.set_deleted_at(parse_optional_datetime(deleted_at)?);
    Ok(toponyme)
}

// ============================================================================
// Upsert statements
// ============================================================================

fn numero_upsert(numero: &Numero) -> Result<SqliteQuery, CacheError> {
    Ok(sqlx::query(
        "INSERT INTO numeros \
         (id, bal_id, voie_id, toponyme_id, numero, suffixe, positions, certifie, comment, \
          created_at, updated_at, deleted_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET \
          voie_id = excluded.voie_id, toponyme_id = excluded.toponyme_id, \
          numero = excluded.numero, suffixe = excluded.suffixe, \
          positions = excluded.positions, certifie = excluded.certifie, \
          comment = excluded.comment, updated_at = excluded.updated_at, \
          deleted_at = excluded.deleted_at",
    )
    .bind(numero.id().to_string())
    .bind(numero.bal_id().to_string())
    .bind(numero.voie_id().to_string())
    .bind(numero.toponyme_id().map(ToString::to_string))
    .bind(i64::from(numero.numero()))
    .bind(numero.suffixe().map(str::to_string))
    .bind(to_json(numero.positions(), "positions")?)
    .bind(numero.certifie())
    .bind(numero.comment().map(str::to_string))
    .bind(format_datetime(numero.created_at()))
    .bind(format_datetime(numero.updated_at()))
    .bind(numero.deleted_at().map(format_datetime)))
}

fn toponyme_upsert(toponyme: &Toponyme) -> Result<SqliteQuery, CacheError> {
    Ok(sqlx::query(
        "INSERT INTO toponymes \
         (id, bal_id, nom, nom_alt, positions, created_at, updated_at, deleted_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET \
          nom = excluded.nom, nom_alt = excluded.nom_alt, positions = excluded.positions, \
          updated_at = excluded.updated_at, deleted_at = excluded.deleted_at",
    )
    .bind(toponyme.id().to_string())
    .bind(toponyme.bal_id().to_string())
    .bind(toponyme.nom().to_string())
    .bind(to_json(toponyme.nom_alt(), "nom_alt")?)
    .bind(to_json(toponyme.positions(), "positions")?)
    .bind(format_datetime(toponyme.created_at()))
    .bind(format_datetime(toponyme.updated_at()))
    .bind(toponyme.deleted_at().map(format_datetime)))
}

/// Applies batch changes to one numero
fn apply_changes(numero: &mut Numero, changes: &NumeroChanges, at: DateTime<Utc>) {
    if let Some(voie_id) = changes.voie_id {
        numero.set_voie(voie_id);
    }
    if let Some(toponyme_id) = changes.toponyme_id {
        numero.set_toponyme(toponyme_id);
    }
    if let Some(kind) = changes.position_type {
        let positions = numero
            .positions()
            .iter()
            .cloned()
            .map(|p| Position { kind, ..p })
            .collect();
        numero.set_positions(positions);
    }
    if let Some(certifie) = changes.certifie {
        numero.set_certifie(certifie);
    }
    if let Some(comment) = &changes.comment {
        numero.set_comment(comment.clone());
    }
    numero.touch(at);
}

// ============================================================================
// IAddressRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl IAddressRepository for SqliteAddressRepository {
    // --- BaseLocale operations ---

    async fn save_base_locale(&self, bal: &BaseLocale) -> anyhow::Result<()> {
        let id = bal.id().to_string();
        let emails = to_json(bal.emails(), "emails")?;
        let sync = bal.sync();

        sqlx::query(
            "INSERT INTO base_locales \
             (id, nom, commune, emails, status, habilitation_id, \
              sync_status, sync_is_paused, sync_current_updated, sync_last_uploaded_revision_id, \
              created_at, updated_at, deleted_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
              nom = excluded.nom, commune = excluded.commune, emails = excluded.emails, \
              status = excluded.status, habilitation_id = excluded.habilitation_id, \
              sync_status = excluded.sync_status, sync_is_paused = excluded.sync_is_paused, \
              sync_current_updated = excluded.sync_current_updated, \
              sync_last_uploaded_revision_id = excluded.sync_last_uploaded_revision_id, \
              updated_at = excluded.updated_at, deleted_at = excluded.deleted_at",
        )
        .bind(&id)
        .bind(bal.nom())
        .bind(bal.commune().as_str())
        .bind(&emails)
        .bind(bal.status().as_str())
        .bind(bal.habilitation_id().map(HabilitationId::as_str))
        .bind(sync.map(|s| s.status().as_str()))
        .bind(sync.map(SyncRecord::is_paused))
        .bind(sync.map(|s| format_datetime(s.current_updated())))
        .bind(sync.map(|s| s.last_uploaded_revision_id().as_str()))
        .bind(format_datetime(bal.created_at()))
        .bind(format_datetime(bal.updated_at()))
        .bind(bal.deleted_at().map(format_datetime))
        .execute(&self.pool)
        .await?;

        tracing::trace!(bal_id = %id, "Saved base locale");
        Ok(())
    }

    async fn get_base_locale(&self, id: &BaseLocaleId) -> anyhow::Result<Option<BaseLocale>> {
        let row = sqlx::query("SELECT * FROM base_locales WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(base_locale_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn query_base_locales(
        &self,
        filter: &BaseLocaleFilter,
    ) -> anyhow::Result<Vec<BaseLocale>> {
        let mut sql = String::from("SELECT * FROM base_locales WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if !filter.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            binds.push(status.as_str().to_string());
        }

        if let Some(ref statuses) = filter.sync_status {
            if statuses.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND sync_status IN ({})", placeholders(statuses.len())));
            binds.extend(statuses.iter().map(|s| s.as_str().to_string()));
        }

        match filter.is_paused {
            Some(true) => sql.push_str(" AND sync_is_paused = 1"),
            Some(false) => sql.push_str(" AND COALESCE(sync_is_paused, 0) = 0"),
            None => {}
        }

        sql.push_str(" ORDER BY created_at ASC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut bals = Vec::with_capacity(rows.len());
        for row in &rows {
            bals.push(base_locale_from_row(row)?);
        }
        Ok(bals)
    }

    async fn touch_base_locale(&self, id: &BaseLocaleId, at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("UPDATE base_locales SET updated_at = ? WHERE id = ?")
            .bind(format_datetime(at))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        tracing::trace!(bal_id = %id, "Touched base locale");
        Ok(())
    }

    async fn update_sync(
        &self,
        id: &BaseLocaleId,
        guard: &SyncGuard,
        status: BaseLocaleStatus,
        sync: &SyncRecord,
    ) -> anyhow::Result<bool> {
        let expected_sync = guard.sync_status.map(|s| s.as_str());

        let result = sqlx::query(
            "UPDATE base_locales SET \
              status = ?, sync_status = ?, sync_is_paused = ?, \
              sync_current_updated = ?, sync_last_uploaded_revision_id = ? \
             WHERE id = ? AND deleted_at IS NULL AND status = ? \
              AND (? IS NULL OR sync_status = ?)",
        )
        .bind(status.as_str())
        .bind(sync.status().as_str())
        .bind(sync.is_paused())
        .bind(format_datetime(sync.current_updated()))
        .bind(sync.last_uploaded_revision_id().as_str())
        .bind(id.to_string())
        .bind(guard.status.as_str())
        .bind(expected_sync)
        .bind(expected_sync)
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() > 0;
        tracing::trace!(
            bal_id = %id,
            status = %status,
            sync_status = %sync.status(),
            applied,
            "Conditional sync update"
        );
        Ok(applied)
    }

    async fn set_sync_paused(&self, id: &BaseLocaleId, paused: bool) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE base_locales SET sync_is_paused = ? \
             WHERE id = ? AND sync_status IN ('synced', 'outdated')",
        )
        .bind(paused)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_base_locale_deleted(
        &self,
        id: &BaseLocaleId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE base_locales SET deleted_at = ? WHERE id = ?")
            .bind(deleted_at.map(format_datetime))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- Voie operations ---

    async fn save_voie(&self, voie: &Voie) -> anyhow::Result<()> {
        let id = voie.id().to_string();

        sqlx::query(
            "INSERT INTO voies \
             (id, bal_id, nom, nom_alt, type_numerotation, trace, centroid, \
              created_at, updated_at, deleted_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
              nom = excluded.nom, nom_alt = excluded.nom_alt, \
              type_numerotation = excluded.type_numerotation, trace = excluded.trace, \
              centroid = excluded.centroid, updated_at = excluded.updated_at, \
              deleted_at = excluded.deleted_at",
        )
        .bind(&id)
        .bind(voie.bal_id().to_string())
        .bind(voie.nom())
        .bind(to_json(voie.nom_alt(), "nom_alt")?)
        .bind(voie.type_numerotation().as_str())
        .bind(optional_json(voie.trace(), "trace")?)
        .bind(optional_json(voie.centroid().as_ref(), "centroid")?)
        .bind(format_datetime(voie.created_at()))
        .bind(format_datetime(voie.updated_at()))
        .bind(voie.deleted_at().map(format_datetime))
        .execute(&self.pool)
        .await?;

        tracing::trace!(voie_id = %id, "Saved voie");
        Ok(())
    }

    async fn get_voie(&self, id: &VoieId) -> anyhow::Result<Option<Voie>> {
        let row = sqlx::query("SELECT * FROM voies WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(voie_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_voies(&self, bal_id: &BaseLocaleId) -> anyhow::Result<Vec<Voie>> {
        let rows = sqlx::query(
            "SELECT * FROM voies WHERE bal_id = ? AND deleted_at IS NULL ORDER BY nom ASC",
        )
        .bind(bal_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut voies = Vec::with_capacity(rows.len());
        for row in &rows {
            voies.push(voie_from_row(row)?);
        }
        Ok(voies)
    }

    async fn delete_voie(&self, id: &VoieId) -> anyhow::Result<bool> {
        let id_str = id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM numeros WHERE voie_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM voies WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::trace!(voie_id = %id_str, "Deleted voie");
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_voie(&self, id: &VoieId, at: DateTime<Utc>) -> anyhow::Result<u64> {
        let id_str = id.to_string();
        let at = format_datetime(at);
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE voies SET deleted_at = ? WHERE id = ?")
            .bind(&at)
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query(
            "UPDATE numeros SET deleted_at = ? WHERE voie_id = ? AND deleted_at IS NULL",
        )
        .bind(&at)
        .bind(&id_str)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::trace!(voie_id = %id_str, numeros = result.rows_affected(), "Soft-deleted voie");
        Ok(result.rows_affected())
    }

    async fn restore_voie(&self, id: &VoieId, numero_ids: &[NumeroId]) -> anyhow::Result<u64> {
        let id_str = id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE voies SET deleted_at = NULL WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        let mut restored = 0;
        if !numero_ids.is_empty() {
            let sql = format!(
                "UPDATE numeros SET deleted_at = NULL \
                 WHERE voie_id = ? AND deleted_at IS NOT NULL AND id IN ({})",
                placeholders(numero_ids.len())
            );
            let mut query = sqlx::query(&sql).bind(&id_str);
            for numero_id in numero_ids {
                query = query.bind(numero_id.to_string());
            }
            restored = query.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        tracing::trace!(voie_id = %id_str, restored, "Restored voie");
        Ok(restored)
    }

    async fn convert_voie_to_toponyme(
        &self,
        voie_id: &VoieId,
        toponyme: &Toponyme,
    ) -> anyhow::Result<bool> {
        let id_str = voie_id.to_string();
        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM voies WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&mut *tx)
            .await?;
        let live_numeros: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM numeros WHERE voie_id = ? AND deleted_at IS NULL",
        )
        .bind(&id_str)
        .fetch_one(&mut *tx)
        .await?;

        if exists.is_none() || live_numeros > 0 {
            // Dropping the transaction rolls it back
            return Ok(false);
        }

        toponyme_upsert(toponyme)?.execute(&mut *tx).await?;
        sqlx::query("DELETE FROM numeros WHERE voie_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM voies WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::trace!(voie_id = %id_str, toponyme_id = %toponyme.id(), "Converted voie");
        Ok(true)
    }

    // --- Numero operations ---

    async fn save_numero(&self, numero: &Numero) -> anyhow::Result<()> {
        numero_upsert(numero)?.execute(&self.pool).await?;
        tracing::trace!(numero_id = %numero.id(), "Saved numero");
        Ok(())
    }

    async fn get_numero(&self, id: &NumeroId) -> anyhow::Result<Option<Numero>> {
        let row = sqlx::query("SELECT * FROM numeros WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(numero_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn query_numeros(&self, filter: &NumeroFilter) -> anyhow::Result<Vec<Numero>> {
        let mut sql = String::from("SELECT * FROM numeros WHERE bal_id = ?");
        let mut binds: Vec<String> = vec![filter.bal_id.to_string()];

        if !filter.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }

        if let Some(ref voie_id) = filter.voie_id {
            sql.push_str(" AND voie_id = ?");
            binds.push(voie_id.to_string());
        }

        if let Some(ref toponyme_id) = filter.toponyme_id {
            sql.push_str(" AND toponyme_id = ?");
            binds.push(toponyme_id.to_string());
        }

        if let Some(ref ids) = filter.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND id IN ({})", placeholders(ids.len())));
            binds.extend(ids.iter().map(ToString::to_string));
        }

        sql.push_str(" ORDER BY voie_id ASC, numero ASC, suffixe ASC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut numeros = Vec::with_capacity(rows.len());
        for row in &rows {
            numeros.push(numero_from_row(row)?);
        }
        Ok(numeros)
    }

    async fn count_numeros(&self, bal_id: &BaseLocaleId) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM numeros WHERE bal_id = ? AND deleted_at IS NULL",
        )
        .bind(bal_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn delete_numero(&self, id: &NumeroId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM numeros WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        tracing::trace!(numero_id = %id, "Deleted numero");
        Ok(result.rows_affected() > 0)
    }

    async fn update_numeros(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
        changes: &NumeroChanges,
        at: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let bal_id_str = bal_id.to_string();
        let mut tx = self.pool.begin().await?;
        let mut count = 0;

        for id in ids {
            let row = sqlx::query(
                "SELECT * FROM numeros WHERE id = ? AND bal_id = ? AND deleted_at IS NULL",
            )
            .bind(id.to_string())
            .bind(&bal_id_str)
            .fetch_optional(&mut *tx)
            .await?;
            let Some(row) = row else {
                continue;
            };

            let mut numero = numero_from_row(&row)?;
            apply_changes(&mut numero, changes, at);
            numero_upsert(&numero)?.execute(&mut *tx).await?;
            count += 1;
        }

        tx.commit().await?;
        tracing::trace!(bal_id = %bal_id_str, count, "Updated numeros");
        Ok(count)
    }

    async fn soft_delete_numeros(
        &self,
        bal_id: &BaseLocaleId,
        ids: &[NumeroId],
        at: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "UPDATE numeros SET deleted_at = ? \
             WHERE bal_id = ? AND deleted_at IS NULL AND id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(format_datetime(at))
            .bind(bal_id.to_string());
        for id in ids {
            query = query.bind(id.to_string());
        }

        Ok(query.execute(&self.pool).await?.rows_affected())
    }

    async fn delete_numeros(&self, bal_id: &BaseLocaleId, ids: &[NumeroId]) -> anyhow::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "DELETE FROM numeros WHERE bal_id = ? AND id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql).bind(bal_id.to_string());
        for id in ids {
            query = query.bind(id.to_string());
        }

        Ok(query.execute(&self.pool).await?.rows_affected())
    }

    // --- Toponyme operations ---

    async fn save_toponyme(&self, toponyme: &Toponyme) -> anyhow::Result<()> {
        toponyme_upsert(toponyme)?.execute(&self.pool).await?;
        tracing::trace!(toponyme_id = %toponyme.id(), "Saved toponyme");
        Ok(())
    }

    async fn get_toponyme(&self, id: &ToponymeId) -> anyhow::Result<Option<Toponyme>> {
        let row = sqlx::query("SELECT * FROM toponymes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(toponyme_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_toponymes(&self, bal_id: &BaseLocaleId) -> anyhow::Result<Vec<Toponyme>> {
        let rows = sqlx::query(
            "SELECT * FROM toponymes WHERE bal_id = ? AND deleted_at IS NULL ORDER BY nom ASC",
        )
        .bind(bal_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut toponymes = Vec::with_capacity(rows.len());
        for row in &rows {
            toponymes.push(toponyme_from_row(row)?);
        }
        Ok(toponymes)
    }

    async fn delete_toponyme(&self, id: &ToponymeId) -> anyhow::Result<bool> {
        let id_str = id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE numeros SET toponyme_id = NULL WHERE toponyme_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM toponymes WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::trace!(toponyme_id = %id_str, "Deleted toponyme");
        Ok(result.rows_affected() > 0)
    }

    async fn touch_toponyme(&self, id: &ToponymeId, at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("UPDATE toponymes SET updated_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(format_datetime(at))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
