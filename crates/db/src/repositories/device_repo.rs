//! Repository for the `devices` and `device_links` tables.

use sigil_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::device::{Device, DeviceLink};

/// Column list for `devices` SELECT queries.
const DEVICE_COLUMNS: &str = "device_hash, first_seen_at, last_seen_at";

/// Column list for `device_links` SELECT queries.
const LINK_COLUMNS: &str = "device_hash, user_id, first_seen_at, last_seen_at";

/// Provides fingerprint tracking and device-to-user linking.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Record a sighting of a device. Idempotent upsert: inserts on first
    /// sight, bumps `last_seen_at` afterwards.
    pub async fn touch(
        tx: &mut Transaction<'_, Postgres>,
        device_hash: &str,
    ) -> Result<Device, sqlx::Error> {
        let query = format!(
            "INSERT INTO devices (device_hash) VALUES ($1) \
             ON CONFLICT (device_hash) DO UPDATE SET last_seen_at = NOW() \
             RETURNING {DEVICE_COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(device_hash)
            .fetch_one(&mut **tx)
            .await
    }

    /// Associate a device with a user. Idempotent; returns `true` only when
    /// the (device, user) pair is new, so the caller can append a
    /// `device_linked` ledger entry exactly once per pair.
    pub async fn link(
        tx: &mut Transaction<'_, Postgres>,
        device_hash: &str,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let inserted = sqlx::query(
            "INSERT INTO device_links (device_hash, user_id) VALUES ($1, $2) \
             ON CONFLICT (device_hash, user_id) DO NOTHING",
        )
        .bind(device_hash)
        .bind(user_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            sqlx::query(
                "UPDATE device_links SET last_seen_at = NOW() \
                 WHERE device_hash = $1 AND user_id = $2",
            )
            .bind(device_hash)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(inserted > 0)
    }

    /// Count distinct users linked to a device within the last
    /// `window_hours`. Feeds the advisory suspicion heuristic.
    pub async fn distinct_users_in_window(
        tx: &mut Transaction<'_, Postgres>,
        device_hash: &str,
        window_hours: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT user_id)::BIGINT FROM device_links \
             WHERE device_hash = $1 \
               AND last_seen_at > NOW() - make_interval(hours => $2::int)",
        )
        .bind(device_hash)
        .bind(window_hours)
        .fetch_one(&mut **tx)
        .await
    }

    /// All users ever linked to a device.
    pub async fn links_for_device(
        pool: &PgPool,
        device_hash: &str,
    ) -> Result<Vec<DeviceLink>, sqlx::Error> {
        let query = format!(
            "SELECT {LINK_COLUMNS} FROM device_links \
             WHERE device_hash = $1 ORDER BY first_seen_at ASC"
        );
        sqlx::query_as::<_, DeviceLink>(&query)
            .bind(device_hash)
            .fetch_all(pool)
            .await
    }
}
