//! Sync watermark and lease lock, both stored in `migration_meta`.
//!
//! The watermark is the boundary between already-synced and not-yet-synced
//! rows. The lease guarantees a single writer: exactly one sync run may
//! read and advance the watermark at a time; a crashed holder's lease is
//! reclaimable once it expires.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::UpdateOptions;

use crate::sink::DocSink;

pub const META_COLLECTION: &str = "migration_meta";
pub const WATERMARK_ID: &str = "last_sync_at";
pub const LEASE_ID: &str = "sync_lock";
pub const LEASE_SECONDS: i64 = 600;

const DUPLICATE_KEY: i32 = 11000;

/// Load the persisted watermark. Absent or unreadable values default to the
/// Unix epoch, which makes the next pass migrate everything.
pub async fn load_watermark(sink: &DocSink) -> Result<DateTime<Utc>> {
    let found =
        sink.collection(META_COLLECTION).find_one(doc! { "_id": WATERMARK_ID }, None).await?;
    Ok(watermark_from_doc(found))
}

/// Persist a new watermark as an RFC 3339 string under the fixed key.
pub async fn store_watermark(sink: &DocSink, value: DateTime<Utc>) -> Result<()> {
    sink.collection(META_COLLECTION)
        .update_one(
            doc! { "_id": WATERMARK_ID },
            doc! { "$set": { "value": value.to_rfc3339() } },
            UpdateOptions::builder().upsert(true).build(),
        )
        .await?;
    Ok(())
}

fn watermark_from_doc(found: Option<Document>) -> DateTime<Utc> {
    let Some(found) = found else {
        return DateTime::UNIX_EPOCH;
    };
    let Ok(raw) = found.get_str("value") else {
        tracing::warn!("watermark document has no string value, treating as epoch");
        return DateTime::UNIX_EPOCH;
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.with_timezone(&Utc),
        Err(err) => {
            tracing::warn!(value = raw, "unparseable watermark, treating as epoch: {err}");
            DateTime::UNIX_EPOCH
        },
    }
}

/// Try to acquire the sync lease for `holder`. Returns `false` when another
/// run holds an unexpired lease.
pub async fn acquire_lease(sink: &DocSink, holder: &str) -> Result<bool> {
    let coll = sink.collection(META_COLLECTION);
    let now = mongodb::bson::DateTime::from_chrono(Utc::now());
    // Reclaim a lease whose holder died without releasing it.
    coll.delete_one(doc! { "_id": LEASE_ID, "expires_at": { "$lt": now } }, None).await?;

    let expires_at =
        mongodb::bson::DateTime::from_chrono(Utc::now() + Duration::seconds(LEASE_SECONDS));
    let lease = doc! { "_id": LEASE_ID, "holder": holder, "expires_at": expires_at };
    match coll.insert_one(lease, None).await {
        Ok(_) => Ok(true),
        Err(err) if is_duplicate_key(&err) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Release the lease if `holder` still owns it. A lease stolen after expiry
/// is left alone.
pub async fn release_lease(sink: &DocSink, holder: &str) -> Result<()> {
    sink.collection(META_COLLECTION)
        .delete_one(doc! { "_id": LEASE_ID, "holder": holder }, None)
        .await?;
    Ok(())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref write_err)) => {
            write_err.code == DUPLICATE_KEY
        },
        _ => false,
    }
}
