//! Document store client using the official MongoDB driver.

use anyhow::Result;
use mirai_sync_core::TABLES;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::transform::{upsert_filter, upsert_update};

/// Write-side client for the document store.
#[derive(Clone, Debug)]
pub struct DocSink {
    db: Database,
}

impl DocSink {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        // The driver connects lazily; ping so a bad URI fails here, not
        // halfway through a run.
        client.database("admin").run_command(doc! { "ping": 1 }, None).await?;
        tracing::info!(db = db_name, "DocSink connected");
        Ok(Self { db: client.database(db_name) })
    }

    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    /// Upsert one document keyed by `old_id`. Returns the generated `_id`
    /// when this call inserted the document, `None` when it updated an
    /// existing one.
    pub async fn upsert(
        &self,
        collection: &str,
        old_id: i64,
        fields: &Document,
    ) -> Result<Option<Bson>> {
        let result = self
            .collection(collection)
            .update_one(
                upsert_filter(old_id),
                upsert_update(old_id, fields),
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(result.upserted_id)
    }

    /// Resolve a relational key to its document `_id`, if the row has ever
    /// been migrated.
    pub async fn document_id_for(&self, collection: &str, old_id: i64) -> Result<Option<Bson>> {
        let found = self.collection(collection).find_one(doc! { "old_id": old_id }, None).await?;
        Ok(found.and_then(|mut d| d.remove("_id")))
    }

    pub async fn count(&self, collection: &str) -> Result<u64> {
        Ok(self.collection(collection).count_documents(None, None).await?)
    }

    /// Create the lookup indexes every migrated collection needs: a unique
    /// index on `old_id`, plus indexes on the reference fields of child
    /// collections.
    pub async fn ensure_indexes(&self) -> Result<()> {
        for spec in TABLES {
            let coll = self.collection(spec.collection);
            coll.create_index(
                IndexModel::builder()
                    .keys(index_keys("old_id"))
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await?;
            if let Some(parent) = spec.parent {
                coll.create_index(
                    IndexModel::builder().keys(index_keys(parent.ref_field)).build(),
                    None,
                )
                .await?;
                coll.create_index(
                    IndexModel::builder().keys(index_keys(parent.old_id_field)).build(),
                    None,
                )
                .await?;
            }
            tracing::debug!(collection = spec.collection, "indexes ensured");
        }
        Ok(())
    }
}

fn index_keys(field: &str) -> Document {
    let mut keys = Document::new();
    keys.insert(field, 1);
    keys
}
