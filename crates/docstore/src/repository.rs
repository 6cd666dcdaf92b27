//! CRUD over channel/message primitives.

use std::sync::Arc;

use {
    chanstore_channels::{MessageGateway, RawMessage},
    serde::{Serialize, de::DeserializeOwned},
    tracing::{debug, warn},
};

use crate::{
    Result,
    document::{Document, Lookup},
    envelope,
    merge::shallow_merge,
};

/// Stateless translation of document operations into gateway calls.
///
/// Every call resolves the collection and goes to the network; nothing is
/// cached and concurrent writes to one document are last-write-wins.
pub struct DocumentRepository<G: ?Sized> {
    gateway: Arc<G>,
}

impl<G: ?Sized> Clone for DocumentRepository<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<G: MessageGateway + ?Sized> DocumentRepository<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Store `payload` as a new document and return its id.
    pub async fn insert<T: Serialize + ?Sized>(&self, collection: &str, payload: &T) -> Result<String> {
        let channel = self.gateway.resolve_collection(collection).await?;
        let body = envelope::encode(payload)?;
        let id = self.gateway.send(&channel, &body).await?;
        debug!(collection, document_id = %id, "document inserted");
        Ok(id)
    }

    /// Every decodable document in the collection, newest first.
    ///
    /// Pages are fetched one after another, each starting below the last id
    /// of the previous page. The scan stops at an empty or short page.
    /// Bodies that do not decode are skipped.
    pub async fn find_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<Document<T>>> {
        let channel = self.gateway.resolve_collection(collection).await?;

        let mut documents = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        let mut skipped = 0usize;

        loop {
            let page = self.gateway.fetch_page(&channel, cursor.as_deref()).await?;
            pages += 1;

            let next = page.last_id().map(str::to_string);
            let exhausted = page.is_last();

            for message in page {
                match decode_message(message) {
                    Some(doc) => documents.push(doc),
                    None => skipped += 1,
                }
            }

            match next {
                Some(next) if !exhausted => cursor = Some(next),
                _ => break,
            }
        }

        debug!(
            collection,
            pages,
            documents = documents.len(),
            skipped,
            "collection scanned"
        );
        Ok(documents)
    }

    /// Point lookup that keeps corruption distinguishable from absence.
    pub async fn lookup<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Lookup<T>> {
        let channel = self.gateway.resolve_collection(collection).await?;
        let Some(message) = self.gateway.fetch_by_id(&channel, id).await else {
            return Ok(Lookup::NotFound);
        };

        Ok(match decode_message(message) {
            Some(doc) => Lookup::Found(doc),
            None => {
                debug!(collection, document_id = id, "stored envelope does not decode");
                Lookup::Corrupt
            },
        })
    }

    /// The document with `id`, or `None` when it is missing or corrupt.
    pub async fn find_by_id<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document<T>>> {
        Ok(self.lookup(collection, id).await?.into_option())
    }

    /// Shallow-merge `partial` into the stored payload.
    ///
    /// Returns `false` when the document is missing or corrupt, when
    /// `partial` is not an object, or when the edit itself fails. Only
    /// collection resolution and serialisation of `partial` are errors.
    pub async fn update<P: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        partial: &P,
    ) -> Result<bool> {
        let channel = self.gateway.resolve_collection(collection).await?;
        let Some(message) = self.gateway.fetch_by_id(&channel, id).await else {
            debug!(collection, document_id = id, "update target not found");
            return Ok(false);
        };
        let Some(existing) = envelope::parse(&message.body) else {
            warn!(collection, document_id = id, "update target is not valid JSON");
            return Ok(false);
        };

        let patch = envelope::to_payload(partial)?;
        let merged = match shallow_merge(existing, patch) {
            Ok(merged) => merged,
            Err(e) => {
                warn!(collection, document_id = id, error = %e, "update rejected");
                return Ok(false);
            },
        };
        let body = serde_json::to_string(&merged)?;

        match self.gateway.edit(&channel, &message, &body).await {
            Ok(()) => {
                debug!(collection, document_id = id, "document updated");
                Ok(true)
            },
            Err(e) => {
                warn!(collection, document_id = id, error = %e, "document edit failed");
                Ok(false)
            },
        }
    }

    /// Remove the document with `id`.
    ///
    /// Returns `false` when it does not exist. A failing delete call is
    /// returned as an error, unlike a failing edit in [`update`](Self::update).
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let channel = self.gateway.resolve_collection(collection).await?;
        let Some(message) = self.gateway.fetch_by_id(&channel, id).await else {
            debug!(collection, document_id = id, "delete target not found");
            return Ok(false);
        };

        self.gateway.delete(&channel, &message).await?;
        debug!(collection, document_id = id, "document deleted");
        Ok(true)
    }
}

fn decode_message<T: DeserializeOwned>(message: RawMessage) -> Option<Document<T>> {
    let data = envelope::decode(&message.body)?;
    Some(Document::new(message.id, data))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::Error,
        chanstore_channels::{PAGE_SIZE, memory::InMemoryGateway},
        serde::Deserialize,
        serde_json::{Value, json},
    };

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: u32,
    }

    fn repo() -> (Arc<InMemoryGateway>, DocumentRepository<InMemoryGateway>) {
        let gateway = Arc::new(InMemoryGateway::new());
        (Arc::clone(&gateway), DocumentRepository::new(gateway))
    }

    fn stored(gateway: &InMemoryGateway, collection: &str, id: &str) -> Value {
        serde_json::from_str(&gateway.stored_body(collection, id).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn insert_then_find_by_id_round_trips() {
        let (_gateway, repo) = repo();
        let user = User {
            name: "ada".into(),
            age: 36,
        };
        let id = repo.insert("users", &user).await.unwrap();

        let doc = repo.find_by_id::<User>("users", &id).await.unwrap().unwrap();
        assert_eq!(doc, Document::new(id, user));
    }

    #[tokio::test]
    async fn insert_strips_id_from_payload() {
        let (gateway, repo) = repo();
        let id = repo
            .insert("users", &json!({"id": "forged", "name": "bob"}))
            .await
            .unwrap();
        assert_eq!(stored(&gateway, "users", &id), json!({"name": "bob"}));

        let doc = repo.find_by_id::<Value>("users", &id).await.unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.data, json!({"name": "bob"}));
    }

    #[tokio::test]
    async fn empty_collection_needs_one_fetch() {
        let (gateway, repo) = repo();
        let docs = repo.find_all::<Value>("empty").await.unwrap();
        assert!(docs.is_empty());
        assert_eq!(gateway.fetch_cursors(), vec![None]);
    }

    #[tokio::test]
    async fn find_all_walks_pages_with_last_id_cursor() {
        let (gateway, repo) = repo();
        for i in 0..(2 * PAGE_SIZE + 37) {
            repo.insert("log", &json!({ "n": i })).await.unwrap();
        }

        let docs = repo.find_all::<Value>("log").await.unwrap();
        assert_eq!(docs.len(), 237);
        // Newest first.
        assert_eq!(docs[0].data, json!({"n": 236}));
        assert_eq!(docs[236].data, json!({"n": 0}));

        let cursors = gateway.fetch_cursors();
        assert_eq!(cursors, vec![
            None,
            Some(docs[PAGE_SIZE - 1].id.clone()),
            Some(docs[2 * PAGE_SIZE - 1].id.clone()),
        ]);
    }

    #[tokio::test]
    async fn find_all_stops_on_empty_page_after_full_page() {
        let (gateway, repo) = repo();
        for i in 0..PAGE_SIZE {
            repo.insert("exact", &json!({ "n": i })).await.unwrap();
        }

        let docs = repo.find_all::<Value>("exact").await.unwrap();
        assert_eq!(docs.len(), PAGE_SIZE);
        assert_eq!(gateway.fetch_cursors().len(), 2);
    }

    #[tokio::test]
    async fn find_all_skips_corrupt_envelopes_in_order() {
        let (gateway, repo) = repo();
        let a = repo.insert("mixed", &json!({"k": "a"})).await.unwrap();
        gateway.seed_raw("mixed", "this is not json");
        let b = repo.insert("mixed", &json!({"k": "b"})).await.unwrap();
        gateway.seed_raw("mixed", "{\"k\":");
        let c = repo.insert("mixed", &json!({"k": "c"})).await.unwrap();

        let ids: Vec<String> = repo
            .find_all::<Value>("mixed")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[tokio::test]
    async fn find_all_skips_documents_of_other_shapes() {
        let (gateway, repo) = repo();
        repo.insert("users", &User {
            name: "ada".into(),
            age: 36,
        })
        .await
        .unwrap();
        gateway.seed_raw("users", r#"{"title":"not a user"}"#);

        let users = repo.find_all::<User>("users").await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].data.name, "ada");
    }

    #[tokio::test]
    async fn lookup_distinguishes_corrupt_from_missing() {
        let (gateway, repo) = repo();
        let bad = gateway.seed_raw("c", "<<garbage>>");

        assert_eq!(
            repo.lookup::<Value>("c", &bad).await.unwrap(),
            Lookup::Corrupt
        );
        assert_eq!(
            repo.lookup::<Value>("c", "123456").await.unwrap(),
            Lookup::NotFound
        );
        assert!(repo.find_by_id::<Value>("c", &bad).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_document_never_edits() {
        let (gateway, repo) = repo();
        let updated = repo
            .update("users", "424242", &json!({"age": 1}))
            .await
            .unwrap();
        assert!(!updated);
        assert_eq!(gateway.edit_calls(), 0);
    }

    #[tokio::test]
    async fn update_corrupt_document_never_edits() {
        let (gateway, repo) = repo();
        let id = gateway.seed_raw("users", "not json");
        assert!(!repo.update("users", &id, &json!({"a": 1})).await.unwrap());
        assert_eq!(gateway.edit_calls(), 0);
    }

    #[tokio::test]
    async fn update_merges_top_level_keys() {
        let (gateway, repo) = repo();
        let id = repo.insert("c", &json!({"a": 1, "b": 2})).await.unwrap();
        assert!(repo.update("c", &id, &json!({"b": 3})).await.unwrap());
        assert_eq!(stored(&gateway, "c", &id), json!({"a": 1, "b": 3}));
    }

    #[tokio::test]
    async fn update_replaces_nested_objects_wholesale() {
        let (gateway, repo) = repo();
        let id = repo.insert("c", &json!({"u": {"x": 1, "y": 2}})).await.unwrap();
        assert!(repo.update("c", &id, &json!({"u": {"x": 9}})).await.unwrap());
        assert_eq!(stored(&gateway, "c", &id), json!({"u": {"x": 9}}));
    }

    #[tokio::test]
    async fn update_ignores_id_in_partial() {
        let (gateway, repo) = repo();
        let id = repo.insert("c", &json!({"a": 1})).await.unwrap();
        assert!(
            repo.update("c", &id, &json!({"id": "other", "a": 2}))
                .await
                .unwrap()
        );
        assert_eq!(stored(&gateway, "c", &id), json!({"a": 2}));
    }

    #[tokio::test]
    async fn update_rejects_non_object_partial() {
        let (gateway, repo) = repo();
        let id = repo.insert("c", &json!({"a": 1})).await.unwrap();
        assert!(!repo.update("c", &id, &json!([1, 2])).await.unwrap());
        assert_eq!(gateway.edit_calls(), 0);
    }

    #[tokio::test]
    async fn failed_edit_reports_false() {
        let (gateway, repo) = repo();
        let id = repo.insert("c", &json!({"a": 1})).await.unwrap();
        gateway.set_fail_edits(true);

        assert!(!repo.update("c", &id, &json!({"a": 2})).await.unwrap());
        assert_eq!(gateway.edit_calls(), 1);
        assert_eq!(stored(&gateway, "c", &id), json!({"a": 1}));
    }

    #[tokio::test]
    async fn delete_missing_document_never_deletes() {
        let (gateway, repo) = repo();
        assert!(!repo.delete("c", "777").await.unwrap());
        assert_eq!(gateway.delete_calls(), 0);
    }

    #[tokio::test]
    async fn delete_existing_document_once() {
        let (gateway, repo) = repo();
        let id = repo.insert("c", &json!({"a": 1})).await.unwrap();

        assert!(repo.delete("c", &id).await.unwrap());
        assert_eq!(gateway.delete_calls(), 1);
        assert!(repo.find_by_id::<Value>("c", &id).await.unwrap().is_none());
        assert_eq!(gateway.message_count("c"), 0);
    }

    #[tokio::test]
    async fn failed_delete_propagates() {
        let (gateway, repo) = repo();
        let id = repo.insert("c", &json!({"a": 1})).await.unwrap();
        gateway.set_fail_deletes(true);

        let err = repo.delete("c", &id).await.unwrap_err();
        assert!(matches!(err, Error::Gateway(_)));
        assert_eq!(gateway.delete_calls(), 1);
    }

    #[tokio::test]
    async fn missing_scope_is_fatal_everywhere() {
        let repo = DocumentRepository::new(Arc::new(InMemoryGateway::without_scope(5)));
        let scope_err = |e: Error| {
            matches!(
                e,
                Error::Gateway(chanstore_channels::Error::ScopeNotFound { scope_id: 5 })
            )
        };

        assert!(scope_err(repo.insert("c", &json!({})).await.unwrap_err()));
        assert!(scope_err(repo.find_all::<Value>("c").await.unwrap_err()));
        assert!(scope_err(
            repo.find_by_id::<Value>("c", "1").await.unwrap_err()
        ));
        assert!(scope_err(
            repo.update("c", "1", &json!({})).await.unwrap_err()
        ));
        assert!(scope_err(repo.delete("c", "1").await.unwrap_err()));
    }
}
