//! CLI subcommands for document CRUD.

use std::{
    io::{Read, Write},
    time::Duration,
};

use {
    anyhow::{Context, Result, anyhow, bail},
    chanstore_channels::MessageGateway,
    chanstore_config::ChanstoreConfig,
    chanstore_docstore::DocumentStore,
    clap::Subcommand,
    serde_json::Value,
};

#[derive(Subcommand)]
pub enum DocumentAction {
    /// Insert a JSON document and print its id.
    Insert {
        collection: String,
        /// JSON payload, or `-` to read it from stdin.
        json: String,
    },
    /// Print every document in a collection, newest first.
    List { collection: String },
    /// Print one document.
    Get { collection: String, id: String },
    /// Merge the top-level keys of a JSON object into a document.
    Update {
        collection: String,
        id: String,
        /// JSON object, or `-` to read it from stdin.
        json: String,
    },
    /// Delete a document.
    Delete { collection: String, id: String },
}

pub async fn handle_documents(
    action: DocumentAction,
    config: &ChanstoreConfig,
    ready_timeout: Duration,
) -> Result<()> {
    let store = DocumentStore::connect(config).await?;

    let result = match tokio::time::timeout(ready_timeout, store.is_ready()).await {
        Ok(true) => run(&store, action, &mut std::io::stdout()).await,
        Ok(false) => Err(anyhow!("discord session is not ready")),
        Err(_) => Err(anyhow!(
            "timed out after {}s waiting for the discord session",
            ready_timeout.as_secs()
        )),
    };

    store.shutdown().await;
    result
}

async fn run<G: MessageGateway + ?Sized>(
    store: &DocumentStore<G>,
    action: DocumentAction,
    out: &mut impl Write,
) -> Result<()> {
    match action {
        DocumentAction::Insert { collection, json } => {
            let payload = parse_json(&json)?;
            let id = store.insert(&collection, &payload).await?;
            writeln!(out, "{id}")?;
        },
        DocumentAction::List { collection } => {
            let docs = store.find_all::<Value>(&collection).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&docs)?)?;
        },
        DocumentAction::Get { collection, id } => {
            let Some(doc) = store.find_by_id::<Value>(&collection, &id).await? else {
                bail!("document {id} not found in {collection}");
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        },
        DocumentAction::Update {
            collection,
            id,
            json,
        } => {
            let patch = parse_json(&json)?;
            if !patch.is_object() {
                bail!("update expects a JSON object");
            }
            if !store.update(&collection, &id, &patch).await? {
                bail!("document {id} in {collection} was not updated");
            }
            writeln!(out, "updated {id}")?;
        },
        DocumentAction::Delete { collection, id } => {
            if !store.delete(&collection, &id).await? {
                bail!("document {id} not found in {collection}");
            }
            writeln!(out, "deleted {id}")?;
        },
    }
    Ok(())
}

fn parse_json(raw: &str) -> Result<Value> {
    if raw == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read JSON from stdin")?;
        return serde_json::from_str(&buf).context("stdin is not valid JSON");
    }
    serde_json::from_str(raw).with_context(|| format!("invalid JSON: {raw}"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chanstore_channels::memory::InMemoryGateway, std::sync::Arc};

    async fn exec(store: &DocumentStore<InMemoryGateway>, action: DocumentAction) -> Result<String> {
        let mut out = Vec::new();
        run(store, action, &mut out).await?;
        Ok(String::from_utf8(out).unwrap().trim().to_string())
    }

    #[tokio::test]
    async fn crud_commands_round_trip() {
        let store = DocumentStore::with_gateway(Arc::new(InMemoryGateway::new()));

        let id = exec(&store, DocumentAction::Insert {
            collection: "notes".into(),
            json: r#"{"title":"hi","tags":["a"]}"#.into(),
        })
        .await
        .unwrap();

        exec(&store, DocumentAction::Update {
            collection: "notes".into(),
            id: id.clone(),
            json: r#"{"tags":["b"]}"#.into(),
        })
        .await
        .unwrap();

        let shown = exec(&store, DocumentAction::Get {
            collection: "notes".into(),
            id: id.clone(),
        })
        .await
        .unwrap();
        let doc: Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(doc, serde_json::json!({"id": id, "title": "hi", "tags": ["b"]}));

        let listed = exec(&store, DocumentAction::List {
            collection: "notes".into(),
        })
        .await
        .unwrap();
        let docs: Vec<Value> = serde_json::from_str(&listed).unwrap();
        assert_eq!(docs.len(), 1);

        assert_eq!(
            exec(&store, DocumentAction::Delete {
                collection: "notes".into(),
                id: id.clone(),
            })
            .await
            .unwrap(),
            format!("deleted {id}")
        );
    }

    #[tokio::test]
    async fn missing_documents_are_errors() {
        let store = DocumentStore::with_gateway(Arc::new(InMemoryGateway::new()));
        let get = exec(&store, DocumentAction::Get {
            collection: "notes".into(),
            id: "1".into(),
        })
        .await;
        assert!(get.is_err());

        let delete = exec(&store, DocumentAction::Delete {
            collection: "notes".into(),
            id: "1".into(),
        })
        .await;
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn update_requires_object() {
        let store = DocumentStore::with_gateway(Arc::new(InMemoryGateway::new()));
        let err = exec(&store, DocumentAction::Update {
            collection: "notes".into(),
            id: "1".into(),
            json: "[1]".into(),
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(parse_json("{nope").is_err());
        assert_eq!(parse_json("3").unwrap(), serde_json::json!(3));
    }
}
