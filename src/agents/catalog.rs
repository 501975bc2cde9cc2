//! Catalog agent: read-only search over the capability provider.

use std::sync::Arc;

use serde_json::json;

use crate::agent::Agent;
use crate::catalog::CapabilityProvider;
use crate::protocol::{content, Performative, Router};

pub const CATALOG_AGENT: &str = "catalog";

/// Build the catalog agent with `script_search` and `workflow_search`
/// handlers.
pub fn catalog_agent(router: &Router, catalog: Arc<dyn CapabilityProvider>) -> Agent {
    let mut agent = Agent::new(CATALOG_AGENT, router);

    {
        let catalog = catalog.clone();
        agent.on("script_search", move |ctx, msg| {
            let catalog = catalog.clone();
            async move {
                let query = msg.content_str("query").filter(|q| !q.is_empty());
                let category = msg.content_str("category").map(str::to_string);
                let tags: Vec<String> = msg
                    .content
                    .get("tags")
                    .and_then(|v| v.as_array())
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|t| t.as_str())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();

                let scripts = catalog
                    .search_scripts(query, category.as_deref(), &tags)
                    .await?;
                let count = scripts.len();
                tracing::info!(count, "Script search");

                ctx.reply(
                    &msg,
                    Performative::Inform,
                    "script_results",
                    content(json!({
                        "scripts": scripts,
                        "count": count,
                    })),
                );
                Ok(())
            }
        });
    }

    agent.on("workflow_search", move |ctx, msg| {
        let catalog = catalog.clone();
        async move {
            let query = msg
                .content_str("query")
                .map(str::to_lowercase)
                .unwrap_or_default();

            let workflows: Vec<_> = catalog
                .get_all_workflows()
                .await?
                .into_iter()
                .filter(|w| {
                    query.is_empty()
                        || w.name.to_lowercase().contains(&query)
                        || w.description.to_lowercase().contains(&query)
                        || w.tags.iter().any(|t| t.to_lowercase().contains(&query))
                })
                .collect();
            let count = workflows.len();
            tracing::info!(count, "Workflow search");

            ctx.reply(
                &msg,
                Performative::Inform,
                "workflow_results",
                content(json!({
                    "workflows": workflows,
                    "count": count,
                })),
            );
            Ok(())
        }
    });

    agent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::protocol::Message;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn search(content_type: &str, body: serde_json::Value) -> Message {
        let router = Router::new();
        let catalog: Arc<dyn CapabilityProvider> = Arc::new(MemoryCatalog::seeded());
        let handle = catalog_agent(&router, catalog).spawn();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.register("caller", tx);

        router.route(Message::create(
            Performative::Request,
            "caller",
            CATALOG_AGENT,
            None,
            content_type,
            content(body),
        ));

        let reply = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        handle.shutdown().await;
        reply
    }

    #[tokio::test]
    async fn test_script_search_by_query() {
        let reply = search("script_search", serde_json::json!({"query": "validation"})).await;

        assert_eq!(reply.content_type, "script_results");
        let scripts = reply.content.get("scripts").unwrap().as_array().unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].get("id").unwrap(), "validation-001");
    }

    #[tokio::test]
    async fn test_script_search_by_tags() {
        let reply = search("script_search", serde_json::json!({"tags": ["pareto"]})).await;

        let count = reply.content.get("count").unwrap().as_u64().unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_workflow_search() {
        let reply = search("workflow_search", serde_json::json!({"query": "cooling"})).await;

        assert_eq!(reply.content_type, "workflow_results");
        let workflows = reply.content.get("workflows").unwrap().as_array().unwrap();
        assert_eq!(workflows.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_query_lists_all_workflows() {
        let reply = search("workflow_search", serde_json::json!({})).await;

        let count = reply.content.get("count").unwrap().as_u64().unwrap();
        assert_eq!(count, 5);
    }
}
