use std::sync::Arc;

use serde_json::Value;

use crate::app::{self, AppContext, GenError, GenRequest, Result};

pub async fn serve(ctx: AppContext, bind: Option<String>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| ctx.config.server.bind.clone());
    crate::server::serve(Arc::new(ctx), &bind).await
}

/// Generate through the same path the endpoint uses, caches included.
pub async fn generate(ctx: &AppContext, request: GenRequest, json: bool) -> Result<()> {
    let envelope = run(ctx, request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    match failure(&envelope) {
        Some(error) => Err(GenError::Other(error)),
        None => {
            println!("{}", envelope["format"].as_str().unwrap_or_default());
            Ok(())
        }
    }
}

pub async fn search(ctx: &AppContext, query: &str, source: &str) -> Result<()> {
    let request = GenRequest {
        search: Some(query.to_string()),
        source: Some(source.to_string()),
        ..Default::default()
    };
    let envelope = run(ctx, request).await?;
    if let Some(error) = failure(&envelope) {
        return Err(GenError::Other(error));
    }

    let results = envelope["data"].as_array().cloned().unwrap_or_default();
    if results.is_empty() {
        println!("No results");
        return Ok(());
    }

    for result in results {
        let text = |key: &str| result[key].as_str().unwrap_or_default().to_string();
        let subtitle = text("subtitle");
        let title = if subtitle.is_empty() {
            text("title")
        } else {
            format!("{} / {}", text("title"), subtitle)
        };
        println!("[{}] {} ({})\n  {}", text("subtype"), title, text("year"), text("link"));
    }

    Ok(())
}

pub fn purge(ctx: &AppContext) -> Result<()> {
    match &ctx.persistent {
        Some(store) => {
            let removed = store.purge_expired()?;
            println!("Removed {} expired entries", removed);
        }
        None => println!("Cache is disabled"),
    }
    Ok(())
}

async fn run(ctx: &AppContext, mut request: GenRequest) -> Result<Value> {
    request.apikey = ctx.config.server.apikey.clone();
    let reply = app::handle(ctx, &request.to_target()).await;
    Ok(serde_json::from_str(&reply.body)?)
}

fn failure(envelope: &Value) -> Option<String> {
    if envelope["success"].as_bool() == Some(true) {
        return None;
    }
    Some(
        envelope["error"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string(),
    )
}
