//! Raw requests through the service router.

use anyhow::{Context as _, Result};
use tillbook_service::Method;

use super::RequestArgs;
use crate::context::Context;

/// Run the request command. Prints the response envelope as JSON and
/// fails when its status is not 2xx.
pub async fn run(args: RequestArgs, ctx: &Context) -> Result<()> {
    let method: Method = args.method.parse()?;
    let body = args
        .body
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--body is not valid JSON")?;

    let service = ctx.service().await?;
    let response = service.dispatch(method, &args.target, body).await;

    ctx.output.json(&response);
    if !response.is_success() {
        anyhow::bail!(
            "{} {} returned {}",
            method,
            args.target,
            response.status
        );
    }
    Ok(())
}
