use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::instance::InstanceContext;
use crate::lifecycle::Worker;

pub(crate) mod error;
pub mod types;

use types::{ActionQuery, InstanceStatus, Message};

/// Serves the HTTP control surface of an instance until cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpWorker;

#[async_trait::async_trait]
impl Worker for HttpWorker {
    async fn run(
        &self,
        ctx: Arc<InstanceContext>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let addr = ctx.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind HTTP server to: {}", addr))?;

        info!("HTTP server listening on: {}", listener.local_addr()?);

        axum::serve(listener, router(ctx))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        Ok(())
    }
}

pub fn router(ctx: Arc<InstanceContext>) -> Router {
    Router::new().route("/", get(handle_action)).with_state(ctx)
}

/// GET /?action=...
async fn handle_action(
    State(ctx): State<Arc<InstanceContext>>,
    Query(query): Query<ActionQuery>,
) -> Response {
    match query.action.as_deref() {
        Some("command") => run_command(&ctx, &query),
        Some("status") => (StatusCode::OK, Json(status(&ctx))).into_response(),
        _ => message(StatusCode::NOT_FOUND, "unknown action"),
    }
}

fn run_command(ctx: &InstanceContext, query: &ActionQuery) -> Response {
    if ctx.config.nocommands {
        return message(
            StatusCode::NOT_IMPLEMENTED,
            "this server is configured to not accept commands",
        );
    }

    let (Some(command), Some(group)) = (query.id, query.group) else {
        return message(
            StatusCode::BAD_REQUEST,
            "command requires the id and group parameters",
        );
    };
    let value = query.value.unwrap_or(0);

    match ctx.dispatch(command, group, value) {
        Ok(rc) => (
            StatusCode::OK,
            Json(Message {
                message: "command executed".to_string(),
                item: Some(rc),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

fn status(ctx: &InstanceContext) -> InstanceStatus {
    let cfg = &ctx.config;
    InstanceStatus {
        id: ctx.id,
        name: ctx.global.output_name(ctx.id),
        port: cfg.port,
        listen: cfg.listen.clone(),
        credentials: cfg.credentials.clone(),
        www_folder: cfg.www_folder.clone(),
        commands_enabled: !cfg.nocommands,
        pipe: cfg.channel.path().map(|p| p.display().to_string()),
        pipe_available: cfg.channel.is_available(),
        auto_toggle: cfg.auto_toggle(),
        continue_toggle: cfg.continue_toggle(),
    }
}

fn message(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(Message {
            message: message.to_string(),
            item: None::<()>,
        }),
    )
        .into_response()
}
