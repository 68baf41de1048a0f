use axum::{Extension, Router, routing::get};
use std::{
    io::{Error, ErrorKind},
    net::SocketAddr,
    str::FromStr,
};
use tokio::{net::TcpListener, task::JoinHandle};

use crate::{api, warning};

/// Starts the local OAuth callback listener.
///
/// Returns the bound address (useful when binding port 0) and the server task.
/// Aborting the task shuts the listener down.
pub async fn start_api_server(
    addr: &str,
    state: api::CallbackState,
) -> Result<(SocketAddr, JoinHandle<()>), Error> {
    let app = Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(state));

    let addr = SocketAddr::from_str(addr).map_err(|e| Error::new(ErrorKind::InvalidInput, e))?;
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warning!("Callback listener stopped: {}", e);
        }
    });

    Ok((local_addr, handle))
}
