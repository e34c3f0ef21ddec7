use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::pipeline::MetadataPipeline;
use crate::server::events::Notifier;
use crate::server::handshake;
use crate::server::manager::{ConnectionSlot, ServerConfig};

/// Serve one source connection until it closes, fails or is cancelled.
///
/// `slot` marks the connection as active in the manager and is released
/// when this future finishes or is dropped.
pub(crate) async fn run(
    stream: TcpStream,
    peer: SocketAddr,
    events: Notifier,
    config: ServerConfig,
    cancel: CancellationToken,
    slot: ConnectionSlot,
) {
    let mut announced = false;

    let result = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(peer = %peer, "session cancelled");
            Ok(())
        }
        result = serve(stream, peer, &events, &config, &mut announced) => result,
    };

    match result {
        Ok(()) => info!(peer = %peer, "Connection closed"),
        Err(e) if e.is_protocol_violation() => warn!(peer = %peer, "Dropping source: {}", e),
        Err(e) => warn!(peer = %peer, "Source connection failed: {}", e),
    }

    drop(slot);
    if announced {
        events.connection(false);
    }
}

async fn serve(
    mut stream: TcpStream,
    peer: SocketAddr,
    events: &Notifier,
    config: &ServerConfig,
    announced: &mut bool,
) -> Result<()> {
    let (request, leftover) = timeout(
        config.handshake_timeout,
        handshake::accept_source(&mut stream, config.max_request_len, config.handshake_idle),
    )
    .await
    .map_err(|_| Error::handshake("timed out waiting for SOURCE request"))??;

    info!(
        peer = %peer,
        mount = %request.mount,
        name = request.header("ice-name").unwrap_or("-"),
        content_type = request.header("content-type").unwrap_or("-"),
        agent = request.header("user-agent").unwrap_or("-"),
        "Connection established"
    );
    *announced = true;
    events.connection(true);

    // Dropped with the connection, so no partial packet outlives it.
    let mut pipeline = MetadataPipeline::new();
    publish(&mut pipeline, &leftover, events)?;

    let mut buffer = vec![0u8; config.read_buffer_size];
    loop {
        let n = stream.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        publish(&mut pipeline, &buffer[..n], events)?;
    }

    debug!(
        peer = %peer,
        packets = pipeline.packets(),
        skipped = pipeline.skipped(),
        "source stream ended"
    );
    Ok(())
}

fn publish(pipeline: &mut MetadataPipeline, chunk: &[u8], events: &Notifier) -> Result<()> {
    for track in pipeline.push(chunk)? {
        info!(track = %track, "Detected track");
        events.song(track);
    }
    Ok(())
}
