use futures_util::{SinkExt, StreamExt};
use tagrpc_frame::{FrameError, TagCodec};
use tagrpc_transport::TcpEndpoint;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::EchoArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_listening, OutputFormat};

pub async fn run(args: EchoArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = TcpEndpoint::bind(&args.addr)
        .await
        .map_err(|err| transport_error("bind failed", err))?;
    info!(addr = %endpoint.local_addr(), "echo peer listening");
    print_listening(endpoint.local_addr(), format);

    let shutdown = CancellationToken::new();
    install_ctrlc_handler(shutdown.clone());

    let mut echoed = 0usize;
    while !args.count.is_some_and(|limit| echoed >= limit) {
        let stream = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = endpoint.accept() => {
                accepted.map_err(|err| transport_error("accept failed", err))?
            }
        };
        let peer = stream.peer_addr();
        info!(%peer, "peer connected");

        let remaining = args.count.map(|limit| limit - echoed);
        let mut frames = Framed::new(stream.into_inner(), TagCodec::new());
        echoed += reflect(&mut frames, &shutdown, remaining).await;
        info!(%peer, echoed, "peer done");
    }

    Ok(SUCCESS)
}

/// Send every frame back on its own tag until the peer goes away, `limit`
/// frames have been echoed, or shutdown is requested.
async fn reflect(
    frames: &mut Framed<TcpStream, TagCodec>,
    shutdown: &CancellationToken,
    limit: Option<usize>,
) -> usize {
    let mut echoed = 0usize;
    while !limit.is_some_and(|limit| echoed >= limit) {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = frames.next() => next,
        };

        // A misbehaving peer ends its own session, never the echo process.
        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(FrameError::ConnectionClosed)) | None => break,
            Some(Err(err)) => {
                warn!(error = %err, "dropping peer after receive error");
                break;
            }
        };

        info!(tag = frame.tag, size = frame.payload.len(), "echoing frame");
        if let Err(err) = frames.send(frame).await {
            warn!(error = %err, "echo send failed, dropping peer");
            break;
        }
        echoed += 1;
    }
    echoed
}

fn install_ctrlc_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown.cancel(),
            Err(err) => warn!(error = %err, "signal handler setup failed"),
        }
    });
}
