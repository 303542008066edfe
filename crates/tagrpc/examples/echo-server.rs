//! Minimal reflecting peer: every frame goes back on its own tag.
//!
//! Run with:
//!   cargo run -p tagrpc --example echo-server --features async
//!
//! In another terminal:
//!   cargo run -p tagrpc --features cli -- call 127.0.0.1:20776 \
//!     --tag 3647565230 --data ok --format pretty

use futures_util::{SinkExt, StreamExt};
use tagrpc::frame::TagCodec;
use tagrpc::transport::TcpEndpoint;
use tokio_util::codec::Framed;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:20776".to_string());
    let endpoint = TcpEndpoint::bind(&addr).await?;
    eprintln!("Listening on {}", endpoint.local_addr());

    loop {
        let stream = endpoint.accept().await?;
        eprintln!("Peer connected: {}", stream.peer_addr());

        tokio::spawn(async move {
            let mut frames = Framed::new(stream.into_inner(), TagCodec::new());
            while let Some(next) = frames.next().await {
                match next {
                    Ok(frame) => {
                        eprintln!("Received {} bytes on tag {}", frame.payload.len(), frame.tag);
                        if frames.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        eprintln!("Peer dropped: {e}");
                        break;
                    }
                }
            }
        });
    }
}
