//! Typed call through the `Method` boundary.
//!
//! Start the echo server first (it answers every call with the request
//! bytes), then:
//!   cargo run -p tagrpc --example put-client

use serde::{Deserialize, Serialize};
use tagrpc::client::{connect, invoke, Json, Method};
use tagrpc::filter::Filter;

#[derive(Debug, Serialize, Deserialize)]
struct PutRequest {
    key: String,
    value: u64,
}

struct Put;

impl Method for Put {
    const NAME: &'static str = "Put";
    const HASH_A: u32 = 0xDEAD_BEEF;
    const HASH_B: u32 = 0x07C4_D341;
    type Request = Json<PutRequest>;
    // The echo server reflects the request, so the response has the same shape.
    type Response = Json<PutRequest>;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:20776".to_string());

    // Compress requests; the reflected bytes come back compressed too.
    let conn = connect(&addr, [Filter::compress(6)?], [Filter::decompress()]).await?;
    eprintln!("Connected to {} (tag {})", conn.peer_addr(), Put::tag());

    let request = Json(PutRequest {
        key: "answer".to_string(),
        value: 42,
    });
    let (Json(reply), status) = invoke::<Put>(&conn, &request).await?;
    println!("{status}: {reply:?}");

    conn.close().await;
    conn.wait_closed().await;
    Ok(())
}
