//! Simple SDK Example
//!
//! Calls the demo methods served by `sockrpc-daemon`.
//!
//! # Usage
//!
//! 1. Start the daemon:
//!    ```bash
//!    cargo run --package sockrpc-daemon -- --socket /tmp/sockrpc.sock
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --example simple -- /tmp/sockrpc.sock
//!    ```

use serde_json::{json, Value};
use sockrpc_sdk::{CallContext, Error, RpcClient};
use std::time::Duration;

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let socket = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/tmp/sockrpc.sock".to_string());

    println!("sockrpc SDK - Simple Example");
    println!("============================\n");

    let client = RpcClient::new(&socket);
    let ctx = CallContext::background().with_timeout(CALL_TIMEOUT);

    // 1. Plain call
    println!("1. Calling hello...");
    let greeting: String = client.call(&ctx, "hello", ()).await?;
    println!("   ✓ {}\n", greeting);

    // 2. Params round trip
    println!("2. Calling echo...");
    let echoed: Value = client
        .call(&ctx, "echo", json!({ "path": "examples/simple.rs" }))
        .await?;
    println!("   ✓ {}\n", echoed);

    // 3. Handler error
    println!("3. Calling fail...");
    match client.call::<_, Value>(&ctx, "fail", ()).await {
        Err(Error::Handler(obj)) => println!("   ✓ error {}: {}\n", obj.code, obj.message),
        other => println!("   ? unexpected: {:?}\n", other),
    }

    // 4. Deadline shorter than the handler
    println!("4. Calling sleep with a 100ms deadline...");
    let deadline = Duration::from_millis(100);
    let short = CallContext::background().with_timeout(deadline);
    let params = json!({ "ms": 1000 });
    match client.call::<_, Value>(&short, "sleep", params).await {
        Err(e) if e.is_cancelled() => println!("   ✓ {}\n", e),
        other => println!("   ? unexpected: {:?}\n", other),
    }

    println!("Done!");
    Ok(())
}
