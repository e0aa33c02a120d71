//! Transport round-trip benchmark.
//!
//! Measures command round trips through the channel against an in-process
//! scripted remote end, which bounds the per-command overhead of the
//! pipeline (serialization, correlation, wakeups) without a browser.

use criterion::{Criterion, criterion_group, criterion_main};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::runtime::Runtime;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use stirrup::identifiers::{FrameId, RequestId};
use stirrup::protocol::{Command, PageCommand, Request};
use stirrup::transport::{Channel, PendingEndpoint};

/// Remote that acks every request immediately.
async fn echo_remote(ws_url: String) {
    let (mut ws, _) = connect_async(ws_url.as_str()).await.expect("connect");

    let ready = json!({
        "id": RequestId::handshake(),
        "type": "success",
        "result": { "protocolVersion": 1 }
    });
    ws.send(Message::Text(ready.to_string().into()))
        .await
        .expect("send ready");

    while let Some(Ok(Message::Text(text))) = ws.next().await {
        let request: Value = serde_json::from_str(&text).expect("request json");
        let reply = json!({
            "id": request["id"],
            "type": "success",
            "result": {}
        });
        if ws
            .send(Message::Text(reply.to_string().into()))
            .await
            .is_err()
        {
            break;
        }
    }
}

fn connect_channel(rt: &Runtime) -> Channel {
    rt.block_on(async {
        let endpoint = PendingEndpoint::bind(None).await.expect("bind");
        tokio::spawn(echo_remote(endpoint.ws_url()));
        let (channel, _) = endpoint.accept().await.expect("accept");
        channel
    })
}

fn bench_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let channel = connect_channel(&rt);

    c.bench_function("channel_round_trip", |b| {
        b.to_async(&rt).iter(|| {
            let channel = channel.clone();
            async move {
                let request = Request::new(FrameId::MAIN, Command::Page(PageCommand::Reload));
                channel.send(request).await.expect("round trip")
            }
        })
    });
}

criterion_group!(benches, bench_round_trip);
criterion_main!(benches);
