//! Dispatcher benchmarks against an in-memory transport.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mazewire_client::{
    ApiConfig, Dispatcher, HttpRequest, HttpResponse, RequestDescriptor, Transport, TransportError,
};
use mazewire_wire::{Envelope, MsgpackCodec, Value};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Answers every request with the same pre-encoded envelope.
struct CannedTransport {
    response: Vec<u8>,
}

#[async_trait]
impl Transport for CannedTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(200, self.response.clone()))
    }
}

fn create_dispatcher() -> Dispatcher {
    let body = Value::from_pairs([("id", Value::Int(1)), ("title", Value::from("Home"))]);
    let response = MsgpackCodec::new()
        .encode_envelope(&Envelope::ok(body))
        .unwrap();
    Dispatcher::new(
        &ApiConfig::default(),
        Arc::new(CannedTransport { response }),
    )
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dispatcher = create_dispatcher();

    let mut group = c.benchmark_group("dispatch");

    let get = RequestDescriptor::get("pages")
        .with_payload(Value::from_pairs([("id", Value::Int(1))]));
    group.bench_function("get_query", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(dispatcher.dispatch(&get).await.unwrap()) });
    });

    let post = RequestDescriptor::post(
        "pages",
        Value::from_pairs([
            ("title", Value::from("Home")),
            ("content", Value::from("x".repeat(1000))),
        ]),
    );
    group.bench_function("post_body", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(dispatcher.dispatch(&post).await.unwrap()) });
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
