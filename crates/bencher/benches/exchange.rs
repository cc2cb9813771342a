use std::hint::black_box;
use std::sync::Arc;

use bencher::{LARGE_HEAD, NullConnection, SIMPLE_ENCODING, SMALL_HEAD, TestCase, WEIGHTED_ENCODING};
use bytes::BytesMut;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use http::StatusCode;
use micro_exchange::Request;
use micro_exchange::codec::{ChunkedEncoder, RequestHeadDecoder};
use micro_exchange::compress::requested_compression;
use serde_json::json;
use tokio_util::codec::{Decoder, Encoder};

fn benchmark_head_decoder(criterion: &mut Criterion) {
    let test_cases = vec![TestCase::small("small_head", SMALL_HEAD), TestCase::large("large_head", LARGE_HEAD)];
    let mut group = criterion.benchmark_group("head_decoder");

    for case in test_cases {
        let wire = case.input().wire();
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &wire, |b, wire| {
            let mut decoder = RequestHeadDecoder::new();
            b.iter_batched_ref(
                || BytesMut::from(wire.as_str()),
                |bytes_mut| {
                    let head = decoder.decode(bytes_mut).expect("input should be a valid request head").unwrap();
                    black_box(head);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_negotiation(criterion: &mut Criterion) {
    let test_cases = vec![TestCase::small("simple", SIMPLE_ENCODING), TestCase::large("weighted", WEIGHTED_ENCODING)];
    let mut group = criterion.benchmark_group("accept_encoding");

    for case in test_cases {
        group.bench_with_input(BenchmarkId::from_parameter(case.input().label()), &case, |b, case| {
            b.iter(|| black_box(requested_compression(Some(black_box(case.input().content())))));
        });
    }

    group.finish();
}

fn benchmark_chunk_framing(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("chunk_framing");

    for size in [64usize, 4096, 65536] {
        let payload = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            let mut encoder = ChunkedEncoder::new();
            encoder.start();
            let mut dst = BytesMut::with_capacity(size + 16);
            b.iter(|| {
                dst.clear();
                encoder.encode(&payload[..], &mut dst).expect("encoder should stay active");
                black_box(&dst);
            });
        });
    }

    group.finish();
}

fn benchmark_json_reply(criterion: &mut Criterion) {
    let connection = Arc::new(NullConnection);
    let mut group = criterion.benchmark_group("json_reply");

    for (name, accept_encoding) in [("identity", ""), ("gzip", "gzip")] {
        group.bench_function(name, |b| {
            b.iter_batched(
                || {
                    let mut decoder = RequestHeadDecoder::new();
                    let mut src = BytesMut::from(SMALL_HEAD.wire().as_str());
                    let head = decoder.decode(&mut src).expect("input should be a valid request head").unwrap();
                    let mut request = Request::from_request_head(Arc::clone(&connection) as _, head);
                    if !accept_encoding.is_empty() {
                        request.in_set("Accept-Encoding", accept_encoding);
                    }
                    request
                },
                |mut request| {
                    request.json_writer().serialize(&json!({"items": [1, 2, 3], "next": "/api/v1/items?offset=3"})).unwrap();
                    request.reply(StatusCode::OK).unwrap();
                    black_box(request.bytes_written());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(exchange, benchmark_head_decoder, benchmark_negotiation, benchmark_chunk_framing, benchmark_json_reply);
criterion_main!(exchange);
