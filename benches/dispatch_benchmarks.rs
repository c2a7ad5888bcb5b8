use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use crypto_provider::{
    Core, CoreCapabilities, CoreHandle, FunctionTable, OperationId, ParamRequest, ProviderConfig,
    constants::params,
    provider_init_with_config,
};

fn benchmark_negotiation(c: &mut Criterion) {
    let mut group = c.benchmark_group("negotiation");
    let core = Core::new();

    group.bench_function("with_self_check", |b| {
        b.iter(|| {
            let provider = core.load("fips").unwrap();
            black_box(provider.context().session_id());
        });
    });

    group.bench_function("without_self_check", |b| {
        let handle = CoreHandle::new("fips");
        b.iter(|| {
            let negotiated =
                provider_init_with_config(&handle, core.dispatch_table(), ProviderConfig::without_self_check())
                    .unwrap();
            black_box(negotiated.context.session_id());
        });
    });

    group.bench_function("capture_core_table", |b| {
        b.iter(|| black_box(CoreCapabilities::capture(core.dispatch_table())));
    });

    group.finish();
}

fn benchmark_introspection(c: &mut Criterion) {
    let mut group = c.benchmark_group("introspection");
    let provider = Core::new().load("fips").unwrap();

    group.bench_function("get_params", |b| {
        b.iter(|| {
            let mut requests = [
                ParamRequest::utf8_ptr(params::NAME),
                ParamRequest::utf8_ptr(params::VERSION),
                ParamRequest::integer(params::STATUS),
            ];
            provider.get_params(&mut requests).unwrap();
            black_box(requests);
        });
    });

    group.bench_function("query_cached", |b| {
        b.iter(|| black_box(provider.query(OperationId::Digest).unwrap()));
    });

    group.bench_function("fetch_digest", |b| {
        b.iter(|| black_box(provider.fetch_digest("SHA256", "fips=yes").unwrap()));
    });

    group.finish();
}

fn benchmark_fetched_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("fetched_algorithms");
    let provider = Core::new().load("fips").unwrap();
    let sha256 = provider.fetch_digest("SHA256", "").unwrap();
    let hmac = provider.fetch_mac("HMAC", "").unwrap();

    for size in [64usize, 1024, 16 * 1024] {
        let data = vec![0xa5u8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("sha256", size), &data, |b, data| {
            b.iter(|| black_box(sha256.digest(data).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("hmac_sha256", size), &data, |b, data| {
            b.iter(|| black_box(hmac.mac(&[], b"benchmark key", data).unwrap()));
        });
    }

    group.finish();
}

// Capture of a table holding only the terminator
fn benchmark_empty_table(c: &mut Criterion) {
    static EMPTY: [crypto_provider::CoreDispatch; 1] = [crypto_provider::CoreDispatch::End];
    c.bench_function("capture_empty_table", |b| {
        b.iter(|| black_box(CoreCapabilities::capture(FunctionTable::new(&EMPTY))));
    });
}

criterion_group!(
    benches,
    benchmark_negotiation,
    benchmark_introspection,
    benchmark_fetched_algorithms,
    benchmark_empty_table
);
criterion_main!(benches);
