use axion_syntax::lexer::tokenize;
use axion_syntax::parser::parse;
use axion_syntax::{analyze, ProcessingOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// ============================================================================
// Test Data: Varying Complexity and Size
// ============================================================================

const TINY_AX: &str = "x = 42\n";

const SMALL_AX: &str = r#"fn add(a: int, b: int) -> int:
    return a + b

total = add(1, 2)
if 0 < total < 10:
    print(f"small {total}")
"#;

const MEDIUM_AX: &str = r#"enum Status: Active, Inactive, Pending

class Server < Base:
    host: str
    port: int = 8080

    fn address() -> str:
        return f"{host}:{port}"

    fn healthy(codes: list[int]) -> bool:
        for code in codes:
            unless 200 <= code < 300:
                return false
        return true

servers = [new Server('a.example.com'), new Server('b.example.com')]
ports = {s.port for s in servers if s.healthy([200, 204])}
label = status match:
    0 => 'idle'
    _ => 'busy'
"#;

fn generate_large_ax(functions: usize) -> String {
    let mut code = String::new();
    for i in 0..functions {
        code.push_str(&format!(
            concat!(
                "fn step_{i}(x, *rest, **options):\n",
                "    y = x * {i} + 1\n",
                "    while y > 0:\n",
                "        y -= 1\n",
                "        if y in (a or b):\n",
                "            break\n",
                "    return [y, {i}, x]\n\n",
            ),
            i = i
        ));
    }
    code
}

// ============================================================================
// Lexer Benchmarks
// ============================================================================

fn bench_lexer_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_by_size");
    let options = ProcessingOptions::default();
    for (name, source) in [("tiny", TINY_AX), ("small", SMALL_AX), ("medium", MEDIUM_AX)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| tokenize(black_box(src), &options))
        });
    }
    group.finish();
}

fn bench_lexer_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_function_scaling");
    let options = ProcessingOptions::default();
    for size in [10, 100, 1000] {
        let source = generate_large_ax(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, src| {
            b.iter(|| tokenize(black_box(src), &options))
        });
    }
    group.finish();
}

// ============================================================================
// Parser Benchmarks
// ============================================================================

fn bench_parser_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_by_size");
    let options = ProcessingOptions::default();
    for (name, source) in [("tiny", TINY_AX), ("small", SMALL_AX), ("medium", MEDIUM_AX)] {
        let tokens = tokenize(source, &options).tokens;
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &tokens, |b, tokens| {
            b.iter(|| parse(black_box(tokens), &options))
        });
    }
    group.finish();
}

fn bench_parser_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_function_scaling");
    let options = ProcessingOptions::default();
    for size in [10, 100, 1000] {
        let tokens = tokenize(&generate_large_ax(size), &options).tokens;
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &tokens, |b, tokens| {
            b.iter(|| parse(black_box(tokens), &options))
        });
    }
    group.finish();
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_e2e_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("e2e_analysis");
    for (name, source) in [("tiny", TINY_AX), ("small", SMALL_AX), ("medium", MEDIUM_AX)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| analyze(black_box(src), "benchmark.ax"))
        });
    }
    group.finish();
}

fn bench_e2e_with_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("e2e_with_json_serialization");
    for (name, source) in [("small", SMALL_AX), ("medium", MEDIUM_AX)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| {
                let result = analyze(black_box(src), "benchmark.ax");
                result.to_json().unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(lexer_benches, bench_lexer_sizes, bench_lexer_scaling);

criterion_group!(parser_benches, bench_parser_sizes, bench_parser_scaling);

criterion_group!(e2e_benches, bench_e2e_analysis, bench_e2e_with_serialization);

criterion_main!(lexer_benches, parser_benches, e2e_benches);
