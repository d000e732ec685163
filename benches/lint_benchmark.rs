// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use promlint::{
    lint::{lint_text, LintOutcome},
    parser::ExprParser,
    render::{JsonRenderer, Renderer, TemplateRenderer},
    PromqlParser,
};

const EXPRESSIONS: [(&str, &str); 5] = [
    ("scalar", "1.23"),
    ("selector", r#"http_requests_total{job="api", code=~"5.."}"#),
    ("aggregation", "sum by (job) (rate(http_requests_total[5m]))"),
    (
        "nested",
        "histogram_quantile(0.9, sum by (le) (rate(request_duration_seconds_bucket[5m]))) > bool 0.5",
    ),
    ("syntax_error", "sum(rate(http_requests_total[5m]) }"),
];

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("promql_parse");
    let parser = PromqlParser::new();

    for (name, text) in EXPRESSIONS.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| {
                let _ = parser.parse_expr(black_box(text));
            });
        });
    }

    group.finish();
}

fn lint_and_render_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lint_and_render");
    let parser = PromqlParser::new();
    let template = TemplateRenderer::from_source(
        "{{#if this}}{{#if Valid}}{{Type}}{{else}}{{ErrorText}}{{/if}}{{/if}}",
    )
    .unwrap();
    let renderers: [(&str, &dyn Renderer); 2] = [("html", &template), ("json", &JsonRenderer)];

    for (name, renderer) in renderers.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), renderer, |b, renderer| {
            b.iter(|| {
                for (_, text) in EXPRESSIONS.iter() {
                    if let LintOutcome::Render(result) = lint_text(&parser, black_box(text), 0) {
                        let mut out = Vec::with_capacity(256);
                        renderer.render(&mut out, Some(&result)).unwrap();
                        black_box(out);
                    }
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, parse_benchmark, lint_and_render_benchmark);
criterion_main!(benches);
