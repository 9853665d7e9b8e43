//! Native transform benchmarks
//!
//! Measures one update cycle's worth of work with the built-in catalog stylesheet:
//! - Stylesheet compilation on its own
//! - Parse + transform + serialize over catalogs of 1, 10, 100 and 1000 books
//!
//! Run benchmarks: `cargo bench --bench transform`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::fmt::Write;
use std::hint::black_box;
use xsltui::xslt::XsltProcessor;
use xsltui_core::defaults::default_document;
use xsltui_core::{EditorId, NativeBackend, XmlEngine};

/// A catalog shaped like the default XML pane, with `count` books.
fn generate_catalog(count: usize) -> String {
    let mut xml = String::from("<catalog>\n");
    for i in 0..count {
        let _ = writeln!(
            xml,
            "  <book id=\"bk{i}\" year=\"{}\"><author>Author {i}</author><title>Title {}</title><price>{}.95</price></book>",
            2000 + i % 20,
            count - i,
            i % 50
        );
    }
    xml.push_str("</catalog>\n");
    xml
}

fn benchmark_compile(c: &mut Criterion) {
    let stylesheet = default_document(EditorId::Xslt);
    c.bench_function("compile_default_stylesheet", |b| {
        b.iter(|| XsltProcessor::compile(black_box(&stylesheet)).expect("Failed to compile stylesheet"))
    });
}

fn benchmark_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    let backend = NativeBackend::default();
    let stylesheet = default_document(EditorId::Xslt);

    for count in [1, 10, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        let xml = generate_catalog(count);

        group.bench_with_input(BenchmarkId::new("books", count), &xml, |b, xml| {
            b.iter(|| {
                let source = backend.parse(xml).into_document().expect("Failed to parse XML");
                let xslt = backend
                    .parse(&stylesheet)
                    .into_document()
                    .expect("Failed to parse stylesheet");
                backend.transform(&source, &xslt).expect("Failed to transform")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_compile, benchmark_transform);
criterion_main!(benches);
