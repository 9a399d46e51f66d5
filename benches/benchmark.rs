//! パフォーマンスベンチマーク
//!
//! このモジュールは、xlsxreportクレートのパフォーマンスを測定するためのベンチマークを提供します。
//!
//! 実装するベンチマーク:
//! - マクロセルのパース
//! - 成長ブロックの展開（行数ごと）
//! - ネストしたブロックの展開
//! - ワークブック入力から命令ドキュメント出力までのコンパイル

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_xlsxwriter::Workbook;
use serde_json::{json, Value};
use std::io::Cursor;
use xlsxreport::{CompilerBuilder, JsonContext, MacroCell, OutputFormat, TemplateSheet};

/// 明細行テンプレート
fn line_template() -> TemplateSheet {
    TemplateSheet::new("Lines")
        .with_cell("A1", "$g.title$")
        .and_then(|s| s.with_cell("A3", "#lines.no#"))
        .and_then(|s| s.with_cell("B3", "#lines.sku#"))
        .and_then(|s| s.with_cell("C3", "#lines.qty#"))
        .and_then(|s| s.with_cell("D3", "#lines.price#~currency(JPY)"))
        .and_then(|s| s.with_cell("A5", "#grow#"))
        .and_then(|s| s.with_cell("D6", "$g.total$"))
        .unwrap()
}

fn line_data(count: usize) -> Value {
    let lines: Vec<Value> = (0..count)
        .map(|i| json!({"sku": format!("SKU-{:06}", i), "qty": i % 7 + 1, "price": i * 10}))
        .collect();
    json!({"g": {"title": "Bulk", "total": count}, "lines": lines})
}

/// マクロセルのパース速度
fn benchmark_macro_parse(c: &mut Criterion) {
    let texts = [
        "$g.title$",
        "#lines.sku#",
        "Total: $order.total | order.subtotal$ ($order.currency$)",
        "#customers.orders.lines.price#",
        "$node.@.id$",
    ];

    let mut group = c.benchmark_group("macro_parse");
    group.throughput(Throughput::Elements(texts.len() as u64));
    group.bench_function("parse_cells", |b| {
        b.iter(|| {
            for text in &texts {
                black_box(MacroCell::parse(black_box(text)).unwrap());
            }
        });
    });
    group.finish();
}

/// 成長ブロックの展開速度（行数ごと）
fn benchmark_grow_expansion(c: &mut Criterion) {
    let compiler = CompilerBuilder::new().build().unwrap();
    let document = compiler.parse_sheets(vec![line_template()]).unwrap();

    let mut group = c.benchmark_group("grow_expansion");
    for rows in [100usize, 1_000, 10_000] {
        let data = line_data(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| {
                let mut ctx = JsonContext::new(data.clone());
                let sheets = document
                    .apply(&mut ctx)
                    .collect::<Result<Vec<_>, _>>()
                    .unwrap();
                black_box(sheets)
            });
        });
    }
    group.finish();
}

/// 3階層ネストしたブロックの展開速度
fn benchmark_nested_expansion(c: &mut Criterion) {
    let sheet = TemplateSheet::new("Nested")
        .with_cell("A1", "#customers.name#")
        .and_then(|s| s.with_cell("B1", "#customers.orders.id#"))
        .and_then(|s| s.with_cell("C1", "#customers.orders.lines.sku#"))
        .and_then(|s| s.with_cell("A3", "#grow#"))
        .unwrap();
    let compiler = CompilerBuilder::new().build().unwrap();
    let document = compiler.parse_sheets(vec![sheet]).unwrap();

    let customers: Vec<Value> = (0..50)
        .map(|c| {
            let orders: Vec<Value> = (0..10)
                .map(|o| {
                    let lines: Vec<Value> =
                        (0..5).map(|l| json!({"sku": format!("{}-{}-{}", c, o, l)})).collect();
                    json!({"id": o, "lines": lines})
                })
                .collect();
            json!({"name": format!("customer-{}", c), "orders": orders})
        })
        .collect();
    let data = json!({ "customers": customers });

    let mut group = c.benchmark_group("nested_expansion");
    group.throughput(Throughput::Elements(50 * 10 * 5));
    group.bench_function("customers_orders_lines", |b| {
        b.iter(|| {
            let mut ctx = JsonContext::new(data.clone());
            let sheets = document
                .apply(&mut ctx)
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            black_box(sheets)
        });
    });
    group.finish();
}

/// ワークブック入力から命令ドキュメント出力までのコンパイル速度
fn benchmark_compile(c: &mut Criterion) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "$g.title$").unwrap();
    worksheet.write_string(2, 0, "#lines.no#").unwrap();
    worksheet.write_string(2, 1, "#lines.sku#").unwrap();
    worksheet.write_string(2, 2, "#lines.qty#").unwrap();
    worksheet.write_string(4, 0, "#grow#").unwrap();
    let template = workbook.save_to_buffer().unwrap();
    let data = line_data(1_000);

    let mut group = c.benchmark_group("compile");
    group.throughput(Throughput::Bytes(template.len() as u64));
    group.sample_size(20);

    for format in [OutputFormat::Json, OutputFormat::Xml] {
        let compiler = CompilerBuilder::new()
            .with_output_format(format)
            .build()
            .unwrap();
        let id = format!("{:?}", format).to_lowercase();
        group.bench_function(id, |b| {
            b.iter(|| {
                let mut ctx = JsonContext::new(data.clone());
                let mut output = Vec::new();
                compiler
                    .compile(Cursor::new(black_box(&template)), &mut ctx, &mut output)
                    .unwrap();
                black_box(output)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_macro_parse,
    benchmark_grow_expansion,
    benchmark_nested_expansion,
    benchmark_compile
);
criterion_main!(benches);
