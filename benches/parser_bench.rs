//! Benchmarks for the table parser and the filter/sort pipeline.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use portmon::{FilterCriteria, RecordParser, RecordPipeline};

const HEADER: &str = "Active Internet connections (servers and established)
Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name
";

/// Sample data lines for benchmarking.
const SAMPLE_LINES: &[&str] = &[
    "tcp        0      0 127.0.0.1:22            0.0.0.0:*               LISTEN      1234/sshd",
    "tcp        0      0 0.0.0.0:80              0.0.0.0:*               LISTEN      881/nginx: master",
    "tcp        0      0 10.0.0.5:22             10.0.0.9:51000          ESTABLISHED 4410/sshd: alice",
    "tcp        0      0 10.0.0.5:443            10.0.0.17:60122         TIME_WAIT   -",
    "tcp        0      0 10.0.0.5:5432           10.0.0.21:33410         CLOSE_WAIT  2001/postgres",
    "tcp6       0      0 :::8080                 :::*                    LISTEN      3100/java",
    "tcp6       0      0 ::1:631                 :::*                    LISTEN      77/cupsd",
    "tcp6       0      0 2001:db8::5:443         2001:db8::9:51811       ESTABLISHED 881/nginx: worker",
];

/// Build a table with `repeat` copies of the sample lines.
fn build_table(repeat: usize) -> String {
    let mut text = String::from(HEADER);
    for _ in 0..repeat {
        for line in SAMPLE_LINES {
            text.push_str(line);
            text.push('\n');
        }
    }
    text
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let parser = RecordParser::default();

    group.throughput(Throughput::Elements(1));
    group.bench_function("single_line", |b| {
        b.iter(|| parser.parse_line(black_box(SAMPLE_LINES[0])))
    });

    let table = build_table(125);
    group.throughput(Throughput::Elements((SAMPLE_LINES.len() * 125) as u64));
    group.bench_function("table_1000", |b| b.iter(|| parser.parse(black_box(&table))));

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    let records = RecordParser::default()
        .parse(&build_table(125))
        .expect("sample table parses");
    let default_view = RecordPipeline::new(FilterCriteria::default());
    let port_view = RecordPipeline::new(FilterCriteria::accept_all().with_ports("22, 443, 8080"));

    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("default_states", |b| {
        b.iter(|| default_view.run(black_box(&records)))
    });
    group.bench_function("port_filter", |b| {
        b.iter(|| port_view.run(black_box(&records)))
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_pipeline);
criterion_main!(benches);
