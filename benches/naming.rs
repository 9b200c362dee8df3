use std::hint::black_box;
use std::path::Path;

use criterion::{Criterion, criterion_group, criterion_main};

use fits_organizer::fits::{encode_header, parse_header};
use fits_organizer::organize::{
    MetadataRecord, OrganizeOptions, build_file_name, build_folder_name, build_key, extract_sequence_suffix, sanitize,
};

fn light_record() -> MetadataRecord {
    MetadataRecord::new()
        .with("OBJECT", "NGC 7000 / North America")
        .with("TELESCOP", "ASA10")
        .with("DATE-LOC", "2025-06-14T23:10:00.115")
        .with("FOCALLEN", 950_i64)
        .with("EXPOSURE", 180.0)
        .with("GAIN", 200_i64)
        .with("CCD-TEMP", -9.8)
        .with("CAMERAID", "ZWOptical_ZWO ASI2600MC-Pro")
        .with("FILTER", "Ha 7nm")
        .with("IMAGETYP", "Light Frame")
}

fn bench_sanitize(c: &mut Criterion) {
    let inputs = [
        "M 51",
        "  NGC 7000 / North America ",
        "\"quoted\" value: with|bad*chars?",
        "Ångström   Ω",
        "",
    ];
    c.bench_function("sanitize", |b| {
        b.iter(|| {
            for input in &inputs {
                black_box(sanitize(black_box(input)));
            }
        });
    });
}

fn bench_names(c: &mut Criterion) {
    let record = light_record();
    let options = OrganizeOptions::default();

    c.bench_function("build_key_and_folder_name", |b| {
        b.iter(|| {
            let (_, key) = build_key(black_box(&record), &options);
            black_box(build_folder_name(&key));
        });
    });

    c.bench_function("build_file_name", |b| {
        b.iter(|| black_box(build_file_name(black_box(&record), Some("0007"), &options)));
    });
}

fn bench_sequence(c: &mut Criterion) {
    let paths = [
        Path::new("Light_M51_180.0s_Bin1_0007.fits"),
        Path::new("LIGHT_2025-06-14_e180_g200_t-9.8_M-51_0007_1.fits"),
        Path::new("flat.fits"),
    ];
    c.bench_function("extract_sequence_suffix", |b| {
        b.iter(|| {
            for path in &paths {
                black_box(extract_sequence_suffix(black_box(path)));
            }
        });
    });
}

fn bench_header(c: &mut Criterion) {
    let bytes = encode_header(&light_record());
    let path = Path::new("bench.fits");
    c.bench_function("parse_header", |b| {
        b.iter(|| black_box(parse_header(black_box(bytes.as_slice()), path)));
    });
}

criterion_group!(benches, bench_sanitize, bench_names, bench_sequence, bench_header);
criterion_main!(benches);
