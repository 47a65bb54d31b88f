use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polars::prelude::*;
use station_gapfill::{GapImputer, ImputeConfig};

/// `stations` stations with `days` days of hourly data each; every 17th
/// value is missing and each station loses a six-hour block per day
fn synthetic_table(stations: usize, days: usize) -> DataFrame {
    let rows = stations * days * 24;
    let mut tm = Vec::with_capacity(rows);
    let mut station = Vec::with_capacity(rows);
    let mut ta = Vec::with_capacity(rows);
    let mut hm = Vec::with_capacity(rows);

    for s in 0..stations {
        for day in 0..days {
            for hour in 0..24 {
                let i = (s * days + day) * 24 + hour;
                let month = day % 12 + 1;
                let year = 2000 + day / 12;
                tm.push(format!("{}-{:02}-15 {:02}:00", year, month, hour));
                station.push(format!("STN{:03}", s));

                let value = 15.0 + (hour as f64 / 24.0 * std::f64::consts::TAU).sin() * 5.0;
                let long_gap = (8..14).contains(&hour) && day % 5 == 0;
                ta.push((i % 17 != 0 && !long_gap).then_some(value));
                hm.push((i % 23 != 0).then_some(60.0 + value));
            }
        }
    }

    df!("tm" => tm, "stnNm" => station, "ta" => ta, "hm" => hm).unwrap()
}

fn bench_imputation(c: &mut Criterion) {
    let imputer = GapImputer::new(ImputeConfig::default()).unwrap();
    let mut group = c.benchmark_group("impute");
    group.sample_size(20);

    for &(stations, days) in &[(5, 60), (20, 120)] {
        let df = synthetic_table(stations, days);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", stations, days * 24)),
            &df,
            |b, df| b.iter(|| imputer.run(black_box(df)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_imputation);
criterion_main!(benches);
