use car_rental::inventory::Inventory;
use car_rental::{CarRentalCompany, Period, ReservationConstraints, ReservationEngine};
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{seq::SliceRandom, thread_rng, Rng};
use std::sync::Arc;
use std::thread;

// Mixed availability/quote/confirm load from several threads against fleets of different sizes
pub fn reservation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("car_rental_engine");
    let car_types = ["Compact", "Economy", "Premium", "Minivan"];

    for cars_per_type in [1u32, 10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(cars_per_type),
            cars_per_type,
            |b, &cars_per_type| {
                b.iter(|| {
                    let data: String = car_types
                        .iter()
                        .map(|name| format!("{},4,14.0,25.0,false,{}\n", name, cars_per_type))
                        .collect();
                    let inventory = Inventory::from_reader(data.as_bytes()).unwrap();
                    let company = Arc::new(CarRentalCompany::new("Hertz", inventory));

                    let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

                    let mut handles = vec![];
                    for t in 0..4 {
                        let company = Arc::clone(&company);

                        let handle = thread::spawn(move || {
                            let mut rng = thread_rng();
                            let client = format!("client{}", t);

                            for _ in 0..250 {
                                let start = base + Duration::days(rng.gen_range(0..300));
                                let end = start + Duration::days(rng.gen_range(1..8));
                                let period = Period::new(start, end).unwrap();
                                let car_type = car_types.choose(&mut rng).unwrap();

                                if rng.gen_bool(0.5) {
                                    // 50% reads
                                    let _ = company.available_car_types_string(&period);
                                } else {
                                    let request = ReservationConstraints::for_period(period, *car_type);
                                    if let Ok(quote) = company.create_quote(&request, &client) {
                                        let _ = company.confirm_quote(&quote);
                                    }
                                }
                            }
                        });

                        handles.push(handle);
                    }

                    for handle in handles {
                        handle.join().unwrap();
                    }

                    black_box(company.stats())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, reservation_benchmark);
criterion_main!(benches);
