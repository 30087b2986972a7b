// Reservation engine for a single rental company
// Serves availability checks, quotes, confirmations and lookups to many concurrent callers

use crate::car::{Car, CarType, Period};
use crate::error::{LoadError, ReservationError};
use crate::inventory::Inventory;
use crate::quote::{Quote, Reservation, ReservationConstraints};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

// Live counters, updated lock-free from any worker
#[derive(Debug, Default)]
pub struct EngineStats {
    pub quotes_issued: AtomicUsize,
    pub quotes_refused: AtomicUsize,
    pub reservations_confirmed: AtomicUsize,
    pub confirmations_refused: AtomicUsize,
}

// Point-in-time copy of the counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineStatsReport {
    pub quotes_issued: usize,
    pub quotes_refused: usize,
    pub reservations_confirmed: usize,
    pub confirmations_refused: usize,
}

// Operations a company exposes to its callers
pub trait ReservationEngine: Send + Sync + 'static {
    // Company name the engine is registered under
    fn name(&self) -> &str;

    // Names of car types with at least one free car over the period, one per line
    fn available_car_types_string(&self, period: &Period) -> String;

    // Price a request without setting any car aside
    fn create_quote(
        &self,
        constraints: &ReservationConstraints,
        client_name: &str,
    ) -> Result<Quote, ReservationError>;

    // Turn a quote into a reservation on a concrete car, if one is still free
    fn confirm_quote(&self, quote: &Quote) -> Result<Reservation, ReservationError>;

    // All reservations made by a client, oldest first
    fn reservations_by(&self, client_name: &str) -> Vec<Reservation>;

    // Number of reservations held on cars of the given type
    fn reservation_count_for_car_type(&self, car_type: &str) -> usize;
}

// Cars of one type behind a single lock
//
// The lock is the unit of mutual exclusion for confirmations: checking for a free car,
// booking it and indexing the reservation all happen under one write guard.
struct CarTypePool {
    car_type: Arc<CarType>,
    cars: RwLock<Vec<Car>>,
}

impl CarTypePool {
    fn has_free_car(&self, period: &Period) -> bool {
        self.cars.read().iter().any(|car| car.is_available(period))
    }
}

pub struct CarRentalCompany {
    name: String,
    // Insertion order of the inventory, which fixes the listing order
    pools: Vec<CarTypePool>,
    pool_index: HashMap<String, usize>,
    // Secondary view over the bookings, written only while a pool's write lock is held
    reservations_by_client: DashMap<String, Vec<Reservation>>,
    stats: EngineStats,
}

impl CarRentalCompany {
    pub fn new(name: impl Into<String>, inventory: Inventory) -> Self {
        let name = name.into();
        let fleet = inventory.into_fleet();
        let mut pools = Vec::with_capacity(fleet.len());
        let mut pool_index = HashMap::with_capacity(fleet.len());

        // Loader output: unique names, cars already in ascending id order
        for (car_type, cars) in fleet {
            pool_index.insert(car_type.name().to_string(), pools.len());
            pools.push(CarTypePool {
                car_type,
                cars: RwLock::new(cars),
            });
        }

        info!(
            company = %name,
            car_types = pools.len(),
            cars = pools.iter().map(|p| p.cars.read().len()).sum::<usize>(),
            "Company ready"
        );

        Self {
            name,
            pools,
            pool_index,
            reservations_by_client: DashMap::new(),
            stats: EngineStats::default(),
        }
    }

    // Load inventory from disk; a malformed file never yields a company
    pub fn from_inventory_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, LoadError> {
        let inventory = Inventory::from_path(path)?;
        Ok(Self::new(name, inventory))
    }

    fn pool(&self, car_type: &str) -> Result<&CarTypePool, ReservationError> {
        self.pool_index
            .get(car_type)
            .map(|&idx| &self.pools[idx])
            .ok_or_else(|| ReservationError::UnknownCarType(car_type.to_string()))
    }

    // Every car type, including ones without cars, in inventory order
    pub fn car_types(&self) -> Vec<Arc<CarType>> {
        self.pools.iter().map(|p| Arc::clone(&p.car_type)).collect()
    }

    pub fn car_type(&self, name: &str) -> Result<Arc<CarType>, ReservationError> {
        self.pool(name).map(|p| Arc::clone(&p.car_type))
    }

    pub fn car_count(&self) -> usize {
        self.pools.iter().map(|p| p.cars.read().len()).sum()
    }

    pub fn is_available(&self, car_type: &str, period: &Period) -> Result<bool, ReservationError> {
        Ok(self.pool(car_type)?.has_free_car(period))
    }

    // Car types with a free car over the period, optionally narrowed to one name
    //
    // An unknown name simply matches nothing.
    pub fn available_car_types(
        &self,
        period: &Period,
        car_type: Option<&str>,
    ) -> Vec<Arc<CarType>> {
        self.pools
            .iter()
            .filter(|pool| car_type.map_or(true, |name| pool.car_type.name() == name))
            .filter(|pool| pool.has_free_car(period))
            .map(|pool| Arc::clone(&pool.car_type))
            .collect()
    }

    // Booked periods of one car, for inspection
    pub fn bookings_for_car(&self, car_id: u32) -> Option<Vec<Period>> {
        self.pools.iter().find_map(|pool| {
            pool.cars
                .read()
                .iter()
                .find(|car| car.id() == car_id)
                .map(|car| car.bookings().to_vec())
        })
    }

    pub fn stats(&self) -> EngineStatsReport {
        EngineStatsReport {
            quotes_issued: self.stats.quotes_issued.load(Ordering::SeqCst),
            quotes_refused: self.stats.quotes_refused.load(Ordering::SeqCst),
            reservations_confirmed: self.stats.reservations_confirmed.load(Ordering::SeqCst),
            confirmations_refused: self.stats.confirmations_refused.load(Ordering::SeqCst),
        }
    }
}

impl ReservationEngine for CarRentalCompany {
    fn name(&self) -> &str {
        &self.name
    }

    fn available_car_types_string(&self, period: &Period) -> String {
        self.available_car_types(period, None)
            .iter()
            .map(|car_type| car_type.name())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn create_quote(
        &self,
        constraints: &ReservationConstraints,
        client_name: &str,
    ) -> Result<Quote, ReservationError> {
        let pool = self.pool(constraints.car_type())?;
        let period = constraints.period();

        if !pool.has_free_car(period) {
            self.stats.quotes_refused.fetch_add(1, Ordering::SeqCst);
            debug!(client = client_name, car_type = constraints.car_type(), %period, "Quote refused");
            return Err(ReservationError::NoAvailability {
                car_type: constraints.car_type().to_string(),
                period: *period,
            });
        }

        let price = pool.car_type.price_for(period);
        let quote = Quote::new(client_name, constraints, price);
        self.stats.quotes_issued.fetch_add(1, Ordering::SeqCst);
        debug!(client = client_name, car_type = constraints.car_type(), %period, price, "Quote issued");

        Ok(quote)
    }

    fn confirm_quote(&self, quote: &Quote) -> Result<Reservation, ReservationError> {
        let pool = self.pool(quote.car_type())?;
        let period = quote.period();

        // Held until the reservation is indexed
        let mut cars = pool.cars.write();

        // Cars are kept in id order, so the first free one has the lowest id
        let Some(car) = cars.iter_mut().find(|car| car.is_available(period)) else {
            self.stats.confirmations_refused.fetch_add(1, Ordering::SeqCst);
            info!(client = quote.client_name(), car_type = quote.car_type(), %period, "Confirmation refused, no car left");
            return Err(ReservationError::NoAvailability {
                car_type: quote.car_type().to_string(),
                period: *period,
            });
        };

        car.book(*period);
        // Priced from the company's own rate, never from what the caller sent
        let price = pool.car_type.price_for(period);
        let reservation = Reservation::new(quote, car.id(), price);

        self.reservations_by_client
            .entry(quote.client_name().to_string())
            .or_default()
            .push(reservation.clone());

        drop(cars);

        self.stats
            .reservations_confirmed
            .fetch_add(1, Ordering::SeqCst);
        info!(
            client = reservation.client_name(),
            car_type = reservation.car_type(),
            car_id = reservation.car_id(),
            price = reservation.price(),
            "Reservation confirmed"
        );

        Ok(reservation)
    }

    fn reservations_by(&self, client_name: &str) -> Vec<Reservation> {
        self.reservations_by_client
            .get(client_name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn reservation_count_for_car_type(&self, car_type: &str) -> usize {
        self.pool(car_type)
            .map(|pool| pool.cars.read().iter().map(|car| car.bookings().len()).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::SAMPLE_INVENTORY;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, 0, 0, 0).unwrap()
    }

    fn period(from: u32, to: u32) -> Period {
        Period::new(day(from), day(to)).unwrap()
    }

    fn constraints(from: u32, to: u32, car_type: &str) -> ReservationConstraints {
        ReservationConstraints::for_period(period(from, to), car_type)
    }

    fn sample_company() -> CarRentalCompany {
        let inventory = Inventory::from_reader(SAMPLE_INVENTORY.as_bytes()).unwrap();
        CarRentalCompany::new("Hertz", inventory)
    }

    fn economy_only(cars: usize) -> CarRentalCompany {
        let data = format!("economy,4,14.0,20.0,false,{}\n", cars);
        let inventory = Inventory::from_reader(data.as_bytes()).unwrap();
        CarRentalCompany::new("Hertz", inventory)
    }

    // Every car's booking set must stay pairwise disjoint
    fn assert_no_double_bookings(company: &CarRentalCompany) {
        for pool in &company.pools {
            for car in pool.cars.read().iter() {
                let bookings = car.bookings();
                for (i, a) in bookings.iter().enumerate() {
                    for b in &bookings[i + 1..] {
                        assert!(
                            !a.overlaps(b),
                            "Car {} double-booked: {} and {}",
                            car.id(),
                            a,
                            b
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_economy_scenario() {
        let company = economy_only(2);

        assert_eq!(company.available_car_types_string(&period(1, 3)), "economy");

        let quote_a = company.create_quote(&constraints(1, 3, "economy"), "A").unwrap();
        assert_eq!(quote_a.price(), 40.0);
        let quote_b = company.create_quote(&constraints(1, 3, "economy"), "B").unwrap();
        let quote_c = company.create_quote(&constraints(1, 3, "economy"), "C").unwrap();

        let reservation_a = company.confirm_quote(&quote_a).unwrap();
        assert_eq!(reservation_a.car_id(), 0);
        assert_eq!(reservation_a.price(), 40.0);

        let reservation_b = company.confirm_quote(&quote_b).unwrap();
        assert_eq!(reservation_b.car_id(), 1);

        let refused = company.confirm_quote(&quote_c);
        assert!(matches!(
            refused,
            Err(ReservationError::NoAvailability { ref car_type, .. }) if car_type == "economy"
        ));

        assert_eq!(company.available_car_types_string(&period(1, 3)), "");
        assert_eq!(company.reservation_count_for_car_type("economy"), 2);
    }

    #[test]
    fn test_available_car_types_in_inventory_order() {
        let company = sample_company();

        // Minivan has no cars and never shows up
        assert_eq!(
            company.available_car_types_string(&period(1, 3)),
            "Compact\nEconomy\nPremium"
        );

        let premium = company.create_quote(&constraints(1, 3, "Premium"), "A").unwrap();
        company.confirm_quote(&premium).unwrap();

        assert_eq!(
            company.available_car_types_string(&period(2, 5)),
            "Compact\nEconomy"
        );
        assert_eq!(
            company.available_car_types_string(&period(4, 6)),
            "Compact\nEconomy\nPremium"
        );
    }

    #[test]
    fn test_available_car_types_filter() {
        let company = sample_company();

        let only_economy = company.available_car_types(&period(1, 3), Some("Economy"));
        assert_eq!(only_economy.len(), 1);
        assert_eq!(only_economy[0].name(), "Economy");

        assert!(company
            .available_car_types(&period(1, 3), Some("Minivan"))
            .is_empty());
        assert!(company
            .available_car_types(&period(1, 3), Some("Spaceship"))
            .is_empty());
    }

    #[test]
    fn test_quote_is_not_binding() {
        let company = economy_only(1);

        let before = company.available_car_types_string(&period(1, 3));
        for client in ["A", "B", "C"] {
            company.create_quote(&constraints(1, 3, "economy"), client).unwrap();
        }

        assert_eq!(company.available_car_types_string(&period(1, 3)), before);
        assert_eq!(company.reservation_count_for_car_type("economy"), 0);
        assert_eq!(company.bookings_for_car(0), Some(vec![]));
        assert_eq!(company.stats().quotes_issued, 3);
    }

    #[test]
    fn test_quote_pricing_is_deterministic_and_linear() {
        let company = sample_company();

        let a = company.create_quote(&constraints(1, 3, "Compact"), "A").unwrap();
        let b = company.create_quote(&constraints(1, 3, "Compact"), "B").unwrap();
        assert_eq!(a.price(), b.price());

        let two_days = company.create_quote(&constraints(10, 12, "Compact"), "A").unwrap();
        let six_days = company.create_quote(&constraints(10, 16, "Compact"), "A").unwrap();
        assert_eq!(two_days.price(), 80.0);
        assert_eq!(six_days.price(), 3.0 * two_days.price());
    }

    #[test]
    fn test_quote_refused_when_fully_booked() {
        let company = economy_only(1);
        let quote = company.create_quote(&constraints(1, 5, "economy"), "A").unwrap();
        company.confirm_quote(&quote).unwrap();

        let result = company.create_quote(&constraints(4, 8, "economy"), "B");
        match result {
            Err(ReservationError::NoAvailability { car_type, period: p }) => {
                assert_eq!(car_type, "economy");
                assert_eq!(p, period(4, 8));
            }
            other => panic!("Expected no availability, got {:?}", other),
        }
        assert_eq!(company.stats().quotes_refused, 1);
    }

    #[test]
    fn test_unknown_car_type() {
        let company = sample_company();

        assert!(matches!(
            company.create_quote(&constraints(1, 3, "Spaceship"), "A"),
            Err(ReservationError::UnknownCarType(ref name)) if name == "Spaceship"
        ));
        assert!(matches!(
            company.car_type("Spaceship"),
            Err(ReservationError::UnknownCarType(_))
        ));
        assert!(matches!(
            company.is_available("Spaceship", &period(1, 3)),
            Err(ReservationError::UnknownCarType(_))
        ));
        assert_eq!(company.reservation_count_for_car_type("Spaceship"), 0);
    }

    #[test]
    fn test_confirming_quote_for_unknown_car_type() {
        let company = sample_company();
        let quote = company.create_quote(&constraints(1, 3, "Economy"), "A").unwrap();

        // A quote arriving over the wire can name any car type
        let mut wire = serde_json::to_value(&quote).unwrap();
        wire["car_type"] = serde_json::json!("Spaceship");
        let unknown: Quote = serde_json::from_value(wire).unwrap();

        let before = company.stats();
        assert!(matches!(
            company.confirm_quote(&unknown),
            Err(ReservationError::UnknownCarType(ref name)) if name == "Spaceship"
        ));
        assert_eq!(company.stats(), before);
        assert!(company.reservations_by("A").is_empty());
        assert_eq!(company.reservation_count_for_car_type("Economy"), 0);
    }

    #[test]
    fn test_confirmation_prices_from_the_car_type_rate() {
        let company = sample_company();
        let quote = company.create_quote(&constraints(1, 3, "Economy"), "A").unwrap();
        assert_eq!(quote.price(), 40.0);

        let mut wire = serde_json::to_value(&quote).unwrap();
        wire["price"] = serde_json::json!(1.0);
        let cheap: Quote = serde_json::from_value(wire).unwrap();

        let reservation = company.confirm_quote(&cheap).unwrap();
        assert_eq!(reservation.price(), 40.0);
        assert_eq!(company.reservations_by("A")[0].price(), 40.0);
    }

    #[test]
    fn test_every_car_id_maps_to_exactly_one_car() {
        let company = sample_company();
        let car_count = company.car_count() as u32;

        for id in 0..car_count {
            let holders = company
                .pools
                .iter()
                .map(|pool| pool.cars.read().iter().filter(|car| car.id() == id).count())
                .sum::<usize>();
            assert_eq!(holders, 1, "car {} held {} times", id, holders);
        }
        assert_eq!(company.bookings_for_car(car_count), None);

        // Each pool only holds cars of its own type, in id order
        for pool in &company.pools {
            let cars = pool.cars.read();
            assert!(cars.iter().all(|car| car.car_type() == &pool.car_type));
            assert!(cars.windows(2).all(|w| w[0].id() < w[1].id()));
        }
    }

    #[test]
    fn test_car_type_with_no_cars_is_never_quoted() {
        let company = sample_company();

        assert_eq!(company.car_type("Minivan").unwrap().seats(), 7);
        assert_eq!(company.car_types().len(), 4);
        assert_eq!(company.car_count(), 6);
        assert!(!company.is_available("Minivan", &period(1, 3)).unwrap());
        assert!(company.is_available("Compact", &period(1, 3)).unwrap());
        assert!(matches!(
            company.create_quote(&constraints(1, 3, "Minivan"), "A"),
            Err(ReservationError::NoAvailability { .. })
        ));
        assert_eq!(company.reservation_count_for_car_type("Minivan"), 0);
    }

    #[test]
    fn test_confirmation_picks_lowest_free_car_id() {
        let company = sample_company();

        // Compact cars are 0, 1 and 2
        let first = company.create_quote(&constraints(1, 3, "Compact"), "A").unwrap();
        assert_eq!(company.confirm_quote(&first).unwrap().car_id(), 0);

        let second = company.create_quote(&constraints(2, 4, "Compact"), "B").unwrap();
        assert_eq!(company.confirm_quote(&second).unwrap().car_id(), 1);

        // Car 0 is free again once the first booking is over
        let later = company.create_quote(&constraints(5, 7, "Compact"), "C").unwrap();
        assert_eq!(company.confirm_quote(&later).unwrap().car_id(), 0);

        assert_eq!(company.bookings_for_car(0).unwrap().len(), 2);
        assert_eq!(company.bookings_for_car(2), Some(vec![]));
        assert_eq!(company.bookings_for_car(99), None);
    }

    #[test]
    fn test_stale_quote_fails_after_last_car_taken() {
        let company = economy_only(1);

        let early = company.create_quote(&constraints(1, 3, "economy"), "A").unwrap();
        let late = company.create_quote(&constraints(2, 4, "economy"), "B").unwrap();

        company.confirm_quote(&early).unwrap();
        assert!(matches!(
            company.confirm_quote(&late),
            Err(ReservationError::NoAvailability { .. })
        ));

        let stats = company.stats();
        assert_eq!(stats.reservations_confirmed, 1);
        assert_eq!(stats.confirmations_refused, 1);
        assert!(company.reservations_by("B").is_empty());
    }

    #[test]
    fn test_lookup_consistency() {
        let company = sample_company();
        assert!(company.reservations_by("A").is_empty());

        let quote = company.create_quote(&constraints(1, 3, "Economy"), "A").unwrap();
        let before_count = company.reservation_count_for_car_type("Economy");
        let reservation = company.confirm_quote(&quote).unwrap();

        let by_a = company.reservations_by("A");
        assert_eq!(by_a, vec![reservation.clone()]);
        assert_eq!(
            company.reservation_count_for_car_type("Economy"),
            before_count + 1
        );

        let second = company.create_quote(&constraints(10, 12, "Premium"), "A").unwrap();
        let second = company.confirm_quote(&second).unwrap();
        assert_eq!(company.reservations_by("A"), vec![reservation, second]);
        assert_eq!(company.reservation_count_for_car_type("Economy"), 1);
        assert_eq!(company.reservation_count_for_car_type("Premium"), 1);
    }

    #[test]
    fn test_concurrent_confirmations_never_double_book() {
        let cars = 3;
        let threads_count = 16;
        let company = Arc::new(economy_only(cars));
        let barrier = Arc::new(Barrier::new(threads_count));

        let quotes: Vec<Quote> = (0..threads_count)
            .map(|i| {
                // Staggered but pairwise overlapping periods
                let from = 1 + (i % 3) as u32;
                company
                    .create_quote(&constraints(from, from + 5, "economy"), &format!("client{}", i))
                    .unwrap()
            })
            .collect();

        let mut handles = vec![];
        for quote in quotes {
            let company = Arc::clone(&company);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                company.confirm_quote(&quote)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(ReservationError::NoAvailability { .. })))
            .count();

        println!("Confirmed {} of {} concurrent quotes", succeeded, threads_count);

        assert_eq!(succeeded, cars);
        assert_eq!(refused, threads_count - cars);
        assert_eq!(company.reservation_count_for_car_type("economy"), cars);
        assert_no_double_bookings(&company);

        let mut car_ids: Vec<u32> = results
            .iter()
            .filter_map(|r| r.as_ref().ok().map(|res| res.car_id()))
            .collect();
        car_ids.sort_unstable();
        assert_eq!(car_ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_concurrent_mixed_workload_keeps_index_consistent() {
        let company = Arc::new(sample_company());
        let threads_count = 8;
        let operations_per_thread = 200;
        let car_types = ["Compact", "Economy", "Premium"];

        let mut handles = vec![];
        for i in 0..threads_count {
            let company = Arc::clone(&company);
            handles.push(thread::spawn(move || {
                let client = format!("client{}", i);
                for j in 0..operations_per_thread {
                    let from = 1 + ((i * 7 + j) % 25) as u32;
                    let request = constraints(from, from + 2, car_types[j % car_types.len()]);

                    if j % 4 == 0 {
                        // Readers run alongside the writers
                        let _ = company.available_car_types_string(request.period());
                        let _ = company.reservations_by(&client);
                        continue;
                    }

                    if let Ok(quote) = company.create_quote(&request, &client) {
                        let _ = company.confirm_quote(&quote);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_no_double_bookings(&company);

        // The client index and the per-car bookings describe the same reservations
        let indexed: usize = (0..threads_count)
            .map(|i| company.reservations_by(&format!("client{}", i)).len())
            .sum();
        let booked: usize = car_types
            .iter()
            .map(|t| company.reservation_count_for_car_type(t))
            .sum();
        assert_eq!(indexed, booked);
        assert_eq!(booked, company.stats().reservations_confirmed);

        for i in 0..threads_count {
            for reservation in company.reservations_by(&format!("client{}", i)) {
                let bookings = company.bookings_for_car(reservation.car_id()).unwrap();
                assert!(bookings.contains(reservation.period()));
            }
        }
    }
}
