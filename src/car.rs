// Vehicle inventory: car categories, physical cars and the booking periods they carry

use crate::error::ReservationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

// A closed time interval [start, end] with start strictly before end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

// Unvalidated wire shape, checked on deserialization
#[derive(Deserialize)]
struct RawPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawPeriod> for Period {
    type Error = ReservationError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Period::new(raw.start, raw.end)
    }
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ReservationError> {
        if start >= end {
            return Err(ReservationError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    // Closed-interval test: touching endpoints count as an overlap
    pub fn overlaps(&self, other: &Period) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    // Billable days, any started day is charged in full
    pub fn days(&self) -> u32 {
        let seconds = (self.end - self.start).num_seconds();
        let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
        days.max(1) as u32
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} - {}]",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

// A category of vehicle sharing seats, trunk space, pricing and smoking policy
// Immutable once loaded and shared by every car of the type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarType {
    name: String,
    seats: u32,
    trunk_space: f32,
    rental_price_per_day: f64,
    smoking_allowed: bool,
}

impl CarType {
    pub fn new(
        name: impl Into<String>,
        seats: u32,
        trunk_space: f32,
        rental_price_per_day: f64,
        smoking_allowed: bool,
    ) -> Self {
        Self {
            name: name.into(),
            seats,
            trunk_space,
            rental_price_per_day,
            smoking_allowed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seats(&self) -> u32 {
        self.seats
    }

    pub fn trunk_space(&self) -> f32 {
        self.trunk_space
    }

    pub fn rental_price_per_day(&self) -> f64 {
        self.rental_price_per_day
    }

    pub fn is_smoking_allowed(&self) -> bool {
        self.smoking_allowed
    }

    // Rate times billable days
    pub fn price_for(&self, period: &Period) -> f64 {
        self.rental_price_per_day * f64::from(period.days())
    }
}

impl fmt::Display for CarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (seats: {}, trunk: {:.1}, rate: {:.2}/day, smoking: {})",
            self.name,
            self.seats,
            self.trunk_space,
            self.rental_price_per_day,
            if self.smoking_allowed { "yes" } else { "no" }
        )
    }
}

// One physical vehicle and the periods it has been booked for
#[derive(Debug, Clone)]
pub struct Car {
    id: u32,
    car_type: Arc<CarType>,
    bookings: Vec<Period>,
}

impl Car {
    pub(crate) fn new(id: u32, car_type: Arc<CarType>) -> Self {
        Self {
            id,
            car_type,
            bookings: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn car_type(&self) -> &Arc<CarType> {
        &self.car_type
    }

    pub fn bookings(&self) -> &[Period] {
        &self.bookings
    }

    pub fn is_available(&self, period: &Period) -> bool {
        !self.bookings.iter().any(|booked| booked.overlaps(period))
    }

    // Callers must check availability under the same lock; a clash here is a bug
    pub(crate) fn book(&mut self, period: Period) {
        debug_assert!(
            self.is_available(&period),
            "car {} double-booked for {}",
            self.id,
            period
        );
        self.bookings.push(period);
    }
}
