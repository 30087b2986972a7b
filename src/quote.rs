// Quotes are priced offers; reservations are quotes bound to a specific car

use crate::car::Period;
use crate::error::ReservationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// What a client asks for: a car type over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationConstraints {
    period: Period,
    car_type: String,
}

impl ReservationConstraints {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        car_type: impl Into<String>,
    ) -> Result<Self, ReservationError> {
        Ok(Self::for_period(Period::new(start, end)?, car_type))
    }

    pub fn for_period(period: Period, car_type: impl Into<String>) -> Self {
        Self {
            period,
            car_type: car_type.into(),
        }
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn car_type(&self) -> &str {
        &self.car_type
    }
}

// A non-binding, priced offer for a car type over a period
// Holding one sets no car aside, so confirming it may still fail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    client_name: String,
    period: Period,
    car_type: String,
    price: f64,
}

impl Quote {
    pub(crate) fn new(
        client_name: impl Into<String>,
        constraints: &ReservationConstraints,
        price: f64,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            period: constraints.period,
            car_type: constraints.car_type.clone(),
            price,
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn car_type(&self) -> &str {
        &self.car_type
    }

    pub fn price(&self) -> f64 {
        self.price
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Quote for {}: {} {} at {:.2}",
            self.client_name, self.car_type, self.period, self.price
        )
    }
}

// A confirmed quote, pinned to one car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    client_name: String,
    period: Period,
    car_type: String,
    car_id: u32,
    price: f64,
}

impl Reservation {
    pub(crate) fn new(quote: &Quote, car_id: u32, price: f64) -> Self {
        Self {
            client_name: quote.client_name.clone(),
            period: quote.period,
            car_type: quote.car_type.clone(),
            car_id,
            price,
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn car_type(&self) -> &str {
        &self.car_type
    }

    pub fn car_id(&self) -> u32 {
        self.car_id
    }

    pub fn price(&self) -> f64 {
        self.price
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reservation for {}: {} #{} {} at {:.2}",
            self.client_name, self.car_type, self.car_id, self.period, self.price
        )
    }
}
