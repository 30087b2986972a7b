// Request surface seen by remote callers, plus an in-process registry of companies
// Every call is handed to its own blocking worker so requests run independently

use crate::car::Period;
use crate::engine::ReservationEngine;
use crate::error::ReservationError;
use crate::quote::{Quote, Reservation, ReservationConstraints};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error("No company bound under '{0}'")]
    CompanyNotBound(String),

    #[error("Worker failed while handling {operation}: {message}")]
    WorkerFailed {
        operation: &'static str,
        message: String,
    },
}

impl ServiceError {
    // The engine-level cause, if there is one
    pub fn reservation_error(&self) -> Option<&ReservationError> {
        match self {
            ServiceError::Reservation(e) => Some(e),
            _ => None,
        }
    }
}

#[async_trait]
pub trait RentalService: Send + Sync + 'static {
    async fn available_car_types(&self, period: Period) -> Result<String, ServiceError>;

    async fn create_quote(
        &self,
        constraints: ReservationConstraints,
        client_name: String,
    ) -> Result<Quote, ServiceError>;

    async fn confirm_quote(&self, quote: Quote) -> Result<Reservation, ServiceError>;

    async fn reservations_by(&self, client_name: String) -> Result<Vec<Reservation>, ServiceError>;

    async fn reservation_count_for_car_type(&self, car_type: String)
        -> Result<usize, ServiceError>;
}

// Serves one engine from the local process
#[derive(Clone)]
pub struct LocalRentalService {
    engine: Arc<dyn ReservationEngine>,
}

impl LocalRentalService {
    pub fn new(engine: Arc<dyn ReservationEngine>) -> Self {
        Self { engine }
    }

    pub fn company_name(&self) -> &str {
        self.engine.name()
    }

    async fn dispatch<T, F>(&self, operation: &'static str, op: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ReservationEngine) -> T + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        debug!(company = engine.name(), operation, "Dispatching request");

        tokio::task::spawn_blocking(move || op(engine.as_ref()))
            .await
            .map_err(|e| ServiceError::WorkerFailed {
                operation,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl RentalService for LocalRentalService {
    async fn available_car_types(&self, period: Period) -> Result<String, ServiceError> {
        self.dispatch("available_car_types", move |engine| {
            engine.available_car_types_string(&period)
        })
        .await
    }

    async fn create_quote(
        &self,
        constraints: ReservationConstraints,
        client_name: String,
    ) -> Result<Quote, ServiceError> {
        Ok(self
            .dispatch("create_quote", move |engine| {
                engine.create_quote(&constraints, &client_name)
            })
            .await??)
    }

    async fn confirm_quote(&self, quote: Quote) -> Result<Reservation, ServiceError> {
        Ok(self
            .dispatch("confirm_quote", move |engine| engine.confirm_quote(&quote))
            .await??)
    }

    async fn reservations_by(&self, client_name: String) -> Result<Vec<Reservation>, ServiceError> {
        self.dispatch("reservations_by", move |engine| {
            engine.reservations_by(&client_name)
        })
        .await
    }

    async fn reservation_count_for_car_type(
        &self,
        car_type: String,
    ) -> Result<usize, ServiceError> {
        self.dispatch("reservation_count_for_car_type", move |engine| {
            engine.reservation_count_for_car_type(&car_type)
        })
        .await
    }
}

// Name-to-company lookup shared by every connection
#[derive(Default)]
pub struct CompanyRegistry {
    companies: DashMap<String, Arc<dyn ReservationEngine>>,
}

impl CompanyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Binds under the engine's own name, replacing any previous binding
    pub fn rebind(&self, engine: Arc<dyn ReservationEngine>) -> Option<Arc<dyn ReservationEngine>> {
        let name = engine.name().to_string();
        info!(company = %name, "Company bound");
        self.companies.insert(name, engine)
    }

    pub fn unbind(&self, name: &str) -> Option<Arc<dyn ReservationEngine>> {
        self.companies.remove(name).map(|(_, engine)| engine)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn ReservationEngine>, ServiceError> {
        self.companies
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ServiceError::CompanyNotBound(name.to_string()))
    }

    // A service handle for the named company
    pub fn connect(&self, name: &str) -> Result<LocalRentalService, ServiceError> {
        self.lookup(name).map(LocalRentalService::new)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.companies.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
