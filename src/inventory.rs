// Inventory loading: turns a comma-separated fleet description into car types and cars
//
// Each non-comment line reads: name,seats,trunk_space,price_per_day,smoking_allowed,count

use crate::car::{Car, CarType};
use crate::error::LoadError;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

const FIELD_COUNT: usize = 6;

// Upper bound on cars across the whole file, ids stay below it
pub const MAX_FLEET_SIZE: u32 = 1_000_000;

// The loaded fleet: car types in file order, each with its cars, ids assigned from 0
//
// Only the loader builds one, so names are unique and ids are unique and ascending.
#[derive(Debug, Clone)]
pub struct Inventory {
    fleet: Vec<(Arc<CarType>, Vec<Car>)>,
}

impl Inventory {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading inventory");
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut fleet = Vec::new();
        let mut seen = HashSet::new();
        let mut next_id: u32 = 0;

        for result in csv_reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            let (car_type, count) = parse_record(&record, line)?;

            if !seen.insert(car_type.name().to_string()) {
                return Err(LoadError::DuplicateCarType {
                    line,
                    name: car_type.name().to_string(),
                });
            }

            debug!(%car_type, count, "Loaded car type");

            let first_id = next_id;
            next_id = next_id
                .checked_add(count)
                .filter(|&end| end <= MAX_FLEET_SIZE)
                .ok_or_else(|| invalid(line, "car count", &record[5]))?;

            let car_type = Arc::new(car_type);
            let cars: Vec<Car> = (first_id..next_id)
                .map(|id| Car::new(id, Arc::clone(&car_type)))
                .collect();
            fleet.push((car_type, cars));
        }

        if fleet.is_empty() {
            return Err(LoadError::Empty);
        }

        let inventory = Inventory { fleet };
        info!(
            car_types = inventory.fleet.len(),
            cars = inventory.car_count(),
            "Inventory loaded"
        );
        Ok(inventory)
    }

    pub fn car_types(&self) -> impl Iterator<Item = &Arc<CarType>> {
        self.fleet.iter().map(|(car_type, _)| car_type)
    }

    pub fn cars(&self) -> impl Iterator<Item = &Car> {
        self.fleet.iter().flat_map(|(_, cars)| cars.iter())
    }

    pub fn car_count(&self) -> usize {
        self.fleet.iter().map(|(_, cars)| cars.len()).sum()
    }

    pub(crate) fn into_fleet(self) -> Vec<(Arc<CarType>, Vec<Car>)> {
        self.fleet
    }
}

fn parse_record(record: &StringRecord, line: u64) -> Result<(CarType, u32), LoadError> {
    if record.len() != FIELD_COUNT {
        return Err(LoadError::FieldCount {
            line,
            found: record.len(),
        });
    }

    let name = &record[0];
    if name.is_empty() {
        return Err(invalid(line, "name", name));
    }

    let seats: u32 = parse_field(&record[1], line, "seat count")?;
    if seats == 0 {
        return Err(invalid(line, "seat count", &record[1]));
    }

    let trunk_space: f32 = parse_field(&record[2], line, "trunk space")?;
    if !trunk_space.is_finite() || trunk_space < 0.0 {
        return Err(invalid(line, "trunk space", &record[2]));
    }

    let price: f64 = parse_field(&record[3], line, "price per day")?;
    if !price.is_finite() || price <= 0.0 {
        return Err(invalid(line, "price per day", &record[3]));
    }

    let smoking_allowed = parse_bool(&record[4], line)?;
    let count: u32 = parse_field(&record[5], line, "car count")?;

    Ok((
        CarType::new(name, seats, trunk_space, price, smoking_allowed),
        count,
    ))
}

fn parse_field<T: FromStr>(value: &str, line: u64, field: &'static str) -> Result<T, LoadError> {
    value.parse().map_err(|_| invalid(line, field, value))
}

// Only the two literal spellings are accepted, in any case
fn parse_bool(value: &str, line: u64) -> Result<bool, LoadError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid(line, "smoking flag", value))
    }
}

fn invalid(line: u64, field: &'static str, value: &str) -> LoadError {
    LoadError::InvalidField {
        line,
        field,
        value: value.to_string(),
    }
}

// A small fleet used by tests and the benchmark
pub const SAMPLE_INVENTORY: &str = "\
# name,seats,trunk,price,smoking,count
Compact,4,12.5,40.0,false,3
Economy,4,14.0,20.0,false,2
Premium,5,20.0,90.0,true,1
Minivan,7,30.0,75.0,false,0
";
