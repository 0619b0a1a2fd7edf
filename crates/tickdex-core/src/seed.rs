//! Demo data for an empty warehouse.
//!
//! Creates the Dow Jones Industrial Average with its 30 constituents and fills
//! every product with a bounded random walk ending just before `end`.

use tickdex_warehouse::{SeriesPoint, Warehouse, WarehouseError};
use time::{Duration, OffsetDateTime};

use crate::store::VALUE_COLUMN;
use crate::{dow_jones_products, Product, Tag, DOW_JONES_INDEX};

/// Lowest price a random walk may reach.
const PRICE_FLOOR: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct SeedOptions {
    /// Points written per product.
    pub points: usize,
    /// Spacing between consecutive points.
    pub step: Duration,
    /// Timestamp the walk ends before.
    pub end: OffsetDateTime,
    /// Fixed random seed for reproducible data.
    pub seed: Option<u64>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            points: 60,
            step: Duration::MINUTE,
            end: OffsetDateTime::now_utc(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub index: String,
    pub products: usize,
    pub points: usize,
}

/// Create (or replace) an index series, tag it `@indexes` and register
/// `@indexes` under `@tags`.
pub fn create_index_series(warehouse: &Warehouse, name: &str) -> Result<(), WarehouseError> {
    warehouse.create_series(name, &[VALUE_COLUMN])?;
    warehouse.attach_tag(name, Tag::INDEXES)?;
    warehouse.attach_tag(Tag::INDEXES, Tag::TAGS)?;
    log::info!("index series {name} created");
    Ok(())
}

/// Create (or replace) a product series tagged `@products`.
pub fn create_product_series(warehouse: &Warehouse, name: &str) -> Result<(), WarehouseError> {
    warehouse.create_series(name, &[VALUE_COLUMN])?;
    warehouse.attach_tag(name, Tag::PRODUCTS)?;
    warehouse.attach_tag(Tag::PRODUCTS, Tag::TAGS)?;
    Ok(())
}

/// Seed the DJIA index and its products.
pub fn seed_dow_jones(
    warehouse: &Warehouse,
    options: &SeedOptions,
) -> Result<SeedReport, WarehouseError> {
    let mut rng = match options.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };

    let timeline = timeline(options)?;
    create_index_series(warehouse, DOW_JONES_INDEX)?;

    let mut written = 0;
    for product in dow_jones_products() {
        create_product_series(warehouse, product.name)?;
        let points = random_walk(product, &timeline, &mut rng);
        written += warehouse.ingest_points(product.name, VALUE_COLUMN, &points)?;
        log::debug!("seeded {} with {} points", product.name, points.len());
    }

    log::info!(
        "seeded {DOW_JONES_INDEX}: {} products, {written} points",
        dow_jones_products().len()
    );
    Ok(SeedReport {
        index: DOW_JONES_INDEX.to_string(),
        products: dow_jones_products().len(),
        points: written,
    })
}

/// Ascending timestamps `end - points * step, ..., end - step`.
fn timeline(options: &SeedOptions) -> Result<Vec<OffsetDateTime>, WarehouseError> {
    let step = if options.step.is_positive() {
        options.step
    } else {
        Duration::MINUTE
    };
    let count = i32::try_from(options.points).map_err(|_| {
        WarehouseError::Rejected(format!("cannot seed {} points per series", options.points))
    })?;

    (1..=count)
        .rev()
        .map(|offset| {
            step.checked_mul(offset)
                .and_then(|back| options.end.checked_sub(back))
                .ok_or_else(|| {
                    WarehouseError::Rejected(format!(
                        "{} points spaced {step} apart reach before the earliest timestamp",
                        options.points
                    ))
                })
        })
        .collect()
}

fn random_walk(
    product: &Product,
    timeline: &[OffsetDateTime],
    rng: &mut fastrand::Rng,
) -> Vec<SeriesPoint> {
    let mut value = product.initial;
    timeline
        .iter()
        .map(|ts| {
            let shift = (rng.f64() - 0.5) * product.amplitude;
            value = (value + shift).max(PRICE_FLOOR);
            SeriesPoint::new(*ts, value)
        })
        .collect()
}
