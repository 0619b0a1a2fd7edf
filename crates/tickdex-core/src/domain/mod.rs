//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Tag`] | Validated catalog tag (`@indexes`, `@products`, ...) |
//! | [`AggregationWindow`] | Half-open `[start, end)` query window |
//! | [`IndexValue`] | Computed index value with optional breakdown |
//! | [`ConstituentValue`] | Latest value of one constituent |
//! | [`Product`] | Reference instrument used by the seed fixture |

mod dow_jones;
mod index;
mod tag;
mod window;

pub use dow_jones::{dow_jones_products, Product, DOW_JONES_INDEX};
pub use index::{ConstituentValue, IndexValue};
pub use tag::Tag;
pub use window::{format_rfc3339, truncate_to_micros, AggregationWindow, DEFAULT_WINDOW_SPAN};
