/// Name of the composite index created by the seed fixture.
pub const DOW_JONES_INDEX: &str = "DJIA";

/// Reference instrument: opening price and random-walk amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Product {
    pub name: &'static str,
    pub initial: f64,
    pub amplitude: f64,
}

const fn product(name: &'static str, initial: f64, amplitude: f64) -> Product {
    Product {
        name,
        initial,
        amplitude,
    }
}

const DOW_JONES: [Product; 30] = [
    product("MMM", 190.0, 1.0),
    product("AXP", 80.0, 1.1),
    product("AAPL", 139.0, 1.5),
    product("BA", 183.0, 0.2),
    product("CAT", 95.0, 0.3),
    product("CVX", 114.0, 0.8),
    product("CSCO", 35.0, 0.2),
    product("KO", 43.0, 0.01),
    product("DD", 79.7, 0.2),
    product("XOM", 83.3, 1.0),
    product("GE", 30.0, 0.1),
    product("GS", 251.0, 1.0),
    product("HD", 147.5, 1.0),
    product("IBM", 180.0, 1.5),
    product("INTC", 36.0, 0.01),
    product("JNJ", 124.0, 1.0),
    product("JPM", 92.0, 1.0),
    product("MCD", 128.0, 1.5),
    product("MRK", 66.0, 1.0),
    product("MSFT", 64.0, 1.5),
    product("NKE", 57.8, 1.6),
    product("PFE", 64.0, 1.0),
    product("PG", 91.0, 1.0),
    product("TRV", 124.0, 1.5),
    product("UNH", 168.0, 2.0),
    product("UTX", 112.0, 1.0),
    product("VZ", 50.0, 0.5),
    product("V", 88.53, 0.1),
    product("WMT", 70.76, 0.1),
    product("DIS", 110.0, 1.0),
];

/// The thirty Dow Jones Industrial Average constituents.
pub fn dow_jones_products() -> &'static [Product] {
    &DOW_JONES
}
