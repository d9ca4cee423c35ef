use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::HashSet, fmt, sync::Mutex};

/// An item or currency code, e.g. `BTC` or `USD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Asset(&'static str);

impl<'de> Deserialize<'de> for Asset {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Asset::new)
    }
}

impl Asset {
    // Flyweight pattern
    // Interning the code as a static str keeps Asset Copy and comparison
    // cheap. Leaks memory once per distinct code.
    pub fn new<R: AsRef<str>>(code: R) -> Self {
        static SET: Lazy<Mutex<HashSet<&'static str>>> = Lazy::new(|| Mutex::new(HashSet::new()));
        let mut set = SET.lock().unwrap();
        if !set.contains(code.as_ref()) {
            let leaked: &'static str = Box::leak(code.as_ref().to_owned().into_boxed_str());
            set.insert(leaked);
        }

        Asset(set.get(code.as_ref()).unwrap())
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tells a trade source which trades to stream: one item/currency pair,
/// optionally restricted to a closed `[start, end]` window in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub item: Asset,
    pub currency: Asset,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl Selector {
    pub fn pair<R: AsRef<str>>(item: R, currency: R) -> Self {
        Selector {
            item: Asset::new(item),
            currency: Asset::new(currency),
            start: None,
            end: None,
        }
    }

    pub fn between(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.item, self.currency)
    }
}
