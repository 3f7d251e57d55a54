use indexmap::IndexMap;

/// Key under which a currency's EUR rate is reported, e.g. `USDtoEUR`.
pub fn rate_key(currency: &str) -> String {
    format!("{}toEUR", currency)
}

/// Resolved `<CCY>toEUR` rates for one run, in the order they were fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeRateSet {
    rates: IndexMap<String, f64>,
}

impl ExchangeRateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the rate for `currency`. A repeated key keeps its original position.
    pub fn insert(&mut self, currency: &str, rate: f64) {
        self.rates.insert(rate_key(currency), rate);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.rates.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(key, rate)| (key.as_str(), *rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.rates.contains_key(key)
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_insertion_order() {
        let mut rates = ExchangeRateSet::new();
        rates.insert("USD", 1.0812);
        rates.insert("GBP", 0.8551);
        rates.insert("CHF", 0.9563);

        let keys: Vec<&str> = rates.keys().collect();
        assert_eq!(keys, vec!["USDtoEUR", "GBPtoEUR", "CHFtoEUR"]);
        assert_eq!(rates.len(), 3);
    }

    #[test]
    fn reinserting_keeps_position() {
        let mut rates = ExchangeRateSet::new();
        rates.insert("USD", 1.0);
        rates.insert("GBP", 0.85);
        rates.insert("USD", 1.08);

        assert_eq!(rates.len(), 2);
        assert_eq!(rates.get("USDtoEUR"), Some(1.08));
        let pairs: Vec<(&str, f64)> = rates.iter().collect();
        assert_eq!(pairs, vec![("USDtoEUR", 1.08), ("GBPtoEUR", 0.85)]);
    }

    #[test]
    fn missing_key() {
        let rates = ExchangeRateSet::new();
        assert!(rates.is_empty());
        assert!(!rates.contains_key("JPYtoEUR"));
        assert_eq!(rates.get("JPYtoEUR"), None);
    }
}
