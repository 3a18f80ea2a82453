use std::collections::BTreeMap;

/// One measurement as reported by the benchmark runner.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub name: String,
    pub params: BTreeMap<String, String>,
    pub score: f64,
    pub score_unit: String,
}

impl BenchmarkResult {
    pub fn new(name: impl Into<String>, score: f64, score_unit: impl Into<String>) -> Self {
        BenchmarkResult {
            name: name.into(),
            params: BTreeMap::new(),
            score,
            score_unit: score_unit.into(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The last two segments of a qualified name, e.g. `Bench.measure` for
    /// `org.example.Bench.measure` or `init::double-checked` for `memo::init::double-checked`.
    ///
    /// `::` takes precedence over `.` as the separator.
    pub fn short_name(&self) -> &str {
        let sep = if self.name.contains("::") { "::" } else { "." };
        match self.name.rmatch_indices(sep).nth(1) {
            Some((idx, _)) => &self.name[idx + sep.len()..],
            None => &self.name,
        }
    }
}
