//! Results files in the layout JMH writes with `-rf json`: an array of records with the
//! measured `primaryMetric` plus some metadata. Fields we don't model are ignored on input.

use std::{collections::BTreeMap, io::Read};

use serde::{Deserialize, Serialize};

use crate::{BenchmarkResult, Error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub benchmark: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    pub primary_metric: PrimaryMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryMetric {
    pub score: f64,
    pub score_unit: String,
    /// Keyed by percentile, e.g. `"99.0"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub score_percentiles: BTreeMap<String, f64>,
}

impl From<Record> for BenchmarkResult {
    fn from(record: Record) -> Self {
        BenchmarkResult {
            name: record.benchmark,
            params: record.params,
            score: record.primary_metric.score,
            score_unit: record.primary_metric.score_unit,
        }
    }
}

impl From<&BenchmarkResult> for Record {
    fn from(result: &BenchmarkResult) -> Self {
        Record {
            benchmark: result.name.clone(),
            mode: None,
            threads: None,
            params: result.params.clone(),
            primary_metric: PrimaryMetric {
                score: result.score,
                score_unit: result.score_unit.clone(),
                score_percentiles: BTreeMap::new(),
            },
        }
    }
}

pub fn parse_records(json: &str) -> Result<Vec<Record>, Error> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_records(reader: impl Read) -> Result<Vec<Record>, Error> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn parse_results(json: &str) -> Result<Vec<BenchmarkResult>, Error> {
    Ok(parse_records(json)?.into_iter().map(Into::into).collect())
}

pub fn read_results(reader: impl Read) -> Result<Vec<BenchmarkResult>, Error> {
    Ok(read_records(reader)?.into_iter().map(Into::into).collect())
}

pub fn to_string_pretty(records: &[Record]) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(records)?)
}
