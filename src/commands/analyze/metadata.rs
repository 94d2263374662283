use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::stats::{Summary, describe};

const TOP_REPOSITORIES: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RepositoryRow {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub stars: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub forks: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub watchers: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub open_issues: Option<f64>,
}

type CountReader = fn(&RepositoryRow) -> Option<f64>;

const COUNT_COLUMNS: [(&str, CountReader); 4] = [
    ("stars", |row| row.stars),
    ("forks", |row| row.forks),
    ("watchers", |row| row.watchers),
    ("open_issues", |row| row.open_issues),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: &'static str,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRepository {
    pub full_name: Option<String>,
    pub language: Option<String>,
    pub database: Option<String>,
    pub stars: Option<f64>,
    pub forks: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataSection {
    pub repositories: usize,
    pub columns: Vec<ColumnSummary>,
    pub languages: Vec<FrequencyCount>,
    pub databases: Vec<FrequencyCount>,
    pub top_repositories: Vec<RankedRepository>,
}

pub fn load_repositories(path: &Path) -> Result<Vec<RepositoryRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<RepositoryRow>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(err) => warn!(
                path = %path.display(),
                row = index + 1,
                error = %err,
                "skipping malformed repository row"
            ),
        }
    }
    Ok(rows)
}

pub fn analyze_metadata(rows: &[RepositoryRow]) -> Option<MetadataSection> {
    if rows.is_empty() {
        warn!("no repository metadata records found");
        return None;
    }

    let columns: Vec<ColumnSummary> = COUNT_COLUMNS
        .iter()
        .filter_map(|&(column, read)| {
            let values: Vec<f64> = rows.iter().filter_map(read).collect();
            describe(&values).map(|summary| ColumnSummary { column, summary })
        })
        .collect();
    for column in &columns {
        info!(
            column = column.column,
            mean = %format!("{:.1}", column.summary.mean),
            median = column.summary.median,
            max = column.summary.max,
            "repository metadata summary"
        );
    }

    let languages = frequencies(rows.iter().map(|row| row.language.as_deref()));
    let databases = frequencies(rows.iter().map(|row| row.database.as_deref()));
    info!(
        repositories = rows.len(),
        languages = languages.len(),
        databases = databases.len(),
        "repository metadata loaded"
    );

    Some(MetadataSection {
        repositories: rows.len(),
        columns,
        languages,
        databases,
        top_repositories: top_repositories(rows),
    })
}

fn frequencies<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<FrequencyCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.flatten().map(str::trim).filter(|value| !value.is_empty()) {
        *counts.entry(value).or_default() += 1;
    }

    let mut ranked: Vec<FrequencyCount> = counts
        .into_iter()
        .map(|(value, count)| FrequencyCount {
            value: value.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    ranked
}

fn top_repositories(rows: &[RepositoryRow]) -> Vec<RankedRepository> {
    let mut ranked: Vec<&RepositoryRow> = rows.iter().collect();
    ranked.sort_by(|a, b| match (a.stars, b.stars) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked
        .into_iter()
        .take(TOP_REPOSITORIES)
        .map(|row| RankedRepository {
            full_name: row.full_name.clone(),
            language: row.language.clone(),
            database: row.database.clone(),
            stars: row.stars,
            forks: row.forks,
        })
        .collect()
}
