//! Launch records dataset, chart handlers and dashboard layout.

use std::fmt;
use std::io::Write;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub mod callbacks;
pub mod charts;
pub mod layout;

pub use callbacks::{Callback, CallbackOutput, CallbackRegistry, Handler, WidgetId, WidgetState};
pub use charts::{pie_chart, scatter_chart, Figure, PieChart, PieSlice, ScatterChart, ScatterPoint, ScatterSeries};
pub use layout::{build_layout, Layout};

/// Default dataset file name, resolved against the working directory.
pub const DEFAULT_DATASET: &str = "spacex_launch_dash.csv";

pub const COL_LAUNCH_SITE: &str = "Launch Site";
pub const COL_PAYLOAD: &str = "Payload Mass (kg)";
pub const COL_CLASS: &str = "class";
pub const COL_BOOSTER_CATEGORY: &str = "Booster Version Category";

const REQUIRED_COLUMNS: [&str; 4] = [COL_LAUNCH_SITE, COL_PAYLOAD, COL_CLASS, COL_BOOSTER_CATEGORY];

#[derive(Error, Debug)]
pub enum LaunchDashError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset is missing required column `{0}`")]
    MissingColumn(String),
    #[error("invalid outcome class: {0}")]
    InvalidOutcome(String),
    #[error("invalid payload mass on row {row}: {value}")]
    InvalidPayload { row: usize, value: f64 },
    #[error("dataset contains no launch records")]
    EmptyDataset,
    #[error("unknown widget id: {0}")]
    UnknownWidget(String),
}

/// Binary launch outcome; serialized as `0`/`1` like the `class` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    Failure,
    Success,
}

impl Outcome {
    pub fn class(self) -> u8 {
        match self {
            Outcome::Failure => 0,
            Outcome::Success => 1,
        }
    }

    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class())
    }
}

impl TryFrom<f64> for Outcome {
    type Error = LaunchDashError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value == 0.0 {
            Ok(Outcome::Failure)
        } else if value == 1.0 {
            Ok(Outcome::Success)
        } else {
            Err(LaunchDashError::InvalidOutcome(value.to_string()))
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.class())
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // The column holds 0/1 but some exports write it as a float.
        let raw = f64::deserialize(deserializer)?;
        Outcome::try_from(raw).map_err(D::Error::custom)
    }
}

/// One launch attempt. Field names follow the dataset's CSV headers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaunchRecord {
    #[serde(rename = "Flight Number", default)]
    pub flight_number: Option<u32>,
    #[serde(rename = "Launch Site")]
    pub launch_site: String,
    #[serde(rename = "class")]
    pub outcome: Outcome,
    #[serde(rename = "Payload Mass (kg)")]
    pub payload_mass_kg: f64,
    #[serde(rename = "Booster Version", default)]
    pub booster_version: Option<String>,
    #[serde(rename = "Booster Version Category")]
    pub booster_version_category: String,
}

/// Parse launch records from CSV bytes.
///
/// Columns are matched by header name; extra columns (including an unnamed
/// index column) are ignored.
pub fn parse_records(input: &[u8]) -> Result<Vec<LaunchRecord>, LaunchDashError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LaunchDashError::MissingColumn(column.to_string()));
        }
    }

    let mut out = Vec::new();
    for (idx, row) in reader.deserialize::<LaunchRecord>().enumerate() {
        let record = row?;
        if !record.payload_mass_kg.is_finite() || record.payload_mass_kg < 0.0 {
            return Err(LaunchDashError::InvalidPayload {
                row: idx + 2,
                value: record.payload_mass_kg,
            });
        }
        out.push(record);
    }
    Ok(out)
}

/// Write records as CSV with the same headers the loader expects.
pub fn write_records<'a, W, I>(records: I, writer: W) -> Result<(), LaunchDashError>
where
    W: Write,
    I: IntoIterator<Item = &'a LaunchRecord>,
{
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Site selector value: every site, or one named site.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SiteSelection {
    #[default]
    All,
    Site(String),
}

impl SiteSelection {
    /// Sentinel used by the dropdown for "all sites".
    pub const ALL: &'static str = "ALL";

    pub fn as_str(&self) -> &str {
        match self {
            SiteSelection::All => Self::ALL,
            SiteSelection::Site(name) => name,
        }
    }

    pub fn matches(&self, site: &str) -> bool {
        match self {
            SiteSelection::All => true,
            SiteSelection::Site(name) => name == site,
        }
    }
}

impl From<&str> for SiteSelection {
    fn from(value: &str) -> Self {
        if value == Self::ALL {
            SiteSelection::All
        } else {
            SiteSelection::Site(value.to_string())
        }
    }
}

impl From<String> for SiteSelection {
    fn from(value: String) -> Self {
        if value == Self::ALL {
            SiteSelection::All
        } else {
            SiteSelection::Site(value)
        }
    }
}

impl From<SiteSelection> for String {
    fn from(value: SiteSelection) -> Self {
        match value {
            SiteSelection::All => SiteSelection::ALL.to_string(),
            SiteSelection::Site(name) => name,
        }
    }
}

impl fmt::Display for SiteSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive payload interval in kilograms. Serialized as `[low, high]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct PayloadRange {
    pub low: f64,
    pub high: f64,
}

impl PayloadRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, payload_kg: f64) -> bool {
        payload_kg >= self.low && payload_kg <= self.high
    }
}

impl From<[f64; 2]> for PayloadRange {
    fn from([low, high]: [f64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<PayloadRange> for [f64; 2] {
    fn from(range: PayloadRange) -> Self {
        [range.low, range.high]
    }
}

/// Success/failure tally for one launch site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub launch_site: String,
    pub launches: usize,
    pub successes: usize,
    pub failures: usize,
}

/// Immutable launch table loaded once before serving.
#[derive(Clone, Debug)]
pub struct Dataset {
    records: Vec<LaunchRecord>,
    sites: Vec<String>,
    payload_bounds: PayloadRange,
}

impl Dataset {
    pub fn new(records: Vec<LaunchRecord>) -> Result<Self, LaunchDashError> {
        if records.is_empty() {
            return Err(LaunchDashError::EmptyDataset);
        }
        let mut sites: Vec<String> = Vec::new();
        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        for record in &records {
            if !sites.iter().any(|s| s == &record.launch_site) {
                sites.push(record.launch_site.clone());
            }
            low = low.min(record.payload_mass_kg);
            high = high.max(record.payload_mass_kg);
        }
        Ok(Self {
            records,
            sites,
            payload_bounds: PayloadRange::new(low, high),
        })
    }

    pub fn from_csv_bytes(input: &[u8]) -> Result<Self, LaunchDashError> {
        Self::new(parse_records(input)?)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_path(path: &Path) -> Result<Self, LaunchDashError> {
        let data = std::fs::read(path)?;
        Self::from_csv_bytes(&data)
    }

    pub fn records(&self) -> &[LaunchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct launch sites in first-appearance order.
    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    /// Observed `[min, max]` payload mass.
    pub fn payload_bounds(&self) -> PayloadRange {
        self.payload_bounds
    }

    /// Records matching a site selection and, optionally, a payload range.
    pub fn filter<'a>(
        &'a self,
        site: &'a SiteSelection,
        payload: Option<PayloadRange>,
    ) -> impl Iterator<Item = &'a LaunchRecord> + 'a {
        self.records.iter().filter(move |r| {
            payload.map_or(true, |range| range.contains(r.payload_mass_kg))
                && site.matches(&r.launch_site)
        })
    }

    pub fn site_summaries(&self) -> Vec<SiteSummary> {
        self.sites
            .iter()
            .map(|site| {
                let (successes, failures) = self
                    .records
                    .iter()
                    .filter(|r| &r.launch_site == site)
                    .fold((0, 0), |(s, f), r| {
                        if r.outcome.is_success() {
                            (s + 1, f)
                        } else {
                            (s, f + 1)
                        }
                    });
                SiteSummary {
                    launch_site: site.clone(),
                    launches: successes + failures,
                    successes,
                    failures,
                }
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) const SAMPLE_CSV: &str = "\
,Flight Number,Launch Site,class,Payload Mass (kg),Booster Version,Booster Version Category
0,1,CCAFS LC-40,0,0.0,F9 v1.0  B0003,v1.0
1,2,CCAFS LC-40,0,525.0,F9 v1.0  B0005,v1.0
2,3,VAFB SLC-4E,0,500.0,F9 v1.1  B1003,v1.1
3,4,VAFB SLC-4E,1,9600.0,F9 FT  B1029.1,FT
4,5,KSC LC-39A,1,2490.0,F9 FT  B1031.1,FT
5,6,KSC LC-39A,1,5300.0,F9 FT  B1030,FT
6,7,KSC LC-39A,0,5200.0,F9 FT  B1034,FT
7,8,CCAFS SLC-40,1,3669.0,F9 B4  B1043.1,B4
8,9,CCAFS SLC-40,1,6460.0,F9 B5  B1046.2,B5
";

    pub(crate) fn sample_dataset() -> Dataset {
        Dataset::from_csv_bytes(SAMPLE_CSV.as_bytes()).expect("sample dataset parses")
    }

    pub(crate) fn record(site: &str, payload: f64, outcome: Outcome, category: &str) -> LaunchRecord {
        LaunchRecord {
            flight_number: None,
            launch_site: site.to_string(),
            outcome,
            payload_mass_kg: payload,
            booster_version: None,
            booster_version_category: category.to_string(),
        }
    }

    /// The three-record example: (A,500,1), (A,1500,0), (B,800,1).
    pub(crate) fn worked_example() -> Dataset {
        Dataset::new(vec![
            record("A", 500.0, Outcome::Success, "v1.0"),
            record("A", 1500.0, Outcome::Failure, "v1.1"),
            record("B", 800.0, Outcome::Success, "FT"),
        ])
        .expect("non-empty")
    }
}
