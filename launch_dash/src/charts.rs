use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value as JsonValue};

use super::{Dataset, Outcome, PayloadRange, SiteSelection};

/// Plotly's default qualitative palette, cycled by slice or series index.
pub const PALETTE: [(u8, u8, u8); 10] = [
    (0x63, 0x6e, 0xfa),
    (0xef, 0x55, 0x3b),
    (0x00, 0xcc, 0x96),
    (0xab, 0x63, 0xfa),
    (0xff, 0xa1, 0x5a),
    (0x19, 0xd3, 0xf3),
    (0xff, 0x66, 0x92),
    (0xb6, 0xe8, 0x80),
    (0xff, 0x97, 0xff),
    (0xfe, 0xcb, 0x52),
];

pub fn palette_rgb(index: usize) -> (u8, u8, u8) {
    PALETTE[index % PALETTE.len()]
}

pub fn palette_hex(index: usize) -> String {
    let (r, g, b) = palette_rgb(index);
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieSlice {
    pub label: String,
    pub value: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieChart {
    pub title: String,
    /// Legend heading for the slice labels.
    pub label_name: String,
    pub slices: Vec<PieSlice>,
}

impl PieChart {
    pub fn total(&self) -> u64 {
        self.slices.iter().map(|s| s.value).sum()
    }

    pub fn to_plotly(&self) -> JsonValue {
        let labels: Vec<&str> = self.slices.iter().map(|s| s.label.as_str()).collect();
        let values: Vec<u64> = self.slices.iter().map(|s| s.value).collect();
        let colors: Vec<String> = (0..self.slices.len()).map(palette_hex).collect();
        json!({
            "data": [{
                "type": "pie",
                "labels": labels,
                "values": values,
                "marker": { "colors": colors },
                "hovertemplate": format!("{}=%{{label}}<br>count=%{{value}}<extra></extra>", self.label_name),
            }],
            "layout": {
                "title": { "text": self.title },
                "legend": { "title": { "text": self.label_name } },
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub payload_mass_kg: f64,
    pub outcome: Outcome,
    pub launch_site: String,
}

/// Points sharing one booster version category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScatterSeries {
    pub category: String,
    pub color: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScatterChart {
    pub title: String,
    pub payload_range: PayloadRange,
    pub series: Vec<ScatterSeries>,
}

impl ScatterChart {
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    pub fn points(&self) -> impl Iterator<Item = &ScatterPoint> {
        self.series.iter().flat_map(|s| s.points.iter())
    }

    pub fn to_plotly(&self) -> JsonValue {
        let traces: Vec<JsonValue> = self
            .series
            .iter()
            .map(|series| {
                let x: Vec<f64> = series.points.iter().map(|p| p.payload_mass_kg).collect();
                let y: Vec<u8> = series.points.iter().map(|p| p.outcome.class()).collect();
                let text: Vec<&str> = series.points.iter().map(|p| p.launch_site.as_str()).collect();
                json!({
                    "type": "scatter",
                    "mode": "markers",
                    "name": series.category,
                    "legendgroup": series.category,
                    "x": x,
                    "y": y,
                    "text": text,
                    "marker": { "color": series.color, "size": 10 },
                    "hovertemplate": "Payload Mass (kg)=%{x}<br>class=%{y}<br>%{text}<extra></extra>",
                })
            })
            .collect();
        json!({
            "data": traces,
            "layout": {
                "title": { "text": self.title },
                "xaxis": { "title": { "text": "Payload Mass (kg)" } },
                "yaxis": { "title": { "text": "class" }, "tickvals": [0, 1] },
                "legend": { "title": { "text": "Booster Version Category" } },
            },
        })
    }
}

/// A chart produced by one of the handlers. Serializes as a Plotly figure.
#[derive(Clone, Debug, PartialEq)]
pub enum Figure {
    Pie(PieChart),
    Scatter(ScatterChart),
}

impl Figure {
    pub fn title(&self) -> &str {
        match self {
            Figure::Pie(chart) => &chart.title,
            Figure::Scatter(chart) => &chart.title,
        }
    }

    pub fn to_plotly(&self) -> JsonValue {
        match self {
            Figure::Pie(chart) => chart.to_plotly(),
            Figure::Scatter(chart) => chart.to_plotly(),
        }
    }
}

impl Serialize for Figure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_plotly().serialize(serializer)
    }
}

/// Outcome pie for the selected site.
///
/// `All` counts successes per site; a named site counts each outcome value at
/// that site. An unknown site yields an empty chart.
pub fn pie_chart(dataset: &Dataset, site: &SiteSelection) -> PieChart {
    match site {
        SiteSelection::All => {
            let slices = dataset
                .sites()
                .iter()
                .filter_map(|name| {
                    let count = dataset
                        .records()
                        .iter()
                        .filter(|r| r.outcome.is_success() && &r.launch_site == name)
                        .count() as u64;
                    (count > 0).then(|| PieSlice {
                        label: name.clone(),
                        value: count,
                    })
                })
                .collect();
            PieChart {
                title: "Total Successful Launches by Site".to_string(),
                label_name: "Launch Site".to_string(),
                slices,
            }
        }
        SiteSelection::Site(name) => {
            let mut counts: Vec<(Outcome, u64)> = Vec::new();
            for record in dataset.filter(site, None) {
                match counts.iter_mut().find(|(o, _)| *o == record.outcome) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((record.outcome, 1)),
                }
            }
            counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            PieChart {
                title: format!("Total Success Launches for site {name}"),
                label_name: "class".to_string(),
                slices: counts
                    .into_iter()
                    .map(|(outcome, value)| PieSlice {
                        label: outcome.to_string(),
                        value,
                    })
                    .collect(),
            }
        }
    }
}

/// Payload vs. outcome scatter for records inside `payload` and the selected
/// site, one series per booster version category.
pub fn scatter_chart(dataset: &Dataset, site: &SiteSelection, payload: PayloadRange) -> ScatterChart {
    let mut series: Vec<ScatterSeries> = Vec::new();
    for record in dataset.filter(site, Some(payload)) {
        let point = ScatterPoint {
            payload_mass_kg: record.payload_mass_kg,
            outcome: record.outcome,
            launch_site: record.launch_site.clone(),
        };
        match series
            .iter_mut()
            .find(|s| s.category == record.booster_version_category)
        {
            Some(existing) => existing.points.push(point),
            None => {
                let color = palette_hex(series.len());
                series.push(ScatterSeries {
                    category: record.booster_version_category.clone(),
                    color,
                    points: vec![point],
                });
            }
        }
    }
    let title = match site {
        SiteSelection::All => "Correlation between Payload and Success for All Sites".to_string(),
        SiteSelection::Site(name) => format!("Correlation between Payload and Success for site {name}"),
    };
    ScatterChart {
        title,
        payload_range: payload,
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn slice_pairs(chart: &PieChart) -> Vec<(&str, u64)> {
        chart.slices.iter().map(|s| (s.label.as_str(), s.value)).collect()
    }

    #[test]
    fn test_worked_example() {
        let ds = worked_example();

        let all = pie_chart(&ds, &SiteSelection::All);
        assert_eq!(slice_pairs(&all), vec![("A", 1), ("B", 1)]);
        assert_eq!(all.title, "Total Successful Launches by Site");

        let site_a = pie_chart(&ds, &SiteSelection::from("A"));
        assert_eq!(slice_pairs(&site_a), vec![("0", 1), ("1", 1)]);
        assert_eq!(site_a.title, "Total Success Launches for site A");

        let scatter = scatter_chart(&ds, &SiteSelection::All, PayloadRange::new(0.0, 1000.0));
        let pts: Vec<(&str, f64, u8)> = scatter
            .points()
            .map(|p| (p.launch_site.as_str(), p.payload_mass_kg, p.outcome.class()))
            .collect();
        assert_eq!(pts, vec![("A", 500.0, 1), ("B", 800.0, 1)]);
    }

    #[test]
    fn test_site_pie_sums_to_site_records() {
        let ds = sample_dataset();
        for site in ds.sites() {
            let chart = pie_chart(&ds, &SiteSelection::from(site.as_str()));
            let expected = ds.records().iter().filter(|r| &r.launch_site == site).count() as u64;
            assert_eq!(chart.total(), expected, "site {site}");

            let mut present: Vec<String> = ds
                .records()
                .iter()
                .filter(|r| &r.launch_site == site)
                .map(|r| r.outcome.to_string())
                .collect();
            present.sort();
            present.dedup();
            let mut labels: Vec<String> = chart.slices.iter().map(|s| s.label.clone()).collect();
            labels.sort();
            assert_eq!(labels, present, "site {site}");
        }
    }

    #[test]
    fn test_site_pie_orders_by_count() {
        let ds = sample_dataset();
        let chart = pie_chart(&ds, &SiteSelection::from("KSC LC-39A"));
        assert_eq!(slice_pairs(&chart), vec![("1", 2), ("0", 1)]);
    }

    #[test]
    fn test_all_pie_skips_sites_without_successes() {
        let ds = sample_dataset();
        let chart = pie_chart(&ds, &SiteSelection::All);
        assert_eq!(
            slice_pairs(&chart),
            vec![("VAFB SLC-4E", 1), ("KSC LC-39A", 2), ("CCAFS SLC-40", 2)]
        );
    }

    #[test]
    fn test_unknown_site_gives_empty_charts() {
        let ds = sample_dataset();
        let nowhere = SiteSelection::from("Boca Chica");
        assert!(pie_chart(&ds, &nowhere).slices.is_empty());
        let scatter = scatter_chart(&ds, &nowhere, ds.payload_bounds());
        assert_eq!(scatter.point_count(), 0);
        assert!(scatter.series.is_empty());
        assert_eq!(scatter.to_plotly()["data"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_scatter_respects_inclusive_range() {
        let ds = sample_dataset();
        let range = PayloadRange::new(500.0, 5300.0);
        for site in std::iter::once(SiteSelection::All)
            .chain(ds.sites().iter().map(|s| SiteSelection::from(s.as_str())))
        {
            let chart = scatter_chart(&ds, &site, range);
            let expected = ds
                .records()
                .iter()
                .filter(|r| range.contains(r.payload_mass_kg) && site.matches(&r.launch_site))
                .count();
            assert_eq!(chart.point_count(), expected, "site {site}");
            assert!(chart.points().all(|p| range.contains(p.payload_mass_kg)));
        }
    }

    #[test]
    fn test_scatter_full_bounds_and_out_of_range() {
        let ds = sample_dataset();
        let full = scatter_chart(&ds, &SiteSelection::All, ds.payload_bounds());
        assert_eq!(full.point_count(), ds.len());

        let site = SiteSelection::from("CCAFS LC-40");
        let site_full = scatter_chart(&ds, &site, ds.payload_bounds());
        assert_eq!(site_full.point_count(), 2);

        let empty = scatter_chart(&ds, &SiteSelection::All, PayloadRange::new(9601.0, 10_000.0));
        assert_eq!(empty.point_count(), 0);
    }

    #[test]
    fn test_scatter_groups_by_category() {
        let ds = sample_dataset();
        let chart = scatter_chart(&ds, &SiteSelection::All, ds.payload_bounds());
        let categories: Vec<&str> = chart.series.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(categories, vec!["v1.0", "v1.1", "FT", "B4", "B5"]);
        assert_eq!(chart.series[2].points.len(), 4);
        assert_eq!(chart.series[0].color, "#636efa");
        assert_eq!(
            chart.title,
            "Correlation between Payload and Success for All Sites"
        );
    }

    #[test]
    fn test_handlers_are_idempotent() {
        let ds = sample_dataset();
        let site = SiteSelection::from("KSC LC-39A");
        assert_eq!(pie_chart(&ds, &site), pie_chart(&ds, &site));
        let range = PayloadRange::new(1000.0, 6000.0);
        assert_eq!(scatter_chart(&ds, &site, range), scatter_chart(&ds, &site, range));
    }

    #[test]
    fn test_plotly_figure_shape() {
        let ds = worked_example();
        let pie = Figure::Pie(pie_chart(&ds, &SiteSelection::All));
        let value = serde_json::to_value(&pie).unwrap();
        assert_eq!(value["data"][0]["type"], "pie");
        assert_eq!(value["data"][0]["labels"], json!(["A", "B"]));
        assert_eq!(value["data"][0]["values"], json!([1, 1]));
        assert_eq!(value["layout"]["title"]["text"], "Total Successful Launches by Site");

        let scatter = Figure::Scatter(scatter_chart(&ds, &SiteSelection::All, PayloadRange::new(0.0, 2000.0)));
        let value = serde_json::to_value(&scatter).unwrap();
        let traces = value["data"].as_array().unwrap();
        assert_eq!(traces.len(), 3);
        assert_eq!(traces[0]["mode"], "markers");
        assert_eq!(traces[1]["x"], json!([1500.0]));
        assert_eq!(traces[1]["y"], json!([0]));
    }
}
