//! Declarative page layout, built once from the loaded dataset.

use serde::{Deserialize, Serialize};

use super::callbacks::WidgetId;
use super::{Dataset, PayloadRange, SiteSelection};

pub const PAGE_TITLE: &str = "SpaceX Launch Records Dashboard";
pub const SLIDER_LABEL: &str = "Payload range (Kg):";

const SLIDER_MIN: f64 = 0.0;
const SLIDER_MAX: f64 = 10_000.0;
const SLIDER_STEP: f64 = 1_000.0;
const MARK_INTERVAL: f64 = 2_000.0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dropdown {
    pub id: WidgetId,
    pub options: Vec<DropdownOption>,
    pub value: SiteSelection,
    pub placeholder: String,
    pub searchable: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SliderMark {
    pub value: f64,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeSlider {
    pub id: WidgetId,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub marks: Vec<SliderMark>,
    pub value: PayloadRange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub title: String,
    pub dropdown: Dropdown,
    pub pie_graph: WidgetId,
    pub slider_label: String,
    pub slider: RangeSlider,
    pub scatter_graph: WidgetId,
}

/// Build the page layout for `dataset`.
///
/// The slider spans 0..10000 kg in 1000 kg steps with a mark every 2000 kg;
/// the upper end is raised to the next step when the data is heavier. Its
/// initial value is the observed payload range.
pub fn build_layout(dataset: &Dataset) -> Layout {
    let bounds = dataset.payload_bounds();

    let mut options = vec![DropdownOption {
        label: "All Sites".to_string(),
        value: SiteSelection::ALL.to_string(),
    }];
    options.extend(dataset.sites().iter().map(|site| DropdownOption {
        label: site.clone(),
        value: site.clone(),
    }));

    let max = if bounds.high > SLIDER_MAX {
        (bounds.high / SLIDER_STEP).ceil() * SLIDER_STEP
    } else {
        SLIDER_MAX
    };
    let min = SLIDER_MIN.min(bounds.low);

    let mut marks = Vec::new();
    let mut tick = SLIDER_MIN;
    while tick <= max {
        marks.push(SliderMark {
            value: tick,
            label: format!("{tick:.0} Kg"),
        });
        tick += MARK_INTERVAL;
    }

    Layout {
        title: PAGE_TITLE.to_string(),
        dropdown: Dropdown {
            id: WidgetId::SiteDropdown,
            options,
            value: SiteSelection::All,
            placeholder: "Select a Launch Site here".to_string(),
            searchable: true,
        },
        pie_graph: WidgetId::SuccessPieChart,
        slider_label: SLIDER_LABEL.to_string(),
        slider: RangeSlider {
            id: WidgetId::PayloadSlider,
            min,
            max,
            step: SLIDER_STEP,
            marks,
            value: bounds,
        },
        scatter_graph: WidgetId::SuccessPayloadScatterChart,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::Outcome;

    #[test]
    fn test_layout_for_sample() {
        let ds = sample_dataset();
        let layout = build_layout(&ds);
        assert_eq!(layout.title, PAGE_TITLE);

        let values: Vec<&str> = layout.dropdown.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(
            values,
            vec!["ALL", "CCAFS LC-40", "VAFB SLC-4E", "KSC LC-39A", "CCAFS SLC-40"]
        );
        assert_eq!(layout.dropdown.options[0].label, "All Sites");
        assert_eq!(layout.dropdown.value, SiteSelection::All);

        assert_eq!(layout.slider.min, 0.0);
        assert_eq!(layout.slider.max, 10_000.0);
        assert_eq!(layout.slider.step, 1_000.0);
        assert_eq!(layout.slider.value, PayloadRange::new(0.0, 9600.0));
        let labels: Vec<&str> = layout.slider.marks.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["0 Kg", "2000 Kg", "4000 Kg", "6000 Kg", "8000 Kg", "10000 Kg"]
        );
    }

    #[test]
    fn test_slider_grows_for_heavy_payloads() {
        let ds = Dataset::new(vec![
            record("A", 1200.0, Outcome::Success, "FT"),
            record("A", 15_250.0, Outcome::Success, "B5"),
        ])
        .unwrap();
        let slider = build_layout(&ds).slider;
        assert_eq!(slider.max, 16_000.0);
        assert_eq!(slider.marks.last().map(|m| m.value), Some(16_000.0));
        assert_eq!(slider.value, PayloadRange::new(1200.0, 15_250.0));
    }

    #[test]
    fn test_layout_serializes_widget_ids() {
        let layout = build_layout(&worked_example());
        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["dropdown"]["id"], "site-dropdown");
        assert_eq!(json["slider"]["id"], "payload-slider");
        assert_eq!(json["pie_graph"], "success-pie-chart");
        assert_eq!(json["scatter_graph"], "success-payload-scatter-chart");
        assert_eq!(json["slider"]["value"], serde_json::json!([500.0, 1500.0]));
    }
}
