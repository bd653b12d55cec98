//! Widget-change dispatch: each handler is registered against the widgets it
//! reads and the chart it writes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::charts::{pie_chart, scatter_chart, Figure};
use super::{Dataset, LaunchDashError, PayloadRange, SiteSelection};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetId {
    SiteDropdown,
    PayloadSlider,
    SuccessPieChart,
    SuccessPayloadScatterChart,
}

impl WidgetId {
    pub const ALL: [WidgetId; 4] = [
        WidgetId::SiteDropdown,
        WidgetId::PayloadSlider,
        WidgetId::SuccessPieChart,
        WidgetId::SuccessPayloadScatterChart,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WidgetId::SiteDropdown => "site-dropdown",
            WidgetId::PayloadSlider => "payload-slider",
            WidgetId::SuccessPieChart => "success-pie-chart",
            WidgetId::SuccessPayloadScatterChart => "success-payload-scatter-chart",
        }
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetId {
    type Err = LaunchDashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WidgetId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| LaunchDashError::UnknownWidget(s.to_string()))
    }
}

/// Current input widget values, as held by the page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetState {
    pub site: SiteSelection,
    pub payload: PayloadRange,
}

impl WidgetState {
    /// Dropdown on `ALL`, slider on the observed payload bounds.
    pub fn initial(dataset: &Dataset) -> Self {
        Self {
            site: SiteSelection::All,
            payload: dataset.payload_bounds(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    SuccessPie,
    PayloadScatter,
}

impl Handler {
    pub fn invoke(self, dataset: &Dataset, state: &WidgetState) -> Figure {
        match self {
            Handler::SuccessPie => Figure::Pie(pie_chart(dataset, &state.site)),
            Handler::PayloadScatter => {
                Figure::Scatter(scatter_chart(dataset, &state.site, state.payload))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Callback {
    pub output: WidgetId,
    pub inputs: Vec<WidgetId>,
    pub handler: Handler,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallbackOutput {
    pub id: WidgetId,
    pub figure: Figure,
}

#[derive(Clone, Debug, Default)]
pub struct CallbackRegistry {
    callbacks: Vec<Callback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pie reads the dropdown; scatter reads the dropdown and the slider.
    pub fn dashboard() -> Self {
        let mut registry = Self::new();
        registry.register(
            WidgetId::SuccessPieChart,
            vec![WidgetId::SiteDropdown],
            Handler::SuccessPie,
        );
        registry.register(
            WidgetId::SuccessPayloadScatterChart,
            vec![WidgetId::SiteDropdown, WidgetId::PayloadSlider],
            Handler::PayloadScatter,
        );
        registry
    }

    pub fn register(&mut self, output: WidgetId, inputs: Vec<WidgetId>, handler: Handler) {
        self.callbacks.push(Callback {
            output,
            inputs,
            handler,
        });
    }

    pub fn callbacks(&self) -> &[Callback] {
        &self.callbacks
    }

    /// Run every callback that reads `changed`, in registration order.
    pub fn dispatch(
        &self,
        changed: WidgetId,
        state: &WidgetState,
        dataset: &Dataset,
    ) -> Vec<CallbackOutput> {
        self.callbacks
            .iter()
            .filter(|cb| cb.inputs.contains(&changed))
            .map(|cb| CallbackOutput {
                id: cb.output,
                figure: cb.handler.invoke(dataset, state),
            })
            .collect()
    }

    /// Run every callback; used for the first render of the page.
    pub fn dispatch_all(&self, state: &WidgetState, dataset: &Dataset) -> Vec<CallbackOutput> {
        self.callbacks
            .iter()
            .map(|cb| CallbackOutput {
                id: cb.output,
                figure: cb.handler.invoke(dataset, state),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn ids(outputs: &[CallbackOutput]) -> Vec<WidgetId> {
        outputs.iter().map(|o| o.id).collect()
    }

    #[test]
    fn test_widget_id_strings() {
        for id in WidgetId::ALL {
            assert_eq!(id.as_str().parse::<WidgetId>().unwrap(), id);
            assert_eq!(serde_json::to_value(id).unwrap(), id.as_str());
        }
        assert!(matches!(
            "nope".parse::<WidgetId>(),
            Err(LaunchDashError::UnknownWidget(_))
        ));
    }

    #[test]
    fn test_dropdown_change_updates_both_charts() {
        let ds = sample_dataset();
        let registry = CallbackRegistry::dashboard();
        let state = WidgetState::initial(&ds);
        let out = registry.dispatch(WidgetId::SiteDropdown, &state, &ds);
        assert_eq!(
            ids(&out),
            vec![WidgetId::SuccessPieChart, WidgetId::SuccessPayloadScatterChart]
        );
    }

    #[test]
    fn test_slider_change_updates_scatter_only() {
        let ds = sample_dataset();
        let registry = CallbackRegistry::dashboard();
        let state = WidgetState {
            site: SiteSelection::from("KSC LC-39A"),
            payload: PayloadRange::new(5000.0, 6000.0),
        };
        let out = registry.dispatch(WidgetId::PayloadSlider, &state, &ds);
        assert_eq!(ids(&out), vec![WidgetId::SuccessPayloadScatterChart]);
        match &out[0].figure {
            Figure::Scatter(chart) => assert_eq!(chart.point_count(), 2),
            other => panic!("expected scatter, got {other:?}"),
        }
    }

    #[test]
    fn test_output_widget_change_triggers_nothing() {
        let ds = sample_dataset();
        let registry = CallbackRegistry::dashboard();
        let state = WidgetState::initial(&ds);
        assert!(registry
            .dispatch(WidgetId::SuccessPieChart, &state, &ds)
            .is_empty());
    }

    #[test]
    fn test_dispatch_all_matches_direct_handlers() {
        let ds = sample_dataset();
        let registry = CallbackRegistry::dashboard();
        let state = WidgetState::initial(&ds);
        let out = registry.dispatch_all(&state, &ds);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].figure, Figure::Pie(pie_chart(&ds, &SiteSelection::All)));
        assert_eq!(
            out[1].figure,
            Figure::Scatter(scatter_chart(&ds, &SiteSelection::All, ds.payload_bounds()))
        );
    }

    #[test]
    fn test_widget_state_wire_format() {
        let state: WidgetState =
            serde_json::from_str(r#"{"site":"ALL","payload":[0,5000]}"#).unwrap();
        assert_eq!(state.site, SiteSelection::All);
        assert_eq!(state.payload, PayloadRange::new(0.0, 5000.0));
    }
}
