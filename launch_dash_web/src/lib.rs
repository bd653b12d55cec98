use std::rc::Rc;

use launch_dash::{
    build_layout, CallbackRegistry, Dataset, Figure, PayloadRange, SiteSelection, WidgetId,
    WidgetState,
};
use leptos::*;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_COMMIT: &str = env!("GIT_COMMIT_HASH");

/// Served by the dashboard binary next to the API.
const DATA_URL: &str = "/data.csv";

#[cfg(feature = "chart_plotly")]
mod browser {
    use launch_dash::Figure;
    use serde::Serialize;
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;

    fn js_err(err: JsValue) -> String {
        err.as_string().unwrap_or_else(|| format!("{err:?}"))
    }

    pub async fn fetch_text(url: &str) -> Result<String, String> {
        let window = web_sys::window().ok_or("no window")?;
        let resp = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(js_err)?;
        let resp: web_sys::Response = resp.dyn_into().map_err(js_err)?;
        if !resp.ok() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let text = JsFuture::from(resp.text().map_err(js_err)?)
            .await
            .map_err(js_err)?;
        text.as_string()
            .ok_or_else(|| "response body was not text".to_string())
    }

    /// Hand a figure to `Plotly.react` on the element `div_id`.
    pub fn plot_figure(div_id: &str, figure: &Figure) -> Result<(), String> {
        let value = figure.to_plotly();
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let data = value["data"]
            .serialize(&serializer)
            .map_err(|e| e.to_string())?;
        let layout = value["layout"]
            .serialize(&serializer)
            .map_err(|e| e.to_string())?;

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("no document")?;
        let div = document
            .get_element_by_id(div_id)
            .ok_or_else(|| format!("missing element #{div_id}"))?;
        let plotly = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("Plotly"))
            .map_err(js_err)?;
        let react = js_sys::Reflect::get(&plotly, &JsValue::from_str("react"))
            .map_err(js_err)?
            .dyn_into::<js_sys::Function>()
            .map_err(|_| "Plotly.react is not available".to_string())?;
        react
            .call3(&JsValue::NULL, &JsValue::from(div), &data, &layout)
            .map_err(js_err)?;
        Ok(())
    }
}

#[cfg(not(feature = "chart_plotly"))]
mod browser {
    use launch_dash::Figure;

    pub async fn fetch_text(_url: &str) -> Result<String, String> {
        Err("built without chart_plotly".to_string())
    }

    pub fn plot_figure(_div_id: &str, _figure: &Figure) -> Result<(), String> {
        Ok(())
    }
}

async fn load_dataset(url: &str) -> Result<Dataset, String> {
    let text = browser::fetch_text(url).await?;
    Dataset::from_csv_bytes(text.as_bytes()).map_err(|e| e.to_string())
}

/// Keep the two slider handles ordered: the moved handle stops at the other.
fn ordered_range(moved_low: bool, value: f64, other: f64) -> PayloadRange {
    if moved_low {
        PayloadRange::new(value.min(other), other)
    } else {
        PayloadRange::new(other, value.max(other))
    }
}

fn fmt_range(range: PayloadRange) -> String {
    format!("{:.0} – {:.0} kg", range.low, range.high)
}

#[component]
pub fn App() -> impl IntoView {
    let (dataset, set_dataset) = create_signal(Option::<Rc<Dataset>>::None);
    let (status, set_status) = create_signal(String::from("Loading launch records…"));
    let (site, set_site) = create_signal(String::from(SiteSelection::ALL));
    let (payload, set_payload) = create_signal(PayloadRange::new(0.0, 0.0));

    spawn_local(async move {
        match load_dataset(DATA_URL).await {
            Ok(ds) => {
                set_payload.set(ds.payload_bounds());
                set_status.set(format!(
                    "{} launches across {} sites.",
                    ds.len(),
                    ds.sites().len()
                ));
                set_dataset.set(Some(Rc::new(ds)));
            }
            Err(err) => set_status.set(format!("Failed to load {DATA_URL}: {err}")),
        }
    });

    let layout = create_memo(move |_| dataset.get().map(|ds| build_layout(&ds)));

    // One effect per registered callback; each tracks only its input widgets.
    for callback in CallbackRegistry::dashboard().callbacks().iter().cloned() {
        create_effect(move |_| {
            let Some(ds) = dataset.get() else {
                return;
            };
            let site_now = if callback.inputs.contains(&WidgetId::SiteDropdown) {
                site.get()
            } else {
                site.get_untracked()
            };
            let payload_now = if callback.inputs.contains(&WidgetId::PayloadSlider) {
                payload.get()
            } else {
                payload.get_untracked()
            };
            let state = WidgetState {
                site: SiteSelection::from(site_now),
                payload: payload_now,
            };
            let figure: Figure = callback.handler.invoke(&ds, &state);
            if let Err(err) = browser::plot_figure(callback.output.as_str(), &figure) {
                set_status.set(format!("Could not draw {}: {err}", callback.output));
            }
        });
    }

    let dropdown = move || {
        layout.get().map(|layout| {
            let dropdown = layout.dropdown;
            let options = dropdown
                .options
                .into_iter()
                .map(|opt| {
                    let selected = opt.value == dropdown.value.as_str();
                    view! { <option value=opt.value selected=selected>{opt.label}</option> }
                })
                .collect_view();
            view! {
                <select id=dropdown.id.as_str() title=dropdown.placeholder
                    on:change=move |ev| set_site.set(event_target_value(&ev))>
                    {options}
                </select>
            }
        })
    };

    let slider = move || {
        layout.get().map(|layout| {
            let slider = layout.slider;
            let marks = slider
                .marks
                .iter()
                .map(|m| view! { <option value=m.value.to_string() label=m.label.clone()></option> })
                .collect_view();
            let mark_labels = slider
                .marks
                .into_iter()
                .map(|m| view! { <span>{m.label}</span> })
                .collect_view();
            view! {
                <p>{layout.slider_label}" "<span class="note">{move || fmt_range(payload.get())}</span></p>
                <div class="slider" id=slider.id.as_str()>
                    <input type="range" min=slider.min max=slider.max step=slider.step
                        list="payload-marks"
                        prop:value=move || payload.get().low
                        on:change=move |ev| {
                            if let Ok(v) = event_target_value(&ev).parse::<f64>() {
                                set_payload.set(ordered_range(true, v, payload.get_untracked().high));
                            }
                        }/>
                    <input type="range" min=slider.min max=slider.max step=slider.step
                        list="payload-marks"
                        prop:value=move || payload.get().high
                        on:change=move |ev| {
                            if let Ok(v) = event_target_value(&ev).parse::<f64>() {
                                set_payload.set(ordered_range(false, v, payload.get_untracked().low));
                            }
                        }/>
                    <datalist id="payload-marks">{marks}</datalist>
                </div>
                <div class="marks">{mark_labels}</div>
            }
        })
    };

    view! {
        <main>
            <header>
                <h1 style="text-align: center; color: #503D36; font-size: 40px;">
                    {launch_dash::layout::PAGE_TITLE}
                </h1>
                <p class="note">{move || status.get()}</p>
            </header>
            <section class="controls">
                {dropdown}
                <div id=WidgetId::SuccessPieChart.as_str() class="plot"></div>
                {slider}
                <div id=WidgetId::SuccessPayloadScatterChart.as_str() class="plot"></div>
            </section>
            <footer>
                <p class="note">{"Web version "}{APP_VERSION}{" ("}{APP_COMMIT}{")"}</p>
            </footer>
        </main>
    }
}

#[cfg(all(target_arch = "wasm32", feature = "chart_plotly"))]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    leptos::mount_to_body(|| view! { <App/> });
}
