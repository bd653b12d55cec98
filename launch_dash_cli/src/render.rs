use std::panic;
use std::path::Path;

use anyhow::{anyhow, Result};
use launch_dash::charts::palette_rgb;
use launch_dash::{PieChart, ScatterChart};
use plotters::prelude::*;

const CHART_SIZE: (u32, u32) = (1024, 640);

#[derive(Clone, Copy, Debug)]
pub enum ChartKind {
    Png,
    Svg,
}

/// Run a render closure, turning plotting errors and backend panics (missing
/// fonts, unwritable paths) into a message.
pub fn render_chart_guard<F>(render: F) -> Result<(), String>
where
    F: FnOnce() -> Result<()>,
{
    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
        .map_err(|e| format!("plotting error: {e}"))
}

fn rgb(index: usize) -> RGBColor {
    let (r, g, b) = palette_rgb(index);
    RGBColor(r, g, b)
}

fn parse_hex(color: &str) -> Option<RGBColor> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

pub fn render_pie(chart: &PieChart, path: &Path, kind: ChartKind) -> Result<()> {
    match kind {
        ChartKind::Png => draw_pie(BitMapBackend::new(path, CHART_SIZE).into_drawing_area(), chart),
        ChartKind::Svg => draw_pie(SVGBackend::new(path, CHART_SIZE).into_drawing_area(), chart),
    }
}

pub fn render_scatter(chart: &ScatterChart, path: &Path, kind: ChartKind) -> Result<()> {
    match kind {
        ChartKind::Png => {
            draw_scatter(BitMapBackend::new(path, CHART_SIZE).into_drawing_area(), chart)
        }
        ChartKind::Svg => {
            draw_scatter(SVGBackend::new(path, CHART_SIZE).into_drawing_area(), chart)
        }
    }
}

fn draw_pie<DB>(root: DrawingArea<DB, plotters::coord::Shift>, chart: &PieChart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{e:?}"))?;
    let root = root
        .titled(&chart.title, ("sans-serif", 28))
        .map_err(|e| anyhow!("{e:?}"))?;

    if chart.slices.is_empty() {
        root.draw(&Text::new(
            "No launches for this selection",
            (40, 40),
            ("sans-serif", 18),
        ))
        .map_err(|e| anyhow!("{e:?}"))?;
        root.present().map_err(|e| anyhow!("{e:?}"))?;
        return Ok(());
    }

    let (w, h) = root.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = (w.min(h) as f64) * 0.38;
    let sizes: Vec<f64> = chart.slices.iter().map(|s| s.value as f64).collect();
    let colors: Vec<RGBColor> = (0..chart.slices.len()).map(rgb).collect();
    let labels: Vec<String> = chart
        .slices
        .iter()
        .map(|s| format!("{} ({})", s.label, s.value))
        .collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 16).into_font());
    pie.percentages(("sans-serif", 14).into_font().color(&WHITE));
    root.draw(&pie).map_err(|e| anyhow!("{e:?}"))?;
    root.present().map_err(|e| anyhow!("{e:?}"))?;
    Ok(())
}

fn draw_scatter<DB>(root: DrawingArea<DB, plotters::coord::Shift>, chart: &ScatterChart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{e:?}"))?;

    let range = chart.payload_range;
    let span = (range.high - range.low).max(1.0);
    let x_min = range.low - span * 0.02;
    let x_max = range.high + span * 0.02;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(48)
        .build_cartesian_2d(x_min..x_max, -0.25f64..1.25f64)
        .map_err(|e| anyhow!("{e:?}"))?;

    ctx.configure_mesh()
        .x_desc("Payload Mass (kg)")
        .y_desc("class")
        .y_labels(3)
        .y_label_formatter(&|v| {
            if (*v - 0.0).abs() < 1e-9 || (*v - 1.0).abs() < 1e-9 {
                format!("{v:.0}")
            } else {
                String::new()
            }
        })
        .draw()
        .map_err(|e| anyhow!("{e:?}"))?;

    for (idx, series) in chart.series.iter().enumerate() {
        let color = parse_hex(&series.color).unwrap_or_else(|| rgb(idx));
        ctx.draw_series(series.points.iter().map(|p| {
            Circle::new(
                (p.payload_mass_kg, p.outcome.class() as f64),
                6,
                color.filled(),
            )
        }))
        .map_err(|e| anyhow!("{e:?}"))?
        .label(series.category.clone())
        .legend(move |(x, y)| Circle::new((x + 8, y), 5, color.filled()));
    }

    if !chart.series.is_empty() {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()
            .map_err(|e| anyhow!("{e:?}"))?;
    }

    root.present().map_err(|e| anyhow!("{e:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#636efa"), Some(RGBColor(0x63, 0x6e, 0xfa)));
        assert_eq!(parse_hex("636efa"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_guard_reports_errors_and_panics() {
        let err = render_chart_guard(|| Err(anyhow!("boom"))).unwrap_err();
        assert!(err.contains("boom"));
        let err = render_chart_guard(|| panic!("backend")).unwrap_err();
        assert_eq!(err, "plotting backend panicked");
        assert!(render_chart_guard(|| Ok(())).is_ok());
    }
}
