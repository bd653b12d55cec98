use std::fs::File;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use launch_dash::{
    pie_chart, scatter_chart, write_records, Dataset, PayloadRange, SiteSelection,
    DEFAULT_DATASET,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod render;
mod server;

use render::{render_chart_guard, ChartKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "Launch records dashboard", long_about = None)]
struct Cli {
    /// Launch records CSV
    #[arg(long, global = true, default_value = DEFAULT_DATASET, value_hint = ValueHint::FilePath)]
    data: PathBuf,

    /// Verbose logging
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the interactive dashboard (default)
    Serve(ServeArgs),
    /// Draw the pie and scatter charts for one selection to image files
    Render(RenderArgs),
    /// Write the records matching a selection as CSV
    Export(ExportArgs),
    /// Print per-site launch counts and payload bounds
    Summary,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:8050")]
    addr: SocketAddr,

    /// Built `launch_dash_web` bundle to serve under /app
    #[arg(long, value_hint = ValueHint::DirPath)]
    web_dist: Option<PathBuf>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8050)),
            web_dist: None,
        }
    }
}

/// Site and payload selection shared by `render` and `export`.
#[derive(Parser, Debug)]
struct SelectionArgs {
    /// Launch site, or ALL
    #[arg(long, default_value = SiteSelection::ALL)]
    site: String,

    /// Lower payload bound in kg (defaults to the dataset minimum)
    #[arg(long)]
    low: Option<f64>,

    /// Upper payload bound in kg (defaults to the dataset maximum)
    #[arg(long)]
    high: Option<f64>,
}

impl SelectionArgs {
    fn resolve(&self, dataset: &Dataset) -> (SiteSelection, PayloadRange) {
        let bounds = dataset.payload_bounds();
        let mut low = self.low.unwrap_or(bounds.low);
        let mut high = self.high.unwrap_or(bounds.high);
        if low > high {
            warn!("payload bounds reversed ({low} > {high}); swapping");
            std::mem::swap(&mut low, &mut high);
        }
        (
            SiteSelection::from(self.site.as_str()),
            PayloadRange::new(low, high),
        )
    }
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Output PNG path; `_pie`/`_scatter` suffixes are added
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Output SVG path; `_pie`/`_scatter` suffixes are added
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let dataset = load_dataset(&cli.data)?;

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => server::serve(Arc::new(dataset), args.addr, args.web_dist).await,
        Command::Render(args) => handle_render(&dataset, args),
        Command::Export(args) => handle_export(&dataset, args),
        Command::Summary => handle_summary(&dataset),
    }
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let t_load = Instant::now();
    let dataset = Dataset::from_path(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let bounds = dataset.payload_bounds();
    info!(
        "Loaded {} launches from {} ({} sites, payload {:.0}..{:.0} kg)",
        dataset.len(),
        path.display(),
        dataset.sites().len(),
        bounds.low,
        bounds.high
    );
    debug!(
        "Load stage: {:.1} ms",
        t_load.elapsed().as_secs_f64() * 1000.0
    );
    Ok(dataset)
}

fn handle_render(dataset: &Dataset, args: RenderArgs) -> Result<()> {
    let (site, payload) = args.selection.resolve(dataset);
    let pie = pie_chart(dataset, &site);
    let scatter = scatter_chart(dataset, &site, payload);
    info!(
        "Selection {site}: {} pie slices, {} scatter points",
        pie.slices.len(),
        scatter.point_count()
    );

    let targets: Vec<(PathBuf, ChartKind)> = match (args.png, args.svg) {
        (None, None) => vec![(PathBuf::from("launches.png"), ChartKind::Png)],
        (png, svg) => png
            .map(|p| (p, ChartKind::Png))
            .into_iter()
            .chain(svg.map(|p| (p, ChartKind::Svg)))
            .collect(),
    };

    for (base, kind) in targets {
        let (pie_path, scatter_path) = derive_chart_paths(&base);
        match render_chart_guard(|| render::render_pie(&pie, &pie_path, kind)) {
            Ok(()) => info!("Wrote plot: {}", pie_path.display()),
            Err(err) => warn!("Skipping pie render ({}): {}", pie_path.display(), err),
        }
        match render_chart_guard(|| render::render_scatter(&scatter, &scatter_path, kind)) {
            Ok(()) => info!("Wrote plot: {}", scatter_path.display()),
            Err(err) => warn!("Skipping scatter render ({}): {}", scatter_path.display(), err),
        }
    }
    Ok(())
}

fn derive_chart_paths(base: &Path) -> (PathBuf, PathBuf) {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("launches");
    let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("png");
    let pie = base.with_file_name(format!("{stem}_pie.{ext}"));
    let scatter = base.with_file_name(format!("{stem}_scatter.{ext}"));
    (pie, scatter)
}

fn handle_export(dataset: &Dataset, args: ExportArgs) -> Result<()> {
    let (site, payload) = args.selection.resolve(dataset);
    let rows: Vec<_> = dataset.filter(&site, Some(payload)).collect();

    if args.output.as_os_str() == "-" {
        let stdout = io::stdout();
        write_records(rows.iter().copied(), stdout.lock())?;
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("failed to create {}", args.output.display()))?;
        write_records(rows.iter().copied(), file)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        info!("Wrote {} rows: {}", rows.len(), args.output.display());
    }
    Ok(())
}

fn handle_summary(dataset: &Dataset) -> Result<()> {
    let bounds = dataset.payload_bounds();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(
        out,
        "{} launches, payload {:.0}..{:.0} kg",
        dataset.len(),
        bounds.low,
        bounds.high
    )?;
    writeln!(out, "{:<16} {:>8} {:>8} {:>8}", "site", "launches", "success", "failure")?;
    for summary in dataset.site_summaries() {
        writeln!(
            out,
            "{:<16} {:>8} {:>8} {:>8}",
            summary.launch_site, summary.launches, summary.successes, summary.failures
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_chart_paths() {
        let (pie, scatter) = derive_chart_paths(Path::new("out/charts.svg"));
        assert_eq!(pie, PathBuf::from("out/charts_pie.svg"));
        assert_eq!(scatter, PathBuf::from("out/charts_scatter.svg"));
    }

    #[test]
    fn test_cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["launch_dash"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.data, PathBuf::from(DEFAULT_DATASET));

        let cli = Cli::try_parse_from(["launch_dash", "serve", "--addr", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.addr.port(), 9000),
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn test_selection_resolve_swaps_reversed_bounds() {
        let dataset = Dataset::from_csv_bytes(
            b"Launch Site,Payload Mass (kg),class,Booster Version Category\nA,100,1,FT\nB,900,0,B4\n",
        )
        .unwrap();
        let args = SelectionArgs {
            site: "ALL".into(),
            low: Some(800.0),
            high: Some(200.0),
        };
        let (site, range) = args.resolve(&dataset);
        assert_eq!(site, SiteSelection::All);
        assert_eq!(range, PayloadRange::new(200.0, 800.0));

        let args = SelectionArgs {
            site: "B".into(),
            low: None,
            high: None,
        };
        assert_eq!(args.resolve(&dataset).1, dataset.payload_bounds());
    }
}
