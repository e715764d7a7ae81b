use clap::Parser;
use color_eyre::Result;
use env_logger::Env;

use ankieta::charts::ChartToggles;
use ankieta::cli::{parse_comment_arg, parse_filter_arg, Cli, ClusterArgs, Command, FilterArg, ReportArgs};
use ankieta::cluster::{ClusterArtifacts, Profile};
use ankieta::config::{AppConfig, ConfigManager};
use ankieta::report::html::HtmlOptions;
use ankieta::report::{html, pdf, TablePreview};
use ankieta::state::DashboardState;
use ankieta::{dataset, export, MemoCache, APP_NAME};

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let manager = ConfigManager::new(APP_NAME)?;
    match cli.command {
        Command::Report(args) => run_report(args, &manager),
        Command::Cluster(args) => run_cluster(args),
        Command::GenerateConfig => {
            let path = manager.write_default_config()?;
            println!("Zapisano domyślną konfigurację: {}", path.display());
            Ok(())
        }
    }
}

fn run_report(args: ReportArgs, manager: &ConfigManager) -> Result<()> {
    let config = manager.load()?;

    let (df, skipped) = dataset::load_files(&args.paths)?;
    for skip in &skipped {
        eprintln!("Pominięto {}: {}", skip.path.display(), skip.reason);
    }

    let mut state = DashboardState::new(df)?;
    state.set_histogram_bins(config.histogram_bins);
    state.toggles = toggles_from(&args, &config);
    state.selection.x = args.x.clone();
    state.selection.y = args.y.clone();
    state.selection.color = args.color.clone();

    for spec in &args.filters {
        match parse_filter_arg(spec)? {
            FilterArg::Range { column, low, high } => {
                state.set_range_filter(&column, low, high)?;
            }
            FilterArg::Values { column, values } => {
                state.set_selected_values(&column, &values)?;
            }
        }
    }
    for spec in &args.comments {
        let (kind, text) = parse_comment_arg(spec)?;
        state.set_comment(kind, &text);
    }

    let filtered = state.filtered()?;
    println!("Liczba wierszy po filtrach: {}", filtered.height());

    let preview_rows = args.preview_rows.unwrap_or(config.preview_rows);
    let preview = TablePreview::from_dataframe(&filtered, preview_rows)?;
    let filter_lines = state.filter_summary();
    let charts = state.charts()?;

    if let Some(path) = &args.out_csv {
        export::write_csv(&filtered, path)?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.out_xlsx {
        export::write_excel(&filtered, path)?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.out_pdf {
        pdf::write_report(path, &preview, &filter_lines, &charts)?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.out_html {
        let options = html_options(args.logo.as_deref().or(config.logo.as_deref()))?;
        html::write_report(path, &preview, &filter_lines, &charts, &options)?;
        log::info!("wrote {}", path.display());
    }
    if args.out_csv.is_none()
        && args.out_xlsx.is_none()
        && args.out_pdf.is_none()
        && args.out_html.is_none()
    {
        println!("{}", filtered.head(Some(preview_rows)));
    }
    Ok(())
}

fn run_cluster(args: ClusterArgs) -> Result<()> {
    let profile = Profile {
        age: args.age.clone(),
        edu_level: args.edu_level.clone(),
        fav_animals: args.fav_animals.clone(),
        fav_place: args.fav_place.clone(),
        gender: args.gender.clone(),
    };

    let mut cache = MemoCache::new();
    let artifacts = ClusterArtifacts::load_cached(&args.artifacts, &mut cache)?;
    let matched = artifacts.find_match(&profile)?;

    println!("Najbliżej Ci do grupy: {}", matched.info.name);
    println!("{}", matched.info.description);
    println!("Liczba twoich znajomych: {}", matched.members.height());

    println!("\nNajczęstsze cechy w grupie:");
    for (field, value) in matched.mode_summary()? {
        println!("  {}: {}", field, value);
    }

    if let Some(path) = &args.out_html {
        let preview = TablePreview::from_dataframe(&matched.members, 10)?;
        let charts = matched.comparison_charts()?;
        let options = html_options(args.logo.as_deref())?;
        html::write_report(path, &preview, &[], &charts, &options)?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

fn toggles_from(args: &ReportArgs, config: &AppConfig) -> ChartToggles {
    if args.charts.is_empty() {
        return config.charts.to_toggles();
    }
    let mut toggles = ChartToggles::none();
    for kind in &args.charts {
        toggles.set(*kind, true);
    }
    toggles
}

fn html_options(logo: Option<&std::path::Path>) -> Result<HtmlOptions> {
    match logo {
        Some(path) => HtmlOptions::default().with_logo_file(path),
        None => Ok(HtmlOptions::default()),
    }
}
