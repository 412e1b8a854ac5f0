use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use server_api::{elements, presets, ApiContext};
use shared::domain::Palette;
use storage::Storage;
use theme_engine::{
    analyzer::analyze_theme_structure,
    palette::{extract_palette, sanitize_palette},
    preset::validate_preset_file,
    probe::{BindingSurface, ProbeOptions, ThemeProbe},
    vision::vision_patch,
};
use tracing::info;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/themes.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert the built-in preset catalog.
    SeedPresets,
    /// Upsert the wallet element catalog.
    SeedElements,
    /// Check a `{"titles": [...]}` preset list file.
    ValidatePresets { file: PathBuf },
    /// Print the category breakdown of a theme file.
    Analyze { theme: PathBuf },
    /// Print the palette extracted from an image.
    Palette { image: PathBuf },
    /// Print the recolor patch an image would apply to a theme.
    GeneratePatch { theme: PathBuf, image: PathBuf },
    /// Map element ids to theme paths using a bindings file.
    Probe {
        theme: PathBuf,
        bindings: PathBuf,
        #[arg(long, default_value = "home")]
        screen: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn read_palette(image: &Path) -> Result<Palette> {
    let bytes = fs::read(image).with_context(|| format!("failed to read {}", image.display()))?;
    let palette = extract_palette(&bytes)?;
    Ok(sanitize_palette(&palette))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn api_context(database_url: &str) -> Result<ApiContext> {
    let storage = Storage::new(database_url).await?;
    Ok(ApiContext::new(storage, "./data/exports"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let cli = Cli::parse();

    match cli.command {
        Command::SeedPresets => {
            let ctx = api_context(&cli.database_url).await?;
            let (seeded, _) = presets::seed_presets(&ctx).await?;
            println!("presets: {} built, {} inserted", seeded.count, seeded.inserted);
        }
        Command::SeedElements => {
            let ctx = api_context(&cli.database_url).await?;
            let seeded = elements::seed_elements(&ctx).await?;
            println!("elements: {} upserted", seeded.inserted);
        }
        Command::ValidatePresets { file } => {
            let titles = validate_preset_file(&file)?;
            println!("{} presets OK", titles.len());
            for title in titles {
                println!("  - {title}");
            }
        }
        Command::Analyze { theme } => {
            let groups = analyze_theme_structure(&read_json(&theme)?);
            for group in groups.iter().filter(|g| !g.elements.is_empty()) {
                println!("{} ({})", group.name, group.elements.len());
                for element in &group.elements {
                    println!("  {} [{}]", element.path, element.properties.join(", "));
                }
            }
        }
        Command::Palette { image } => print_json(&read_palette(&image)?)?,
        Command::GeneratePatch { theme, image } => {
            let palette = read_palette(&image)?;
            let patch = vision_patch(&palette, &read_json(&theme)?)?;
            print_json(&patch)?;
        }
        Command::Probe {
            theme,
            bindings,
            screen,
            out_dir,
        } => {
            let raw = fs::read_to_string(&bindings)
                .with_context(|| format!("failed to read {}", bindings.display()))?;
            let probe = ThemeProbe::new(BindingSurface::from_json(&raw)?, read_json(&theme)?);
            let result = probe.build_mapping(&ProbeOptions::for_screen(&screen)).await?;
            let generated_at = chrono::Utc::now().to_rfc3339();

            fs::create_dir_all(&out_dir)?;
            let autogen = out_dir.join(format!("{screen}.autogen.json"));
            let report = out_dir.join(format!("{screen}.report.json"));
            let summary = out_dir.join(format!("{screen}.summary.md"));
            fs::write(
                &autogen,
                serde_json::to_string_pretty(&result.autogen(&screen, &generated_at))?,
            )?;
            fs::write(
                &report,
                serde_json::to_string_pretty(&result.report(&screen, &generated_at))?,
            )?;
            fs::write(&summary, result.summary_markdown(&screen, &generated_at))?;
            info!(coverage = result.coverage, "probe finished");
            println!(
                "coverage {:.1}%: ok={} ambiguous={} unmapped={} non_scalar={}",
                result.coverage * 100.0,
                result.totals.ok,
                result.totals.ambiguous,
                result.totals.unmapped,
                result.totals.non_scalar
            );
            println!("wrote {}, {}, {}", autogen.display(), report.display(), summary.display());
        }
    }

    Ok(())
}
