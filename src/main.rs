use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use eo_dag::config::Settings;
use eo_dag::download_plan::DownloadPlan;
use eo_dag::key_prefix::aws::{AwsBucket, DemNaming, DemResolution};
use eo_dag::key_prefix::ewoc::{ArdKind, EwocBucketKind};
use eo_dag::provider::{AwsEoBucket, DiasBucket, EwocBucket, S2Options};
use eo_dag::s3::S3Client;
use eo_dag::ProductId;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "eo-dag")]
#[command(about = "Retrieve EO products and auxiliary data from cloud object stores", long_about = None)]
#[command(version)]
struct Args {
    /// TOML settings file, overridden by the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    Aws,
    Dias,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SrtmSource {
    Ewoc,
    Dias,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a Sentinel-1, Sentinel-2 or Landsat-8 product
    Get {
        id: String,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        #[arg(long, value_enum, default_value = "aws")]
        source: Source,
        /// Rebuild the SAFE format from the AWS layout
        #[arg(long)]
        safe: bool,
        /// Only the scene classification mask of a L2A product
        #[arg(long)]
        mask_only: bool,
        /// Read Sentinel-2 L2A products from the COG bucket
        #[arg(long)]
        cogs: bool,
        /// Landsat items to download (comma-separated, e.g., "ST_B10,QA_PIXEL")
        #[arg(long, value_delimiter = ',')]
        items: Vec<String>,
    },
    /// Download Copernicus DEM tiles
    Dem {
        #[arg(required = true)]
        tiles: Vec<String>,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        #[arg(long, default_value = "1s", value_parser = DemResolution::from_str)]
        resolution: DemResolution,
        /// Name the tiles the way Sen2Cor expects
        #[arg(long)]
        sen2cor: bool,
    },
    /// Download and unpack SRTM tiles
    Srtm {
        #[arg(required = true)]
        tiles: Vec<String>,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        #[arg(long, default_value = "1s", value_parser = DemResolution::from_str)]
        resolution: DemResolution,
        #[arg(long, value_enum, default_value = "ewoc")]
        source: SrtmSource,
    },
    /// List the ARD products of a tile
    Ard {
        tile: String,
        #[arg(long)]
        production_id: String,
        #[arg(long, value_parser = ArdKind::from_str)]
        kind: ArdKind,
        /// Write the products as a JSON collection
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the AgERA5 products
    Agera5 {
        /// Write the products as a JSON collection
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload a directory to the ARD or PRD bucket
    Upload {
        dir: PathBuf,
        prefix: String,
        #[arg(long, value_parser = EwocBucketKind::from_str)]
        bucket: EwocBucketKind,
        /// Only upload files ending with this suffix
        #[arg(long)]
        suffix: Option<String>,
    },
    /// Write the download plan of a bucket prefix
    Plan {
        prefix: String,
        #[arg(long, value_parser = EwocBucketKind::from_str)]
        bucket: EwocBucketKind,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        #[arg(long)]
        plan: PathBuf,
    },
    /// Run a download plan written by `plan`
    Execute {
        #[arg(long)]
        plan: PathBuf,
        #[arg(long, value_parser = EwocBucketKind::from_str)]
        bucket: EwocBucketKind,
    },
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::read(path)?,
        None => Settings::default(),
    };
    Ok(settings.with_overrides(|name| std::env::var(name).ok())?)
}

async fn get(settings: &Settings, id: &str, output: &Path, source: Source, options: GetOptions) -> Result<PathBuf> {
    let id = ProductId::parse(id)?;
    let s2_options = S2Options {
        safe: options.safe,
        mask_only: options.mask_only,
    };
    let path = match (source, id) {
        (Source::Aws, ProductId::S1(id)) => {
            AwsEoBucket::connect(settings, AwsBucket::SentinelS1L1c)
                .await?
                .download_s1_prd(&id, output, options.safe)
                .await?
        }
        (Source::Aws, ProductId::S2(id)) => {
            AwsEoBucket::connect(settings, AwsBucket::for_s2(&id, options.cogs)?)
                .await?
                .download_s2_prd(&id, output, s2_options)
                .await?
        }
        (Source::Aws, ProductId::L8C2(id)) => {
            let items = (!options.items.is_empty()).then_some(options.items.as_slice());
            AwsEoBucket::connect(settings, AwsBucket::UsgsLandsat)
                .await?
                .download_l8c2_prd(&id, output, items)
                .await?
        }
        (Source::Dias, ProductId::S1(id)) => {
            DiasBucket::connect(settings)
                .await?
                .download_s1_prd(&id, output)
                .await?
        }
        (Source::Dias, ProductId::S2(id)) => {
            DiasBucket::connect(settings)
                .await?
                .download_s2_prd(&id, output, options.mask_only)
                .await?
        }
        (source, id) => bail!("{id} cannot be retrieved from {source:?}"),
    };
    Ok(path)
}

struct GetOptions {
    safe: bool,
    mask_only: bool,
    cogs: bool,
    items: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("eo_dag={}", log_level))
        .init();

    let settings = load_settings(args.config.as_deref())?;

    match args.command {
        Command::Get {
            id,
            output,
            source,
            safe,
            mask_only,
            cogs,
            items,
        } => {
            let options = GetOptions {
                safe,
                mask_only,
                cogs,
                items,
            };
            let path = get(&settings, &id, &output, source, options).await?;
            info!(path = %path.display(), "product downloaded");
        }
        Command::Dem {
            tiles,
            output,
            resolution,
            sen2cor,
        } => {
            let naming = if sen2cor { DemNaming::Sen2Cor } else { DemNaming::Aws };
            let paths = AwsEoBucket::connect(&settings, resolution.bucket())
                .await?
                .download_copdem_tiles(&tiles, &output, resolution, naming)
                .await?;
            info!(count = paths.len(), "DEM tiles downloaded");
        }
        Command::Srtm {
            tiles,
            output,
            resolution,
            source,
        } => match source {
            SrtmSource::Ewoc => {
                EwocBucket::connect(&settings, EwocBucketKind::AuxData)
                    .await?
                    .download_srtm_tiles(&tiles, &output, resolution)
                    .await?
            }
            SrtmSource::Dias => {
                if resolution != DemResolution::OneArcSecond {
                    bail!("DIAS only serves 1s SRTM tiles");
                }
                DiasBucket::connect(&settings)
                    .await?
                    .download_srtm1s_tiles(&tiles, &output)
                    .await?
            }
        },
        Command::Ard {
            tile,
            production_id,
            kind,
            output,
        } => {
            let bucket = EwocBucket::connect(&settings, EwocBucketKind::Ard).await?;
            let collection = bucket.ard_collection(kind, &tile, &production_id).await?;
            for entry in &collection.entries {
                println!("{} {}", entry.date, entry.path);
            }
            if let Some(output) = output {
                collection
                    .write(&output)
                    .with_context(|| format!("writing {}", output.display()))?;
            }
        }
        Command::Agera5 { output } => {
            let bucket = EwocBucket::connect(&settings, EwocBucketKind::AuxData).await?;
            let collection = bucket.agera5_collection().await?;
            for entry in &collection.entries {
                println!("{} {}", entry.date, entry.path);
            }
            if let Some(output) = output {
                collection
                    .write(&output)
                    .with_context(|| format!("writing {}", output.display()))?;
            }
        }
        Command::Upload {
            dir,
            prefix,
            bucket,
            suffix,
        } => {
            let ewoc = EwocBucket::connect(&settings, bucket).await?;
            let (count, bytes) = match (bucket, suffix) {
                (EwocBucketKind::Ard, None) => ewoc.upload_ard_prd(&dir, &prefix).await?,
                (EwocBucketKind::Prd, None) => ewoc.upload_ewoc_prd(&dir, &prefix).await?,
                (_, suffix) => {
                    ewoc.store()
                        .upload_prefix(&dir, &prefix, suffix.as_deref())
                        .await?
                }
            };
            info!(count, bytes, "upload complete");
        }
        Command::Plan {
            prefix,
            bucket,
            output,
            plan,
        } => {
            let ewoc = EwocBucket::connect(&settings, bucket).await?;
            let download_plan = ewoc.store().plan_prefix(&prefix, &output, false, None).await?;
            download_plan.write(&plan)?;
            info!(tasks = download_plan.len(), plan = %plan.display(), "plan written");
        }
        Command::Execute { plan, bucket } => {
            let download_plan = DownloadPlan::read(&plan)?;
            let client = S3Client::from_config(&settings.ewoc_store(bucket)?).await?;
            let summary = download_plan.execute(&client).await?;
            info!(
                downloaded = summary.downloaded,
                skipped = summary.skipped,
                "plan executed"
            );
        }
    }

    Ok(())
}
