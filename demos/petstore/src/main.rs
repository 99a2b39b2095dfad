use std::path::PathBuf;

use apiweave::http::Body;
use apiweave::{init_tracing, ApiConfig, ConfigValue};
use clap::{Parser, Subcommand, ValueEnum};
use http_body_util::BodyExt;
use petstore::build_app;
use petstore::models::PetIn;
use petstore::services::{PetService, UserDirectory};
use tower::ServiceExt;

#[derive(Parser)]
#[command(name = "petstore", about = "Pet store API served with apiweave")]
struct Cli {
    /// Configuration profile (`apiweave-{profile}.yaml`).
    #[arg(long, default_value = "dev", global = true)]
    profile: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: String,
    },
    /// Print or write the OpenAPI document.
    Spec {
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }
}

fn seed() -> Vec<PetIn> {
    [("Kitty", "cat"), ("Coco", "dog"), ("Flash", "cat")]
        .into_iter()
        .map(|(name, category)| PetIn {
            name: name.into(),
            category: category.into(),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = ApiConfig::load(&cli.profile)?;

    match cli.command {
        Command::Serve { addr } => {
            let pets = PetService::with_pets(seed()).await;
            build_app(&config, pets, UserDirectory::demo())?
                .serve(&addr)
                .await?;
        }
        Command::Spec { format, output } => {
            config.set(
                "apiweave.openapi.spec_format",
                ConfigValue::String(format.as_str().into()),
            );
            if let Some(path) = &output {
                config.set(
                    "apiweave.openapi.local_spec_path",
                    ConfigValue::String(path.display().to_string()),
                );
            }
            let spec_path: String =
                config.get_or("apiweave.openapi.spec_path", "/openapi.json".to_string())?;
            let router = build_app(&config, PetService::new(), UserDirectory::demo())?.build()?;
            if output.is_none() {
                let request = http::Request::builder()
                    .uri(spec_path.as_str())
                    .body(Body::empty())?;
                let response = router.oneshot(request).await?;
                let body = response.into_body().collect().await?.to_bytes();
                println!("{}", String::from_utf8_lossy(&body));
            }
        }
    }
    Ok(())
}
