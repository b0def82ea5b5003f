use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{info, warn};
use std::path::{Path, PathBuf};

use fichas_ayudas::api::{self, AppState};
use fichas_ayudas::config::Settings;
use fichas_ayudas::dataset::{index_dataset, IndexMode};
use fichas_ayudas::document::{PdfDocument, MIN_TEXT_CHARS};
use fichas_ayudas::generator::{FichaGenerator, GenerationOptions, DEFAULT_USUARIO};
use fichas_ayudas::llm::{LlmClient, ModelChoice};
use fichas_ayudas::prompt::build_context;
use fichas_ayudas::rag::RagSystem;
use fichas_ayudas::word::WordGenerator;

/// Generate social-aid fichas from convocatoria PDFs using an LLM and a Qdrant example index
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve,

    /// Generate a ficha from a PDF and write it as .docx
    Generate {
        /// Path to the convocatoria PDF
        pdf: PathBuf,

        /// Output .docx path (defaults to OUTPUT_DIR/<pdf name>.docx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model to use instead of the configured default
        #[arg(short, long, value_enum)]
        model: Option<ModelChoice>,

        /// Skip retrieval of similar fichas
        #[arg(long)]
        no_rag: bool,

        /// Value for the USUARIO field
        #[arg(long, default_value = DEFAULT_USUARIO)]
        usuario: String,
    },

    /// Index prior fichas (.docx) into the vector database
    Index {
        /// Folder tree containing the fichas
        #[arg(long, default_value = "Fichas y documentación")]
        dataset: PathBuf,

        /// Drop the existing index first
        #[arg(long)]
        reindex: bool,

        /// Add to a non-empty index
        #[arg(long)]
        append: bool,
    },

    /// Print extracted text, metadata and boletín detection for a PDF
    Inspect {
        /// Path to the PDF
        pdf: PathBuf,

        /// Also print the retrieval context with similar fichas
        #[arg(long)]
        examples: bool,
    },

    /// Print statistics of the vector database collection
    RagInfo,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    let settings = Settings::from_env().context("Invalid configuration")?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
    )
    .init();

    let args = Args::parse();

    match args.command {
        Command::Serve => {
            let state = AppState::initialize(settings).await?;
            api::serve(state).await
        }
        Command::Generate {
            pdf,
            output,
            model,
            no_rag,
            usuario,
        } => {
            generate(
                settings,
                &pdf,
                output,
                model,
                GenerationOptions {
                    use_rag: !no_rag,
                    usuario,
                },
            )
            .await
        }
        Command::Index {
            dataset,
            reindex,
            append,
        } => {
            let rag = RagSystem::connect(&settings).await?;
            let summary = index_dataset(&rag, &dataset, IndexMode::from_flags(reindex, append)).await?;

            info!("Setup completado");
            info!("Total de fichas en el sistema: {}", summary.after);
            info!("Fichas encontradas: {}", summary.found);
            info!("Fichas indexadas: {}", summary.indexed);
            let info = rag.collection_info().await?;
            info!("Colección: {}", info.name);
            Ok(())
        }
        Command::Inspect { pdf, examples } => {
            let document = PdfDocument::from_file(&pdf).context("Failed to process document")?;
            println!("{}", serde_json::to_string_pretty(&document.metadata)?);
            println!("{}", serde_json::to_string_pretty(&document.boletin)?);

            if examples {
                let rag = RagSystem::connect(&settings).await?;
                let similar = rag
                    .retrieve_similar(&document.text, settings.rag_top_k, None)
                    .await?;
                println!("{}", build_context(&document.text, &similar));
            } else {
                println!("{}", document.text);
            }
            Ok(())
        }
        Command::RagInfo => {
            let rag = RagSystem::connect(&settings).await?;
            let info = rag.collection_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
    }
}

async fn generate(
    settings: Settings,
    pdf: &Path,
    output: Option<PathBuf>,
    model: Option<ModelChoice>,
    options: GenerationOptions,
) -> Result<()> {
    info!("Processing file: {}", pdf.display());
    let document = PdfDocument::from_file(pdf).context("Failed to process document")?;
    if document.text.chars().count() < MIN_TEXT_CHARS {
        anyhow::bail!("No se pudo extraer texto suficiente del PDF");
    }
    if let Some(tipo) = document.boletin.tipo {
        info!("Boletín detectado: {:?}", tipo);
    }

    let rag = if options.use_rag && settings.use_rag {
        Some(RagSystem::connect(&settings).await?)
    } else {
        None
    };
    let default_model = LlmClient::from_settings(&settings)?;
    let generator = FichaGenerator::from_settings(default_model, rag, &settings)?;

    let generated = match model {
        Some(choice) => {
            let client = LlmClient::for_choice(choice, &settings)?;
            generator.generate_with(&client, &document.text, &options).await?
        }
        None => generator.generate(&document.text, &options).await?,
    };

    let report = generator.validate(&generated.ficha);
    if !report.valid {
        warn!("La ficha no supera {} comprobaciones", report.errors.len());
    }

    let output = match output {
        Some(output) => output,
        None => {
            settings.ensure_directories()?;
            let stem = pdf
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "ficha".to_string());
            settings.output_dir.join(format!("{}.docx", stem))
        }
    };
    WordGenerator::new().generate(&generated.ficha, &output)?;

    println!("{}", serde_json::to_string_pretty(&generated)?);
    info!("Ficha escrita en {}", output.display());
    Ok(())
}
