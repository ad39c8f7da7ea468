#![warn(clippy::unwrap_used)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as _;

use fichario::error::ContextError;
use fichario::layout::paginate;
use fichario::record::{DocumentMetadata, FormRecord};
use fichario::renderer;
use fichario::template::FormTemplate;

/// Renders clinical-study form records into the paginated PDF replicating the
/// official paper form.
#[derive(clap::Parser)]
#[command(name = "fichario", version)]
struct CliArguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Render a record list to the PDF document of its form.
    Render {
        /// The path of the JSON form template.
        #[arg(short = 't', long = "template", value_name = "template_file")]
        template_path: PathBuf,
        /// The path of the JSON record list.
        #[arg(short = 'r', long = "records", value_name = "records_file")]
        records_path: PathBuf,
        /// The study protocol code stamped in the header.
        #[arg(long = "study")]
        study_code: String,
        /// The active protocol version label stamped in the header.
        #[arg(long = "version", default_value = "1")]
        version: String,
        /// The date stamped in the header, already formatted for display.
        #[arg(long = "date")]
        date: String,
        /// The path of the output PDF file; defaults to the document number of the form.
        #[arg(short = 'o', long = "output", value_name = "output_file")]
        output_pdf_path: Option<PathBuf>,
    },
    /// Print the computed page partition of a record list without rendering it.
    Pages {
        /// The path of the JSON form template.
        #[arg(short = 't', long = "template", value_name = "template_file")]
        template_path: PathBuf,
        /// The path of the JSON record list.
        #[arg(short = 'r', long = "records", value_name = "records_file")]
        records_path: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli_arguments = CliArguments::parse();
    match run(cli_arguments) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{}", error);
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(cli_arguments: CliArguments) -> Result<(), ContextError> {
    match cli_arguments.command {
        Command::Render {
            template_path,
            records_path,
            study_code,
            version,
            date,
            output_pdf_path,
        } => {
            let template = FormTemplate::from_path(&template_path)?;
            let records = load_records(&records_path)?;
            let metadata = DocumentMetadata {
                study_code,
                document_number: template.document_number.clone(),
                version,
                date,
            };
            let output_pdf_path = output_pdf_path
                .unwrap_or_else(|| PathBuf::from(renderer::output_file_name(&template)));
            renderer::render_to_file(&records, &metadata, &template, &output_pdf_path)?;
            println!("Wrote {:?}", output_pdf_path);

            Ok(())
        }
        Command::Pages {
            template_path,
            records_path,
        } => {
            let template = FormTemplate::from_path(&template_path)?;
            let records = load_records(&records_path)?;
            let pages = paginate(
                records.len(),
                template.rows_per_page,
                template.pad_to_minimum_rows,
            );
            let total_pages = pages.len();
            for page in pages {
                println!(
                    "Page {} of {}: records {}..{}, {} blank rows",
                    page.index + 1,
                    total_pages,
                    page.records.start,
                    page.records.end,
                    page.blank_rows
                );
            }

            Ok(())
        }
    }
}

fn load_records(records_path: &PathBuf) -> Result<Vec<FormRecord>, ContextError> {
    let records_content = std::fs::read_to_string(records_path).map_err(|error| {
        ContextError::with_error(
            format!("Unable to read the record list {:?}", records_path),
            &error,
        )
    })?;
    serde_json::from_str(&records_content).map_err(|error| {
        ContextError::with_error(
            format!("Unable to parse the record list {:?}", records_path),
            &error,
        )
    })
}
