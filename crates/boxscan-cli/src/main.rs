mod commands;
mod output;

use boxscan_core::geometry::Point;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "boxscan",
    version,
    about = "Map named fields on PDF forms and extract their text"
)]
struct Cli {
    /// Viewer config file (JSON: initial_zoom, min_zoom, zoom_step)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug details to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show page count and page sizes of a PDF
    Info {
        /// Path to PDF file
        pdf_file: PathBuf,
    },
    /// Extract the text under every templated field of one or more PDFs
    Extract {
        /// PDF files, or directories whose PDF files are all scanned
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Template JSON file
        #[arg(short, long, value_name = "FILE")]
        template: PathBuf,

        /// Only extract this page (1-based)
        #[arg(short, long)]
        page: Option<u32>,

        /// Zoom the page geometry is taken at (default: initial_zoom from config)
        #[arg(short, long)]
        zoom: Option<f64>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write extracted fields to a JSON file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Move each successfully scanned PDF into this directory
        #[arg(long, value_name = "DIR")]
        move_to: Option<PathBuf>,
    },
    /// Create, inspect and edit templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Print the regions of a template
    Show {
        /// Template JSON file
        file: PathBuf,
    },
    /// Validate a template file
    Validate {
        /// Template JSON file
        file: PathBuf,
    },
    /// Add a region as if dragged on screen (creates the file if missing)
    Add {
        /// Template JSON file
        file: PathBuf,

        /// Page number (1-based)
        #[arg(short, long)]
        page: u32,

        /// Field name
        #[arg(short, long)]
        name: String,

        /// Drag start in viewport pixels, as X,Y
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        from: Point,

        /// Drag end in viewport pixels, as X,Y
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        to: Point,

        /// Zoom the drag was made at
        #[arg(short, long, default_value_t = 1.0)]
        zoom: f64,

        /// Viewport scroll offset, as X,Y
        #[arg(long, value_parser = parse_point, default_value = "0,0")]
        scroll: Point,
    },
    /// Remove the most recently added region of a page
    RemoveLast {
        /// Template JSON file
        file: PathBuf,

        /// Page number (1-based)
        #[arg(short, long)]
        page: u32,
    },
    /// Remove every region of a page
    Clear {
        /// Template JSON file
        file: PathBuf,

        /// Page number (1-based)
        #[arg(short, long)]
        page: u32,
    },
    /// Remove all regions with the given name from a page
    Remove {
        /// Template JSON file
        file: PathBuf,

        /// Page number (1-based)
        #[arg(short, long)]
        page: u32,

        /// Field name
        #[arg(short, long)]
        name: String,
    },
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{s}'"))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("'{v}' is not a number"))
    };
    Ok(Point::new(coord(x)?, coord(y)?))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Info { pdf_file } => commands::info::run(&pdf_file),
        Commands::Extract {
            inputs,
            template,
            page,
            zoom,
            output,
            out,
            move_to,
        } => commands::extract::run(
            &inputs,
            &template,
            page,
            zoom,
            cli.config.as_deref(),
            &output,
            out,
            move_to.as_deref(),
        ),
        Commands::Template { action } => match action {
            TemplateAction::Show { file } => commands::template::show(&file),
            TemplateAction::Validate { file } => commands::template::validate(&file),
            TemplateAction::Add {
                file,
                page,
                name,
                from,
                to,
                zoom,
                scroll,
            } => commands::template::add(&file, page, &name, from, to, zoom, scroll),
            TemplateAction::RemoveLast { file, page } => {
                commands::template::remove_last(&file, page)
            }
            TemplateAction::Clear { file, page } => commands::template::clear(&file, page),
            TemplateAction::Remove { file, page, name } => {
                commands::template::remove(&file, page, &name)
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("12.5,-3").unwrap(), Point::new(12.5, -3.0));
        assert_eq!(parse_point(" 1 , 2 ").unwrap(), Point::new(1.0, 2.0));
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn test_cli_parses_template_add() {
        let cli = Cli::try_parse_from([
            "boxscan", "template", "add", "t.json", "--page", "2", "--name", "total", "--from",
            "10,10", "--to", "90,40", "--zoom", "1.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Template {
                action: TemplateAction::Add { page, zoom, scroll, .. },
            } => {
                assert_eq!(page, 2);
                assert_eq!(zoom, 1.5);
                assert_eq!(scroll, Point::new(0.0, 0.0));
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_cli_parses_extract_over_many_inputs() {
        let cli = Cli::try_parse_from([
            "boxscan", "extract", "a.pdf", "To Scan", "-t", "form.json", "--move-to", "Scanned",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract {
                inputs, move_to, ..
            } => {
                assert_eq!(inputs, vec![PathBuf::from("a.pdf"), PathBuf::from("To Scan")]);
                assert_eq!(move_to, Some(PathBuf::from("Scanned")));
            }
            _ => panic!("wrong subcommand"),
        }

        assert!(Cli::try_parse_from(["boxscan", "extract", "-t", "form.json"]).is_err());
    }
}
