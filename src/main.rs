use clap::{Parser, Subcommand};
use nb2post::config::{self, ConfigError, ConvertConfig};
use nb2post::render::MarkdownRenderer;
use nb2post::{convert, output, scan};
use std::path::PathBuf;

/// Directory and policy overrides shared by all commands.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Directory holding front-matter files and notebooks
    #[arg(long, global = true)]
    notebooks: Option<PathBuf>,

    /// Directory assembled posts are written to
    #[arg(long, global = true)]
    posts: Option<PathBuf>,

    /// Directory extracted notebook images are written to
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Skip notebooks that fail to render instead of stopping
    #[arg(long, global = true)]
    keep_going: bool,
}

#[derive(Parser)]
#[command(name = "nb2post")]
#[command(version)]
#[command(about = "Convert Jupyter notebooks into blog posts")]
#[command(long_about = "\
Convert Jupyter notebooks into blog posts

Each post is a pair of files in the notebook directory that share a name:

  notebooks/
  ├── 2024-01-01-hiking.md     # Front matter (YYYY-MM-DD-<name>.md)
  ├── hiking.ipynb             # Notebook (<name>.ipynb)
  └── draft.ipynb              # No front matter = reported, skipped

Running with no arguments converts ./notebooks into ./_posts, writing
notebook images to ./assets/images:

  _posts/2024-01-01-hiking.md       # front matter + rendered notebook
  assets/images/hiking_2_0.png      # linked as /assets/images/hiking_2_0.png

Run 'nb2post gen-config' to print a documented nb2post.toml.")]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Render every paired notebook and write posts (default)
    Convert,
    /// List paired and unpaired files without writing anything
    Check,
    /// Print a stock nb2post.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Convert) {
        Command::Convert => {
            let config = resolve_config(&cli.run)?;
            let renderer = MarkdownRenderer::new();
            println!("==> Converting {}", config.paths.notebooks.display());
            let summary = convert::run(&config, &renderer, |event| {
                output::print_convert_event(&event)
            })?;
            println!("{}", output::format_summary(&summary));
        }
        Command::Check => {
            let config = resolve_config(&cli.run)?;
            println!("==> Checking {}", config.paths.notebooks.display());
            let report = scan::scan(&config.paths.notebooks, &config.naming)?;
            output::print_scan_report(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file, then apply command-line overrides.
fn resolve_config(args: &RunArgs) -> Result<ConvertConfig, ConfigError> {
    let mut config = config::load_config(&args.config)?;
    if let Some(dir) = &args.notebooks {
        config.paths.notebooks = dir.clone();
    }
    if let Some(dir) = &args.posts {
        config.paths.posts = dir.clone();
    }
    if let Some(dir) = &args.images {
        config.paths.images = dir.clone();
    }
    if args.keep_going {
        config.run.keep_going = true;
    }
    Ok(config)
}
