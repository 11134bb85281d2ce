//! XHS Templates CLI
//!
//! Usage:
//!   xhs-templates [OPTIONS] [NAME]
//!
//! Options:
//!   -r, --root <DIR>     Root directory holding the bundled templates/ folder
//!   -l, --list           List available templates
//!   -j, --json           Print the resolved template as JSON
//!   -c, --check <FILE>   Validate a single templates file and exit
//!   -v, --verbose        Debug logging on stderr
//!   -h, --help           Print help

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use xhs_templates::{load_file, LoadedTemplates, LoaderConfig, ResolutionCache, TemplateLoader};

#[derive(Parser)]
#[command(name = "xhs-templates")]
#[command(about = "Resolve inheritable prompt templates")]
struct Cli {
    /// Template to show (falls back to the configured default)
    name: Option<String>,

    /// Root directory holding the bundled templates/ folder
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// List available templates
    #[arg(short, long)]
    list: bool,

    /// Print the resolved template as JSON
    #[arg(short, long)]
    json: bool,

    /// Validate a single templates file and exit
    #[arg(short, long)]
    check: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Log filter: `RUST_LOG` if set, else warnings; `-v` adds debug on top
fn log_filter(verbose: bool) -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    if verbose {
        filter.add_directive(LevelFilter::DEBUG.into())
    } else {
        filter
    }
}

fn setup_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(verbose))
        .init();

    debug!("Logging initialized (verbose: {})", verbose);
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Some(path) = &cli.check {
        std::process::exit(check(path));
    }

    let root = cli.root.clone().unwrap_or_else(default_root);
    info!(root = %root.display(), "Loading templates");

    let mut cache = ResolutionCache::new();
    let templates = TemplateLoader::new(LoaderConfig::new(root)).load(&mut cache);

    if cli.list {
        print_list(&templates);
        return;
    }

    let Some(template) = templates.select(cli.name.as_deref()) else {
        eprintln!(
            "Error: no template named '{}' and no default template in {}",
            cli.name.as_deref().unwrap_or(templates.default_template_name()),
            templates.source()
        );
        std::process::exit(1);
    };

    if cli.json {
        match serde_json::to_string_pretty(template) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Some(requested) = cli.name.as_deref() {
        if requested != template.name {
            eprintln!("Template '{}' not found, using '{}'", requested, template.name);
        }
    }

    println!("template:     {}", template.name);
    if let Some(label) = &template.label {
        println!("label:        {}", label);
    }
    println!("aspect ratio: {}", templates.aspect_ratio_for(template));
    println!("source:       {}", templates.source());
    if let Some(prompt) = &template.prompt {
        println!("\nprompt:\n{}", prompt);
    }
    if let Some(negative) = &template.negative {
        println!("\nnegative:\n{}", negative);
    }
}

/// Directory above the executable's own directory, like an installed bundle
fn default_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_list(templates: &LoadedTemplates) {
    println!("Templates from {}:", templates.source());
    if templates.registry().is_empty() {
        println!("  (none)");
        return;
    }
    let default = templates.default_template_name();
    for resolved in templates.registry().iter() {
        let marker = if resolved.name == default { "*" } else { " " };
        match &resolved.label {
            Some(label) => println!("{} {:<20} {}", marker, resolved.name, label),
            None => println!("{} {}", marker, resolved.name),
        }
    }
}

/// Strictly validate one file; returns the process exit code
fn check(path: &Path) -> i32 {
    match load_file(path) {
        Ok(loaded) => {
            println!("{}: {} templates OK", path.display(), loaded.registry().len());
            0
        }
        Err(e) => {
            let content = fs::read_to_string(path).unwrap_or_default();
            eprintln!("{}", e.format(&content, &path.display().to_string()).trim_end());
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_rust_log_respected_without_verbose() {
        std::env::set_var("RUST_LOG", "debug");
        let filter = log_filter(false).to_string();
        std::env::remove_var("RUST_LOG");

        assert_eq!(filter, "debug");
    }

    #[test]
    #[serial]
    fn test_default_filter_is_warn() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(log_filter(false).to_string(), "warn");
        assert!(log_filter(true).to_string().contains("debug"));
    }
}
