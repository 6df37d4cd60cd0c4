use colored::Colorize;
use dotenv_loadr::{
    ConfigError, EnvFileResolver, Environment, ProcessEnv, Startup, candidate_files,
    resolve_environment, resolve_root,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = match std::env::args().nth(1) {
        Some(arg) => match arg.as_str() {
            "files" => show_files(),
            "load" => apply(false),
            "overload" => apply(true),
            "startup" => startup(),
            _ => {
                eprintln!(
                    "unknown arg: {}. Available: files, load, overload, startup",
                    arg
                );
                std::process::exit(2);
            }
        },
        None => {
            println!("Usage: dotenv-loadr [command] [environment]");
            println!("Commands:");
            println!("  files    - List candidate env files, most specific first");
            println!("  load     - Load env files without replacing set variables");
            println!("  overload - Overload env files, most specific file last");
            println!("  startup  - Run the startup hook (container-aware mode)");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprint!("{}", e);
        std::process::exit(1);
    }
}

/// Environment from the second argument, falling back to `APP_ENV`
fn inputs() -> Result<(Environment, PathBuf), ConfigError> {
    let environment = match std::env::args().nth(2) {
        Some(name) => name.parse()?,
        None => resolve_environment(&ProcessEnv)?,
    };
    let root = resolve_root(None, &ProcessEnv)?;
    Ok((environment, root))
}

fn show_files() -> Result<(), ConfigError> {
    let (environment, root) = inputs()?;
    println!("Candidate env files for {}:", environment.to_string().cyan());
    for file in candidate_files(&environment, &root) {
        let marker = if file.exists() {
            "✓".green()
        } else {
            "-".dimmed()
        };
        println!("  {} {} ({})", marker, file.display(), file.kind);
    }
    Ok(())
}

fn apply(overload: bool) -> Result<(), ConfigError> {
    let (environment, root) = inputs()?;
    let mut resolver = EnvFileResolver::process();
    let files = if overload {
        resolver.overload(&environment, &root)?
    } else {
        resolver.load(&environment, &root)?
    };
    print_applied(&files);
    Ok(())
}

fn startup() -> Result<(), ConfigError> {
    let report = Startup::new().run()?;
    println!(
        "{} {} in {}",
        report.mode.to_string().cyan().bold(),
        report.environment,
        report.root.display()
    );
    print_applied(&report.files);
    Ok(())
}

fn print_applied(files: &[PathBuf]) {
    if files.is_empty() {
        println!("No env files found");
        return;
    }
    for file in files {
        println!("  ✓ {}", file.display().to_string().green());
    }
}
