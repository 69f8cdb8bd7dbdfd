//! `rac` - compile and run ABAP code on a remote system.
//!
//! # Usage
//!
//! ```bash
//! # Prompts for the password
//! rac compile hello.abap -u https://host:44300 -n DEVELOPER -c 001
//!
//! # Structured output, credentials from the environment
//! ADT_URL=https://host:44300 ADT_USER=DEVELOPER ADT_CLIENT=001 ADT_PASS=... rac compile hello.abap --json
//! ```
//!
//! Exits with 0 when the code compiled and ran, 1 otherwise.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rac_adt::AdtClient;
use rac_compiler::{CompilationRequest, UnitSettings};
use rac_core::{CompilationResult, ConnectionConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "rac", version, about = "Remote ABAP compiler")]
struct Cli {
    /// Log every remote step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile an ABAP source file and run it
    Compile(CompileArgs),
}

#[derive(Debug, Args)]
struct CompileArgs {
    /// Source file defining a local class MAIN with a public method RUN
    file: PathBuf,

    /// Server URL, e.g. https://host:44300
    #[arg(short = 'u', long, env = "ADT_URL")]
    url: String,

    /// User name
    #[arg(short = 'n', long, env = "ADT_USER")]
    user: String,

    /// Logon client
    #[arg(short = 'c', long, env = "ADT_CLIENT")]
    client: String,

    /// Password; prompted for when absent
    #[arg(short = 'p', long, env = "ADT_PASS", hide_env_values = true)]
    password: Option<String>,

    /// Prefix of the throwaway class name
    #[arg(long, env = "ADT_CLASS_PREFIX", default_value = "RAC_")]
    prefix: String,

    /// Package the throwaway class is created in
    #[arg(long, env = "ADT_PACKAGE", default_value = "$TMP")]
    package: String,

    /// Transport request, for packages that record changes
    #[arg(long, env = "ADT_TRANSPORT")]
    transport: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    insecure: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Compile(args) => runtime.block_on(compile(args)),
    }
}

/// `RAC_LOG` wins over `RUST_LOG`; without either, only warnings are shown.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("RAC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

async fn compile(args: CompileArgs) -> ExitCode {
    let source = match read_source(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let password = match args.password.clone() {
        Some(password) => password,
        None => match dialoguer::Password::new().with_prompt("Password").interact() {
            Ok(password) => password,
            Err(_) => {
                eprintln!("Cancelled");
                return ExitCode::FAILURE;
            }
        },
    };

    match run(&args, password, &source).await {
        Ok(result) => {
            match render(&result, args.json) {
                Ok(report) => print!("{}", report),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    args: &CompileArgs,
    password: String,
    source: &str,
) -> Result<CompilationResult, Box<dyn std::error::Error>> {
    let config = ConnectionConfig {
        accept_invalid_certs: args.insecure,
        ..ConnectionConfig::new(&args.url, &args.user, password, &args.client)
    };
    let client = AdtClient::new(&config)?;
    let request = CompilationRequest::new(client, &unit_settings(args))?;
    Ok(request.compile(source).await?)
}

fn unit_settings(args: &CompileArgs) -> UnitSettings {
    UnitSettings::new(&args.prefix, &args.package, args.transport.clone())
}

fn read_source(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("Cannot read {}: {}", path.display(), e))
}

fn render(result: &CompilationResult, json: bool) -> Result<String, serde_json::Error> {
    if json {
        let mut out = serde_json::to_string_pretty(result)?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(result.format_report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use rac_core::CompilationError;

    fn parse(extra: &[&str]) -> CompileArgs {
        let mut argv = vec![
            "rac", "compile", "hello.abap", "-u", "https://host:44300", "-n", "DEVELOPER", "-c",
            "001", "-p", "secret",
        ];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Compile(args) => args,
        }
    }

    #[test]
    fn test_parse_compile() {
        let args = parse(&["--transport", "NPLK900001", "--json"]);
        assert_eq!(args.file, PathBuf::from("hello.abap"));
        assert_eq!(args.url, "https://host:44300");
        assert_eq!(args.user, "DEVELOPER");
        assert_eq!(args.client, "001");
        assert_eq!(args.password.as_deref(), Some("secret"));
        assert!(args.json);
        assert!(!args.insecure);

        let settings = unit_settings(&args);
        assert_eq!(settings.transport.as_deref(), Some("NPLK900001"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_transport_is_dropped() {
        let args = parse(&["--transport", "", "--prefix", "ZRAC_", "--package", "ZPKG"]);
        let settings = unit_settings(&args);
        assert_eq!(settings.transport, None);
        assert_eq!(settings.class_prefix, "ZRAC_");
        assert_eq!(settings.package, "ZPKG");
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from([
            "rac", "compile", "x.abap", "-u", "https://h", "-n", "U", "-c", "001", "-p", "x", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_read_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "class main definition.").unwrap();
        assert_eq!(read_source(file.path()).unwrap(), "class main definition.");

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.abap");
        assert!(read_source(&missing).unwrap_err().starts_with("Cannot read"));
    }

    #[test]
    fn test_render() {
        let ok = CompilationResult::succeeded("RAC_X").with_output("Hello World\n".to_string());
        assert_eq!(render(&ok, false).unwrap(), "Ok\nHello World\n");

        let failed = CompilationResult::failed(
            "RAC_X",
            vec![CompilationError::at("Statement is not well-formed.", 4, 6)],
        );
        assert_eq!(
            render(&failed, false).unwrap(),
            "Line: 4 Offset: 6 Error: \"Statement is not well-formed.\".\n"
        );

        let json: serde_json::Value =
            serde_json::from_str(&render(&failed, true).unwrap()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["className"], "RAC_X");
        assert_eq!(json["errors"][0]["errorMessage"], "Statement is not well-formed.");
        assert_eq!(json["errors"][0]["line"], 4);
        assert!(json.get("output").is_none());
    }
}
