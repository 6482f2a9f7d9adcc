//! # CLI
//!
//! This module defines the command-line interface of `protocall` using `clap`.
//!
//! Every command takes the root `.proto` file to load; imports are searched in the `-I`
//! directories first and then next to the root file. `-I` belongs to `protocall` itself and
//! goes before the subcommand, so every directory lands in one ordered list.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "protocall",
    version,
    about = "Call unary gRPC methods of .proto files loaded at runtime"
)]
pub struct Cli {
    /// Directory to search for imports (repeatable, searched in order)
    #[arg(
        short = 'I',
        long = "import-path",
        env = "PROTOCALL_IMPORT_PATH",
        value_delimiter = ':'
    )]
    pub import_path: Vec<PathBuf>,

    /// Log loader and transport activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the services declared in a proto file and their methods
    Services {
        /// Root proto file
        proto: PathBuf,
    },

    /// Print the zero-valued JSON request of a method
    ///
    /// The output can be edited and passed back to `call` with `--body-file`.
    Template {
        /// Root proto file
        proto: PathBuf,
        /// Endpoint (package.Service/Method)
        #[arg(value_parser = parse_endpoint)]
        endpoint: (String, String),
    },

    /// Perform a unary gRPC call
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// protocall call greeter.proto helloworld.Greeter/SayHello \
    ///     --address localhost:50051 --body '{"name": "world"}'
    /// ```
    Call {
        /// Root proto file
        proto: PathBuf,
        /// Endpoint (package.Service/Method)
        #[arg(value_parser = parse_endpoint)]
        endpoint: (String, String),
        /// Server address (host:port or a full http:// URI)
        #[arg(short, long)]
        address: String,
        /// JSON request body. Without a body the zero-valued request is sent
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,
        /// Read the JSON request body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
}

fn parse_endpoint(value: &str) -> Result<(String, String), String> {
    let (service, method) = value.rsplit_once('/').ok_or_else(|| {
        format!("Invalid endpoint format: '{value}'. Expected 'package.Service/Method'")
    })?;

    if service.trim().is_empty() || method.trim().is_empty() {
        return Err("Service and Method names cannot be empty".to_string());
    }

    Ok((service.to_string(), method.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn endpoint_is_split_on_the_last_slash() {
        assert_eq!(
            parse_endpoint("pkg.Svc/Get"),
            Ok(("pkg.Svc".to_string(), "Get".to_string()))
        );
        assert!(parse_endpoint("pkg.Svc").is_err());
        assert!(parse_endpoint("pkg.Svc/").is_err());
        assert!(parse_endpoint("/Get").is_err());
    }

    #[test]
    fn import_path_is_repeatable_and_keeps_order() {
        let cli = Cli::try_parse_from([
            "protocall",
            "-I",
            "protos",
            "--import-path",
            "vendor",
            "-I",
            "third_party",
            "services",
            "svc.proto",
        ])
        .unwrap();

        assert_eq!(
            cli.import_path,
            [
                PathBuf::from("protos"),
                PathBuf::from("vendor"),
                PathBuf::from("third_party"),
            ]
        );
        assert!(matches!(cli.command, Commands::Services { .. }));
    }

    #[test]
    fn import_path_after_the_subcommand_is_rejected() {
        let result = Cli::try_parse_from([
            "protocall",
            "-I",
            "protos",
            "services",
            "svc.proto",
            "-I",
            "vendor",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn body_and_body_file_are_exclusive() {
        let result = Cli::try_parse_from([
            "protocall",
            "call",
            "svc.proto",
            "pkg.Svc/Get",
            "--address",
            "localhost:50051",
            "--body",
            "{}",
            "--body-file",
            "body.json",
        ]);
        assert!(result.is_err());
    }
}
