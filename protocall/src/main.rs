//! # Protocall CLI Entry Point
//!
//! The main executable for the Protocall tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs the
//!    stderr log subscriber.
//! 2. **Loading**: Loads the root proto file and its imports via `protocall_core`.
//! 3. **Execution**: Lists services, renders a request template, or performs a unary call.
//! 4. **Presentation**: Formats and prints the result or error to standard output/error.
//!
//! Calls block the main thread for the whole round trip; no async runtime is set up here.

mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use formatter::{FormattedString, GenericError};
use protocall_core::{
    invoke::{InvocationEngine, request_template},
    prost_reflect::MethodDescriptor,
    schema::{ImportPath, Schema, load},
};
use std::{
    path::{Path, PathBuf},
    process,
};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let import_path = ImportPath::from(args.import_path);

    match args.command {
        Commands::Services { proto } => list_services(&proto, &import_path),
        Commands::Template { proto, endpoint } => {
            let (service, method) = endpoint;
            print_template(&proto, &import_path, &service, &method)
        }
        Commands::Call {
            proto,
            endpoint,
            address,
            body,
            body_file,
        } => {
            let (service, method) = endpoint;
            let method = find_method_or_exit(&proto, &import_path, &service, &method);
            run_call(&method, &address, body, body_file)
        }
    }
}

/// `RUST_LOG` wins unless `-v` is given; without either only warnings are shown.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_or_exit(proto: &Path, import_path: &ImportPath) -> Schema {
    match load(proto, import_path) {
        Ok(schema) => schema,
        Err(errors) => {
            eprintln!("{}", FormattedString::from(errors));
            process::exit(1);
        }
    }
}

fn find_method_or_exit(
    proto: &Path,
    import_path: &ImportPath,
    service: &str,
    method: &str,
) -> MethodDescriptor {
    let schema = load_or_exit(proto, import_path);
    let tree = schema.service_tree();

    match tree
        .find_method(service, method)
        .and_then(|handle| tree.resolve_selection(handle))
    {
        Some(method) => method,
        None => {
            let err = GenericError("Method not found", format!("{service}/{method}"));
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

fn list_services(proto: &Path, import_path: &ImportPath) {
    let schema = load_or_exit(proto, import_path);
    println!("{}", FormattedString::from(schema.service_tree()));
}

fn print_template(proto: &Path, import_path: &ImportPath, service: &str, method: &str) {
    let method = find_method_or_exit(proto, import_path, service, method);

    match request_template(&method) {
        // Plain output so it can be redirected into a body file.
        Ok(text) => println!("{text}"),
        Err(err) => {
            eprintln!(
                "{}",
                FormattedString::from(GenericError("Failed to render request template", err))
            );
            process::exit(1);
        }
    }
}

fn run_call(
    method: &MethodDescriptor,
    address: &str,
    body: Option<String>,
    body_file: Option<PathBuf>,
) {
    let body = match request_body(method, body, body_file) {
        Ok(body) => body,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    };

    let mut engine = match InvocationEngine::grpc() {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!(
                "{}",
                FormattedString::from(GenericError("Failed to start the transport", err))
            );
            process::exit(1);
        }
    };

    let outcome = engine.invoke(method, &body, address);
    let success = outcome.is_success();
    println!("{}", FormattedString::from(outcome));

    if !success {
        process::exit(1);
    }
}

fn request_body(
    method: &MethodDescriptor,
    body: Option<String>,
    body_file: Option<PathBuf>,
) -> anyhow::Result<String> {
    if let Some(body) = body {
        return Ok(body);
    }

    match body_file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read request body from '{}'", path.display())),
        None => request_template(method).context("failed to build the default request"),
    }
}
