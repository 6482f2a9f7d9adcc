use colored::*;
use protocall_core::{
    invoke::InvocationOutcome,
    prost_reflect::MethodDescriptor,
    schema::{LoadErrors, ServiceTree},
};
use std::fmt::Display;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<LoadErrors> for FormattedString {
    fn from(errors: LoadErrors) -> Self {
        let mut out = format!("{}\n", "Failed to load schema:".red().bold());
        for err in &errors {
            out.push_str(&format!("\n  - {err}"));
        }
        FormattedString(out)
    }
}

impl From<ServiceTree> for FormattedString {
    fn from(tree: ServiceTree) -> Self {
        if tree.is_empty() {
            return FormattedString("No services found.".yellow().to_string());
        }

        let mut out = String::new();
        for node in tree.services() {
            out.push_str(&format!(
                "{} {} {{\n",
                "service".cyan(),
                node.service().full_name().green()
            ));
            for method in node.methods() {
                out.push_str(&format!("  {}\n", FormattedString::from(method.clone()).0));
            }
            out.push_str("}\n\n");
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<MethodDescriptor> for FormattedString {
    fn from(method: MethodDescriptor) -> Self {
        let stream = |streaming: bool| {
            if streaming {
                format!("{} ", "stream".cyan())
            } else {
                String::new()
            }
        };

        let mut line = format!(
            "{} {}({}{}) {} ({}{});",
            "rpc".cyan(),
            method.name().green(),
            stream(method.is_client_streaming()),
            method.input().full_name(),
            "returns".cyan(),
            stream(method.is_server_streaming()),
            method.output().full_name(),
        );
        if method.is_client_streaming() || method.is_server_streaming() {
            line.push_str(&format!(" {}", "// not callable".dimmed()));
        }
        FormattedString(line)
    }
}

impl From<InvocationOutcome> for FormattedString {
    fn from(outcome: InvocationOutcome) -> Self {
        match &outcome {
            InvocationOutcome::Success(text) => FormattedString(text.clone()),
            InvocationOutcome::RequestParseFailure(_) => FormattedString(format!(
                "{}\n\n{}",
                "Invalid Request:".red().bold(),
                outcome.to_text()
            )),
            InvocationOutcome::TransportFailure(_) => FormattedString(format!(
                "{}\n\n{}",
                "gRPC Failed:".red().bold(),
                outcome.to_text()
            )),
        }
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        FormattedString(format!("{}\n\n'{:#}'", "Error:".red().bold(), err))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}
