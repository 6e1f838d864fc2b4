//! Error kinds that end a run, and how they are reported.

use std::fmt;

use console::style;
use pierkube::MergeError;

/// What went wrong, attached as context to the underlying error so `main` can
/// pick an exit status.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no Palette credential found (set PALETTE_API_KEY or PALETTE_TOKEN, or sign in to {host} in a browser)")]
    NoCredential { host: String },
    #[error("could not list projects")]
    ListProjects,
    #[error("could not search clusters in project {project}")]
    SearchClusters { project: String },
    #[error("could not fetch the kubeconfig of cluster {cluster}")]
    FetchKubeconfig { cluster: String },
    #[error("could not parse the kubeconfig of cluster {cluster}")]
    ParseKubeconfig { cluster: String },
    #[error("could not write the merged kubeconfig")]
    Output,
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NoCredential { .. } => 2,
            Error::ListProjects | Error::SearchClusters { .. } | Error::FetchKubeconfig { .. } => 3,
            Error::ParseKubeconfig { .. } => 4,
            Error::Output => 6,
        }
    }
}

/// Exit status for an error that stopped the run.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(err) = err.downcast_ref::<Error>() {
        err.exit_code()
    } else if err.downcast_ref::<MergeError>().is_some() {
        5
    } else {
        1
    }
}

/// Displays an error followed by each of its causes.
pub struct DisplayCauses<'a>(pub &'a anyhow::Error);

impl fmt::Display for DisplayCauses<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", style("ERROR:").red().bold(), self.0)?;
        for cause in self.0.chain().skip(1) {
            writeln!(f, "  caused by: {}", cause)?;
        }
        Ok(())
    }
}
