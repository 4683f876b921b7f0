//! CLI module for Critic.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{format_size, Output};

use clap::{Parser, Subcommand};

/// Critic - AI-powered media critique
///
/// Upload an image or a video and get creative feedback from a Gemini-backed
/// agent that can research references on the web.
#[derive(Parser, Debug)]
#[command(name = "critic")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Critique a local image or video file
    Critique {
        /// Image (jpg, jpeg, png) or video (mp4, mov, avi) file
        file: String,

        /// What you would like critiqued (e.g. "Analyze the composition and lighting")
        #[arg(short, long)]
        prompt: String,

        /// Critique mode (image or video); defaults to the one implied by the file extension
        #[arg(short, long)]
        mode: Option<String>,

        /// Google API key
        #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Start the web UI
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration and credentials
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
