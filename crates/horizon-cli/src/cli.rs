use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "horizon")]
#[command(version, about = "Event Horizon - build a web page by chatting with an AI model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Chat completions endpoint URL
    #[arg(long, global = true, env = "HORIZON_API_URL")]
    pub api_url: Option<String>,

    /// API key for the completions endpoint
    #[arg(long, global = true, env = "HORIZON_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name sent with every request
    #[arg(long, global = true, env = "HORIZON_MODEL")]
    pub model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Chat with the model to build a project's page
    Chat(ChatArgs),

    /// Project management
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
}

#[derive(Args, Default)]
pub struct ChatArgs {
    /// Project ID or unique prefix (defaults to the most recent project)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Send a single prompt and exit instead of starting an interactive session
    #[arg(long)]
    pub prompt: Option<String>,
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project
    New {
        /// Project name (defaults to "Project N")
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List projects, most recently updated first
    List,

    /// Show a project and its conversation
    Show { id: String },

    /// Delete a project
    Delete { id: String },

    /// Write a project's HTML document to a file
    Export {
        id: String,

        /// Destination path (defaults to <name>.html in the current directory)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Clear a project's conversation history, keeping its code
    Clear { id: String },
}
