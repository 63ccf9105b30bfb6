// src/cli/args.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Save, list and share bookmarks across sessions, live
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,

    #[arg(long = "no-color", help = "disable colored output")]
    pub no_color: bool,

    #[arg(long = "generate-config", help = "print the default configuration")]
    pub generate_config: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Creates a new, empty database
    CreateDb {
        /// Path of the database file
        path: String,
    },
    /// Signs in through an identity provider
    Login {
        #[arg(short = 'p', long = "provider", help = "identity provider, default: google")]
        provider: Option<String>,
    },
    /// Ends the session
    Logout,
    /// Shows the signed-in user
    Whoami,
    /// Adds a bookmark
    Add {
        /// URL of the bookmark
        url: String,

        #[arg(short = 't', long = "title", help = "title of the bookmark")]
        title: String,
    },
    /// Lists your bookmarks, newest first
    List {
        #[arg(long = "json", help = "output as json")]
        is_json: bool,
    },
    /// Deletes bookmarks
    Delete {
        /// list of ids, separated by comma, no blanks
        ids: String,
    },
    /// Opens a bookmark in the browser
    Open {
        /// id of the bookmark
        id: String,
    },
    /// Shows the page and follows changes until Ctrl-C
    Watch,
    /// Generates shell completion scripts
    Completion {
        /// Shell to generate completions for (bash, zsh, fish)
        shell: String,
    },
}
