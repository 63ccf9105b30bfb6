// src/cli/mod.rs
use crate::cli::args::{Cli, Commands};
use crate::cli::error::{CliError, CliResult};
use crate::config::Settings;
use crate::infrastructure::di::ServiceContainer;

pub mod args;
pub mod commands;
pub mod completion;
pub mod error;

pub async fn execute_command(cli: Cli, settings: &Settings) -> CliResult<()> {
    if cli.generate_config {
        println!("{}", crate::config::generate_default_config());
        return Ok(());
    }
    let color = commands::color_choice(cli.no_color);

    let command = match cli.command {
        Some(Commands::CreateDb { path }) => {
            return commands::create_db(&path).map_err(|e| e.context("create-db"))
        }
        Some(Commands::Completion { shell }) => return handle_completion(&shell),
        Some(command) => command,
        None => return Ok(()),
    };

    let services =
        ServiceContainer::new(settings).map_err(|e| e.context("Cannot open bookmarks"))?;
    match command {
        Commands::Login { provider } => commands::login(&services, settings, provider).await,
        Commands::Logout => commands::logout(&services, settings, color).await,
        Commands::Whoami => commands::whoami(&services, settings, color).await,
        Commands::Add { url, title } => commands::add(&services, settings, color, &url, &title).await,
        Commands::List { is_json } => commands::list(&services, settings, color, is_json).await,
        Commands::Delete { ids } => commands::delete(&services, settings, color, &ids).await,
        Commands::Open { id } => commands::open(&services, settings, color, &id).await,
        Commands::Watch => commands::watch(&services, settings, color).await,
        Commands::CreateDb { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn handle_completion(shell: &str) -> CliResult<()> {
    match shell.to_lowercase().as_str() {
        "bash" => {
            eprintln!("# Outputting bash completion script for smartmark");
            eprintln!("# To use, run one of:");
            eprintln!("# - eval \"$(smartmark completion bash)\"       # one-time use");
            eprintln!("# - smartmark completion bash >> ~/.bashrc      # add to bashrc");
            eprintln!("#");
        }
        "zsh" => {
            eprintln!("# Outputting zsh completion script for smartmark");
            eprintln!("# To use, run one of:");
            eprintln!("# - eval \"$(smartmark completion zsh)\"        # one-time use");
            eprintln!("# - smartmark completion zsh > ~/.zfunc/_smartmark # save to fpath directory");
            eprintln!("#");
        }
        "fish" => {
            eprintln!("# Outputting fish completion script for smartmark");
            eprintln!("# - smartmark completion fish | source          # one-time use");
            eprintln!("#");
        }
        _ => {}
    }

    completion::generate_completion(shell, &mut std::io::stdout()).map_err(|e| {
        CliError::CommandFailed(format!("Failed to generate completion script: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exitcode;

    fn cli(command: Commands) -> Cli {
        Cli {
            config: None,
            debug: 0,
            no_color: true,
            generate_config: false,
            command: Some(command),
        }
    }

    #[tokio::test]
    async fn given_existing_file_when_create_db_then_error_names_command() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();

        let err = execute_command(cli(Commands::CreateDb { path }), &Settings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::InvalidInput(_)));
        assert!(err.to_string().contains("create-db: Database already exists"));
        assert_eq!(err.exit_code(), exitcode::USAGE);
    }

    #[tokio::test]
    async fn given_missing_database_when_listing_then_error_keeps_hint() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            db_url: dir.path().join("absent.db").to_string_lossy().to_string(),
            ..Settings::default()
        };

        let err = execute_command(cli(Commands::Whoami), &settings)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Cannot open bookmarks"));
        assert!(message.contains("create-db"));
    }
}
