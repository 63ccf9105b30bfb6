// src/cli/commands.rs
//! Each command mounts a `Page` over the configured provider, drives it
//! like a user would and reports through the page's notices.

use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use termcolor::{ColorChoice, StandardStream};
use tracing::{debug, instrument};

use crate::cli::error::{CliError, CliResult};
use crate::config::Settings;
use crate::domain::bookmark::{Bookmark, BookmarkId};
use crate::domain::session_provider::AuthProvider;
use crate::infrastructure::accounts::AccountDirectory;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::sqlite::SqliteSessionProvider;
use crate::presentation::notice::{TerminalNotifier, AUTH_ERROR, LOGGED_OUT, LOGOUT_FAILED};
use crate::presentation::page::{Page, PageSettings, Step};
use crate::presentation::render;
use crate::util::helper::parse_ids;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

pub fn color_choice(no_color: bool) -> ColorChoice {
    if no_color || !std::io::stdout().is_terminal() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Mounted page with a resolved session
async fn open_page(services: &ServiceContainer, settings: &Settings, color: ColorChoice) -> CliResult<Page> {
    let mut page = Page::new(
        services.bookmark_store.clone(),
        Arc::new(TerminalNotifier::new(color)),
        PageSettings::from(settings),
    );
    page.mount();
    if !page
        .wait_for(COMMAND_TIMEOUT, |p| !p.session().is_loading())
        .await
    {
        return Err(CliError::CommandFailed("Timed out resolving session".to_string()));
    }
    Ok(page)
}

/// Mounted page of a signed-in user whose list has loaded
async fn open_list(services: &ServiceContainer, settings: &Settings, color: ColorChoice) -> CliResult<Page> {
    let mut page = open_page(services, settings, color).await?;
    if page.session().user().is_none() {
        return Err(CliError::NotSignedIn);
    }
    let loaded = page
        .wait_for(COMMAND_TIMEOUT, |p| p.list().is_some_and(|l| !l.is_loading()))
        .await;
    if !loaded {
        return Err(CliError::CommandFailed("Timed out loading bookmarks".to_string()));
    }
    Ok(page)
}

fn failed_notice(page: &Page) -> Option<String> {
    page.last_notice()
        .filter(|n| n.is_error())
        .map(|n| n.message.clone())
}

fn saved_bookmarks(page: &Page) -> Vec<Bookmark> {
    page.list()
        .map(|l| l.saved().cloned().collect())
        .unwrap_or_default()
}

#[instrument(level = "debug")]
pub fn create_db(path: &str) -> CliResult<()> {
    if Path::new(path).exists() {
        return Err(CliError::InvalidInput(format!(
            "Database already exists at: {}. Please choose a different path or delete the existing file.",
            path
        )));
    }

    println!("Creating new database at: {}", path);
    SqliteSessionProvider::from_url(path, AccountDirectory::default())?;
    println!("Database created successfully at: {}", path);
    Ok(())
}

#[instrument(skip(services, settings), level = "debug")]
pub async fn login(
    services: &ServiceContainer,
    settings: &Settings,
    provider: Option<String>,
) -> CliResult<()> {
    let provider = provider
        .map(AuthProvider::new)
        .unwrap_or_else(|| settings.default_auth_provider());
    let store = &services.bookmark_store;

    store
        .sign_in(&provider)
        .await
        .map_err(|e| CliError::CommandFailed(format!("{}: {}", AUTH_ERROR, e)))?;
    let user = store.current_user().await?.ok_or(CliError::NotSignedIn)?;
    println!("Signed in as {}", user);
    Ok(())
}

#[instrument(skip(services, settings), level = "debug")]
pub async fn logout(services: &ServiceContainer, settings: &Settings, color: ColorChoice) -> CliResult<()> {
    let mut page = open_page(services, settings, color).await?;
    page.sign_out();
    let settled = |p: &Page| {
        p.last_notice()
            .is_some_and(|n| n.message == LOGGED_OUT || n.message == LOGOUT_FAILED)
    };
    if !page.wait_for(COMMAND_TIMEOUT, settled).await {
        return Err(CliError::CommandFailed("Timed out signing out".to_string()));
    }
    match failed_notice(&page) {
        Some(message) => Err(CliError::CommandFailed(message)),
        None => Ok(()),
    }
}

pub async fn whoami(services: &ServiceContainer, settings: &Settings, color: ColorChoice) -> CliResult<()> {
    let page = open_page(services, settings, color).await?;
    let user = page.session().user().ok_or(CliError::NotSignedIn)?;
    println!("{}", user);
    Ok(())
}

#[instrument(skip(services, settings), level = "debug")]
pub async fn add(
    services: &ServiceContainer,
    settings: &Settings,
    color: ColorChoice,
    url: &str,
    title: &str,
) -> CliResult<()> {
    let mut page = open_list(services, settings, color).await?;
    page.set_title(title);
    page.set_url(url);

    if !page.submit() {
        return Err(CliError::InvalidInput(
            failed_notice(&page).unwrap_or_else(|| "Submission rejected".to_string()),
        ));
    }
    if !page
        .wait_for(COMMAND_TIMEOUT, |p| !p.form().is_in_flight())
        .await
    {
        return Err(CliError::CommandFailed("Timed out adding bookmark".to_string()));
    }
    if let Some(message) = failed_notice(&page) {
        return Err(CliError::CommandFailed(message));
    }

    if let Some(bookmark) = saved_bookmarks(&page)
        .into_iter()
        .find(|b| b.title == title && b.url == url)
    {
        println!("{}", bookmark.id);
    }
    Ok(())
}

#[instrument(skip(services, settings), level = "debug")]
pub async fn list(
    services: &ServiceContainer,
    settings: &Settings,
    color: ColorChoice,
    is_json: bool,
) -> CliResult<()> {
    let page = open_list(services, settings, color).await?;
    if let Some(message) = failed_notice(&page) {
        return Err(CliError::CommandFailed(message));
    }

    if is_json {
        let json = serde_json::to_string_pretty(&saved_bookmarks(&page))
            .map_err(|e| CliError::CommandFailed(format!("Cannot serialize bookmarks: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    let mut stdout = StandardStream::stdout(color);
    if let Some(l) = page.list() {
        render::list(&mut stdout, l)?;
    }
    Ok(())
}

#[instrument(skip(services, settings), level = "debug")]
pub async fn delete(
    services: &ServiceContainer,
    settings: &Settings,
    color: ColorChoice,
    ids: &str,
) -> CliResult<()> {
    let ids = parse_ids(ids)?;
    let mut page = open_list(services, settings, color).await?;

    for id in ids {
        if !page.list().is_some_and(|l| l.contains(id)) {
            eprintln!("Bookmark with ID {} not found", id);
            continue;
        }
        page.delete(id);
        let gone = page
            .wait_for(COMMAND_TIMEOUT, |p| {
                !p.list().is_some_and(|l| l.contains(id)) || failed_notice(p).is_some()
            })
            .await;
        if let Some(message) = failed_notice(&page) {
            return Err(CliError::CommandFailed(format!("{} {}", message, id)));
        }
        if !gone {
            return Err(CliError::CommandFailed(format!("Timed out deleting bookmark {}", id)));
        }
        println!("Deleted bookmark with ID {}", id);
    }
    Ok(())
}

#[instrument(skip(services, settings), level = "debug")]
pub async fn open(
    services: &ServiceContainer,
    settings: &Settings,
    color: ColorChoice,
    id: &str,
) -> CliResult<()> {
    let id: BookmarkId = id.parse()?;
    let page = open_list(services, settings, color).await?;
    let bookmark = saved_bookmarks(&page)
        .into_iter()
        .find(|b| b.id == id)
        .ok_or_else(|| CliError::InvalidInput(format!("Bookmark with ID {} not found", id)))?;

    debug!("Opening {}", bookmark.url);
    open::that(&bookmark.url)
        .map_err(|e| CliError::CommandFailed(format!("Cannot open {}: {}", bookmark.url, e)))?;
    Ok(())
}

/// Renders the page after every change until Ctrl-C
#[instrument(skip(services, settings), level = "debug")]
pub async fn watch(services: &ServiceContainer, settings: &Settings, color: ColorChoice) -> CliResult<()> {
    let mut page = Page::new(
        services.bookmark_store.clone(),
        Arc::new(TerminalNotifier::new(color)),
        PageSettings::from(settings),
    );
    page.mount();
    let interactive = std::io::stdout().is_terminal();
    let mut stdout = StandardStream::stdout(color);
    redraw(&mut stdout, &page, interactive)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                page.teardown();
                return Err(CliError::OperationAborted);
            }
            step = page.pump() => match step {
                Step::Closed => return Ok(()),
                Step::Tick => {}
                _ => redraw(&mut stdout, &page, interactive)?,
            }
        }
    }
}

fn redraw(stdout: &mut StandardStream, page: &Page, interactive: bool) -> CliResult<()> {
    if interactive {
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    }
    render::render_page(stdout, page)?;
    stdout.flush()?;
    Ok(())
}
