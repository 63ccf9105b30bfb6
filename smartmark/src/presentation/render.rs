// smartmark/src/presentation/render.rs
use std::io;

use termcolor::{Color, ColorSpec, WriteColor};

use crate::domain::user::User;
use crate::presentation::form::FormState;
use crate::presentation::list_view::{ListEntry, ListState};
use crate::presentation::page::Page;
use crate::presentation::session_view::SessionState;

pub const APP_TITLE: &str = "Smart Bookmark App";
pub const EMPTY_LIST: &str = "No bookmarks yet. Add your first bookmark above!";

fn colored<W: WriteColor>(out: &mut W, color: Color, bold: bool, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold))?;
    write!(out, "{}", text)?;
    out.reset()
}

fn header<W: WriteColor>(out: &mut W, user: Option<&User>) -> io::Result<()> {
    colored(out, Color::Blue, true, APP_TITLE)?;
    if let Some(user) = user {
        write!(out, "  ")?;
        if let Some(avatar) = &user.avatar_url {
            write!(out, "<{}> ", avatar)?;
        }
        write!(out, "{}  ", user.display_name())?;
        colored(out, Color::White, false, "[Sign Out]")?;
    }
    writeln!(out)?;
    writeln!(out)
}

fn welcome<W: WriteColor>(out: &mut W) -> io::Result<()> {
    colored(out, Color::White, true, &format!("Welcome to {}", APP_TITLE))?;
    writeln!(out)?;
    writeln!(out, "Sign in with Google to start saving your bookmarks")?;
    colored(out, Color::Blue, false, "[Sign in with Google]")?;
    writeln!(out)
}

fn form<W: WriteColor>(out: &mut W, form: &FormState) -> io::Result<()> {
    colored(out, Color::White, true, "Add New Bookmark")?;
    writeln!(out)?;
    writeln!(out, "  Title: {}", form.title())?;
    writeln!(out, "  URL:   {}", form.url())?;
    write!(out, "  ")?;
    colored(out, Color::Blue, false, &format!("[{}]", form.submit_label()))?;
    writeln!(out)?;
    writeln!(out)
}

/// Renders one list entry; pending entries are marked until confirmed
pub fn entry<W: WriteColor>(out: &mut W, entry: &ListEntry) -> io::Result<()> {
    match entry.id() {
        Some(id) => colored(out, Color::White, false, &format!("[{}] ", id))?,
        None => colored(out, Color::Yellow, false, "[saving] ")?,
    }
    colored(out, Color::Green, true, entry.title())?;
    writeln!(out)?;
    write!(out, "    ")?;
    colored(out, Color::Yellow, false, entry.url())?;
    writeln!(out)
}

pub fn list<W: WriteColor>(out: &mut W, list: &ListState) -> io::Result<()> {
    colored(out, Color::White, true, "Your Bookmarks")?;
    writeln!(out)?;
    if list.is_loading() {
        return writeln!(out, "Loading bookmarks...");
    }
    if list.is_empty() {
        return writeln!(out, "{}", EMPTY_LIST);
    }
    for e in list.entries() {
        entry(out, e)?;
    }
    Ok(())
}

pub fn render_page<W: WriteColor>(out: &mut W, page: &Page) -> io::Result<()> {
    match page.session() {
        SessionState::Uninitialized => {
            header(out, None)?;
            writeln!(out, "Loading...")?;
        }
        SessionState::Unauthenticated => {
            header(out, None)?;
            welcome(out)?;
        }
        SessionState::Authenticated(user) => {
            header(out, Some(user))?;
            form(out, page.form())?;
            if let Some(l) = page.list() {
                list(out, l)?;
            }
        }
    }
    out.flush()
}
