#[macro_use]
extern crate tracing;

mod broadcast;
mod config;
mod format;
mod intake;
mod macros;
mod notifications;
mod sql;
mod timeout;
mod tray;
mod utils;
mod widgets;

use std::cell::RefCell;
use std::rc::Rc;
use gtk4::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigBlacklist, ConfigPreference};
use crate::format::HyperlinkFormatter;
use crate::intake::{Collaborators, Intake};
use crate::sql::actor::SqlActor;
use crate::sql::wrappers::history::SqlHistory;
use crate::tray::UnreadTray;
use crate::widgets::bubbles::BubbleStack;

const APPLICATION_ID: &str = "io.github.bubble_notifier";
const STYLE: &str = include_str!("style.css");

fn apply_style() {
    let Some(display) = gdk4::Display::default() else {
        warn!("No default display, bubbles will be unstyled");
        return;
    };

    let provider = gtk4::CssProvider::new();
    provider.load_from_data(STYLE);

    gtk4::style_context_add_provider_for_display(
        &display,
        &provider,
        gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    gtk4::init()?;

    // History comes first, the server answers record queries from it
    let actor = SqlActor::open(&sql::get_database_path())?;
    sql::init_database(&actor).await?;

    let history = SqlHistory::new(actor.clone());
    let tray = UnreadTray::default();

    notifications::activate(actor, history.subscribe()).await?;

    tokio::spawn({
        let tray = tray.clone();
        async move {
            if let Err(err) = tray::item::serve(tray).await {
                warn!(%err, "Failed to export tray item");
            }
        }
    });

    config::watch();

    let intake = Rc::new(RefCell::new(Intake::new(
        Collaborators {
            formatter: Box::new(HyperlinkFormatter),
            preference: Box::new(ConfigPreference),
            blacklist: Box::new(ConfigBlacklist),
            history: Box::new(history),
            tray: Box::new(tray),
        },
        config::read_config().bubbles.eviction,
    )));

    let application = gtk4::Application::new(
        Some(APPLICATION_ID),
        Default::default(),
    );

    application.connect_startup(move |app| {
        apply_style();
        widgets::bubbles::listen_for_notifications(BubbleStack::new(app, intake.clone()));
    });

    application.connect_activate(|_| debug!("Application activated"));

    // No window exists until the first bubble, keep the application alive
    let _hold = application.hold();
    let exit_code = application.run_with_args::<&str>(&[]);
    info!(?exit_code, "Application exited");

    Ok(())
}
