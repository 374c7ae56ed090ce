//! RagDesk CLI — terminal rendering helpers.
//!
//! `main.rs` calls these and stays free of styling details.

use std::time::Duration;

use colored::*;

use ragdesk_core::message::Role;
use ragdesk_hub::client::DisplayMessage;

pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}", "    ╔══════════════════════════════════════╗".cyan());
    println!("{}", format!("    ║          RagDesk v{:<19}║", version).cyan());
    println!("{}", "    ║   Knowledge-base chat assistant      ║".cyan());
    println!("{}", "    ╚══════════════════════════════════════╝\n".cyan());
}

/// Build the `termimad` skin used for assistant replies.
pub fn make_mad_skin() -> termimad::MadSkin {
    let mut skin = termimad::MadSkin::default();
    skin.set_headers_fg(termimad::crossterm::style::Color::Cyan);
    skin.bold.set_fg(termimad::crossterm::style::Color::Yellow);
    skin.italic.set_fg(termimad::crossterm::style::Color::Green);
    skin.inline_code.set_fg(termimad::crossterm::style::Color::Magenta);
    skin
}

/// Print one transcript entry. Assistant replies are rendered as Markdown.
pub fn print_message(skin: &termimad::MadSkin, message: &DisplayMessage) {
    match message.role {
        Role::User => {
            println!(
                "{} {} {}",
                "You ›".green().bold(),
                message.content,
                message.time_label().dimmed()
            );
        }
        Role::Assistant => {
            println!("\n{} {}", "AI ›".cyan().bold(), message.time_label().dimmed());
            print!("{}", skin.term_text(message.content.trim()));
            println!();
        }
    }
}

/// Spinner shown while a message is in flight.
pub fn typing_spinner(label: &str) -> indicatif::ProgressBar {
    let spinner = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.set_message(label.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
