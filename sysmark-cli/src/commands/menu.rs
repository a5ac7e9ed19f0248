// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Interactive menu, shown when no subcommand is given.

use std::io::{self, stdout, BufRead, Write};

use crossterm::{
    cursor::MoveTo,
    style::Stylize,
    terminal::{Clear, ClearType},
    ExecutableCommand,
};
use sysmark_bench::{InfoProvider, SysinfoProvider};
use sysmark_core::Category;

use super::run::Session;
use crate::display;
use crate::Cli;

/// A menu selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Category(Category),
    All,
    Exit,
}

impl Choice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Category(Category::Cpu)),
            "2" => Some(Self::Category(Category::Ram)),
            "3" => Some(Self::Category(Category::Disk)),
            "4" => Some(Self::Category(Category::Network)),
            "5" => Some(Self::All),
            "0" | "q" | "quit" | "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

fn clear_screen() -> io::Result<()> {
    stdout().execute(Clear(ClearType::All))?;
    stdout().execute(MoveTo(0, 0))?;
    Ok(())
}

/// Print `message` and read one line. `None` on end of input.
fn prompt(message: &str) -> io::Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn confirm(message: &str) -> io::Result<bool> {
    let answer = prompt(&format!("{} [y/N]: ", message))?;
    Ok(matches!(
        answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("y" | "yes")
    ))
}

fn pause() -> io::Result<()> {
    prompt("\nPress ENTER to return to the menu...").map(|_| ())
}

fn print_menu(session: &Session) {
    let hardware = session.coordinator.hardware();
    println!("{}", "sysmark - hardware benchmark".bold());
    println!(
        "{} physical / {} logical cores, {} workloads registered",
        hardware.physical(),
        hardware.logical(),
        session.registry.len()
    );
    println!();
    println!("  1) CPU");
    println!("  2) RAM");
    println!("  3) Disk");
    println!("  4) Network");
    println!("  5) Complete benchmark");
    println!("  0) Exit");
    println!();
}

pub fn execute(cli: &Cli) -> anyhow::Result<()> {
    let session = Session::prepare(cli)?;
    let info = SysinfoProvider::new();

    loop {
        clear_screen()?;
        print_menu(&session);

        let Some(input) = prompt("Select an option [0-5]: ")? else {
            return Ok(());
        };

        match Choice::parse(&input) {
            Some(Choice::Exit) => return Ok(()),
            Some(Choice::Category(category)) => {
                clear_screen()?;
                match info.snapshot(category) {
                    Ok(snapshot) => display::print_info(category, &snapshot),
                    Err(e) => tracing::warn!(error = %e, "System information unavailable"),
                }
                println!();
                if confirm(&format!("Start the {} benchmark?", category.title()))? {
                    session.run_category(category)?;
                }
                pause()?;
            }
            Some(Choice::All) => {
                println!(
                    "Runs CPU, RAM, Disk and Network in order with a {:.0}s pause between them.",
                    session.coordinator.config().category_pause.as_secs_f64()
                );
                if confirm("Start the complete benchmark?")? {
                    session.run_all()?;
                }
                pause()?;
            }
            None => {
                println!("Invalid option: {:?}", input);
                pause()?;
            }
        }
    }
}
