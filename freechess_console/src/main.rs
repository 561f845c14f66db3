// Legend for various fix-this comments:
//   * "TODO" - bug or missing crucial feature.
//   * "Improvement potential" - missing nice-to-have feature or an opportunity
//       to make code better or faster.

#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

mod client_config;
mod client_main;
mod network;
mod tui;

use std::io::{self, BufRead};
use std::time::Duration;

use anyhow::Context;
use clap::{Command, arg};

use freechess_club::client::ClientOptions;
use freechess_club::event::decode_frame;
use freechess_club::notification::{MatchContext, candidates};

use client_config::{ConsoleConfig, read_config_file};


fn main() -> anyhow::Result<()> {
    let matches = Command::new("FreeChess")
        .author(clap::crate_authors!())
        .version(clap::crate_version!())
        .about("Free Chess Club console client")
        .subcommand_required(true)
        .subcommand(
            Command::new("client")
                .about("Connect to the relay and play")
                .arg(arg!(--"config" <file> "Path to the configuration file: yaml-serialized ConsoleConfig."))
                .arg(arg!(--"host" <host> "Relay host, e.g. localhost:8080"))
                .arg(arg!(--"user" <user> "Log in as this user instead of a guest"))
                .arg(arg!(--"password" <password> "Password for --user"))
                .arg(arg!(--"insecure" "Use ws:// instead of wss://"))
                .arg(arg!(--"reconnect-delay" <delay> "Pause before reconnecting, e.g. 5s"))
                .arg(arg!(--"log-file" <file> "Write logs to this file")),
        )
        .subcommand(
            Command::new("decode").about(concat!(
                "Reads relay frames from stdin, one per line, ",
                "and prints the decoded messages and server notifications."
            )),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("client", sub_matches)) => {
            let mut config = match sub_matches.get_one::<String>("config") {
                Some(file) => read_config_file(file)?,
                None => ConsoleConfig::default(),
            };
            if let Some(host) = sub_matches.get_one::<String>("host") {
                config.host = host.clone();
            }
            if let Some(user) = sub_matches.get_one::<String>("user") {
                config.user = Some(user.clone());
            }
            if let Some(password) = sub_matches.get_one::<String>("password") {
                config.password = Some(password.clone());
            }
            if sub_matches.get_flag("insecure") {
                config.secure = false;
            }
            if let Some(delay) = sub_matches.get_one::<String>("reconnect-delay") {
                config.reconnect_delay = parse_delay(delay)?;
            }
            if let Some(log_file) = sub_matches.get_one::<String>("log-file") {
                config.log_file = Some(log_file.clone());
            }
            init_logging(config.log_file.as_deref())?;
            client_main::run(client_main::ClientConfig {
                relay: config.relay(),
                credentials: config.credentials(),
                reconnect_delay: config.reconnect_delay,
                options: ClientOptions {
                    sound_enabled: config.sound,
                    autoscroll: config.autoscroll,
                    ..ClientOptions::default()
                },
            })?;
            Ok(())
        }
        Some(("decode", _)) => {
            init_logging(None)?;
            decode_stdin()
        }
        _ => unreachable!("Exhausted list of subcommands and subcommand_required prevents `None`"),
    }
}

fn parse_delay(delay: &str) -> anyhow::Result<Duration> {
    humantime::parse_duration(delay).with_context(|| format!("Invalid delay '{delay}'."))
}

// The client owns the terminal, so its logs go to a file.
fn init_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let target = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file '{path}'."))?;
            env_logger::Target::Pipe(Box::new(file))
        }
        None => env_logger::Target::Stderr,
    };
    env_logger::Builder::new()
        .target(target)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    Ok(())
}

fn decode_stdin() -> anyhow::Result<()> {
    let ctx = MatchContext { takeback_pending: false };
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin.")?;
        if line.trim().is_empty() {
            continue;
        }
        let messages = match decode_frame(&line) {
            Ok(messages) => messages,
            Err(err) => {
                println!("! {err:?}");
                continue;
            }
        };
        for message in messages {
            println!("{:?}: {message:?}", message.message_type());
            if let freechess_club::event::ServerMessage::Unknown(free_text) = &message {
                for notification in candidates(&free_text.text, &ctx) {
                    println!("  -> {notification:?}");
                }
            }
        }
    }
    Ok(())
}
