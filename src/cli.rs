use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, path::PathBuf};

use handctl::config::ProfileStore;

use crate::pipeline::{self, RunOptions};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.subcommand()?;

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.opt_free_from_str()?;
            match topic {
                Some(t) => print_subcmd_help(&t),
                None => print_help(),
            }
            Ok(())
        }

        Some("run") => {
            let profile: Option<String> = pargs.opt_value_from_str("--profile")?;
            let input: Option<PathBuf> = pargs.opt_value_from_str("--input")?;
            let opts = RunOptions {
                input,
                cursor: !pargs.contains("--no-cursor"),
                watch: !pargs.contains("--no-watch"),
            };
            reject_leftovers(pargs)?;

            let mut store = ProfileStore::open_default()?;
            if let Some(name) = profile {
                store.set_active(&name)?;
            }
            if let Some(e) = &store.load_error {
                return Err(anyhow!(
                    "active profile '{}' is invalid: {e}\nfix it or pick another with `handctl use <name>`",
                    store.active_name
                ));
            }
            pipeline::run_pipeline(store, opts)
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handctl use <profile_name>"))?;
            let mut store = ProfileStore::open_default()?;
            store.set_active(&name)?;
            print_response(&serde_json::json!({"ok": true, "data": {"active_profile": store.active_name}}));
            Ok(())
        }

        Some("list") => {
            let store = ProfileStore::open_default()?;
            for name in store.list_profiles() {
                let mark = if name == store.active_name { "*" } else { " " };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("doctor") => {
            let store = ProfileStore::open_default()?;
            print_response(&store.doctor_report());
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn reject_leftovers(pargs: Arguments) -> Result<()> {
    let rest = pargs.finish();
    if !rest.is_empty() {
        return Err(anyhow!("unexpected arguments: {rest:?}"));
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"handctl - camera hand-gesture events

USAGE:
  handctl help [command]          Show general or command-specific help
  handctl run [options]           Stream landmark frames, print events
  handctl use <name>              Switch active profile
  handctl list                    List profiles
  handctl doctor                  Show config paths and validate profiles

RUN OPTIONS:
  --profile <name>                Use (and activate) this profile
  --input <path>                  Read frames from a file instead of stdin
  --no-cursor                     Do not print cursor_moved events
  --no-watch                      Do not reload the profile when it changes

TIPS:
  - Profiles: ~/.config/handctl/profiles (override with HANDCTL_CONFIG_DIR)
  - Log level: RUST_LOG=debug
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "run" => println!(
            "usage: handctl run [--profile <name>] [--input <path>] [--no-cursor] [--no-watch]\n\
             Reads one JSON frame per line: {{\"t\": <ms>, \"landmarks\": [{{\"x\":..,\"y\":..,\"z\":..}}, ...]}}\n\
             and writes one JSON event per line. Ctrl-C stops the stream."
        ),
        "use" => {
            println!("usage: handctl use <name>\nSwitches the active profile to <name>.")
        }
        "list" => {
            println!("usage: handctl list\nLists available profiles; marks active with '*'.")
        }
        "doctor" => println!(
            "usage: handctl doctor\nShows config locations, validates every profile and prints effective settings."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
