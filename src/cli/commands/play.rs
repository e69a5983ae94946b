//! Interactive playback.
//!
//! Reads line commands from stdin and engine events from the player on a
//! single thread; both feed the sequencer, so playback state is only ever
//! touched from here.

use std::io::{BufRead, Write};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, unbounded};
use tokio::runtime::Runtime;

use super::fetch_playlist;
use crate::audius::AudiusClient;
use crate::config::Config;
use crate::display;
use crate::error::Error;
use crate::model::Playlist;
use crate::player::{AudioSink, EngineEvent, EngineOptions, Player, Sequencer};

const HELP: &str = "Commands: <number> play/pause track, p or Enter play/pause, n next, b previous, s stop, +/- volume, q quit";

const VOLUME_STEP: f32 = 0.1;

/// A line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    /// 1-based track number
    Select(usize),
    Toggle,
    Next,
    Previous,
    Stop,
    /// Volume up (+1) or down (-1) one step
    Volume(i8),
    Quit,
    Help,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if let Ok(n) = line.parse::<usize>() {
        return Input::Select(n);
    }
    match line.to_ascii_lowercase().as_str() {
        "" | "p" => Input::Toggle,
        "n" => Input::Next,
        "b" => Input::Previous,
        "s" => Input::Stop,
        "+" | "=" => Input::Volume(1),
        "-" => Input::Volume(-1),
        "q" | "quit" | "exit" => Input::Quit,
        "h" | "?" | "help" => Input::Help,
        _ => Input::Unknown(line.to_string()),
    }
}

/// Play a playlist interactively
pub fn cmd_play(
    rt: &Runtime,
    config: &Config,
    playlist_id: Option<&str>,
    start: Option<usize>,
) -> anyhow::Result<()> {
    let client = AudiusClient::new(&config.api)?;
    let playlist = fetch_playlist(rt, &client, config, playlist_id)?;
    if let Some(n) = start
        && (n == 0 || n > playlist.tracks.len())
    {
        return Err(Error::invalid_input(format!(
            "--start must be between 1 and {}",
            playlist.tracks.len()
        ))
        .into());
    }

    let player = Player::new(EngineOptions {
        progress_interval: Duration::from_millis(config.playback.progress_interval_ms),
        stream_timeout: Duration::from_secs(config.playback.stream_timeout_secs),
    })?;
    let events = player.events().clone();
    let mut sequencer = Sequencer::new(playlist.tracks.clone(), client.base_url(), player);

    print!("{}", display::render_page(&playlist, sequencer.state(), 0.0));
    println!("\n{HELP}");

    if let Some(n) = start {
        let _ = handle_input(&mut sequencer, Input::Select(n));
        print_status(&playlist, &sequencer);
    }

    let (line_tx, line_rx) = unbounded::<String>();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    loop {
        select! {
            recv(line_rx) -> line => {
                // stdin closed
                let Ok(line) = line else { break };
                match parse_input(&line) {
                    Input::Volume(step) => {
                        let player = sequencer.sink();
                        player.set_volume(player.volume() + f32::from(step) * VOLUME_STEP);
                        println!("Volume: {:.0}%", player.volume() * 100.0);
                    }
                    input => {
                        if !handle_input(&mut sequencer, input) {
                            break;
                        }
                        print_status(&playlist, &sequencer);
                    }
                }
            }
            recv(events) -> event => {
                let Ok(event) = event else {
                    tracing::error!(target: "cli::play", "Audio engine stopped");
                    break;
                };
                let progress_only = matches!(event, EngineEvent::Progress { .. });
                if apply_event(&mut sequencer, event) {
                    if progress_only {
                        print_progress(&playlist, &sequencer);
                    } else {
                        print_status(&playlist, &sequencer);
                    }
                }
            }
        }
    }

    sequencer.stop();
    tracing::debug!(
        target: "cli::play",
        underruns = sequencer.sink().state().underruns,
        "Playback session ended"
    );
    println!();
    Ok(())
}

/// Apply a user command. Returns false to quit.
fn handle_input<S: AudioSink>(sequencer: &mut Sequencer<S>, input: Input) -> bool {
    let result = match input {
        Input::Select(0) => {
            println!("Track numbers start at 1");
            Ok(())
        }
        Input::Select(n) => sequencer.activate_index(n - 1),
        Input::Toggle => sequencer.toggle(),
        Input::Next => sequencer.next(),
        Input::Previous => sequencer.previous(),
        Input::Stop => {
            sequencer.stop();
            Ok(())
        }
        Input::Quit => return false,
        // Volume belongs to the output device, not the sequencer
        Input::Volume(_) => Ok(()),
        Input::Help => {
            println!("{HELP}");
            Ok(())
        }
        Input::Unknown(line) => {
            println!("Unknown command '{line}'. {HELP}");
            Ok(())
        }
    };

    if let Err(e) = result {
        println!("{e}");
    }
    true
}

/// Feed an engine event to the sequencer. Returns whether it applied to
/// the current load.
fn apply_event<S: AudioSink>(sequencer: &mut Sequencer<S>, event: EngineEvent) -> bool {
    match event {
        EngineEvent::Progress {
            load,
            track_id,
            position,
            duration,
        } => {
            // Fall back to the API's duration for streams without a declared length
            let total = duration.map(|d| d.as_secs_f64()).or_else(|| {
                sequencer
                    .tracks()
                    .iter()
                    .find(|t| t.id == track_id)
                    .map(|t| t.duration as f64)
            });
            sequencer.on_progress_tick(load, &track_id, position.as_secs_f64(), total.unwrap_or(0.0))
        }
        EngineEvent::Ended { load, track_id } => sequencer.on_track_ended(load, &track_id),
        EngineEvent::Failed {
            load,
            track_id,
            reason,
        } => sequencer.on_playback_failed(load, &track_id, reason),
    }
}

fn print_status<S: AudioSink>(playlist: &Playlist, sequencer: &Sequencer<S>) {
    match display::now_playing(playlist, sequencer.state(), sequencer.progress()) {
        Some(line) => println!("\r{line}"),
        None => println!("\rStopped"),
    }
}

fn print_progress<S: AudioSink>(playlist: &Playlist, sequencer: &Sequencer<S>) {
    if let Some(line) = display::now_playing(playlist, sequencer.state(), sequencer.progress()) {
        print!("\r{line}");
        let _ = std::io::stdout().flush();
    }
}
