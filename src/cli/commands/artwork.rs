//! Download playlist and track artwork with mirror fallback.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::runtime::Runtime;

use super::fetch_playlist;
use crate::audius::AudiusClient;
use crate::config::Config;
use crate::cover::{
    ArtworkCache, ArtworkError, ArtworkFetcher, ArtworkOrigin, FetchedArtwork, HttpImageSource,
    ImageSource,
};
use crate::error::ResultExt;
use crate::model::{ArtworkSize, Playlist, Track};

/// The playlist cover is shown at the page header's resolution.
const COVER_SIZE: ArtworkSize = ArtworkSize::Medium;

type Outcome = Result<FetchedArtwork, ArtworkError>;

/// Artwork for one playlist page.
pub(crate) struct PageArtwork {
    pub cover: Outcome,
    /// One entry per track, in track order
    pub tracks: Vec<Outcome>,
}

#[derive(Debug, Default)]
struct Tally {
    loaded: usize,
    failed: usize,
}

/// Download the playlist cover and artwork for every track
pub fn cmd_artwork(
    rt: &Runtime,
    config: &Config,
    playlist_id: Option<&str>,
    size: Option<ArtworkSize>,
    out: Option<&PathBuf>,
    clear_cache: bool,
) -> anyhow::Result<()> {
    let client = AudiusClient::new(&config.api)?;
    let playlist = fetch_playlist(rt, &client, config, playlist_id)?;
    let size = size.unwrap_or(config.artwork.size);

    let cache = match &config.artwork.cache_dir {
        Some(dir) => ArtworkCache::new(dir),
        None => ArtworkCache::default_location(),
    };
    if clear_cache {
        cache.clear().with_context("clearing artwork cache")?;
        println!("Cleared artwork cache at {}", cache.dir().display());
    }

    let source = HttpImageSource::new(Duration::from_secs(config.artwork.timeout_secs))?;
    let fetcher = ArtworkFetcher::new(source).with_cache(cache);

    if let Some(dir) = out {
        std::fs::create_dir_all(dir).with_context(format!("creating {}", dir.display()))?;
    }

    println!(
        "Fetching cover and {} artwork for {} tracks...",
        size,
        playlist.tracks.len()
    );
    let page = rt.block_on(fetch_page(
        &fetcher,
        &playlist,
        size,
        config.artwork.concurrency,
    ));

    let mut tally = Tally::default();
    report("Cover", page.cover, out, cover_file_name, &mut tally)?;
    for (i, (track, result)) in playlist.tracks.iter().zip(page.tracks).enumerate() {
        let label = format!("{:>3}. {}", i + 1, track.title);
        report(
            &label,
            result,
            out,
            |mime| output_file_name(i + 1, track, mime),
            &mut tally,
        )?;
    }

    println!(
        "\nArtwork complete: {} loaded, {} failed.",
        tally.loaded, tally.failed
    );
    if let Some(cache) = fetcher.cache() {
        println!(
            "Cache: {} KB in {}",
            cache.size_bytes() / 1024,
            cache.dir().display()
        );
    }
    Ok(())
}

/// Fetch the cover, then every track's artwork at most `concurrency` at a
/// time.
pub(crate) async fn fetch_page<S: ImageSource>(
    fetcher: &ArtworkFetcher<S>,
    playlist: &Playlist,
    size: ArtworkSize,
    concurrency: usize,
) -> PageArtwork {
    let cover = fetcher.fetch(&playlist.artwork, COVER_SIZE).await;
    let tracks = fetch_all(fetcher, &playlist.tracks, size, concurrency).await;
    PageArtwork { cover, tracks }
}

/// Fetch artwork for all tracks, at most `concurrency` at a time. Results
/// come back in track order.
pub(crate) async fn fetch_all<S: ImageSource>(
    fetcher: &ArtworkFetcher<S>,
    tracks: &[Track],
    size: ArtworkSize,
    concurrency: usize,
) -> Vec<Outcome> {
    let mut results: Vec<(usize, Outcome)> = stream::iter(tracks.iter().enumerate())
        .map(|(i, track)| async move { (i, fetcher.fetch(&track.artwork, size).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(i, _)| *i);
    results.into_iter().map(|(_, result)| result).collect()
}

/// Print one outcome, copying the image into `out` when asked.
fn report(
    label: &str,
    result: Outcome,
    out: Option<&PathBuf>,
    file_name: impl FnOnce(&str) -> String,
    tally: &mut Tally,
) -> anyhow::Result<()> {
    match result {
        Ok(fetched) => {
            tally.loaded += 1;
            let mut line = format!("{label}: {}", describe(&fetched));
            if let Some(dir) = out {
                let path = dir.join(file_name(&fetched.image.mime_type));
                std::fs::write(&path, &fetched.image.data)
                    .with_context(format!("writing {}", path.display()))?;
                line.push_str(&format!(" -> {}", path.display()));
            }
            println!("{line}");
        }
        Err(ArtworkError::Missing(_)) => println!("{label}: no artwork"),
        Err(e) => {
            tally.failed += 1;
            tracing::warn!(target: "cli::artwork", item = label.trim(), error = %e, "Artwork unavailable");
            println!("{label}: failed ({e})");
        }
    }
    Ok(())
}

/// Human-readable account of where an image came from.
fn describe(fetched: &FetchedArtwork) -> String {
    let attempts = match fetched.attempts {
        1 => "1 attempt".to_string(),
        n => format!("{n} attempts"),
    };
    match &fetched.origin {
        ArtworkOrigin::Cached(_) => "cached".to_string(),
        ArtworkOrigin::Primary => format!("primary ({attempts})"),
        ArtworkOrigin::Mirror(n) => format!("mirror {n} ({attempts})"),
    }
}

fn extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

fn cover_file_name(mime_type: &str) -> String {
    format!("cover.{}", extension(mime_type))
}

fn output_file_name(number: usize, track: &Track, mime_type: &str) -> String {
    let id: String = track
        .id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    Path::new(&format!("{number:03}-{id}"))
        .with_extension(extension(mime_type))
        .to_string_lossy()
        .into_owned()
}
