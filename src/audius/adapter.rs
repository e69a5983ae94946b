//! Adapter layer: Convert Audius DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.
//! If the API changes its response format, only this file and dto.rs
//! need to change.

use super::dto;
use crate::model::{ArtworkSet, ArtworkSize, Playlist, Track, TrackId};

/// Convert an API playlist into the domain playlist.
pub fn to_playlist(playlist: dto::Playlist) -> Playlist {
    Playlist {
        id: playlist.id,
        name: playlist.playlist_name,
        description: playlist.description.unwrap_or_default(),
        artwork: to_artwork(playlist.artwork),
        owner: playlist.user.name,
        track_count: playlist.track_count,
        total_play_count: playlist.total_play_count,
        favorite_count: playlist.favorite_count,
        repost_count: playlist.repost_count,
        tracks: playlist.tracks.into_iter().map(to_track).collect(),
    }
}

/// Convert an API track into the domain track.
pub fn to_track(track: dto::Track) -> Track {
    Track {
        id: TrackId::new(track.id),
        title: track.title,
        artist: track.user.name,
        duration: track.duration,
        play_count: track.play_count,
        artwork: to_artwork(track.artwork),
    }
}

/// Convert API artwork; empty strings count as absent.
pub fn to_artwork(artwork: Option<dto::Artwork>) -> ArtworkSet {
    let Some(artwork) = artwork else {
        return ArtworkSet::default();
    };

    let primary = [
        (ArtworkSize::Small, artwork.small),
        (ArtworkSize::Medium, artwork.medium),
        (ArtworkSize::Large, artwork.large),
    ]
    .into_iter()
    .filter_map(|(size, url)| url.filter(|u| !u.is_empty()).map(|u| (size, u)));

    ArtworkSet::new(primary, artwork.mirrors.unwrap_or_default())
}
