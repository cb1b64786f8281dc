//! Command handlers for the ade-rooms CLI
//!
//! This module implements the main command handlers that coordinate between
//! CLI arguments and the core application functionality.

use chrono::{Local, Timelike};
use tracing::{info, warn};

use crate::app::{
    catalog, decoder, fetcher, free_rooms, resolve, AdeSession, AdeSource, CacheManager,
    CacheState, ClockTime, DayFilter, RefreshPolicy, RoomCategory,
};
use crate::cli::{FreeArgs, RefreshArgs, RoomsArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Handle the free command
///
/// Resolves the current (or requested) time against the cached snapshot and
/// prints the rooms that are free, with their capacity and horizon.
pub async fn handle_free(args: FreeArgs, config: &AppConfig) -> Result<()> {
    let cache = build_cache(config, None)?;
    restore_snapshot(&cache).await;

    let policy = if args.fresh || !config.cache.serve_stale {
        RefreshPolicy::BlockUntilFresh
    } else {
        RefreshPolicy::ServeStaleAndRefresh
    };
    let Some(snapshot) = cache.get_snapshot(policy).await else {
        return Err(AppError::generic(
            "no availability data: refresh failed and nothing is cached",
        ));
    };

    let at = args.at.unwrap_or_else(now_clock);
    let free = free_rooms(&snapshot, at);
    let free: Vec<_> = free
        .into_iter()
        .filter(|(room, _)| {
            args.min_capacity.is_none()
                || room_capacity(&snapshot, room) >= args.min_capacity.unwrap_or(0)
        })
        .collect();

    info!(rooms = free.len(), at = %at, "resolved free rooms");
    if free.is_empty() {
        println!("No free room at {at}.");
        return Ok(());
    }

    println!("Free rooms at {at} (snapshot from {}):", snapshot.fetched_at.with_timezone(&Local).format("%H:%M"));
    for (room, until) in free {
        let capacity = match snapshot.rooms[&room].capacity {
            Some(seats) => format!("{seats} seats"),
            None => "capacity unknown".to_string(),
        };
        println!("  {room:<6} {capacity:<18} free until {until}");
    }
    Ok(())
}

fn room_capacity(snapshot: &crate::app::CacheSnapshot, room: &str) -> u32 {
    snapshot.rooms.get(room).and_then(|s| s.capacity).unwrap_or(0)
}

/// Handle the rooms command
///
/// Without arguments prints today's schedule for every cached room. With a
/// room number and `--all-days` it fetches that room's whole week live.
pub async fn handle_rooms(args: RoomsArgs, config: &AppConfig) -> Result<()> {
    if args.all_days {
        let Some(room) = args.room.as_deref() else {
            return Err(AppError::generic("--all-days requires a room number"));
        };
        return print_live_week(room, config).await;
    }

    let cache = build_cache(config, None)?;
    restore_snapshot(&cache).await;
    let Some(snapshot) = cache.get_snapshot(RefreshPolicy::ServeStaleAndRefresh).await else {
        return Err(AppError::generic(
            "no availability data: refresh failed and nothing is cached",
        ));
    };

    let now = now_clock();
    for (number, schedule) in &snapshot.rooms {
        if let Some(wanted) = args.room.as_deref() {
            if number != wanted {
                continue;
            }
        }
        if !schedule.available {
            println!("{number}: no data this pass");
            continue;
        }
        let status = resolve(&schedule.busy, now);
        let verdict = match status.free_until {
            Some(until) if status.is_free => format!("free until {until}"),
            _ => "occupied".to_string(),
        };
        print!("{number}: {verdict}");
        if !schedule.busy.is_empty() {
            let slots: Vec<String> = schedule
                .busy
                .iter()
                .map(|b| format!("{}-{}", b.start, b.end))
                .collect();
            print!("  busy {}", slots.join(", "));
        }
        println!();
    }
    Ok(())
}

/// Fetch and print one room's full week, bypassing the snapshot
async fn print_live_week(room_number: &str, config: &AppConfig) -> Result<()> {
    let (client_config, _) = config.to_runtime_config();
    let session = AdeSession::negotiate(&client_config).await?;
    let today = Local::now().date_naive();
    session.load_project(fetcher::period_index(today)).await?;

    // The room id is only discoverable through the catalog walk.
    let mut found = None;
    for category in RoomCategory::ALL {
        let rooms = match catalog::list_rooms(&session, category).await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(category = category.label(), "catalog bucket failed: {e}");
                continue;
            }
        };
        if let Some(room) = rooms.into_iter().find(|r| r.room_number() == room_number) {
            found = Some(room);
            break;
        }
    }
    let Some(room) = found else {
        return Err(AppError::generic(format!(
            "room '{room_number}' not found in any category"
        )));
    };

    let raw = fetcher::fetch_raw(
        &session,
        &room.id,
        fetcher::week_number(today),
        fetcher::period_index(today),
    )
    .await?;
    let decoded = decoder::decode(&raw, &room.path, DayFilter::AllDays);
    if !decoded.available {
        return Err(AppError::generic(format!(
            "room '{room_number}' returned an undecodable grid"
        )));
    }

    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    println!("Week schedule for {room_number}:");
    for interval in &decoded.busy {
        let day = DAYS.get(usize::from(interval.day)).copied().unwrap_or("?");
        println!("  {day} {}-{}", interval.start, interval.end);
    }
    if decoded.busy.is_empty() {
        println!("  no occupancy this week");
    }
    Ok(())
}

/// Handle the refresh command
pub async fn handle_refresh(args: RefreshArgs, config: &AppConfig) -> Result<()> {
    let cache = build_cache(config, args.workers)?;
    restore_snapshot(&cache).await;

    let snapshot = cache.force_refresh().await?;
    println!(
        "Snapshot refreshed: {} rooms, generation {}.",
        snapshot.room_count(),
        snapshot.generation
    );
    Ok(())
}

/// Handle the info command
pub async fn handle_info(config: &AppConfig) -> Result<()> {
    let cache = build_cache(config, None)?;
    restore_snapshot(&cache).await;

    let state = match cache.state().await {
        CacheState::Empty => "empty",
        CacheState::Refreshing => "refreshing",
        CacheState::Valid => "valid",
        CacheState::Stale => "stale",
    };
    println!("Snapshot state: {state}");
    if let Some(snapshot) = cache.peek().await {
        println!(
            "  fetched {}, generation {}, {} rooms",
            snapshot.fetched_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            snapshot.generation,
            snapshot.room_count()
        );
    }

    let (_, cache_options) = config.to_runtime_config();
    match cache_options.state_file {
        Some(path) => println!("State file: {}", path.display()),
        None => println!("State file: disabled"),
    }
    println!("Snapshot TTL: {:?}", cache_options.ttl);

    println!("Room categories:");
    for (_, label) in catalog::list_categories() {
        println!("  {label}");
    }
    Ok(())
}

/// Assemble the production cache from configuration
fn build_cache(
    config: &AppConfig,
    workers_override: Option<usize>,
) -> Result<CacheManager<AdeSource>> {
    let (client_config, cache_options) = config.to_runtime_config();
    let workers = workers_override.unwrap_or(config.cache.worker_count);
    let source = AdeSource::new(client_config, workers)?;
    Ok(CacheManager::new(source, cache_options))
}

/// Best-effort restore of a persisted snapshot; absence is normal
async fn restore_snapshot<S: crate::app::SnapshotSource>(cache: &CacheManager<S>) {
    match cache.load_persisted().await {
        Ok(true) => info!("restored persisted snapshot"),
        Ok(false) => {}
        Err(e) => warn!("could not restore persisted snapshot: {e}"),
    }
}

fn now_clock() -> ClockTime {
    let now = Local::now();
    ClockTime::new(now.hour() as u8, now.minute() as u8)
}
