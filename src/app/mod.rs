//! Core application logic for the room availability engine
//!
//! This module contains the main application components: the session
//! negotiator, resource catalog walker, timetable fetcher, grid decoder,
//! availability resolver, mirror client and the snapshot cache.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ade_rooms::app::{AdeSource, CacheManager, CacheOptions, RefreshPolicy};
//! use ade_rooms::app::{free_rooms, ClientConfig, ClockTime};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Build the production source and the cache around it
//! let source = AdeSource::new(ClientConfig::default(), 6)?;
//! let cache = CacheManager::new(source, CacheOptions::default());
//! cache.load_persisted().await?;
//!
//! // Resolve the free rooms right now
//! if let Some(snapshot) = cache.get_snapshot(RefreshPolicy::ServeStaleAndRefresh).await {
//!     for (room, until) in free_rooms(&snapshot, ClockTime::new(10, 30)) {
//!         println!("{room} free until {until}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod availability;
pub mod cache;
pub mod catalog;
pub mod decoder;
pub mod fetcher;
pub mod mirror;
pub mod models;
pub mod session;

// Re-export main public API
pub use availability::{free_rooms, resolve};
pub use cache::{
    AdeSource, CacheManager, CacheOptions, CacheState, RefreshPolicy, SnapshotSource,
};
pub use catalog::{list_categories, list_rooms, RoomCategory, RoomResource};
pub use decoder::{decode, DayFilter, DecodedSchedule};
pub use fetcher::{fetch_raw, period_index, week_number, weekday_index};
pub use mirror::fetch_mirror;
pub use models::{
    AvailabilityStatus, BusyInterval, CacheSnapshot, ClockTime, FreeUntil, RoomSchedule,
};
pub use session::{AdeSession, ClientConfig};
