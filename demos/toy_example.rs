//! A city-weather walkthrough: build one partition per day, each
//! holding per-city, per-minute weather
//! samples in its own bucket, upload them, then read a couple of
//! values back, one by direct `Get`, one by scanning inside a `View`.
//!
//! A production deployment would talk to S3 and take its bucket name
//! from flags; this demo swaps those for [`FsStorage`] rooted at a
//! temp directory, so it runs standalone with no external service.

use infreqcache::storage::FsStorage;
use infreqcache::Db;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, Level};

const CITIES: &[&str] = &["bangkok", "singapore", "new york", "amsterdam"];
const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct CityInfo {
    temperature: f64,
    wind_speed: f64,
}

fn rand_city_info(seed: &mut u64) -> CityInfo {
    // xorshift64, good enough for synthetic demo data and avoids
    // pulling a second rand dependency into the demo.
    *seed ^= *seed << 13;
    *seed ^= *seed >> 7;
    *seed ^= *seed << 17;
    let temperature = (*seed % 400) as f64 / 10.0;
    let wind_speed = ((*seed >> 16) % 150) as f64 / 10.0;
    CityInfo {
        temperature,
        wind_speed,
    }
}

fn minute_key(minute: u32) -> Vec<u8> {
    format!("{:04}", minute).into_bytes()
}

fn generate_partition(staging_root: &std::path::Path, day: &str, seed: &mut u64) {
    let dir = staging_root.join(day);
    let db = sled::open(&dir).expect("open staging sled db");
    for city in CITIES {
        let tree = db.open_tree(city.as_bytes()).expect("open city tree");
        for minute in 0..MINUTES_PER_DAY {
            let info = rand_city_info(seed);
            let payload = serde_json::to_vec(&info).expect("encode city info");
            tree.insert(minute_key(minute), payload)
                .expect("insert sample");
        }
    }
    db.flush().expect("flush staging db");
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .pretty()
        .with_max_level(Level::INFO)
        .init();

    let storage_root = TempDir::new().expect("create storage root");
    let storage = Arc::new(FsStorage::new(storage_root.path()).expect("create fs storage"));
    let db = Db::new(storage, 100);

    let staging_root = TempDir::new().expect("create staging root");
    let mut seed = 0x5eed_u64;

    for day in ["2017-01-01", "2017-01-02", "2017-01-15"] {
        info!(partition = day, "creating partition");
        generate_partition(staging_root.path(), day, &mut seed);
        db.set_part(day, &staging_root.path().join(day), true)
            .expect("upload partition");
    }

    // Direct point lookup: bangkok's sample for minute 1 of 2017-01-01.
    let raw = db
        .get("2017-01-01", b"bangkok", &minute_key(1))
        .expect("get bangkok sample");
    let info: CityInfo = serde_json::from_slice(&raw).expect("decode city info");
    info!(?info, "bangkok at 2017-01-01 00:01");

    // Which city was hottest at minute 2 of 2017-01-15? Scanned inside
    // a single `View` so every city's bucket is read against the same
    // open partition handle.
    let (_, hottest) = db
        .view("2017-01-15", |sled_db| {
            let mut hottest: Option<(&str, f64)> = None;
            for city in CITIES {
                let tree = sled_db.open_tree(city.as_bytes())?;
                if let Some(raw) = tree.get(minute_key(2))? {
                    let info: CityInfo =
                        serde_json::from_slice(&raw).map_err(infreqcache::Error::from)?;
                    if hottest.map_or(true, |(_, temp)| info.temperature > temp) {
                        hottest = Some((*city, info.temperature));
                    }
                }
            }
            Ok(hottest)
        })
        .expect("view 2017-01-15");

    match hottest.flatten() {
        Some((city, temp)) => println!("Hottest city was {} with temperature {}", city, temp),
        None => println!("No samples found"),
    }
}
