use std::fs;
use std::path::PathBuf;

use anyhow::Error;
use simple_logger::SimpleLogger;

use disksort::checksum::checksum_ignore_order;
use disksort::join::Join;
use disksort::sort::Sort;
use disksort::split::{ChunkSize, Split};

fn write_inputs(dir: &PathBuf) -> Result<(PathBuf, PathBuf), Error> {
    let trips = dir.join("trips.csv");
    let mut content = String::from("trip,station,minutes\r\n");
    for trip in 0..10_000 {
        content.push_str(&format!("{:06},{:04},{}\r\n", trip, (trip * 7919) % 1000, trip % 90));
    }
    fs::write(&trips, content)?;

    let stations = dir.join("stations.csv");
    let mut content = String::from("station,name\r\n");
    for station in (0..1000).rev() {
        content.push_str(&format!("{:04},station-{}\r\n", station, station));
    }
    fs::write(&stations, content)?;
    Ok((trips, stations))
}

// cargo run -r --example disksort_csv
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().init()?;
    let dir = PathBuf::from("./target/demo");
    fs::create_dir_all(&dir)?;
    let (trips, stations) = write_inputs(&dir)?;

    let mut split = Split::new(trips.clone(), dir.join("chunks"));
    split.with_chunk_size(ChunkSize::Count(8));
    let chunks = split.split()?;
    log::info!("{} chunks in {}", chunks.len(), dir.join("chunks").display());

    let sorted_trips = dir.join("trips-by-station.csv");
    let mut trips_sort = Sort::new(vec![trips.clone()], sorted_trips.clone());
    trips_sort.with_key(1);
    trips_sort.with_chunk_size_bytes(32 * 1024);
    trips_sort.sort()?;

    let sorted_stations = dir.join("stations-sorted.csv");
    Sort::new(vec![stations.clone()], sorted_stations.clone()).sort()?;

    let joined = dir.join("trips-with-station.csv");
    let rows = Join::new(sorted_trips.clone(), sorted_stations.clone(), 1, 0).join(joined.clone())?;
    log::info!("Joined {} rows into {}", rows, joined.display());

    let mut resorted = Sort::new(vec![sorted_trips.clone()], dir.join("trips-resorted.csv"));
    resorted.with_has_header(false);
    resorted.with_key(1);
    resorted.sort()?;
    log::info!(
        "Checksums, sorted: {}, sorted again: {}",
        checksum_ignore_order(&sorted_trips)?,
        checksum_ignore_order(&dir.join("trips-resorted.csv"))?
    );
    Ok(())
}
