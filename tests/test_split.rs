use std::fs;
use std::path::PathBuf;

use disksort::error::{find, Error};
use disksort::split::{ChunkSize, Split};

mod common;

fn concat(chunks: &Vec<PathBuf>) -> Result<Vec<u8>, anyhow::Error> {
    let mut joined = Vec::new();
    for chunk in chunks {
        joined.extend_from_slice(&fs::read(chunk)?);
    }
    Ok(joined)
}

#[test]
fn test_chunks_reproduce_input_without_header() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/").with_extension("csv");
    let records = common::random_records(5_000, 100, 1);
    common::write_lines(&input_path, Some("key,sequence,payload"), &records, "\r\n")?;
    let body: String = records.iter().map(|line| format!("{}\r\n", line)).collect();

    for chunk_size in [1, 10, 333, 4096, 1_000_000] {
        let dest = common::temp_file_name("./target/results/");
        let mut split = Split::new(input_path.clone(), dest.clone());
        split.with_chunk_size(ChunkSize::Bytes(chunk_size));
        let chunks = split.split()?;
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            let bytes = fs::read(chunk)?;
            assert!(bytes.is_empty() || bytes.ends_with(b"\r\n"), "chunk size: {}", chunk_size);
        }
        assert_eq!(concat(&chunks)?, body.as_bytes(), "chunk size: {}", chunk_size);
        fs::remove_dir_all(dest)?;
    }
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_chunk_names() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/").with_extension("csv");
    let records = common::random_records(1_000, 10, 2);
    common::write_lines(&input_path, None, &records, "\n")?;

    let dest = common::temp_file_name("./target/results/").join("nested");
    let mut split = Split::new(input_path.clone(), dest.clone());
    split.with_has_header(false);
    split.with_line_terminator(b"\n");
    split.with_chunk_size(ChunkSize::Bytes(2_000));
    let chunks = split.split()?;
    assert!(chunks.len() > 2);
    assert_eq!(chunks[0], dest.join("part_001.csv"));
    assert_eq!(chunks[1], dest.join("part_002.csv"));

    let lines: usize = chunks.iter().map(|chunk| common::read_lines(chunk).unwrap().len()).sum();
    assert_eq!(lines, 1_000);
    fs::remove_dir_all(dest.parent().unwrap())?;
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_chunk_count() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let records = common::random_records(10_000, 1_000, 3);
    common::write_lines(&input_path, None, &records, "\n")?;

    let dest = common::temp_file_name("./target/results/");
    let mut split = Split::new(input_path.clone(), dest.clone());
    split.with_has_header(false);
    split.with_line_terminator(b"\n");
    split.with_chunk_size(ChunkSize::Count(4));
    split.with_naming_template("chunk-{i}");
    let chunks = split.split()?;
    // each chunk overshoots its share by less than a line
    assert!(chunks.len() == 4 || chunks.len() == 3, "chunks: {}", chunks.len());
    assert_eq!(chunks[0], dest.join("chunk-1"));
    let expected: String = records.iter().map(|line| format!("{}\n", line)).collect();
    assert_eq!(concat(&chunks)?, expected.as_bytes());
    fs::remove_dir_all(dest)?;
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_smaller_than_one_chunk() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let records = common::random_records(10, 5, 4);
    common::write_lines(&input_path, Some("header"), &records, "\r\n")?;

    let dest = common::temp_file_name("./target/results/");
    let chunks = Split::new(input_path.clone(), dest.clone()).split()?;
    assert_eq!(chunks.len(), 1);
    assert_eq!(common::read_lines(&chunks[0])?, records);
    fs::remove_dir_all(dest)?;
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_empty_after_header() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    fs::write(&input_path, "key,sequence,payload\r\n")?;

    let dest = common::temp_file_name("./target/results/");
    let chunks = Split::new(input_path.clone(), dest.clone()).split()?;
    assert_eq!(chunks.len(), 1);
    assert_eq!(fs::metadata(&chunks[0])?.len(), 0);
    fs::remove_dir_all(dest)?;
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_missing_input() {
    common::setup();
    let dest = common::temp_file_name("./target/results/");
    let error = Split::new(PathBuf::from("./target/results/missing.csv"), dest.clone())
        .split()
        .unwrap_err();
    assert!(matches!(find(&error), Some(Error::Io { .. })));
    assert!(!dest.exists());
}
