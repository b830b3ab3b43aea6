use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use data_encoding::HEXLOWER;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();
    let parallel_results_dir_path = PathBuf::from_str("./target/parallel-results/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    }

    if !parallel_results_dir_path.exists() {
        fs::create_dir_all(&parallel_results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create parallel results directory: {:?}", parallel_results_dir_path)
        );
    }
}

#[allow(dead_code)]
pub fn read_lines(path: &PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

/// Records of the form `key,sequence,payload` where key is one of `keys` zero padded values
/// and sequence is the zero based line number
#[allow(dead_code)]
pub fn random_records(lines: usize, keys: u32, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..lines)
        .map(|sequence| {
            let key: u32 = rng.gen_range(0..keys);
            let payload = HEXLOWER.encode(&rng.gen::<[u8; 6]>());
            format!("{:08},{},{}", key, sequence, payload)
        })
        .collect()
}

#[allow(dead_code)]
pub fn write_lines(path: &PathBuf, header: Option<&str>, lines: &Vec<String>, terminator: &str) -> Result<(), anyhow::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    if let Some(header) = header {
        write!(writer, "{}{}", header, terminator)?;
    }
    for line in lines {
        write!(writer, "{}{}", line, terminator)?;
    }
    writer.flush()?;
    Ok(())
}

#[allow(dead_code)]
pub fn key_of(line: &str, key: usize) -> String {
    line.split(',').nth(key).unwrap_or("").to_string()
}
