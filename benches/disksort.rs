use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Error};
use benchmark_rs::benchmarks::Benchmarks;
use benchmark_rs::stopwatch::StopWatch;
use data_encoding::HEXLOWER;
use simple_logger::SimpleLogger;

use disksort::sort::Sort;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Clone)]
pub struct BenchmarkConfig {
    files: BTreeMap<usize, PathBuf>,
    bench_results_dir: PathBuf,
    bench_tmp_dir: PathBuf,
    tasks: usize,
    chunk_size_bytes: u64,
    description: String,
}

impl BenchmarkConfig {
    pub fn new(files: BTreeMap<usize, PathBuf>, bench_results_dir: PathBuf, bench_tmp_dir: PathBuf, tasks: usize, chunk_size_bytes: u64, description: &str) -> BenchmarkConfig {
        BenchmarkConfig {
            files,
            bench_results_dir,
            bench_tmp_dir,
            tasks,
            chunk_size_bytes,
            description: description.to_string(),
        }
    }

    pub fn get_input_path(&self, key: usize) -> PathBuf {
        self.files.get(&key).unwrap().clone()
    }

    pub fn bench_results_dir(&self) -> &PathBuf {
        &self.bench_results_dir
    }

    pub fn bench_tmp_dir(&self) -> &PathBuf {
        &self.bench_tmp_dir
    }

    pub fn tasks(&self) -> usize {
        self.tasks
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_bytes
    }
}

impl Display for BenchmarkConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "tasks: {}, chunk size: {}, description: {}",
                 self.tasks,
                 self.chunk_size_bytes,
                 self.description,
        )
    }
}

fn temp_file_name(dir: &PathBuf) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

fn cleanup(bench_results_dir: &PathBuf) -> Result<(), anyhow::Error> {
    if bench_results_dir.exists() {
        fs::remove_dir_all(bench_results_dir.clone()).with_context(|| anyhow!("{}", bench_results_dir.to_string_lossy()))?;
    }
    Ok(())
}

fn setup(bench_input_dir: &PathBuf, bench_results_dir: &PathBuf, bench_tmp_dir: &PathBuf) -> Result<(), anyhow::Error> {
    cleanup(bench_results_dir)?;

    for dir in [bench_input_dir, bench_results_dir, bench_tmp_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir.clone())
                .with_context(|| anyhow!("{}", dir.to_string_lossy()))?;
        }
    }
    Ok(())
}

fn create_input_files(count: usize, factor: usize, base_path: PathBuf) -> Result<BTreeMap<usize, PathBuf>, anyhow::Error> {
    let mut files: BTreeMap<usize, PathBuf> = BTreeMap::new();
    for i in 1..=count {
        let number_of_lines = i * factor;
        let path = base_path.join(PathBuf::from(format!("{}.csv", number_of_lines)));
        if !path.exists() {
            let mut writer = BufWriter::new(
                File::create(&path)
                    .with_context(|| anyhow!("path: {}", path.to_string_lossy()))?);
            write!(writer, "key,sequence,payload\r\n")?;
            for sequence in 0..number_of_lines {
                let key = rand::random::<u32>();
                let payload = HEXLOWER.encode(&rand::random::<[u8; 16]>());
                write!(writer, "{:010},{},{}\r\n", key, sequence, payload)?;
            }
        }
        files.insert(number_of_lines, path);
    }
    Ok(files)
}

fn sort(stop_watch: &mut StopWatch, config: BenchmarkConfig, work: usize) -> Result<(), anyhow::Error> {
    stop_watch.pause();
    let input_path = config.get_input_path(work);
    let output_path = temp_file_name(config.bench_results_dir());
    log::info!("Start sorting {}", input_path.to_string_lossy());
    stop_watch.resume();
    let mut disk_sort = Sort::new(vec![input_path.clone()], output_path.clone());
    disk_sort.with_tmp_dir(config.bench_tmp_dir().clone());
    disk_sort.with_tasks(config.tasks());
    disk_sort.with_chunk_size_bytes(config.chunk_size_bytes());
    disk_sort.sort()?;
    stop_watch.pause();
    log::info!("Finish sorting {}", input_path.to_string_lossy());
    fs::remove_file(output_path.clone())
        .with_context(|| anyhow!("{}", output_path.to_string_lossy()))?;
    Ok(())
}

#[test]
fn disksort_bench() -> Result<(), Error> {
    SimpleLogger::new().init().unwrap();
    log::info!("Started disksort_bench.");

    let bench_input_dir = PathBuf::from("./target/benchmarks/input");
    let bench_results_dir = PathBuf::from("./target/benchmarks/results");
    let bench_tmp_dir = PathBuf::from("./target/benchmarks/results/tmp");
    setup(&bench_input_dir, &bench_results_dir, &bench_tmp_dir)?;

    let small_files = create_input_files(5, 20_000, bench_input_dir.clone())?;

    let mut benchmarks = Benchmarks::new("disksort");

    for tasks in [1, 2, 4] {
        for chunk_size_bytes in [256 * 1024, 16 * 1024 * 1024] {
            benchmarks.add(
                format!("small-files-{}-tasks-{}-bytes", tasks, chunk_size_bytes).as_str(),
                sort,
                BenchmarkConfig::new(
                    small_files.clone(),
                    bench_results_dir.clone(),
                    bench_tmp_dir.clone(),
                    tasks,
                    chunk_size_bytes,
                    "small files",
                ),
                small_files.keys().cloned().collect(),
                3,
                0,
            )?;
        }
    }

    benchmarks.run()?;
    benchmarks.save_to_csv(PathBuf::from("./target/benchmarks/"), true, true)?;
    benchmarks.save_to_json(PathBuf::from("./target/benchmarks/"))?;

    log::info!("Finished disksort_bench.");
    Ok(())
}
