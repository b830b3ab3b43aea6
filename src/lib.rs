//! This crate implements external sort, merge and sort-merge join for delimited text files that
//! do not fit in memory, for example CSV or TSV.
//!
//! A file is split into line aligned chunks, the chunks are sorted in memory in parallel and the
//! sorted chunks are merged with a k-way merge into the output. Memory usage is bounded by the
//! chunk size times the number of tasks. Records are compared by one key field as strings, ties
//! keep their input order.
//!
//! Files sorted by a key can be joined with [join::Join], an inner equi-join that streams both
//! inputs once.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use disksort::sort::Sort;
//! use disksort::join::Join;
//!
//! // sort two CSV files with headers by their first field and join them
//! fn sort_and_join(orders: PathBuf, customers: PathBuf, tmp: PathBuf, output: PathBuf) -> Result<usize, anyhow::Error> {
//!     let sorted_orders = tmp.join("orders-sorted.csv");
//!     let mut orders_sort = Sort::new(vec![orders], sorted_orders.clone());
//!     // set number of CPU cores the sort will attempt to use. The default is to use all
//!     // available cores.
//!     orders_sort.with_tasks(2);
//!     orders_sort.with_tmp_dir(tmp.clone());
//!     orders_sort.sort()?;
//!
//!     let sorted_customers = tmp.join("customers-sorted.csv");
//!     let mut customers_sort = Sort::new(vec![customers], sorted_customers.clone());
//!     customers_sort.with_tmp_dir(tmp.clone());
//!     customers_sort.sort()?;
//!
//!     Join::new(sorted_orders, sorted_customers, 0, 0).join(output)
//! }
//! ```
//!

pub(crate) mod sort_command;
pub(crate) mod line_record;
pub(crate) mod record_reader;
pub(crate) mod unmerged_chunk_file;
pub(crate) mod config;
pub(crate) mod chunk_iterator;
pub(crate) mod output_file;

pub mod sort;
pub mod split;
pub mod join;
pub mod checksum;
pub mod dialect;
pub mod error;
pub mod order;

pub use config::FailurePolicy;
