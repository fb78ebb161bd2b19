use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use robin_hash::HashTable;
use robin_hash::SlotLayout;
use robin_hash::hash_table::Entry;
use robin_hash::{Compact, Indirect, Inline};

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Load factor at which the table grows, clamped to [0.2, 0.8].
    #[arg(short = 'l', long = "load_factor")]
    load_factor: Option<f32>,

    /// Slot layout: compact, inline, or indirect.
    #[arg(long = "layout", default_value = "inline")]
    layout: String,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn run<L: SlotLayout>(args: &Args) {
    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64, L> = HashTable::with_capacity(args.target_capacity);
    if let Some(load_factor) = args.load_factor {
        table.set_max_load_factor(load_factor, |&v| hash_u64(v));
    }

    println!("Actual capacity: {}", table.capacity());
    println!(
        "Filling table with u64 values up to max load factor {:.3}...",
        table.max_load_factor()
    );

    let initial_capacity = table.capacity();
    let num_values = (initial_capacity as f64 * table.max_load_factor() as f64) as usize;
    for i in 0..num_values {
        let value = i as u64;
        match table.entry(hash_u64(value), |&v| v == value, |&v| hash_u64(v)) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
    }

    println!("Inserted {} values into table", table.len());
    println!("Final load factor: {:.2}%", table.load_factor() * 100.0);
    if table.capacity() != initial_capacity {
        println!(
            "Table grew from {} to {} buckets",
            initial_capacity,
            table.capacity()
        );
    }

    table.probe_histogram().print();
    table.debug_stats().print();
}

fn main() {
    let args = Args::parse();

    match args.layout.as_str() {
        "compact" => run::<Compact>(&args),
        "inline" => run::<Inline>(&args),
        "indirect" => run::<Indirect>(&args),
        other => {
            eprintln!("unknown layout `{other}`, expected compact, inline, or indirect");
            std::process::exit(2);
        }
    }
}
