use clap::Parser;
use robin_hash::HashMap;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    #[arg(short = 'l', long = "load_factor", default_value_t = 0.75)]
    load_factor: f32,
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashMap with target capacity {} at load factor {}",
        args.target_capacity, args.load_factor
    );

    let mut map: HashMap<u64, u64> =
        HashMap::with_capacity_and_load_factor(args.target_capacity, args.load_factor);
    println!("Actual capacity: {}", map.capacity());

    let num_keys = map.capacity() as u64;
    for key in 1..=num_keys {
        map.insert(key, key);
    }

    println!("Inserted {} entries", map.len());
    map.probe_stats().print();
}
