// In demos/fetch.rs
use handoff_bridge::ffi::{handoff_shutdown, handoff_startup, HANDOFF_SUCCESS};
use handoff_bridge::Consumer;
use std::env;
use std::ffi::CString;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <identifier> [root_dir]", args[0]);
        std::process::exit(1);
    }

    let root = CString::new(args.get(2).map(String::as_str).unwrap_or("."))?;
    let status = unsafe { handoff_startup(root.as_ptr()) };
    if status != HANDOFF_SUCCESS {
        eprintln!("Failed to start producer (status {})", status);
        std::process::exit(1);
    }

    let consumer: Consumer = Consumer::default();
    match consumer.fetch_json::<serde_json::Value>(&args[1])? {
        Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
        None => println!("{}: resource not available", args[1]),
    }

    let leaked = handoff_shutdown();
    if leaked > 0 {
        eprintln!("{} handles were never released", leaked);
    }
    Ok(())
}
