use gemini_core::drive::ProgramKind;
use gemini_core::motion::{compile_sequence, load_sequence, sequence_time};
use std::env;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: compile_sequence <sequence.json> [program|profile] [eres]");
        return;
    }

    let path = &args[1];
    let kind = match args.get(2).map(String::as_str) {
        Some("profile") => ProgramKind::Profile,
        _ => ProgramKind::Program,
    };
    let eres: f64 = match args.get(3).map(|s| s.parse()) {
        Some(Ok(eres)) => eres,
        Some(Err(e)) => {
            eprintln!("Invalid encoder resolution: {}", e);
            std::process::exit(1);
        }
        None => 4000.0,
    };

    let cycles = match load_sequence(path) {
        Ok(cycles) => cycles,
        Err(e) => {
            eprintln!("Failed to load sequence: {}", e);
            std::process::exit(1);
        }
    };

    match compile_sequence(&cycles, kind, None) {
        Ok(commands) => {
            println!("{} {:?} commands:", commands.len(), kind);
            for command in &commands {
                println!("  {}", command);
            }
            println!(
                "\nEstimated time: {:.3} s (ERES {})",
                sequence_time(&cycles, eres),
                eres
            );
        }
        Err(e) => {
            eprintln!("Failed to compile sequence: {}", e);
            std::process::exit(1);
        }
    }
}
