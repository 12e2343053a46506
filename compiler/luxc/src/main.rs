//! Lux compiler CLI.

use lux_diagnostic::ErrorCode;

fn main() {
    luxc::tracing_setup::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "demo" => {
            let frames = args
                .get(2)
                .and_then(|arg| arg.parse().ok())
                .unwrap_or(3u32);
            if let Err(message) = luxc::demo::run_demo(frames) {
                eprintln!("error: {message}");
                std::process::exit(1);
            }
        }
        "explain" => {
            if args.len() < 3 {
                eprintln!("Usage: lux explain <code>");
                std::process::exit(1);
            }
            match ErrorCode::parse(&args[2]) {
                Some(code) => {
                    println!("{code} ({} phase): {}", code.phase(), code.description());
                }
                None => {
                    eprintln!("unknown error code `{}`", args[2]);
                    std::process::exit(1);
                }
            }
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("unknown command `{other}`");
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Lux compiler");
    println!();
    println!("Usage:");
    println!("  lux demo [frames]    Compile the built-in demo patch and run it");
    println!("  lux explain <code>   Explain a diagnostic code (e.g. E2002)");
    println!("  lux help             Show this help");
}
