use std::env;

use zap2zerolog::{transform_source, Config};

fn main() {
    let path = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: cargo run --example rewrite -- <file.go> [config.yaml]");
        std::process::exit(2);
    });

    let cfg = match env::args().nth(2) {
        Some(cfg_path) => Config::from_yaml_file(cfg_path.as_ref()).unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(2);
        }),
        None => Config::default(),
    };

    let src = std::fs::read_to_string(&path).expect("read file");
    match transform_source(&src, &cfg) {
        Ok(t) => {
            for d in &t.diagnostics {
                eprintln!("{d}");
            }
            eprintln!("{} call(s) rewritten", t.rewrites);
            print!("{}", t.output);
        }
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    }
}
