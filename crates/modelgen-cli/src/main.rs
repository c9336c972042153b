use std::env;
use std::process::ExitCode;

use modelgen::Instance;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(file_path) = args.get(1) else {
        eprintln!("usage: modelgen <file.mg>");
        return ExitCode::FAILURE;
    };

    let mut instance = Instance::new();
    if let Err(err) = instance.run_file(file_path) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
