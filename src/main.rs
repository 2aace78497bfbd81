use std::process::ExitCode;

fn main() -> ExitCode {
    codemap::cli::run()
}
